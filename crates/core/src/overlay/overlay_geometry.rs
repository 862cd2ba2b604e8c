use serde::{Deserialize, Serialize};

use crate::shared::constants::{DEFAULT_DIM_ALPHA, DEFAULT_HOLE_MARGIN};
use crate::shared::geometry::{Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    EvenOdd,
}

/// Dimmed overlay with a transparent cut-out over the guide frame.
///
/// The mask path is `outer` followed by `hole`, filled even-odd: points
/// inside exactly one of the two sub-paths are dimmed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuidanceMask {
    pub outer: Rect,
    pub hole: Rect,
    pub marker_center: Point,
    pub fill_rule: FillRule,
    pub dim_alpha: f64,
}

impl GuidanceMask {
    /// Sub-paths in drawing order.
    pub fn subpaths(&self) -> [Rect; 2] {
        [self.outer, self.hole]
    }

    pub fn is_dimmed(&self, p: Point) -> bool {
        let crossings = self
            .subpaths()
            .iter()
            .filter(|r| r.contains_point(p))
            .count();
        crossings % 2 == 1
    }
}

/// Pure mask computation from the view bounds and the guide frame.
pub fn compute_mask(bounds: Rect, guide_frame: Rect, margin: f64) -> GuidanceMask {
    let hole = guide_frame.inset_by(margin, margin);
    GuidanceMask {
        outer: bounds,
        hole,
        marker_center: hole.center(),
        fill_rule: FillRule::EvenOdd,
        dim_alpha: DEFAULT_DIM_ALPHA,
    }
}

/// Keeps the guidance mask in step with layout.
///
/// Every layout change recomputes from scratch; identical inputs give an
/// identical mask, so repeated layout passes are harmless.
#[derive(Clone, Debug)]
pub struct OverlayGeometry {
    margin: f64,
    dim_alpha: f64,
    mask: Option<GuidanceMask>,
}

impl OverlayGeometry {
    pub fn new(margin: f64, dim_alpha: f64) -> Self {
        Self {
            margin,
            dim_alpha,
            mask: None,
        }
    }

    /// Layout callback. Returns the freshly computed mask.
    pub fn on_bounds_changed(&mut self, bounds: Rect, guide_frame: Rect) -> GuidanceMask {
        if !bounds.contains_rect(&guide_frame) {
            log::warn!("Guide frame {guide_frame:?} extends outside overlay bounds {bounds:?}");
        }
        let mask = GuidanceMask {
            dim_alpha: self.dim_alpha,
            ..compute_mask(bounds, guide_frame, self.margin)
        };
        self.mask = Some(mask);
        mask
    }

    /// Mask from the most recent layout, if any has happened.
    pub fn mask(&self) -> Option<&GuidanceMask> {
        self.mask.as_ref()
    }
}

impl Default for OverlayGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_HOLE_MARGIN, DEFAULT_DIM_ALPHA)
    }
}
