use serde::{Deserialize, Serialize};

use crate::shared::geometry::{Point, Size};

/// Focus/exposure point of interest in normalized sensor space, `[0, 1]` on
/// both axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

/// Converts a tap in a portrait view into the sensor's coordinate frame.
///
/// The sensor is mounted rotated 90° from the portrait UI, so the view's
/// vertical axis becomes the sensor's x and the view's horizontal axis,
/// flipped, becomes the sensor's y. The rotation is fixed: it does not
/// follow the device orientation, so taps in landscape map as if the device
/// were still portrait.
///
/// Returns `None` for an empty view. Taps outside the view are clamped.
pub fn map_tap_to_focus(tap: Point, view_size: Size) -> Option<FocusPoint> {
    if view_size.is_empty() {
        return None;
    }
    Some(FocusPoint {
        x: (tap.y / view_size.height).clamp(0.0, 1.0),
        y: (1.0 - tap.x / view_size.width).clamp(0.0, 1.0),
    })
}
