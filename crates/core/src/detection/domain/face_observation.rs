use serde::{Deserialize, Serialize};

/// Head rotation in degrees relative to camera-forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacePose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl FacePose {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// True when any axis deviates strictly more than `max_degrees`.
    /// A face at exactly the limit is still frontal.
    pub fn exceeds(&self, max_degrees: f64) -> bool {
        self.yaw.abs() > max_degrees || self.pitch.abs() > max_degrees || self.roll.abs() > max_degrees
    }
}

/// Face bounds normalized to the frame, origin at the bottom-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Pixel rectangle `(x, y, width, height)` with a top-left origin,
    /// clamped to the frame.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> (u32, u32, u32, u32) {
        let fw = frame_width as f64;
        let fh = frame_height as f64;

        let x1 = (self.x * fw).clamp(0.0, fw);
        let x2 = ((self.x + self.width) * fw).clamp(0.0, fw);
        let top = (1.0 - self.y - self.height) * fh;
        let y1 = top.clamp(0.0, fh);
        let y2 = (top + self.height * fh).clamp(0.0, fh);

        (
            x1.round() as u32,
            y1.round() as u32,
            (x2 - x1).round() as u32,
            (y2 - y1).round() as u32,
        )
    }
}

/// One face as reported by the detection engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub pose: FacePose,
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

/// Per-frame summary consumed by the quality gate.
///
/// `primary` is present exactly when a single face was found; with zero or
/// several faces only the count is meaningful.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceObservation {
    face_count: usize,
    primary: Option<DetectedFace>,
}

impl FaceObservation {
    pub fn from_faces(faces: Vec<DetectedFace>) -> Self {
        let primary = match faces.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        Self {
            face_count: faces.len(),
            primary,
        }
    }

    /// Observation of `count` faces with no pose data, e.g. for crowds.
    pub fn with_count(count: usize) -> Self {
        Self {
            face_count: count,
            primary: None,
        }
    }

    pub fn single(face: DetectedFace) -> Self {
        Self::from_faces(vec![face])
    }

    pub fn face_count(&self) -> usize {
        self.face_count
    }

    pub fn primary(&self) -> Option<&DetectedFace> {
        self.primary.as_ref()
    }

    pub fn pose(&self) -> Option<FacePose> {
        self.primary.map(|f| f.pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn face(yaw: f64) -> DetectedFace {
        DetectedFace {
            pose: FacePose::new(yaw, 0.0, 0.0),
            bounding_box: BoundingBox::default(),
        }
    }

    #[test]
    fn test_single_face_has_primary() {
        let obs = FaceObservation::from_faces(vec![face(3.0)]);
        assert_eq!(obs.face_count(), 1);
        assert_eq!(obs.pose(), Some(FacePose::new(3.0, 0.0, 0.0)));
    }

    #[rstest]
    #[case::none(vec![])]
    #[case::two(vec![face(0.0), face(1.0)])]
    #[case::three(vec![face(0.0), face(1.0), face(2.0)])]
    fn test_other_counts_have_no_primary(#[case] faces: Vec<DetectedFace>) {
        let n = faces.len();
        let obs = FaceObservation::from_faces(faces);
        assert_eq!(obs.face_count(), n);
        assert!(obs.primary().is_none());
    }

    #[test]
    fn test_with_count() {
        let obs = FaceObservation::with_count(4);
        assert_eq!(obs.face_count(), 4);
        assert!(obs.pose().is_none());
    }

    #[rstest]
    #[case::frontal(FacePose::new(0.0, 0.0, 0.0), false)]
    #[case::at_limit(FacePose::new(15.0, -15.0, 15.0), false)]
    #[case::yaw_over(FacePose::new(15.0001, 0.0, 0.0), true)]
    #[case::pitch_over(FacePose::new(0.0, -16.0, 0.0), true)]
    #[case::roll_over(FacePose::new(0.0, 0.0, 20.0), true)]
    fn test_pose_exceeds(#[case] pose: FacePose, #[case] expected: bool) {
        assert_eq!(pose.exceeds(15.0), expected);
    }

    #[test]
    fn test_bounding_box_flips_to_top_left_origin() {
        // Box occupying the bottom-left quarter of a 200x100 frame
        let bbox = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 0.5,
            height: 0.5,
        };
        assert_eq!(bbox.to_pixel_rect(200, 100), (0, 50, 100, 50));
    }

    #[test]
    fn test_bounding_box_clamps_to_frame() {
        let bbox = BoundingBox {
            x: 0.8,
            y: -0.2,
            width: 0.4,
            height: 0.4,
        };
        // x spans 80..100 after clamp, top = (1 + 0.2 - 0.4) * 100 = 80 → 80..100
        assert_eq!(bbox.to_pixel_rect(100, 100), (80, 80, 20, 20));
    }

    #[test]
    fn test_detected_face_deserializes_without_bounding_box() {
        let face: DetectedFace =
            serde_json::from_str(r#"{"pose": {"yaw": 1.0, "pitch": 2.0, "roll": 3.0}}"#).unwrap();
        assert_eq!(face.pose, FacePose::new(1.0, 2.0, 3.0));
        assert_eq!(face.bounding_box, BoundingBox::default());
    }
}
