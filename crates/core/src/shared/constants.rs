/// Largest head rotation, per axis, still considered facing forward (degrees).
pub const MAX_POSE_ANGLE_DEGREES: f64 = 15.0;

/// Lowest normalized brightness accepted for capture.
pub const MIN_BRIGHTNESS: f64 = 0.4;

/// Luma sampling grid spacing in pixels, both axes.
pub const DEFAULT_SAMPLE_STRIDE: usize = 10;

/// Inset from the guide frame to the transparent hole, per side (points).
pub const DEFAULT_HOLE_MARGIN: f64 = 2.5;

/// Opacity of the black dimming layer around the hole.
pub const DEFAULT_DIM_ALPHA: f64 = 0.4;

/// How long one detection may stay in flight before its result is abandoned.
pub const DEFAULT_DETECTION_TIMEOUT_MS: u64 = 1000;

pub const SETTINGS_DIR_NAME: &str = "ScanFace";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
