use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;

use scanface_core::camera::domain::focus_mapper::map_tap_to_focus;
use scanface_core::camera::domain::orientation::{resolve_orientation, CameraFacing, DeviceOrientation};
use scanface_core::overlay::overlay_geometry::{GuidanceMask, OverlayGeometry};
use scanface_core::pipeline::capture_validator::CaptureValidator;
use scanface_core::pipeline::frame_intake::FrameDisposition;
use scanface_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use scanface_core::pipeline::validation_listener::ValidationListener;
use scanface_core::quality::validation_result::ValidationResult;
use scanface_core::replay::frame_source::FrameSource;
use scanface_core::replay::manifest_frame_source::ManifestFrameSource;
use scanface_core::shared::geometry::{Point, Rect, Size};
use scanface_core::shared::settings::ScanSettings;

/// Face capture gating: replay recorded sessions and check overlay and
/// focus geometry.
#[derive(Parser)]
#[command(name = "scanface")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded capture session through the quality gate.
    Replay(ReplayArgs),
    /// Compute the guidance mask cut-out for a guide frame.
    Mask(MaskArgs),
    /// Map a tap in the preview to a camera focus point.
    Focus(FocusArgs),
    /// Resolve the image orientation for a device orientation and camera.
    Orientation(OrientationArgs),
}

#[derive(Args)]
struct ReplayArgs {
    /// Session manifest (JSON).
    manifest: PathBuf,

    /// Settings file (defaults to the per-user settings).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Luma sampling stride in pixels.
    #[arg(long)]
    stride: Option<usize>,

    /// Detection timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print one JSON object per verdict instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MaskArgs {
    /// Overlay bounds as x,y,w,h.
    #[arg(long, value_parser = parse_rect)]
    bounds: Rect,

    /// Guide frame as x,y,w,h.
    #[arg(long, value_parser = parse_rect)]
    guide: Rect,

    /// Inset from the guide frame to the hole, per side. Overrides the
    /// settings file.
    #[arg(long)]
    margin: Option<f64>,

    /// Settings file (defaults to the per-user settings).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print the full mask as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FocusArgs {
    /// Tap location in view points as x,y.
    #[arg(long, value_parser = parse_point)]
    tap: Point,

    /// Preview view size as w,h.
    #[arg(long, value_parser = parse_size)]
    view: Size,
}

#[derive(Args)]
struct OrientationArgs {
    /// portrait, landscape_left, portrait_upside_down, landscape_right,
    /// face_up, face_down or unknown.
    #[arg(long, value_parser = parse_named::<DeviceOrientation>)]
    device: DeviceOrientation,

    /// front or back. Defaults to the camera in the settings file.
    #[arg(long, value_parser = parse_named::<CameraFacing>)]
    facing: Option<CameraFacing>,

    /// Settings file (defaults to the per-user settings).
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Replay(args) => run_replay(&args),
        Command::Mask(args) => run_mask(&args),
        Command::Focus(args) => run_focus(&args),
        Command::Orientation(args) => run_orientation(&args),
    }
}

/// Collects verdicts between pumps so they can be printed with the frame
/// they belong to.
#[derive(Default)]
struct VerdictCollector {
    pending: RefCell<Vec<ValidationResult>>,
}

impl ValidationListener for VerdictCollector {
    fn on_validation(&self, result: &ValidationResult) {
        self.pending.borrow_mut().push(*result);
    }
}

impl VerdictCollector {
    fn take(&self) -> Vec<ValidationResult> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

fn run_replay(args: &ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(args)?;
    let mut source = ManifestFrameSource::open(&args.manifest)?;
    log::info!(
        "Replaying {} frames from {} ({} camera, {:?})",
        source.frame_count().unwrap_or(0),
        args.manifest.display(),
        source.manifest().camera_facing,
        source.orientation()
    );

    let detector = source.scripted_detector(settings.detector);
    let (intake, mut validator) = CaptureValidator::start(
        Box::new(detector),
        &settings,
        Box::new(StdoutPipelineLogger::new()),
    )?;
    let collector = Arc::new(VerdictCollector::default());
    validator.subscribe(&collector);

    let wait = settings.detection_timeout();
    for frame in source.frames() {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Skipping unreadable frame: {e}");
                continue;
            }
        };
        let index = frame.index();
        let timestamp_ms = frame.timestamp().as_millis();

        match intake.on_frame(frame) {
            FrameDisposition::Dispatched(_) => {
                validator.pump_timeout(wait);
                let verdicts = collector.take();
                if verdicts.is_empty() {
                    println!("frame {index:>4} @ {timestamp_ms}ms: no verdict");
                }
                for verdict in verdicts {
                    print_verdict(index, timestamp_ms, &verdict, args.json)?;
                }
            }
            FrameDisposition::DroppedInFlight => {
                println!("frame {index:>4} @ {timestamp_ms}ms: dropped (detection in flight)");
            }
            FrameDisposition::Skipped(e) => {
                println!("frame {index:>4} @ {timestamp_ms}ms: skipped ({e})");
            }
            FrameDisposition::DetectorUnavailable => {
                return Err("face detection worker stopped".into());
            }
        }
    }

    let stats = validator.stats();
    validator.shutdown(intake)?;
    log::info!(
        "{} frames, {} verdicts, {} dropped, {} skipped, {} detection failures",
        stats.frames_received,
        stats.verdicts,
        stats.frames_dropped,
        stats.frames_skipped,
        stats.detection_failures
    );
    Ok(())
}

fn read_settings(path: Option<&Path>) -> Result<ScanSettings, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => ScanSettings::load_from(path)?,
        None => ScanSettings::load(),
    })
}

fn load_settings(args: &ReplayArgs) -> Result<ScanSettings, Box<dyn std::error::Error>> {
    let mut settings = read_settings(args.settings.as_deref())?;
    if let Some(stride) = args.stride {
        settings.sample_stride = stride;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.detection_timeout_ms = timeout_ms;
    }
    settings.validate()?;
    Ok(settings)
}

fn print_verdict(
    index: usize,
    timestamp_ms: u128,
    verdict: &ValidationResult,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let line = serde_json::json!({
            "frame": index,
            "timestamp_ms": timestamp_ms as u64,
            "accepted": verdict.accepted,
            "reason": verdict.reason,
            "text": verdict.reason_text(),
        });
        println!("{}", serde_json::to_string(&line)?);
    } else {
        let status = if verdict.accepted { "ACCEPT" } else { "REJECT" };
        println!(
            "frame {index:>4} @ {timestamp_ms}ms: {status}  {}",
            verdict.reason_text()
        );
    }
    Ok(())
}

fn build_mask(args: &MaskArgs, settings: &ScanSettings) -> Result<GuidanceMask, String> {
    let margin = args.margin.unwrap_or(settings.overlay.hole_margin);
    if !(margin >= 0.0) {
        return Err(format!("Margin must be >= 0, got {margin}"));
    }
    let mut overlay = OverlayGeometry::new(margin, settings.overlay.dim_alpha);
    Ok(overlay.on_bounds_changed(args.bounds, args.guide))
}

fn run_mask(args: &MaskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = read_settings(args.settings.as_deref())?;
    let mask = build_mask(args, &settings)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mask)?);
    } else {
        let hole = mask.hole;
        println!(
            "hole: {},{},{},{}",
            hole.min_x(),
            hole.min_y(),
            hole.size.width,
            hole.size.height
        );
        println!("marker: {},{}", mask.marker_center.x, mask.marker_center.y);
    }
    Ok(())
}

fn run_focus(args: &FocusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let point = map_tap_to_focus(args.tap, args.view).ok_or_else(|| {
        format!(
            "View size must be non-empty, got {}x{}",
            args.view.width, args.view.height
        )
    })?;
    println!("focus: {:.4},{:.4}", point.x, point.y);
    Ok(())
}

fn facing_for(args: &OrientationArgs) -> Result<CameraFacing, Box<dyn std::error::Error>> {
    match args.facing {
        Some(facing) => Ok(facing),
        None => Ok(read_settings(args.settings.as_deref())?.camera_facing),
    }
}

fn run_orientation(args: &OrientationArgs) -> Result<(), Box<dyn std::error::Error>> {
    let orientation = resolve_orientation(args.device, facing_for(args)?);
    println!("{}", serde_json::to_string(&orientation)?.trim_matches('"'));
    Ok(())
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{s}': {e}"))?;
    <[f64; N]>::try_from(values).map_err(|v| format!("expected {N} values, got {}", v.len()))
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let [x, y, w, h] = parse_numbers::<4>(s)?;
    if w < 0.0 || h < 0.0 {
        return Err(format!("width and height must be >= 0 in '{s}'"));
    }
    Ok(Rect::new(x, y, w, h))
}

fn parse_point(s: &str) -> Result<Point, String> {
    let [x, y] = parse_numbers::<2>(s)?;
    Ok(Point::new(x, y))
}

fn parse_size(s: &str) -> Result<Size, String> {
    let [width, height] = parse_numbers::<2>(s)?;
    Ok(Size::new(width, height))
}

/// Parses an enum by its serialized name, e.g. `landscape_left`.
fn parse_named<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown value '{s}'"))
}
