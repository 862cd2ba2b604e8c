use crate::shared::frame::FrameSample;

/// Produces camera frames in capture order.
///
/// The pipeline only sees [`FrameSample`]s; decoding and timing are up to
/// the implementation.
pub trait FrameSource {
    /// Number of frames the source will yield, when known up front.
    fn frame_count(&self) -> Option<usize>;

    /// Returns an iterator over frames in capture order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<FrameSample, Box<dyn std::error::Error>>> + '_>;
}
