//! The frame decoder collaborator.

use image::RgbaImage;

use montage_common::{MontageError, MontageResult};
use montage_project_model::media::{AssetSource, StillFrame};

/// One decoded frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: RgbaImage,
    /// Source time the frame was actually taken from. May differ from the
    /// requested time when the decoder snaps to an addressable frame.
    pub actual_time_secs: f64,
}

/// Decodes single frames from clip sources.
///
/// Implementations fail with [`MontageError::NotDecodable`] when the frame
/// cannot be produced and [`MontageError::OutOfRange`] when the time lies
/// past the end of the source.
#[async_trait::async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Decode the frame at `local_time_secs` of `source`.
    async fn decode_frame(
        &self,
        source: &AssetSource,
        local_time_secs: f64,
    ) -> MontageResult<DecodedFrame>;

    /// Decoder name, for logs.
    fn name(&self) -> &str;
}

/// Copy an in-memory still into an image buffer.
pub fn still_to_image(frame: &StillFrame) -> MontageResult<RgbaImage> {
    RgbaImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec()).ok_or_else(|| {
        MontageError::not_decodable(format!(
            "still frame buffer does not match {}x{}",
            frame.width(),
            frame.height()
        ))
    })
}
