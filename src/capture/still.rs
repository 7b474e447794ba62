//! Still-image source: one decoded picture replayed every cycle.

use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use lp_map::rect::RectResizer;
use lp_map::{RgbFrame, Size};

use super::FrameSource;
use crate::error::{GrabberError, GrabberResult};

#[derive(Debug, Clone)]
pub struct StillSource {
    image: RgbFrame,
}

impl StillSource {
    /// Decode `path` and fit it to `size` with the rectangular formatter.
    pub fn open(path: impl AsRef<Path>, size: Size) -> GrabberResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .map_err(|e| GrabberError::from(e).with_context(format!("decoding {}", path.display())))?
            .to_rgb8();
        let native = Size::new(decoded.width(), decoded.height());
        let frame = RgbFrame::from_raw(native, decoded.into_raw())?;
        info!("loaded {} ({})", path.display(), native);
        Self::from_frame(frame, size)
    }

    /// Use an in-memory frame, resized to `size` if it differs.
    pub fn from_frame(frame: RgbFrame, size: Size) -> GrabberResult<Self> {
        if frame.is_empty() || size.is_empty() {
            return Err(GrabberError::config(
                "source",
                format!("{} -> {}", frame.size(), size),
                "still image and target size must be non-empty",
            ));
        }
        if frame.size() == size {
            return Ok(Self { image: frame });
        }
        let mut image = RgbFrame::new(size);
        let path = RectResizer::new().apply(&frame, &mut image)?;
        debug!("still image {} -> {} via {:?}", frame.size(), size, path);
        Ok(Self { image })
    }

    pub fn image(&self) -> &RgbFrame {
        &self.image
    }
}

#[async_trait]
impl FrameSource for StillSource {
    fn size(&self) -> Size {
        self.image.size()
    }

    async fn initialize(&mut self) -> GrabberResult<()> {
        Ok(())
    }

    async fn acquire(&mut self, frame: &mut RgbFrame) -> GrabberResult<()> {
        frame.copy_from(&self.image);
        Ok(())
    }

    async fn shutdown(&mut self) -> GrabberResult<()> {
        Ok(())
    }
}
