//! # Capture Module
//!
//! Frame sources feeding the grabber. A source fills the shared RGB8 buffer
//! once per acquisition cycle and may expose camera controls through the
//! capability queries on [`FrameSource`].

pub mod pattern;
pub mod still;

use async_trait::async_trait;
use lp_map::{RgbFrame, Size};

use crate::controls::CameraControls;
use crate::error::GrabberResult;

pub use pattern::PatternSource;
pub use still::StillSource;

/// Abstract interface for frame sources.
#[async_trait]
pub trait FrameSource: Send {
    /// Native resolution of every frame this source produces.
    fn size(&self) -> Size;

    async fn initialize(&mut self) -> GrabberResult<()>;

    /// Write the next frame into `frame`, resizing it to [`Self::size`] if needed.
    async fn acquire(&mut self, frame: &mut RgbFrame) -> GrabberResult<()>;

    async fn shutdown(&mut self) -> GrabberResult<()>;

    fn controls(&self) -> Option<&dyn CameraControls> {
        None
    }

    fn controls_mut(&mut self) -> Option<&mut dyn CameraControls> {
        None
    }
}
