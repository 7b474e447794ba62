//! Common test utilities shared by the grabber integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use foveal_grabber::capture::FrameSource;
use foveal_grabber::config::GrabberConfig;
use foveal_grabber::error::{GrabberError, GrabberResult};
use foveal_grabber::{RgbFrame, Size};

/// Small geometry that builds tables quickly.
pub fn small_config() -> GrabberConfig {
    GrabberConfig {
        width: 64,
        height: 48,
        eccentricities: 12,
        angles: 32,
        fovea: 16,
        ..GrabberConfig::default()
    }
}

/// Solid frames cycling red, green, blue; optionally fails the first
/// `failures` acquisitions with a retryable error.
pub struct MockSource {
    size: Size,
    frames: u64,
    failures: u32,
    pub shutdowns: u32,
}

impl MockSource {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            frames: 0,
            failures: 0,
            shutdowns: 0,
        }
    }

    pub fn failing(size: Size, failures: u32) -> Self {
        Self {
            failures,
            ..Self::new(size)
        }
    }

    pub fn color(frame: u64) -> [u8; 3] {
        match frame % 3 {
            0 => [255, 0, 0],
            1 => [0, 255, 0],
            _ => [0, 0, 255],
        }
    }
}

#[async_trait]
impl FrameSource for MockSource {
    fn size(&self) -> Size {
        self.size
    }

    async fn initialize(&mut self) -> GrabberResult<()> {
        Ok(())
    }

    async fn acquire(&mut self, frame: &mut RgbFrame) -> GrabberResult<()> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(GrabberError::frame_capture("mock bus reset"));
        }
        let color = Self::color(self.frames);
        *frame = RgbFrame::from_fn(self.size, |_, _| color);
        self.frames += 1;
        Ok(())
    }

    async fn shutdown(&mut self) -> GrabberResult<()> {
        self.shutdowns += 1;
        Ok(())
    }
}

/// Deterministic noise so neighbouring pixels differ.
pub fn noise(size: Size, seed: u32) -> RgbFrame {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    RgbFrame::from_fn(size, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        [next(), next(), next()]
    })
}
