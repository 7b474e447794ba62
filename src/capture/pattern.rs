//! Synthetic test-pattern source.
//!
//! Concentric rings around the image center, alternating angular wedges and
//! a diagonal ramp, all drifting with the frame counter. The log-polar output
//! of this pattern is easy to eyeball: rings become horizontal bands and
//! wedges vertical ones.

use std::f64::consts::TAU;

use async_trait::async_trait;
use log::{debug, trace};
use lp_map::geometry::BYTES_PER_PIXEL;
use lp_map::{RgbFrame, Size};

use super::FrameSource;
use crate::controls::{check_range, CameraControls, Control, ExtendedControls};
use crate::error::{GrabberError, GrabberResult};

const WEDGES: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Settings {
    brightness: f64,
    gain: f64,
    /// `(blue, red)`
    white_balance: (f64, f64),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            brightness: 0.5,
            gain: 0.5,
            white_balance: (0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bus {
    power: bool,
    capture: bool,
    transmission: bool,
    bytes_per_packet: u32,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            power: true,
            capture: true,
            transmission: true,
            bytes_per_packet: 4096,
        }
    }
}

/// Deterministic generator; frame `n` always renders the same bytes for the
/// same settings.
#[derive(Debug, Clone)]
pub struct PatternSource {
    size: Size,
    frame_index: u64,
    settings: Settings,
    bus: Bus,
}

impl PatternSource {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            frame_index: 0,
            settings: Settings::default(),
            bus: Bus::default(),
        }
    }

    /// Number of frames produced so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn render(&self, frame: &mut RgbFrame) {
        let (w, h) = (self.size.w, self.size.h);
        let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0);
        let t = self.frame_index as f64;
        let s = self.settings;
        let offset = (s.brightness - 0.5) * 255.0;
        let scale = s.gain * 2.0;
        let (blue, red) = (s.white_balance.0 * 2.0, s.white_balance.1 * 2.0);
        let level = |v: f64, channel: f64| (v * scale * channel + offset).round().clamp(0.0, 255.0) as u8;

        for y in 0..h {
            let row = frame.row_mut(y);
            let py = cy - (f64::from(y) + 0.5);
            for x in 0..w {
                let px = f64::from(x) + 0.5 - cx;
                let rho = px.hypot(py);
                let theta = py.atan2(px).rem_euclid(TAU);
                let ring = (rho * 2.0 + t).rem_euclid(256.0);
                let wedge = if ((theta / TAU * WEDGES) as u32) % 2 == 0 { 200.0 } else { 55.0 };
                let ramp = ((u64::from(x) + u64::from(y) + self.frame_index) % 256) as f64;
                let i = x as usize * BYTES_PER_PIXEL;
                row[i] = level(ring, red);
                row[i + 1] = level(wedge, 1.0);
                row[i + 2] = level(ramp, blue);
            }
        }
    }
}

#[async_trait]
impl FrameSource for PatternSource {
    fn size(&self) -> Size {
        self.size
    }

    async fn initialize(&mut self) -> GrabberResult<()> {
        if self.size.is_empty() {
            return Err(GrabberError::config(
                "source",
                self.size.to_string(),
                "pattern size must be non-empty",
            ));
        }
        self.frame_index = 0;
        debug!("pattern source initialized at {}", self.size);
        Ok(())
    }

    async fn acquire(&mut self, frame: &mut RgbFrame) -> GrabberResult<()> {
        if !(self.bus.power && self.bus.capture && self.bus.transmission) {
            return Err(GrabberError::frame_capture("pattern transmission is stopped")
                .with_metadata("power", self.bus.power.to_string())
                .with_metadata("capture", self.bus.capture.to_string()));
        }
        frame.resize(self.size);
        self.render(frame);
        trace!("pattern frame {}", self.frame_index);
        self.frame_index += 1;
        Ok(())
    }

    async fn shutdown(&mut self) -> GrabberResult<()> {
        Ok(())
    }

    fn controls(&self) -> Option<&dyn CameraControls> {
        Some(self)
    }

    fn controls_mut(&mut self) -> Option<&mut dyn CameraControls> {
        Some(self)
    }
}

impl CameraControls for PatternSource {
    fn get(&self, control: Control) -> GrabberResult<f64> {
        match control {
            Control::Brightness => Ok(self.settings.brightness),
            Control::Gain => Ok(self.settings.gain),
            other => Err(GrabberError::unsupported(other.name())),
        }
    }

    fn set(&mut self, control: Control, value: f64) -> GrabberResult<()> {
        match control {
            Control::Brightness => self.settings.brightness = check_range("brightness", value)?,
            Control::Gain => self.settings.gain = check_range("gain", value)?,
            other => return Err(GrabberError::unsupported(other.name())),
        }
        Ok(())
    }

    fn white_balance(&self) -> GrabberResult<(f64, f64)> {
        Ok(self.settings.white_balance)
    }

    fn set_white_balance(&mut self, blue: f64, red: f64) -> GrabberResult<()> {
        self.settings.white_balance = (check_range("blue", blue)?, check_range("red", red)?);
        Ok(())
    }

    fn extended(&mut self) -> Option<&mut dyn ExtendedControls> {
        Some(self)
    }
}

impl ExtendedControls for PatternSource {
    fn transmission(&self) -> GrabberResult<bool> {
        Ok(self.bus.transmission)
    }

    fn set_transmission(&mut self, on: bool) -> GrabberResult<()> {
        self.bus.transmission = on;
        Ok(())
    }

    fn set_defaults(&mut self) -> GrabberResult<()> {
        self.settings = Settings::default();
        Ok(())
    }

    fn reset(&mut self) -> GrabberResult<()> {
        self.settings = Settings::default();
        self.bus = Bus::default();
        self.frame_index = 0;
        Ok(())
    }

    fn set_power(&mut self, on: bool) -> GrabberResult<()> {
        self.bus.power = on;
        Ok(())
    }

    fn set_capture(&mut self, on: bool) -> GrabberResult<()> {
        self.bus.capture = on;
        Ok(())
    }

    fn bytes_per_packet(&self) -> GrabberResult<u32> {
        Ok(self.bus.bytes_per_packet)
    }

    fn set_bytes_per_packet(&mut self, bytes: u32) -> GrabberResult<()> {
        if bytes == 0 {
            return Err(GrabberError::config("bytes_per_packet", "0", "must be positive"));
        }
        self.bus.bytes_per_packet = bytes;
        Ok(())
    }
}
