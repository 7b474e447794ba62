//! # Camera Controls
//!
//! Capability interfaces a [`FrameSource`](crate::capture::FrameSource) may
//! expose. A source advertises support by returning `Some` from
//! `controls()`/`controls_mut()`; vendor extensions are reached the same way
//! through [`CameraControls::extended`]. Every method has a default that
//! reports [`GrabberError::Unsupported`], so an implementation only overrides
//! what its hardware can do.
//!
//! Control values are normalized to `0.0..=1.0`.

use std::fmt;

use crate::error::{GrabberError, GrabberResult};

/// Scalar controls addressable through [`CameraControls::get`]/[`CameraControls::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Brightness,
    Exposure,
    Sharpness,
    Hue,
    Saturation,
    Gamma,
    Shutter,
    Gain,
    Iris,
}

impl Control {
    pub const ALL: [Control; 9] = [
        Control::Brightness,
        Control::Exposure,
        Control::Sharpness,
        Control::Hue,
        Control::Saturation,
        Control::Gamma,
        Control::Shutter,
        Control::Gain,
        Control::Iris,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Control::Brightness => "brightness",
            Control::Exposure => "exposure",
            Control::Sharpness => "sharpness",
            Control::Hue => "hue",
            Control::Saturation => "saturation",
            Control::Gamma => "gamma",
            Control::Shutter => "shutter",
            Control::Gain => "gain",
            Control::Iris => "iris",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reject values outside the normalized range.
pub fn check_range(control: &str, value: f64) -> GrabberResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(GrabberError::config(
            control,
            value.to_string(),
            "control values are normalized to 0.0..=1.0",
        ))
    }
}

/// Standard camera settings.
pub trait CameraControls: Send {
    fn get(&self, control: Control) -> GrabberResult<f64> {
        Err(GrabberError::unsupported(control.name()))
    }

    fn set(&mut self, control: Control, value: f64) -> GrabberResult<()> {
        let _ = value;
        Err(GrabberError::unsupported(control.name()))
    }

    /// White balance as `(blue, red)`.
    fn white_balance(&self) -> GrabberResult<(f64, f64)> {
        Err(GrabberError::unsupported("white_balance"))
    }

    fn set_white_balance(&mut self, blue: f64, red: f64) -> GrabberResult<()> {
        let _ = (blue, red);
        Err(GrabberError::unsupported("white_balance"))
    }

    fn supports(&self, control: Control) -> bool {
        self.get(control).is_ok()
    }

    /// Vendor extension, if the device has one.
    fn extended(&mut self) -> Option<&mut dyn ExtendedControls> {
        None
    }

    fn brightness(&self) -> GrabberResult<f64> {
        self.get(Control::Brightness)
    }

    fn set_brightness(&mut self, value: f64) -> GrabberResult<()> {
        self.set(Control::Brightness, value)
    }

    fn gain(&self) -> GrabberResult<f64> {
        self.get(Control::Gain)
    }

    fn set_gain(&mut self, value: f64) -> GrabberResult<()> {
        self.set(Control::Gain, value)
    }
}

/// Bus operation mode of a FireWire-class device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    Legacy,
    B1394b,
}

/// Vendor-specific controls of FireWire-class cameras.
pub trait ExtendedControls: Send {
    fn has_feature(&self, feature: u32) -> bool {
        let _ = feature;
        false
    }

    fn feature(&self, feature: u32) -> GrabberResult<f64> {
        Err(GrabberError::unsupported(format!("feature {}", feature)))
    }

    fn set_feature(&mut self, feature: u32, value: f64) -> GrabberResult<()> {
        let _ = value;
        Err(GrabberError::unsupported(format!("feature {}", feature)))
    }

    /// Switch a feature between automatic and manual mode.
    fn set_auto(&mut self, feature: u32, auto: bool) -> GrabberResult<()> {
        let _ = auto;
        Err(GrabberError::unsupported(format!("auto mode for feature {}", feature)))
    }

    fn one_push(&mut self, feature: u32) -> GrabberResult<()> {
        Err(GrabberError::unsupported(format!("one-push for feature {}", feature)))
    }

    fn operation_mode(&self) -> GrabberResult<OperationMode> {
        Err(GrabberError::unsupported("operation_mode"))
    }

    fn set_operation_mode(&mut self, mode: OperationMode) -> GrabberResult<()> {
        let _ = mode;
        Err(GrabberError::unsupported("operation_mode"))
    }

    fn transmission(&self) -> GrabberResult<bool> {
        Err(GrabberError::unsupported("transmission"))
    }

    fn set_transmission(&mut self, on: bool) -> GrabberResult<()> {
        let _ = on;
        Err(GrabberError::unsupported("transmission"))
    }

    fn set_broadcast(&mut self, on: bool) -> GrabberResult<()> {
        let _ = on;
        Err(GrabberError::unsupported("broadcast"))
    }

    /// Restore factory settings for every feature.
    fn set_defaults(&mut self) -> GrabberResult<()> {
        Err(GrabberError::unsupported("defaults"))
    }

    fn reset(&mut self) -> GrabberResult<()> {
        Err(GrabberError::unsupported("reset"))
    }

    fn set_power(&mut self, on: bool) -> GrabberResult<()> {
        let _ = on;
        Err(GrabberError::unsupported("power"))
    }

    fn set_capture(&mut self, on: bool) -> GrabberResult<()> {
        let _ = on;
        Err(GrabberError::unsupported("capture"))
    }

    fn bytes_per_packet(&self) -> GrabberResult<u32> {
        Err(GrabberError::unsupported("bytes_per_packet"))
    }

    fn set_bytes_per_packet(&mut self, bytes: u32) -> GrabberResult<()> {
        let _ = bytes;
        Err(GrabberError::unsupported("bytes_per_packet"))
    }
}
