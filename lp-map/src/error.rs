// SPDX-License-Identifier: MIT
// Error type shared by every transform in this crate.

use fast_image_resize as fir;

use crate::geometry::Size;

#[derive(Debug)]
pub enum MapError {
    /// Invalid geometry parameters; the transform object is never built.
    Configuration { field: &'static str, reason: String },
    /// A source or destination buffer does not match the geometry it is used with.
    DimensionMismatch {
        what: &'static str,
        expected: Size,
        actual: Size,
    },
    /// The source buffer holds no frame yet (e.g. nothing acquired).
    UnsupportedSourceState(&'static str),
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl MapError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(what: &'static str, expected: Size, actual: Size) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }
}

impl From<fir::ResizeError> for MapError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for MapError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::Configuration { field, reason } => {
                write!(f, "Invalid geometry ({}): {}", field, reason)
            }
            MapError::DimensionMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "Dimension mismatch for {}: expected {}x{}, got {}x{}",
                what, expected.w, expected.h, actual.w, actual.h
            ),
            MapError::UnsupportedSourceState(reason) => {
                write!(f, "Source not available: {}", reason)
            }
            MapError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            MapError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Fir(e) => Some(e),
            MapError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}
