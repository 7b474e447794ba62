//! # Grabber Error Handling
//!
//! Hierarchical error type for the host side of the foveated grabber, with
//! classification traits so the acquisition loop can decide between retrying
//! the next cycle, skipping a frame, or shutting down.
//!
//! ## Error Classification
//!
//! - `Retryable`: the next cycle may succeed (no frame acquired yet, source hiccup)
//! - `Recoverable`: a fallback exists (skip the frame, reinitialize a sink)
//! - Fatal: invalid configuration; the grabber never becomes usable
//!
//! Errors from the transform core ([`lp_map::MapError`]) are folded in by
//! kind: configuration errors become fatal [`GrabberError::Config`], a missing
//! frame becomes a retryable [`GrabberError::SourceUnavailable`], and buffer
//! mismatches stay [`GrabberError::Transform`] (recoverable).
//!
//! ## Usage
//!
//! ```rust
//! use foveal_grabber::error::{GrabberError, Retryable};
//!
//! let error = GrabberError::source_unavailable("no frame acquired yet")
//!     .with_operation("get_logpolar_image")
//!     .with_recovery_suggestion("Wait for the next acquisition cycle");
//!
//! assert!(error.is_retryable());
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

use lp_map::MapError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Debug,
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that affect operation but can be recovered from
    Error,
    Critical,
    /// Fatal errors that cannot be recovered from
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    pub severity: ErrorSeverity,
    pub retryable: bool,
    pub recoverable: bool,
    /// Additional metadata as key-value pairs
    pub metadata: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            retryable: false,
            recoverable: false,
            metadata: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for the grabber
#[derive(Debug)]
pub enum GrabberError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// No frame to work on yet; try again next cycle
    SourceUnavailable {
        reason: String,
        context: ErrorContext,
    },
    /// Frame acquisition failures
    FrameCapture {
        reason: String,
        context: ErrorContext,
    },
    /// Transform core errors not covered by the other variants
    Transform {
        operation: String,
        source: MapError,
        context: ErrorContext,
    },
    /// Output delivery errors
    Sink {
        target: String,
        reason: String,
        context: ErrorContext,
    },
    /// Camera control not available on the current source
    Unsupported {
        capability: String,
        context: ErrorContext,
    },
    /// Lifecycle violations (open twice, close while idle, ...)
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
}

impl GrabberError {
    /// Create a configuration error (fatal)
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create a retryable "no frame yet" error
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
        .retryable()
    }

    pub fn frame_capture(reason: impl Into<String>) -> Self {
        Self::FrameCapture {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Wrap a transform error raised during `operation`
    pub fn transform(operation: impl Into<String>, source: MapError) -> Self {
        Self::Transform {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    pub fn sink(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sink {
            target: target.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: capability.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Info),
        }
    }

    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach the path an I/O error refers to
    pub fn with_path(mut self, p: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(p.into());
        }
        self
    }

    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    pub fn retryable(mut self) -> Self {
        self.context_mut().retryable = true;
        self
    }

    pub fn recoverable(mut self) -> Self {
        self.context_mut().recoverable = true;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::SourceUnavailable { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::Transform { context, .. } => context,
            Self::Sink { context, .. } => context,
            Self::Unsupported { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::SourceUnavailable { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::Transform { context, .. } => context,
            Self::Sink { context, .. } => context,
            Self::Unsupported { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::FrameCapture { .. } => "frame_capture",
            Self::Transform { .. } => "transform",
            Self::Sink { .. } => "sink",
            Self::Unsupported { .. } => "unsupported",
            Self::State { .. } => "state",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
        }
    }
}

impl fmt::Display for GrabberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrabberError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            GrabberError::SourceUnavailable { reason, .. } => {
                write!(f, "Source not available: {}", reason)
            }
            GrabberError::FrameCapture { reason, .. } => {
                write!(f, "Frame capture failed: {}", reason)
            }
            GrabberError::Transform {
                operation, source, ..
            } => {
                write!(f, "Transform failed during {}: {}", operation, source)
            }
            GrabberError::Sink { target, reason, .. } => {
                write!(f, "Delivery to {} failed: {}", target, reason)
            }
            GrabberError::Unsupported { capability, .. } => {
                write!(f, "Capability not supported by this source: {}", capability)
            }
            GrabberError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            GrabberError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            GrabberError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
        }
    }
}

impl StdError for GrabberError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transform { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type GrabberResult<T> = Result<T, GrabberError>;

/// Trait for errors that can be retried
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Get the recommended retry delay in milliseconds
    fn retry_delay_ms(&self) -> Option<u64> {
        None
    }

    fn max_retries(&self) -> Option<usize> {
        None
    }
}

impl Retryable for GrabberError {
    fn is_retryable(&self) -> bool {
        self.context().retryable
            || matches!(
                self,
                Self::SourceUnavailable { .. } | Self::FrameCapture { .. } | Self::Io { .. }
            )
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::SourceUnavailable { .. } => Some(0), // next cycle
            Self::FrameCapture { .. } => Some(100),
            Self::Io { .. } => Some(100),
            _ => None,
        }
    }

    fn max_retries(&self) -> Option<usize> {
        match self {
            Self::SourceUnavailable { .. } => Some(10),
            Self::FrameCapture { .. } => Some(5),
            Self::Io { .. } => Some(3),
            _ => None,
        }
    }
}

/// Trait for errors that can be recovered from
pub trait Recoverable {
    fn is_recoverable(&self) -> bool;

    /// Get recovery strategies for this error
    fn recovery_strategies(&self) -> Vec<RecoveryStrategy>;
}

/// Recovery strategies for handling errors
#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: usize, delay_ms: u64 },
    /// Reinitialize the component
    Reinitialize { component: String },
    /// Skip the current operation
    Skip { reason: String },
}

impl Recoverable for GrabberError {
    fn is_recoverable(&self) -> bool {
        self.context().recoverable
            || matches!(
                self,
                Self::SourceUnavailable { .. }
                    | Self::FrameCapture { .. }
                    | Self::Transform { .. }
                    | Self::Sink { .. }
                    | Self::Unsupported { .. }
            )
    }

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy> {
        match self {
            Self::SourceUnavailable { .. } => vec![RecoveryStrategy::Retry {
                max_attempts: 10,
                delay_ms: 0,
            }],
            Self::FrameCapture { .. } => vec![
                RecoveryStrategy::Retry {
                    max_attempts: 5,
                    delay_ms: 100,
                },
                RecoveryStrategy::Reinitialize {
                    component: "frame_source".to_string(),
                },
            ],
            Self::Transform { .. } => vec![RecoveryStrategy::Skip {
                reason: "Skip current frame for this output".to_string(),
            }],
            Self::Sink { .. } => vec![
                RecoveryStrategy::Skip {
                    reason: "Drop frame for this consumer".to_string(),
                },
                RecoveryStrategy::Reinitialize {
                    component: "sink".to_string(),
                },
            ],
            _ => vec![],
        }
    }
}

pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for GrabberError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

pub trait HasRecoverySuggestion {
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for GrabberError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error is transient (may resolve itself next cycle)
    pub fn is_transient(error: &GrabberError) -> bool {
        matches!(
            error,
            GrabberError::SourceUnavailable { .. } | GrabberError::FrameCapture { .. }
        )
    }

    /// Check if an error is fatal (cannot be recovered from)
    pub fn is_fatal(error: &GrabberError) -> bool {
        matches!(error, GrabberError::Config { .. }) || error.severity() == ErrorSeverity::Fatal
    }
}

impl From<MapError> for GrabberError {
    fn from(error: MapError) -> Self {
        match error {
            MapError::Configuration { field, reason } => Self::config(field, "", reason),
            MapError::UnsupportedSourceState(reason) => Self::source_unavailable(reason),
            other => Self::transform("resample", other).recoverable(),
        }
    }
}

impl From<std::io::Error> for GrabberError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for GrabberError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

impl From<image::ImageError> for GrabberError {
    fn from(error: image::ImageError) -> Self {
        Self::external("image", error)
    }
}
