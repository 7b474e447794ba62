//! # Processing Module
//!
//! Formatters, outputs and frame sinks driven by the grabber each cycle.

pub mod processing;

// Re-export commonly used types for convenience
pub use processing::{
    ChannelSink, FovealFormatter, Formatter, FrameSink, InverseSink, LogpolarFormatter, Output,
    OutputKind, PngSequenceSink, RectFormatter, SinkSet,
};
