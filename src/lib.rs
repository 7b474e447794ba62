//! # Foveal Grabber
//!
//! Host side of a foveated camera: acquires Cartesian RGB frames from a
//! [`FrameSource`](capture::FrameSource) and serves three views of each one,
//! built on the [`lp_map`] transform core:
//!
//! - **rect**: the frame resized to a configured Cartesian size
//! - **logpolar**: the log-polar image (rings × sectors)
//! - **fovea**: the centered, uniformly sampled foveal window
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `capture`: frame sources (synthetic pattern, still image)
//! - `controls`: camera control capability interfaces
//! - `processing`: formatters, outputs and frame sinks
//! - `grabber`: lifecycle, locking and the acquisition loop
//! - `config`: configuration management and validation
//! - `error`: error hierarchy and classification
//!
//! ## Example
//!
//! ```rust,no_run
//! use foveal_grabber::capture::PatternSource;
//! use foveal_grabber::config::GrabberConfig;
//! use foveal_grabber::grabber::Grabber;
//! use foveal_grabber::processing::{ChannelSink, OutputKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GrabberConfig::default();
//! let grabber = Grabber::new(config.clone(), PatternSource::new(config.source_size()))?;
//!
//! let (sink, mut frames) = ChannelSink::new("viewer", 4);
//! grabber.add_sink(OutputKind::Logpolar, Box::new(sink)).await;
//!
//! grabber.open().await?;
//! grabber.run(Some(10)).await?;
//! let lp = frames.recv().await.expect("one log-polar frame");
//! assert_eq!((lp.width(), lp.height()), (252, 156));
//! grabber.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod controls;
pub mod error;
pub mod grabber;
pub mod processing;

/// Re-export error types for convenience
pub use error::{
    GrabberError, GrabberResult, HasRecoverySuggestion, HasSeverity, Recoverable, Retryable,
};
pub use grabber::{CycleReport, Grabber, GrabberState};
pub use lp_map::{RgbFrame, Size};
