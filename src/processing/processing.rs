//! # Output Formatting and Delivery
//!
//! Each acquisition cycle produces up to three outputs from the same source
//! buffer. An [`Output`] binds one [`Formatter`] to its own destination
//! buffer and to the [`SinkSet`] of consumers interested in it.
//!
//! ## Architecture
//!
//! 1. **Formatter Trait**: synchronous source → destination transform
//! 2. **Output**: formatter + destination buffer (allocated once) + sinks
//! 3. **FrameSink Trait**: abstract consumer of formatted frames
//! 4. **SinkSet**: concurrent fan-out to every sink of one output
//!
//! An output without sinks is skipped entirely; its formatter never runs.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, trace, warn};
use lp_map::fovea::FovealCropper;
use lp_map::rect::RectResizer;
use lp_map::{LogPolarTransform, RgbFrame, Size};
use tokio::sync::mpsc;

use crate::error::{GrabberError, GrabberResult};

/// The three output shapes a grabber serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum OutputKind {
    /// Cartesian resize of the source
    Rect,
    /// Full log-polar image
    Logpolar,
    /// Centered 1:1 foveal crop
    Fovea,
}

impl OutputKind {
    pub const ALL: [OutputKind; 3] = [OutputKind::Rect, OutputKind::Logpolar, OutputKind::Fovea];

    pub fn index(self) -> usize {
        match self {
            OutputKind::Rect => 0,
            OutputKind::Logpolar => 1,
            OutputKind::Fovea => 2,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputKind::Rect => "rect",
            OutputKind::Logpolar => "logpolar",
            OutputKind::Fovea => "fovea",
        })
    }
}

/// Synchronous frame formatter.
pub trait Formatter: Send {
    fn kind(&self) -> OutputKind;

    /// Size of every frame this formatter writes.
    fn output_size(&self) -> Size;

    /// Format `src` into `dst`. On error `dst` is left untouched.
    fn format(&mut self, src: &RgbFrame, dst: &mut RgbFrame) -> GrabberResult<()>;
}

/// Cartesian → Cartesian resize to a fixed output size.
pub struct RectFormatter {
    size: Size,
    resizer: RectResizer,
}

impl RectFormatter {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            resizer: RectResizer::new(),
        }
    }
}

impl Formatter for RectFormatter {
    fn kind(&self) -> OutputKind {
        OutputKind::Rect
    }

    fn output_size(&self) -> Size {
        self.size
    }

    fn format(&mut self, src: &RgbFrame, dst: &mut RgbFrame) -> GrabberResult<()> {
        let path = self.resizer.apply(src, dst)?;
        trace!("rect {} -> {} via {:?}", src.size(), dst.size(), path);
        Ok(())
    }
}

/// Cartesian → log-polar through the shared forward table.
pub struct LogpolarFormatter {
    transform: Arc<LogPolarTransform>,
}

impl LogpolarFormatter {
    pub fn new(transform: Arc<LogPolarTransform>) -> Self {
        Self { transform }
    }
}

impl Formatter for LogpolarFormatter {
    fn kind(&self) -> OutputKind {
        OutputKind::Logpolar
    }

    fn output_size(&self) -> Size {
        self.transform.geometry().logpolar_size()
    }

    fn format(&mut self, src: &RgbFrame, dst: &mut RgbFrame) -> GrabberResult<()> {
        Ok(self.transform.cart_to_logpolar(src, dst)?)
    }
}

pub struct FovealFormatter {
    cropper: FovealCropper,
}

impl FovealFormatter {
    pub fn new(fovea: u32) -> Self {
        Self {
            cropper: FovealCropper::new(fovea),
        }
    }
}

impl Formatter for FovealFormatter {
    fn kind(&self) -> OutputKind {
        OutputKind::Fovea
    }

    fn output_size(&self) -> Size {
        self.cropper.output_size()
    }

    fn format(&mut self, src: &RgbFrame, dst: &mut RgbFrame) -> GrabberResult<()> {
        Ok(self.cropper.apply(src, dst)?)
    }
}

/// Abstract consumer of formatted frames.
#[async_trait]
pub trait FrameSink: Send {
    fn name(&self) -> &str;

    async fn deliver(&mut self, frame: &RgbFrame) -> GrabberResult<()>;

    async fn shutdown(&mut self) -> GrabberResult<()> {
        Ok(())
    }
}

/// Fan-out to every consumer of one output.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn FrameSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn FrameSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver `frame` to all sinks concurrently.
    ///
    /// Every sink gets the frame even when another fails; the first failure
    /// is returned.
    pub async fn deliver(&mut self, frame: &RgbFrame) -> GrabberResult<()> {
        let results = join_all(self.sinks.iter_mut().map(|s| s.deliver(frame))).await;
        let mut first = None;
        for result in results {
            if let Err(e) = result {
                warn!("sink delivery failed: {}", e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    pub async fn shutdown(&mut self) -> GrabberResult<()> {
        for sink in &mut self.sinks {
            sink.shutdown().await?;
        }
        Ok(())
    }
}

/// Hands out clones of each frame over a bounded tokio channel.
///
/// A full channel drops the frame; a closed one is a delivery error.
pub struct ChannelSink {
    name: String,
    tx: mpsc::Sender<RgbFrame>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<RgbFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
                dropped: 0,
            },
            rx,
        )
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&mut self, frame: &RgbFrame) -> GrabberResult<()> {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!("{}: consumer lagging, dropped frame ({} total)", self.name, self.dropped);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(GrabberError::sink(self.name.clone(), "receiver dropped"))
            }
        }
    }
}

/// Writes `<prefix>_<index>.png` files into a directory.
pub struct PngSequenceSink {
    name: String,
    dir: PathBuf,
    prefix: String,
    next: u64,
}

impl PngSequenceSink {
    /// Create `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> GrabberResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| GrabberError::io("create output dir", e).with_path(dir.display().to_string()))?;
        let prefix = prefix.into();
        Ok(Self {
            name: format!("{}/{}", dir.display(), prefix),
            dir,
            prefix,
            next: 0,
        })
    }

    /// Path the next delivered frame will be written to.
    pub fn next_path(&self) -> PathBuf {
        self.dir.join(format!("{}_{:06}.png", self.prefix, self.next))
    }

    pub fn written(&self) -> u64 {
        self.next
    }
}

#[async_trait]
impl FrameSink for PngSequenceSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&mut self, frame: &RgbFrame) -> GrabberResult<()> {
        let path = self.next_path();
        let (w, h) = (frame.width(), frame.height());
        let data = frame.as_bytes().to_vec();
        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            image::save_buffer(&target, &data, w, h, image::ExtendedColorType::Rgb8)
        })
        .await
        .map_err(|e| GrabberError::sink(self.name.clone(), e.to_string()))?
        .map_err(|e| GrabberError::from(e).with_context(format!("writing {}", path.display())))?;
        self.next += 1;
        Ok(())
    }
}

/// Wraps another sink and hands it the Cartesian reconstruction of each
/// log-polar frame.
pub struct InverseSink {
    transform: Arc<LogPolarTransform>,
    buffer: RgbFrame,
    inner: Box<dyn FrameSink>,
}

impl InverseSink {
    /// # Errors
    /// [`GrabberError::Config`] if `transform` has no inverse table.
    pub fn new(transform: Arc<LogPolarTransform>, inner: Box<dyn FrameSink>) -> GrabberResult<Self> {
        if !transform.has_inverse() {
            return Err(GrabberError::config(
                "inverse",
                "false",
                "reconstruction needs the inverse table",
            ));
        }
        let buffer = transform.cartesian_frame();
        Ok(Self {
            transform,
            buffer,
            inner,
        })
    }
}

#[async_trait]
impl FrameSink for InverseSink {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn deliver(&mut self, frame: &RgbFrame) -> GrabberResult<()> {
        self.transform.logpolar_to_cart(frame, &mut self.buffer)?;
        self.inner.deliver(&self.buffer).await
    }

    async fn shutdown(&mut self) -> GrabberResult<()> {
        self.inner.shutdown().await
    }
}

/// One output stream of the grabber.
///
/// Sinks can be attached at any time; the formatter and its destination
/// buffer only exist between [`Output::bind`] and [`Output::release`].
pub struct Output {
    kind: OutputKind,
    name: String,
    formatter: Option<Box<dyn Formatter>>,
    buffer: RgbFrame,
    sinks: SinkSet,
    produced: u64,
}

impl Output {
    pub fn new(kind: OutputKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            formatter: None,
            buffer: RgbFrame::default(),
            sinks: SinkSet::new(),
            produced: 0,
        }
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a formatter and allocate its destination buffer.
    pub fn bind(&mut self, formatter: Box<dyn Formatter>) {
        debug_assert_eq!(formatter.kind(), self.kind);
        self.buffer = RgbFrame::new(formatter.output_size());
        self.formatter = Some(formatter);
        self.produced = 0;
    }

    pub fn release(&mut self) {
        self.formatter = None;
        self.buffer = RgbFrame::default();
    }

    pub fn is_bound(&self) -> bool {
        self.formatter.is_some()
    }

    pub fn add_sink(&mut self, sink: Box<dyn FrameSink>) {
        debug!("{}: attached sink {}", self.name, sink.name());
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn output_size(&self) -> Option<Size> {
        self.formatter.as_ref().map(|f| f.output_size())
    }

    /// Most recent formatted frame.
    pub fn buffer(&self) -> &RgbFrame {
        &self.buffer
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }

    fn formatter_mut(&mut self) -> GrabberResult<&mut Box<dyn Formatter>> {
        let name = &self.name;
        self.formatter
            .as_mut()
            .ok_or_else(|| GrabberError::state("unbound", "format", format!("{} has no formatter", name)))
    }

    /// Format `src` and deliver it, if anyone is listening.
    ///
    /// Returns whether the formatter ran.
    pub async fn process(&mut self, src: &RgbFrame) -> GrabberResult<bool> {
        if self.sinks.is_empty() {
            return Ok(false);
        }
        let formatter = self
            .formatter
            .as_mut()
            .ok_or_else(|| GrabberError::state("unbound", "process", "output has no formatter"))?;
        formatter
            .format(src, &mut self.buffer)
            .map_err(|e| e.with_operation(format!("format {}", self.kind)))?;
        self.produced += 1;
        self.sinks.deliver(&self.buffer).await?;
        Ok(true)
    }

    /// Format `src` into a caller buffer, resized to the output size.
    ///
    /// Nothing is written when `src` holds no frame.
    pub fn format_into(&mut self, src: &RgbFrame, dst: &mut RgbFrame) -> GrabberResult<()> {
        if src.is_empty() {
            return Err(GrabberError::source_unavailable("no frame acquired yet")
                .with_operation(format!("get {}", self.kind)));
        }
        let formatter = self.formatter_mut()?;
        dst.resize(formatter.output_size());
        formatter.format(src, dst)
    }

    pub async fn shutdown(&mut self) -> GrabberResult<()> {
        self.sinks.shutdown().await
    }
}
