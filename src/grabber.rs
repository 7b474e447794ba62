//! # Foveated Grabber
//!
//! Drives one [`FrameSource`] and three outputs (rectangular, log-polar,
//! foveal) from a single acquisition loop.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──open()──▶ Opening ──▶ Active ──close()──▶ Closing ──▶ Idle
//! ```
//!
//! Lookup tables and output buffers are built in `open()` and dropped in
//! `close()`. Sinks survive a close and are reused by the next open.
//!
//! ## Locking
//!
//! One [`tokio::sync::Mutex`] guards the source, the shared source buffer and
//! every output. It is held for exactly one acquire-plus-format cycle, so the
//! source buffer never changes while a formatter reads it. On-demand
//! accessors (`get_image` and friends) take the same lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use lp_map::{LogPolarTransform, RgbFrame, SensorGeometry, Size};
use tokio::sync::Mutex;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::capture::FrameSource;
use crate::config::GrabberConfig;
use crate::controls::{Control, ExtendedControls};
use crate::error::{classify, GrabberError, GrabberResult, Retryable};
use crate::processing::{
    FovealFormatter, FrameSink, LogpolarFormatter, Output, OutputKind, RectFormatter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabberState {
    Idle,
    Opening,
    Active,
    Closing,
}

impl fmt::Display for GrabberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GrabberState::Idle => "idle",
            GrabberState::Opening => "opening",
            GrabberState::Active => "active",
            GrabberState::Closing => "closing",
        })
    }
}

/// What one acquisition cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// 1-based index of the acquired frame.
    pub frame: u64,
    /// Outputs whose formatter ran and whose sinks were fed.
    pub ran: Vec<OutputKind>,
    /// Outputs that failed this cycle; the others still ran.
    pub failures: Vec<(OutputKind, GrabberError)>,
}

impl CycleReport {
    pub fn ran(&self, kind: OutputKind) -> bool {
        self.ran.contains(&kind)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Totals for one call to [`Grabber::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub retries: u64,
    pub output_failures: u64,
}

struct Shared {
    state: GrabberState,
    source: Box<dyn FrameSource>,
    /// Most recent acquired frame; empty until the first acquisition.
    frame: RgbFrame,
    acquired: u64,
    transform: Option<Arc<LogPolarTransform>>,
    outputs: [Output; 3],
}

impl Shared {
    fn ensure_active(&self, operation: &str) -> GrabberResult<()> {
        if self.state != GrabberState::Active {
            return Err(GrabberError::state(
                self.state.to_string(),
                operation,
                "grabber is not open",
            ));
        }
        Ok(())
    }

    fn output(&mut self, kind: OutputKind) -> &mut Output {
        &mut self.outputs[kind.index()]
    }
}

pub struct Grabber {
    config: GrabberConfig,
    geometry: SensorGeometry,
    shared: Mutex<Shared>,
    stop: AtomicBool,
}

impl Grabber {
    /// Validate `config` against `source`. Nothing is allocated until [`Self::open`].
    pub fn new(config: GrabberConfig, source: impl FrameSource + 'static) -> GrabberResult<Self> {
        Self::with_boxed_source(config, Box::new(source))
    }

    pub fn with_boxed_source(
        config: GrabberConfig,
        source: Box<dyn FrameSource>,
    ) -> GrabberResult<Self> {
        config.validate()?;
        let geometry = config.geometry()?;
        if source.size() != geometry.source() {
            return Err(GrabberError::config(
                "source",
                source.size().to_string(),
                format!("frame source must produce {} frames", geometry.source()),
            ));
        }
        let outputs = [
            Output::new(OutputKind::Rect, config.rect_name()),
            Output::new(OutputKind::Logpolar, config.logpolar_name()),
            Output::new(OutputKind::Fovea, config.fovea_name()),
        ];
        Ok(Self {
            config,
            geometry,
            shared: Mutex::new(Shared {
                state: GrabberState::Idle,
                source,
                frame: RgbFrame::default(),
                acquired: 0,
                transform: None,
                outputs,
            }),
            stop: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &GrabberConfig {
        &self.config
    }

    pub async fn state(&self) -> GrabberState {
        self.shared.lock().await.state
    }

    /// Initialize the source, build the lookup tables and allocate output buffers.
    pub async fn open(&self) -> GrabberResult<()> {
        let mut guard = self.shared.lock().await;
        let shared = &mut *guard;
        if shared.state != GrabberState::Idle {
            return Err(GrabberError::state(shared.state.to_string(), "open", "already open"));
        }
        shared.state = GrabberState::Opening;
        info!("{}: opening ({})", self.config.name, self.geometry.source());

        if let Err(e) = shared.source.initialize().await {
            shared.state = GrabberState::Idle;
            return Err(e.with_operation("open"));
        }

        let mut transform = LogPolarTransform::new(self.geometry);
        if self.config.inverse {
            transform.build_inverse();
        }
        let transform = Arc::new(transform);
        shared.output(OutputKind::Rect).bind(Box::new(RectFormatter::new(self.config.rect_size())));
        shared
            .output(OutputKind::Logpolar)
            .bind(Box::new(LogpolarFormatter::new(transform.clone())));
        shared
            .output(OutputKind::Fovea)
            .bind(Box::new(FovealFormatter::new(self.geometry.fovea())));
        shared.transform = Some(transform);
        shared.frame = RgbFrame::default();
        shared.acquired = 0;

        shared.state = GrabberState::Active;
        info!(
            "{}: active, logpolar {} fovea {} rect {}",
            self.config.name,
            self.geometry.logpolar_size(),
            self.geometry.fovea_size(),
            self.config.rect_size()
        );
        Ok(())
    }

    /// Shut down the source and sinks and release tables and buffers.
    ///
    /// The grabber always ends up `Idle`; the first shutdown error is returned.
    pub async fn close(&self) -> GrabberResult<()> {
        let mut guard = self.shared.lock().await;
        let shared = &mut *guard;
        if shared.state != GrabberState::Active {
            return Err(GrabberError::state(shared.state.to_string(), "close", "not open"));
        }
        shared.state = GrabberState::Closing;
        info!("{}: closing after {} frames", self.config.name, shared.acquired);
        self.stop.store(true, Ordering::Relaxed);

        let mut first = shared.source.shutdown().await.err();
        for output in shared.outputs.iter_mut() {
            if let Err(e) = output.shutdown().await {
                warn!("{}: sink shutdown failed: {}", output.name(), e);
                first.get_or_insert(e);
            }
            output.release();
        }
        shared.transform = None;
        shared.frame = RgbFrame::default();
        shared.state = GrabberState::Idle;
        info!("{}: idle", self.config.name);
        first.map_or(Ok(()), Err)
    }

    /// Attach a consumer to one output. Allowed in any state.
    pub async fn add_sink(&self, kind: OutputKind, sink: Box<dyn FrameSink>) {
        self.shared.lock().await.output(kind).add_sink(sink);
    }

    pub async fn sink_count(&self, kind: OutputKind) -> usize {
        self.shared.lock().await.output(kind).sink_count()
    }

    /// Shared transform, available while the grabber is open.
    pub async fn transform(&self) -> Option<Arc<LogPolarTransform>> {
        self.shared.lock().await.transform.clone()
    }

    /// Acquire one frame and feed every output that has consumers.
    pub async fn cycle(&self) -> GrabberResult<CycleReport> {
        let mut guard = self.shared.lock().await;
        let shared = &mut *guard;
        shared.ensure_active("cycle")?;

        shared.source.acquire(&mut shared.frame).await?;
        shared.acquired += 1;
        let mut report = CycleReport {
            frame: shared.acquired,
            ..CycleReport::default()
        };

        for output in shared.outputs.iter_mut() {
            match output.process(&shared.frame).await {
                Ok(true) => report.ran.push(output.kind()),
                Ok(false) => {}
                Err(e) => {
                    warn!("{}: frame {} failed: {}", output.name(), report.frame, e);
                    report.failures.push((output.kind(), e));
                }
            }
        }
        trace!("frame {}: ran {:?}", report.frame, report.ran);
        Ok(report)
    }

    /// Repeat [`Self::cycle`] until `max_frames` cycles completed, [`Self::stop`]
    /// is called during this run, or a non-retryable error occurs.
    ///
    /// Cycles are paced at the configured framerate when it is positive.
    /// Retryable acquisition errors are retried up to their limit; output
    /// failures are counted and only abort the run when fatal.
    pub async fn run(&self, max_frames: Option<u64>) -> GrabberResult<RunStats> {
        self.stop.store(false, Ordering::Relaxed);
        let mut stats = RunStats::default();
        let mut ticker = match self.pacing()? {
            Some(period) => {
                let mut t = interval(period);
                t.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Some(t)
            }
            None => None,
        };
        let mut consecutive = 0usize;
        info!("{}: running (framerate {})", self.config.name, self.config.framerate);

        while max_frames.is_none_or(|max| stats.cycles < max) {
            if self.stop.load(Ordering::Relaxed) {
                debug!("{}: stop requested", self.config.name);
                break;
            }
            match ticker.as_mut() {
                Some(t) => {
                    t.tick().await;
                }
                None => tokio::task::yield_now().await,
            }
            match self.cycle().await {
                Ok(report) => {
                    consecutive = 0;
                    stats.cycles += 1;
                    stats.output_failures += report.failures.len() as u64;
                    if let Some((_, e)) = report.failures.into_iter().find(|(_, e)| classify::is_fatal(e)) {
                        return Err(e);
                    }
                }
                Err(e) if e.is_retryable() => {
                    consecutive += 1;
                    stats.retries += 1;
                    if consecutive > e.max_retries().unwrap_or(0) {
                        warn!("{}: giving up after {} retries", self.config.name, consecutive - 1);
                        return Err(e);
                    }
                    debug!("{}: retrying cycle: {}", self.config.name, e);
                    if let Some(ms) = e.retry_delay_ms().filter(|&ms| ms > 0) {
                        sleep(Duration::from_millis(ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(stats)
    }

    /// Cycle period for the configured framerate; `None` runs unpaced.
    fn pacing(&self) -> GrabberResult<Option<Duration>> {
        let rate = self.config.framerate;
        if rate <= 0.0 {
            return Ok(None);
        }
        let period = Duration::try_from_secs_f64(1.0 / rate).map_err(|_| {
            GrabberError::config("framerate", rate.to_string(), "period out of range")
        })?;
        Ok((!period.is_zero()).then_some(period))
    }

    /// Ask a running [`Self::run`] to return after its current cycle.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Rectangular output of the most recent frame, into a caller buffer.
    pub async fn get_image(&self, dst: &mut RgbFrame) -> GrabberResult<()> {
        self.format_latest(OutputKind::Rect, dst).await
    }

    pub async fn get_logpolar_image(&self, dst: &mut RgbFrame) -> GrabberResult<()> {
        self.format_latest(OutputKind::Logpolar, dst).await
    }

    pub async fn get_foveal_image(&self, dst: &mut RgbFrame) -> GrabberResult<()> {
        self.format_latest(OutputKind::Fovea, dst).await
    }

    async fn format_latest(&self, kind: OutputKind, dst: &mut RgbFrame) -> GrabberResult<()> {
        let mut guard = self.shared.lock().await;
        let shared = &mut *guard;
        if shared.state != GrabberState::Active {
            return Err(GrabberError::source_unavailable(format!("grabber is {}", shared.state))
                .with_operation(format!("get {}", kind)));
        }
        shared.outputs[kind.index()].format_into(&shared.frame, dst)
    }

    pub fn necc(&self) -> u32 {
        self.geometry.eccentricities()
    }

    pub fn nang(&self) -> u32 {
        self.geometry.angles()
    }

    pub fn fovea(&self) -> u32 {
        self.geometry.fovea()
    }

    pub fn overlap(&self) -> f64 {
        self.geometry.overlap()
    }

    /// Rectangular output width, 0 unless open.
    pub async fn width(&self) -> u32 {
        self.rect_size().await.w
    }

    /// Rectangular output height, 0 unless open.
    pub async fn height(&self) -> u32 {
        self.rect_size().await.h
    }

    async fn rect_size(&self) -> Size {
        let shared = self.shared.lock().await;
        if shared.state == GrabberState::Active {
            self.config.rect_size()
        } else {
            Size::default()
        }
    }

    pub async fn get_control(&self, control: Control) -> GrabberResult<f64> {
        let shared = self.shared.lock().await;
        shared.ensure_active("get control")?;
        shared
            .source
            .controls()
            .ok_or_else(|| GrabberError::unsupported("camera controls"))?
            .get(control)
    }

    pub async fn set_control(&self, control: Control, value: f64) -> GrabberResult<()> {
        let mut shared = self.shared.lock().await;
        shared.ensure_active("set control")?;
        debug!("{}: set {} = {}", self.config.name, control, value);
        shared
            .source
            .controls_mut()
            .ok_or_else(|| GrabberError::unsupported("camera controls"))?
            .set(control, value)
    }

    pub async fn white_balance(&self) -> GrabberResult<(f64, f64)> {
        let shared = self.shared.lock().await;
        shared.ensure_active("get white balance")?;
        shared
            .source
            .controls()
            .ok_or_else(|| GrabberError::unsupported("camera controls"))?
            .white_balance()
    }

    pub async fn set_white_balance(&self, blue: f64, red: f64) -> GrabberResult<()> {
        let mut shared = self.shared.lock().await;
        shared.ensure_active("set white balance")?;
        shared
            .source
            .controls_mut()
            .ok_or_else(|| GrabberError::unsupported("camera controls"))?
            .set_white_balance(blue, red)
    }

    /// Run `f` against the source's vendor extension under the grabber lock.
    pub async fn with_extended<R>(
        &self,
        f: impl FnOnce(&mut dyn ExtendedControls) -> GrabberResult<R>,
    ) -> GrabberResult<R> {
        let mut shared = self.shared.lock().await;
        shared.ensure_active("extended control")?;
        let ext = shared
            .source
            .controls_mut()
            .and_then(|c| c.extended())
            .ok_or_else(|| GrabberError::unsupported("extended controls"))?;
        f(ext)
    }
}
