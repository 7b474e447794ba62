use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use foveal_grabber::capture::{FrameSource, PatternSource, StillSource};
use foveal_grabber::config::GrabberConfig;
use foveal_grabber::grabber::Grabber;
use foveal_grabber::processing::{InverseSink, OutputKind, PngSequenceSink};
use log::{info, warn};

/// Foveated frame grabber: writes rectangular, log-polar and foveal PNG
/// sequences from a synthetic pattern or a still image.
#[derive(Parser, Debug)]
#[command(name = "fgrab")]
#[command(about = "Grab frames and write their rectangular, log-polar and foveal views")]
struct Args {
    /// JSON configuration file; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Still image to use as the source instead of the test pattern
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Source width
    #[arg(long)]
    width: Option<u32>,

    /// Source height
    #[arg(long)]
    height: Option<u32>,

    /// Rectangular output width
    #[arg(long)]
    out_width: Option<u32>,

    /// Rectangular output height
    #[arg(long)]
    out_height: Option<u32>,

    /// Number of eccentricity rings (positive multiple of 6)
    #[arg(long)]
    necc: Option<u32>,

    /// Number of angular sectors
    #[arg(long)]
    nang: Option<u32>,

    /// Fovea side in pixels
    #[arg(long)]
    fovea: Option<u32>,

    /// Receptive-field overlap (>= 1.0)
    #[arg(long)]
    overlap: Option<f64>,

    /// Cycles to run
    #[arg(short = 'n', long, default_value_t = 10)]
    frames: u64,

    /// Cycle rate in Hz, 0 for as fast as possible
    #[arg(short = 'r', long)]
    framerate: Option<f64>,

    /// Directory receiving one sub-directory per output
    #[arg(short, long, default_value = "fgrab-out")]
    out_dir: PathBuf,

    /// Outputs to write
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = OutputKind::ALL)]
    outputs: Vec<OutputKind>,

    /// Also write the Cartesian reconstruction of each log-polar frame
    #[arg(long)]
    reconstruct: bool,
}

impl Args {
    fn to_config(&self) -> Result<GrabberConfig> {
        let mut config = match &self.config {
            Some(path) => GrabberConfig::from_json_file(path)?,
            None => GrabberConfig::default(),
        };
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        config.out_width = self.out_width.or(config.out_width);
        config.out_height = self.out_height.or(config.out_height);
        if let Some(v) = self.necc {
            config.eccentricities = v;
        }
        if let Some(v) = self.nang {
            config.angles = v;
        }
        if let Some(v) = self.fovea {
            config.fovea = v;
        }
        if let Some(v) = self.overlap {
            config.overlap = v;
        }
        if let Some(v) = self.framerate {
            config.framerate = v;
        }
        config.inverse |= self.reconstruct;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.to_config()?;
    info!("{:?}", config);

    let source: Box<dyn FrameSource> = match &args.input {
        Some(path) => Box::new(StillSource::open(path, config.source_size())?),
        None => Box::new(PatternSource::new(config.source_size())),
    };
    let grabber = Grabber::with_boxed_source(config, source)?;

    for kind in &args.outputs {
        let sink = PngSequenceSink::new(args.out_dir.join(kind.to_string()), kind.to_string())?;
        grabber.add_sink(*kind, Box::new(sink)).await;
    }

    grabber.open().await?;
    if args.reconstruct {
        let transform = grabber
            .transform()
            .await
            .context("grabber opened without a transform")?;
        let inner = PngSequenceSink::new(args.out_dir.join("reconstruct"), "reconstruct")?;
        let sink = InverseSink::new(transform, Box::new(inner))?;
        grabber.add_sink(OutputKind::Logpolar, Box::new(sink)).await;
    }

    let result = grabber.run(Some(args.frames)).await;
    if let Err(e) = grabber.close().await {
        warn!("close failed: {}", e);
    }
    let stats = result?;
    info!(
        "{} cycles ({} retries, {} output failures) written to {}",
        stats.cycles,
        stats.retries,
        stats.output_failures,
        args.out_dir.display()
    );
    Ok(())
}
