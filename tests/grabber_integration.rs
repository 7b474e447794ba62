//! End-to-end tests of the grabber lifecycle, acquisition loop and outputs.

mod common;

use std::sync::Arc;

use common::{noise, small_config, MockSource};
use foveal_grabber::capture::{PatternSource, StillSource};
use foveal_grabber::controls::{Control, OperationMode};
use foveal_grabber::error::{classify, Retryable};
use foveal_grabber::grabber::{Grabber, GrabberState};
use foveal_grabber::processing::{ChannelSink, InverseSink, OutputKind, PngSequenceSink};
use foveal_grabber::{RgbFrame, Size};

const SOURCE: Size = Size { w: 64, h: 48 };

fn mock_grabber() -> Grabber {
    Grabber::new(small_config(), MockSource::new(SOURCE)).unwrap()
}

#[tokio::test]
async fn lifecycle_transitions() {
    let grabber = mock_grabber();
    assert_eq!(grabber.state().await, GrabberState::Idle);
    assert_eq!(grabber.width().await, 0);
    assert_eq!(grabber.height().await, 0);
    assert_eq!(grabber.close().await.unwrap_err().category(), "state");
    assert_eq!(grabber.cycle().await.unwrap_err().category(), "state");
    let mut dst = RgbFrame::default();
    let err = grabber.get_foveal_image(&mut dst).await.unwrap_err();
    assert_eq!(err.category(), "source_unavailable");

    grabber.open().await.unwrap();
    assert_eq!(grabber.state().await, GrabberState::Active);
    assert_eq!((grabber.width().await, grabber.height().await), (64, 48));
    assert_eq!(grabber.open().await.unwrap_err().category(), "state");

    grabber.close().await.unwrap();
    assert_eq!(grabber.state().await, GrabberState::Idle);
    assert!(grabber.transform().await.is_none());

    grabber.open().await.unwrap();
    grabber.cycle().await.unwrap();
    grabber.close().await.unwrap();
}

#[tokio::test]
async fn geometry_accessors_report_configuration() {
    let grabber = mock_grabber();
    assert_eq!(grabber.necc(), 12);
    assert_eq!(grabber.nang(), 32);
    assert_eq!(grabber.fovea(), 16);
    assert_eq!(grabber.overlap(), 1.0);
}

#[tokio::test]
async fn invalid_configuration_is_fatal() {
    let mut config = small_config();
    config.eccentricities = 100;
    let err = Grabber::new(config, MockSource::new(SOURCE)).err().unwrap();
    assert!(classify::is_fatal(&err));

    let err = Grabber::new(small_config(), MockSource::new(Size::new(32, 24)))
        .err()
        .unwrap();
    assert_eq!(err.category(), "config");
}

#[tokio::test]
async fn accessors_before_first_frame_ask_for_retry() {
    let grabber = mock_grabber();
    grabber.open().await.unwrap();

    let mut dst = RgbFrame::new(Size::new(4, 4));
    dst.as_bytes_mut().fill(0x5A);
    for result in [
        grabber.get_image(&mut dst).await,
        grabber.get_logpolar_image(&mut dst).await,
        grabber.get_foveal_image(&mut dst).await,
    ] {
        let err = result.unwrap_err();
        assert!(err.is_retryable());
        assert!(classify::is_transient(&err));
    }
    assert_eq!(dst.size(), Size::new(4, 4));
    assert!(dst.as_bytes().iter().all(|&b| b == 0x5A));
}

#[tokio::test]
async fn outputs_without_sinks_are_skipped() {
    let grabber = mock_grabber();
    let (sink, mut rx) = ChannelSink::new("fovea", 4);
    grabber.add_sink(OutputKind::Fovea, Box::new(sink)).await;
    grabber.open().await.unwrap();

    let report = grabber.cycle().await.unwrap();
    assert_eq!(report.frame, 1);
    assert_eq!(report.ran, vec![OutputKind::Fovea]);
    assert!(report.is_clean());

    let fovea = rx.recv().await.unwrap();
    assert_eq!(fovea.size(), Size::new(16, 16));
    assert_eq!(fovea.pixel(0, 0), MockSource::color(0));
}

#[tokio::test]
async fn on_demand_images_follow_latest_frame() {
    let grabber = mock_grabber();
    grabber.open().await.unwrap();
    grabber.cycle().await.unwrap();
    grabber.cycle().await.unwrap();

    let mut rect = RgbFrame::default();
    grabber.get_image(&mut rect).await.unwrap();
    assert_eq!(rect.size(), SOURCE);
    assert_eq!(rect.pixel(10, 10), MockSource::color(1));

    let mut lp = RgbFrame::default();
    grabber.get_logpolar_image(&mut lp).await.unwrap();
    assert_eq!(lp.size(), Size::new(32, 12));
    assert!(lp.as_bytes().chunks(3).all(|px| px == MockSource::color(1)));

    let mut again = RgbFrame::default();
    grabber.get_logpolar_image(&mut again).await.unwrap();
    assert_eq!(lp, again);

    let mut fovea = RgbFrame::default();
    grabber.get_foveal_image(&mut fovea).await.unwrap();
    assert_eq!(fovea.size(), Size::new(16, 16));
}

#[tokio::test]
async fn run_writes_png_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config();
    config.out_width = Some(32);
    config.out_height = Some(24);
    let grabber = Grabber::new(config, PatternSource::new(SOURCE)).unwrap();
    for kind in OutputKind::ALL {
        let sink = PngSequenceSink::new(dir.path().join(kind.to_string()), kind.to_string()).unwrap();
        grabber.add_sink(kind, Box::new(sink)).await;
    }

    grabber.open().await.unwrap();
    let stats = grabber.run(Some(3)).await.unwrap();
    grabber.close().await.unwrap();
    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.retries, 0);

    for (kind, dims) in [
        (OutputKind::Rect, (32, 24)),
        (OutputKind::Logpolar, (32, 12)),
        (OutputKind::Fovea, (16, 16)),
    ] {
        let out = dir.path().join(kind.to_string());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 3, "{}", kind);
        let last = out.join(format!("{}_000002.png", kind));
        assert_eq!(image::image_dimensions(&last).unwrap(), dims);
    }
}

#[tokio::test]
async fn paced_run_respects_frame_limit() {
    let mut config = small_config();
    config.framerate = 200.0;
    let grabber = Grabber::new(config, MockSource::new(SOURCE)).unwrap();
    grabber.open().await.unwrap();
    let stats = grabber.run(Some(4)).await.unwrap();
    assert_eq!(stats.cycles, 4);
}

#[tokio::test]
async fn run_retries_transient_capture_failures() {
    let grabber = Grabber::new(small_config(), MockSource::failing(SOURCE, 2)).unwrap();
    grabber.open().await.unwrap();
    let stats = grabber.run(Some(3)).await.unwrap();
    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.retries, 2);
}

#[tokio::test]
async fn run_gives_up_after_retry_limit() {
    let grabber = Grabber::new(small_config(), MockSource::failing(SOURCE, 50)).unwrap();
    grabber.open().await.unwrap();
    let err = grabber.run(Some(3)).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.category(), "frame_capture");
}

#[tokio::test]
async fn sinks_survive_reopen() {
    let grabber = mock_grabber();
    let (sink, mut rx) = ChannelSink::new("rect", 4);
    grabber.add_sink(OutputKind::Rect, Box::new(sink)).await;

    grabber.open().await.unwrap();
    grabber.cycle().await.unwrap();
    grabber.close().await.unwrap();
    grabber.open().await.unwrap();
    grabber.cycle().await.unwrap();

    assert_eq!(grabber.sink_count(OutputKind::Rect).await, 1);
    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_some());
}

#[tokio::test]
async fn failing_sink_does_not_stop_other_outputs() {
    let grabber = mock_grabber();
    let (dead, rx) = ChannelSink::new("dead", 1);
    drop(rx);
    let (live, mut live_rx) = ChannelSink::new("live", 1);
    grabber.add_sink(OutputKind::Rect, Box::new(dead)).await;
    grabber.add_sink(OutputKind::Fovea, Box::new(live)).await;
    grabber.open().await.unwrap();

    let report = grabber.cycle().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, OutputKind::Rect);
    assert!(report.ran(OutputKind::Fovea));
    assert!(live_rx.recv().await.is_some());

    let stats = grabber.run(Some(2)).await.unwrap();
    assert_eq!(stats.output_failures, 2);
}

#[tokio::test]
async fn controls_go_through_the_source() {
    let grabber = Grabber::new(small_config(), PatternSource::new(SOURCE)).unwrap();
    assert_eq!(grabber.set_control(Control::Gain, 0.7).await.unwrap_err().category(), "state");

    grabber.open().await.unwrap();
    grabber.set_control(Control::Gain, 0.7).await.unwrap();
    assert_eq!(grabber.get_control(Control::Gain).await.unwrap(), 0.7);
    assert_eq!(grabber.get_control(Control::Iris).await.unwrap_err().category(), "unsupported");
    grabber.set_white_balance(0.4, 0.6).await.unwrap();
    assert_eq!(grabber.white_balance().await.unwrap(), (0.4, 0.6));

    let bytes = grabber
        .with_extended(|ext| {
            ext.set_bytes_per_packet(2048)?;
            ext.bytes_per_packet()
        })
        .await
        .unwrap();
    assert_eq!(bytes, 2048);
    let err = grabber
        .with_extended(|ext| ext.set_operation_mode(OperationMode::B1394b))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "unsupported");
}

#[tokio::test]
async fn sources_without_controls_report_unsupported() {
    let grabber = mock_grabber();
    grabber.open().await.unwrap();
    let err = grabber.get_control(Control::Brightness).await.unwrap_err();
    assert_eq!(err.category(), "unsupported");
    assert!(grabber.with_extended(|ext| ext.reset()).await.is_err());
}

#[tokio::test]
async fn reconstruction_sink_receives_cartesian_frames() {
    let mut config = small_config();
    config.inverse = true;
    let still = StillSource::from_frame(noise(SOURCE, 7), SOURCE).unwrap();
    let grabber = Grabber::new(config, still).unwrap();
    grabber.open().await.unwrap();

    let transform = grabber.transform().await.unwrap();
    assert!(transform.has_inverse());
    let (inner, mut rx) = ChannelSink::new("recon", 2);
    let sink = InverseSink::new(transform, Box::new(inner)).unwrap();
    grabber.add_sink(OutputKind::Logpolar, Box::new(sink)).await;

    let report = grabber.cycle().await.unwrap();
    assert!(report.ran(OutputKind::Logpolar));
    let recon = rx.recv().await.unwrap();
    assert_eq!(recon.size(), SOURCE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_ends_unbounded_run() {
    let grabber = Arc::new(mock_grabber());
    let (sink, mut rx) = ChannelSink::new("rect", 1);
    grabber.add_sink(OutputKind::Rect, Box::new(sink)).await;
    grabber.open().await.unwrap();

    let runner = {
        let grabber = grabber.clone();
        tokio::spawn(async move { grabber.run(None).await })
    };
    for _ in 0..3 {
        assert!(rx.recv().await.is_some());
    }
    grabber.stop();
    let stats = runner.await.unwrap().unwrap();
    assert!(stats.cycles >= 3);
    grabber.close().await.unwrap();
}

#[tokio::test]
async fn run_after_stop_starts_fresh() {
    let grabber = mock_grabber();
    grabber.open().await.unwrap();
    grabber.stop();
    assert_eq!(grabber.run(Some(2)).await.unwrap().cycles, 2);
    assert_eq!(grabber.run(Some(3)).await.unwrap().cycles, 3);
}
