use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::pose::{FrameAnalysis, MetricsEngine, PoseDetector, Skeleton};
use crate::session::{CoachEngine, CoachEvent};

use super::gate::FrameGate;

/// One captured camera frame.
pub struct Frame {
    pub image: DynamicImage,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            captured_at: Instant::now(),
        }
    }
}

pub struct LoopConfig {
    pub frame_interval: Duration,
    pub detect_timeout: Duration,
}

pub async fn sensing_loop(
    engine: Arc<Mutex<CoachEngine>>,
    detector: Arc<dyn PoseDetector>,
    mut frames: mpsc::Receiver<Frame>,
    events: broadcast::Sender<CoachEvent>,
    config: LoopConfig,
    cancel_token: CancellationToken,
) {
    let mut gate = FrameGate::new(config.frame_interval);
    let mut metrics = MetricsEngine::new();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    info!("frame source closed, sensing loop exiting");
                    break;
                };
                if !gate.admit(frame.captured_at) {
                    continue;
                }

                let captured_at = frame.captured_at;
                let analysis = match detect(&detector, frame, config.detect_timeout).await {
                    Ok(skeletons) => metrics.analyze(skeletons, captured_at),
                    Err(err) => {
                        warn!("pose detection failed: {err:#}");
                        FrameAnalysis::failed(captured_at)
                    }
                };

                let cue = {
                    let mut guard = engine.lock().await;
                    guard.apply_frame(analysis, Instant::now())
                };
                if let Some(cue) = cue {
                    let _ = events.send(CoachEvent::CueReady(cue));
                }
            }
            _ = cancel_token.cancelled() => {
                info!("sensing loop shutting down");
                break;
            }
        }
    }
}

/// Runs the detector on a blocking worker, bounded by `timeout`.
async fn detect(
    detector: &Arc<dyn PoseDetector>,
    frame: Frame,
    timeout: Duration,
) -> Result<Vec<Skeleton>> {
    let started = Instant::now();
    let detector = Arc::clone(detector);
    let task = tokio::task::spawn_blocking(move || detector.detect(&frame.image));

    let skeletons = tokio::time::timeout(timeout, task)
        .await
        .map_err(|_| anyhow!("detector timed out after {}ms", timeout.as_millis()))?
        .context("detector worker join failed")??;

    debug!(
        "detected {} skeletons in {}ms",
        skeletons.len(),
        started.elapsed().as_millis()
    );
    Ok(skeletons)
}
