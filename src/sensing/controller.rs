use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pose::PoseDetector;
use crate::session::{CoachEngine, CoachEvent};
use crate::settings::CoachSettings;

use super::loop_worker::{sensing_loop, Frame, LoopConfig};

/// At most one frame waits for the detector; the rest are dropped at
/// submission.
const FRAME_QUEUE_DEPTH: usize = 1;

pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    frame_tx: Option<mpsc::Sender<Frame>>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            frame_tx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start_sensing(
        &mut self,
        engine: Arc<Mutex<CoachEngine>>,
        detector: Arc<dyn PoseDetector>,
        events: broadcast::Sender<CoachEvent>,
        settings: &CoachSettings,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sensing already active");
        }

        let cancel_token = CancellationToken::new();
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let config = LoopConfig {
            frame_interval: settings.frame_interval(),
            detect_timeout: settings.detect_timeout(),
        };

        let handle = tokio::spawn(sensing_loop(
            engine,
            detector,
            frame_rx,
            events,
            config,
            cancel_token.clone(),
        ));

        info!("sensing started");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.frame_tx = Some(frame_tx);
        Ok(())
    }

    /// Hands a frame to the loop without waiting. Returns false if sensing
    /// is stopped or the loop is still busy with an earlier frame.
    pub fn submit(&self, frame: Frame) -> bool {
        let Some(tx) = &self.frame_tx else {
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("sensing loop busy, frame dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub async fn stop_sensing(&mut self) -> Result<()> {
        self.frame_tx = None;
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sensing loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}
