use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use log::{error, info};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};

use crate::coaching::{Cue, SessionReview};
use crate::pose::PoseDetector;
use crate::sensing::{Frame, SensingController};
use crate::settings::CoachSettings;

use super::{CoachEngine, CoachEvent, CoachSnapshot, Focus, VoiceCommand};

const EVENT_CAPACITY: usize = 32;

/// Async front door to a coaching session. Owns the engine behind a mutex,
/// the sensing loop, and the phase ticker; pushes changes as `CoachEvent`s.
#[derive(Clone)]
pub struct CoachController {
    engine: Arc<Mutex<CoachEngine>>,
    settings: CoachSettings,
    events: broadcast::Sender<CoachEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    sensing: Arc<Mutex<SensingController>>,
    detector: Arc<dyn PoseDetector>,
}

impl CoachController {
    pub fn new(settings: CoachSettings, detector: Arc<dyn PoseDetector>) -> Result<Self> {
        settings.validate().context("Invalid coach settings")?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            engine: Arc::new(Mutex::new(CoachEngine::new(&settings))),
            settings,
            events,
            ticker: Arc::new(Mutex::new(None)),
            sensing: Arc::new(Mutex::new(SensingController::new())),
            detector,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoachEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> CoachSnapshot {
        self.engine.lock().await.snapshot(Instant::now())
    }

    /// Returns false if a session was already running. If sensing cannot
    /// start, the session is cancelled and the error returned.
    pub async fn start_session(&self) -> Result<bool> {
        // held across both steps so a concurrent end cannot slip between them
        let mut sensing = self.sensing.lock().await;
        if !self.engine.lock().await.start(Instant::now()) {
            return Ok(false);
        }

        if let Err(err) = sensing.start_sensing(
            self.engine.clone(),
            self.detector.clone(),
            self.events.clone(),
            &self.settings,
        ) {
            self.engine.lock().await.cancel();
            return Err(err.context("Failed to start coaching session"));
        }
        drop(sensing);

        self.spawn_ticker().await;
        self.emit_state_changed().await;
        Ok(true)
    }

    pub async fn end_session(&self) -> Result<Option<SessionReview>> {
        let review = self.engine.lock().await.end(Instant::now());
        let Some(review) = review else {
            return Ok(None);
        };

        self.sensing.lock().await.stop_sensing().await?;
        self.cancel_ticker().await;

        self.emit_state_changed().await;
        let _ = self.events.send(CoachEvent::SessionCompleted(review.clone()));
        Ok(Some(review))
    }

    /// Queues a camera frame for the sensing loop. Returns false if it was
    /// dropped.
    pub async fn submit_frame(&self, frame: Frame) -> bool {
        self.sensing.lock().await.submit(frame)
    }

    /// Parses and applies a spoken command. Unrecognized text is ignored.
    pub async fn handle_command(&self, utterance: &str) -> Result<Option<VoiceCommand>> {
        let Some(command) = VoiceCommand::parse(utterance) else {
            return Ok(None);
        };
        info!("voice command: {command:?}");

        match command {
            VoiceCommand::StartSession => {
                self.start_session().await?;
            }
            VoiceCommand::EndSession => {
                self.end_session().await?;
            }
            VoiceCommand::Mute => self.set_muted(true).await,
            VoiceCommand::Unmute => self.set_muted(false).await,
            VoiceCommand::WhatToFix => {
                self.request_cue().await;
            }
            VoiceCommand::SetFocus(focus) => self.set_focus(focus).await,
        }
        Ok(Some(command))
    }

    pub async fn set_focus(&self, focus: Focus) {
        self.engine.lock().await.set_focus(focus, Instant::now());
        self.emit_state_changed().await;
    }

    pub async fn set_muted(&self, muted: bool) {
        self.engine.lock().await.set_muted(muted);
        self.emit_state_changed().await;
    }

    pub async fn request_cue(&self) -> Option<Cue> {
        let cue = self.engine.lock().await.request_cue(Instant::now());
        if let Some(cue) = &cue {
            let _ = self.events.send(CoachEvent::CueReady(cue.clone()));
        }
        cue
    }

    pub async fn take_pending_cue(&self) -> Option<String> {
        self.engine.lock().await.take_pending_cue()
    }

    pub async fn tactical_cue(&self) -> Option<Cue> {
        self.engine.lock().await.tactical_cue()
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let engine = self.engine.clone();
        let events = self.events.clone();
        let tick_interval = self.settings.tick_interval();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                interval.tick().await;

                let snapshot = {
                    let mut guard = engine.lock().await;
                    if !guard.is_active() {
                        break;
                    }
                    let now = Instant::now();
                    guard.tick(now).then(|| guard.snapshot(now))
                };

                if let Some(snapshot) = snapshot {
                    let _ = events.send(CoachEvent::StateChanged(snapshot));
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!("phase ticker failed: {err}");
                }
            }
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(CoachEvent::StateChanged(snapshot));
    }
}
