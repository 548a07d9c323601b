use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

/// Timing knobs for a coaching session. Passed explicitly to whoever needs
/// them; there is no global copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachSettings {
    /// Minimum spacing between processed frames; faster frames are dropped.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Minimum spacing between two spoken cues.
    #[serde(default = "default_cue_cooldown_secs")]
    pub cue_cooldown_secs: u64,
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
    /// Sessions running longer than this move to cool-down.
    #[serde(default = "default_cooldown_after_secs")]
    pub cooldown_after_secs: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Upper bound on a single detector call.
    #[serde(default = "default_detect_timeout_ms")]
    pub detect_timeout_ms: u64,
}

fn default_frame_interval_ms() -> u64 {
    1_000
}

fn default_cue_cooldown_secs() -> u64 {
    20
}

fn default_warmup_secs() -> u64 {
    60
}

fn default_cooldown_after_secs() -> u64 {
    1_800
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_detect_timeout_ms() -> u64 {
    5_000
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            cue_cooldown_secs: default_cue_cooldown_secs(),
            warmup_secs: default_warmup_secs(),
            cooldown_after_secs: default_cooldown_after_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            detect_timeout_ms: default_detect_timeout_ms(),
        }
    }
}

/// Upper bound for every millisecond period.
const MAX_PERIOD_MS: u64 = 60_000;

impl CoachSettings {
    /// Rejects values that would disable a gate or stall the ticker.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("frameIntervalMs", self.frame_interval_ms),
            ("tickIntervalMs", self.tick_interval_ms),
            ("detectTimeoutMs", self.detect_timeout_ms),
        ] {
            if value == 0 || value > MAX_PERIOD_MS {
                bail!("{name} must be between 1 and {MAX_PERIOD_MS}, got {value}");
            }
        }
        if self.cue_cooldown_secs == 0 {
            bail!("cueCooldownSecs must be greater than zero");
        }
        if self.warmup_secs >= self.cooldown_after_secs {
            bail!(
                "warmupSecs ({}) must be less than cooldownAfterSecs ({})",
                self.warmup_secs,
                self.cooldown_after_secs
            );
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn cue_cooldown(&self) -> Duration {
        Duration::from_secs(self.cue_cooldown_secs)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn cooldown_after(&self) -> Duration {
        Duration::from_secs(self.cooldown_after_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }
}

/// Settings backed by an optional JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CoachSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str::<CoachSettings>(&contents)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        } else {
            CoachSettings::default()
        };
        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> CoachSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update(&self, settings: CoachSettings) -> Result<()> {
        settings.validate().context("Rejected settings update")?;
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &CoachSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
