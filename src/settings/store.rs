use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;
use crate::media::{
    DEFAULT_FADE_OUT_EPSILON_SECS, DEFAULT_FADE_WINDOW_SECS, FadeConfig, FadeTuning,
};

/// Controller-wide settings, persisted as `settings.json` in the data dir.
///
/// Missing fields take their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    // tracker
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    // fades
    #[serde(default = "default_fade_window_secs")]
    pub fade_window_secs: f64,
    #[serde(default = "default_fade_out_epsilon_secs")]
    pub fade_out_epsilon_secs: f64,
    /// Forced fade-outs also latch and report `FadingOut`
    #[serde(default)]
    pub latch_forced_fade_out: bool,

    // engine capabilities
    #[serde(default)]
    pub supports_rate: bool,

    // simulated engine
    #[serde(default = "default_sim_duration_secs")]
    pub sim_duration_secs: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            fade_window_secs: default_fade_window_secs(),
            fade_out_epsilon_secs: default_fade_out_epsilon_secs(),
            latch_forced_fade_out: false,
            supports_rate: false,
            sim_duration_secs: default_sim_duration_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 { 150 }
fn default_fade_window_secs() -> f64 { DEFAULT_FADE_WINDOW_SECS }
fn default_fade_out_epsilon_secs() -> f64 { DEFAULT_FADE_OUT_EPSILON_SECS }
fn default_sim_duration_secs() -> f64 { 30.0 }

impl ControllerSettings {
    /// Tracker poll period, at least one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Fade configuration new sessions start with.
    pub fn fade_config(&self) -> FadeConfig {
        FadeConfig::with_window(self.fade_window_secs)
    }

    /// Fade knobs shared by every session.
    pub fn fade_tuning(&self) -> FadeTuning {
        FadeTuning {
            epsilon_secs: self.fade_out_epsilon_secs,
            latch_forced: self.latch_forced_fade_out,
        }
    }
}

/// Loads settings, falling back to defaults when the file is missing or
/// unreadable.
pub fn load_settings(data_dir: &Path) -> ControllerSettings {
    let p = settings_path(data_dir);
    let Ok(bytes) = fs::read(&p) else {
        return ControllerSettings::default();
    };
    match serde_json::from_slice(&bytes) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %p.display(), err = %e, "settings file is corrupt, using defaults");
            ControllerSettings::default()
        }
    }
}

/// Writes the settings atomically through a temp file and a rename.
pub fn save_settings(data_dir: &Path, s: &ControllerSettings) -> Result<(), SettingsError> {
    fs::create_dir_all(data_dir)?;
    let p = settings_path(data_dir);
    let tmp = p.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, &p) {
        let _ = fs::remove_file(&p);
        fs::rename(&tmp, &p).map_err(|_| e)?;
    }
    Ok(())
}

/// `{data_dir}/settings.json`
pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}
