use anyhow::{Result, anyhow};
use directories::BaseDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::regs::FIFO_CAPACITY;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// Classifier tuning. Defaults are the values the gesture engine was
/// characterised with; change them only against recorded traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    /// Every channel must exceed this for a sample to count as signal.
    pub threshold_out: u8,
    /// Accumulated ratio delta that marks a swipe on one axis.
    pub sensitivity_1: i32,
    /// Per-batch delta below which the hand is considered still.
    pub sensitivity_2: i32,
    pub near_count: u32,
    pub far_count: u32,
    /// Batches with this many samples or fewer are skipped.
    pub min_batch: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            threshold_out: 10,
            sensitivity_1: 50,
            sensitivity_2: 20,
            near_count: 10,
            far_count: 2,
            min_batch: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30,
            timeout_ms: 10_000,
        }
    }
}

impl SessionSettings {
    /// Polls a session may run before it is declared timed out. Counted in
    /// pauses so the bound holds whatever the delay source is.
    pub fn max_polls(&self) -> u64 {
        self.timeout_ms.div_ceil(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub session: SessionSettings,
}

fn config_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|b| b.config_dir().join("gesturectl"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl Profile {
    pub fn from_toml_str(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt).map_err(|e| anyhow!("invalid profile: {e}"))?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        Self::from_toml_str(&txt).map_err(|e| anyhow!("{}: {e}", path.display()))
    }

    /// Load `path` if given, otherwise the user profile, installing the
    /// bundled default the first time.
    pub fn load_or_install_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load_file(p);
        }

        let Some(dir) = config_dir() else {
            warn!("no config directory available; using built-in profile");
            return Self::from_toml_str(default_profile_text());
        };

        let def_path = dir.join("profile.toml");
        if !def_path.exists() {
            fs::create_dir_all(&dir)?;
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }
        Self::load_file(&def_path)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn validate_profile(p: &Profile) -> Result<()> {
    let th = &p.thresholds;
    if th.sensitivity_1 <= 0 || th.sensitivity_2 <= 0 {
        return Err(anyhow!("thresholds.sensitivity_1/2 must be positive"));
    }
    if th.sensitivity_2 >= th.sensitivity_1 {
        return Err(anyhow!(
            "thresholds.sensitivity_2 ({}) must be below sensitivity_1 ({})",
            th.sensitivity_2,
            th.sensitivity_1
        ));
    }
    if th.min_batch >= FIFO_CAPACITY {
        return Err(anyhow!(
            "thresholds.min_batch must be below the FIFO capacity ({FIFO_CAPACITY})"
        ));
    }
    if p.session.poll_interval_ms == 0 || p.session.timeout_ms == 0 {
        return Err(anyhow!("session intervals must be positive durations"));
    }
    Ok(())
}
