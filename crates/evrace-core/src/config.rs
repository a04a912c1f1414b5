//! Analysis options.
//!
//! Precedence, lowest first: [`Default`], a TOML file, environment overrides
//! ([`AnalysisOptions::with_env`]), then whatever the caller sets explicitly.
//!
//! Recognized environment variables (values `on|off|true|false|1|0`):
//! - `EVRACE_EXPLORATION`: independent-exploration ordering pass
//! - `EVRACE_TIMERS`: timer augmentation
//! - `EVRACE_PARALLEL`: per-variable parallel race detection
//! - `EVRACE_ONE_PER_PAIR`: keep one race per `(variable, event pair)`

use crate::types::EventType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for the graph normalizer passes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Chain independently explored root events in arrival order.
    ///
    /// This can hide races the runtime does not actually serialize.
    pub independent_exploration: bool,
    /// Root event types the exploration order applies to.
    pub exploration_types: Vec<EventType>,
    /// Scope-name prefixes marking script execution.
    pub script_scope_prefixes: Vec<String>,
    /// Scope-name prefixes marking resource loading.
    pub resource_scope_prefixes: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            independent_exploration: true,
            exploration_types: vec![EventType::UserInterface],
            script_scope_prefixes: vec!["script".to_owned()],
            resource_scope_prefixes: vec!["load".to_owned(), "resource".to_owned()],
        }
    }
}

/// Options for the timer augmentation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimerOptions {
    /// Whether to add delay-derived edges at all.
    pub enabled: bool,
    /// Head event types whose arc duration is a timer delay.
    pub timer_types: Vec<EventType>,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            timer_types: vec![EventType::Timer],
        }
    }
}

/// Options for race detection.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RaceOptions {
    /// Detect variables in parallel on the rayon pool.
    pub parallel: bool,
    /// Report only the first racing access pair per `(variable, event pair)`.
    pub one_per_event_pair: bool,
}

/// All pipeline options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Normalizer passes.
    pub normalize: NormalizeOptions,
    /// Timer augmentation.
    pub timers: TimerOptions,
    /// Race detection.
    pub race: RaceOptions,
}

impl AnalysisOptions {
    /// Parse options from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).context("parse analysis options toml")
    }

    /// Read options from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("read options {}", path.display()))?;
        Self::from_toml_str(&src).with_context(|| format!("in {}", path.display()))
    }

    /// Merge environment overrides; unparseable values are ignored.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|k| std::env::var(k).ok())
    }

    /// Merge overrides from an arbitrary key lookup (testable form of [`Self::with_env`]).
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |k: &str| lookup(k).as_deref().and_then(parse_switch);
        if let Some(v) = flag("EVRACE_EXPLORATION") {
            self.normalize.independent_exploration = v;
        }
        if let Some(v) = flag("EVRACE_TIMERS") {
            self.timers.enabled = v;
        }
        if let Some(v) = flag("EVRACE_PARALLEL") {
            self.race.parallel = v;
        }
        if let Some(v) = flag("EVRACE_ONE_PER_PAIR") {
            self.race.one_per_event_pair = v;
        }
        self
    }
}

fn parse_switch(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
