//! Emergence detection over entropy trajectories.
//!
//! The detector watches the rule-usage entropy of a series of grammars
//! (an induction trace or a sliding-window series) and flags indices
//! where the discrete second derivative of the entropy bends sharply.
//! Curvature is normalized by the peak entropy, compared against a
//! static or adaptive (`median + k * MAD`) threshold, and gated by
//! persistence, hysteresis and a minimum inter-event gap so that noisy
//! trajectories do not chatter.
//!
//! Concave-down curvature (entropy collapsing) is classified as
//! `emergence` — structure crystallizing into few heavily-used rules —
//! and concave-up as `dissolution`.

use crate::entropy::compute_entropy;
use crate::error::ConfigError;
use crate::grammar::Grammar;
use crate::symbol::RuleId;
use log::debug;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Named sensitivity preset; overrides the static threshold when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum Preset {
    Sensitive,
    Balanced,
    Strict,
}

impl Preset {
    /// The normalized curvature threshold this preset stands for.
    pub fn threshold(self) -> f64 {
        match self {
            Preset::Sensitive => 0.15,
            Preset::Balanced => 0.25,
            Preset::Strict => 0.40,
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sensitive" => Ok(Preset::Sensitive),
            "balanced" => Ok(Preset::Balanced),
            "strict" => Ok(Preset::Strict),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

/// Where the curvature threshold comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum ThresholdMode {
    /// Use the configured (or preset) threshold as-is.
    #[default]
    Static,
    /// Derive the threshold from the data: `median + k * MAD` over the
    /// normalized curvatures, falling back to the static threshold when
    /// there are not enough points.
    Adaptive,
}

impl FromStr for ThresholdMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(ThresholdMode::Static),
            "adaptive" => Ok(ThresholdMode::Adaptive),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Detector configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// Static normalized curvature threshold.
    pub threshold: f64,
    /// Overrides `threshold` when set.
    pub preset: Option<Preset>,
    pub mode: ThresholdMode,
    /// MAD multiplier for adaptive mode.
    pub k: f64,
    /// Consecutive above-threshold steps required to emit an event.
    pub min_persistence: usize,
    /// Margin below the threshold at which an active event ends.
    pub hysteresis: f64,
    /// Minimum index distance between events.
    pub min_gap: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            preset: None,
            mode: ThresholdMode::Static,
            k: 3.0,
            min_persistence: 2,
            hysteresis: 0.1,
            min_gap: 2,
        }
    }
}

/// Direction of an entropy bend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum EventKind {
    /// Concave-down curvature: rule usage consolidating.
    Emergence,
    /// Concave-up curvature: structure dispersing.
    Dissolution,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Emergence => f.write_str("emergence"),
            EventKind::Dissolution => f.write_str("dissolution"),
        }
    }
}

/// A detected structural change at one index of the trajectory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EmergenceEvent {
    pub index: usize,
    /// Raw (signed) second difference of the entropy at `index`.
    pub magnitude: f64,
    pub kind: EventKind,
    pub entropy_before: f64,
    pub entropy_after: f64,
    /// Rules present at `index + 1` but not at `index - 1`, ascending.
    /// Filled in by the engine; empty as emitted by the detector.
    pub rules_added: Vec<RuleId>,
}

/// Entropy trajectory plus the events found on it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Detection {
    pub entropies: Vec<f64>,
    pub events: Vec<EmergenceEvent>,
}

/// Second-derivative entropy analyzer with adaptive thresholding and
/// persistence/hysteresis gating.
#[derive(Debug, Clone)]
pub struct EmergenceDetector {
    threshold: f64,
    mode: ThresholdMode,
    k: f64,
    min_persistence: usize,
    hysteresis: f64,
    min_gap: usize,
}

impl EmergenceDetector {
    /// Builds a detector, validating the configuration.
    ///
    /// A preset, when present, overrides the static threshold. A zero
    /// `min_persistence` is clamped to 1.
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        if config.k < 0.0 || config.k.is_nan() {
            return Err(ConfigError::AdaptiveK(config.k));
        }
        if config.threshold < 0.0 || config.threshold.is_nan() {
            return Err(ConfigError::Threshold(config.threshold));
        }
        let threshold = config
            .preset
            .map(Preset::threshold)
            .unwrap_or(config.threshold);
        Ok(Self {
            threshold,
            mode: config.mode,
            k: config.k,
            min_persistence: config.min_persistence.max(1),
            hysteresis: config.hysteresis.max(0.0),
            min_gap: config.min_gap,
        })
    }

    /// Computes the entropy of each grammar and runs event detection
    /// over the resulting trajectory.
    pub fn detect<'a, T, I>(&self, grammars: I) -> Detection
    where
        T: Hash + Eq + Clone + 'a,
        I: IntoIterator<Item = &'a Grammar<T>>,
    {
        let entropies: Vec<f64> = grammars.into_iter().map(compute_entropy).collect();
        let events = self.events_from_entropies(&entropies);
        Detection { entropies, events }
    }

    /// Runs detection over a precomputed entropy series.
    ///
    /// Fewer than three points cannot carry a second derivative and
    /// yield no events.
    pub fn events_from_entropies(&self, entropies: &[f64]) -> Vec<EmergenceEvent> {
        if entropies.len() < 3 {
            return Vec::new();
        }

        let threshold = match self.mode {
            ThresholdMode::Static => self.threshold,
            ThresholdMode::Adaptive => self.adaptive_threshold(entropies),
        };
        let max_entropy = max_or_one(entropies);
        debug!(
            "emergence: threshold {:.4}, peak entropy {:.4}, {} points",
            threshold,
            max_entropy,
            entropies.len()
        );

        let mut events = Vec::new();
        let mut run = 0usize;
        let mut active = false;
        let mut last_event: Option<usize> = None;

        for i in 1..entropies.len() - 1 {
            let d2 = entropies[i + 1] - 2.0 * entropies[i] + entropies[i - 1];
            let norm = d2.abs() / max_entropy;

            if norm >= threshold {
                run += 1;
            } else {
                run = 0;
            }

            let gap_ok = last_event.map_or(true, |last| i - last >= self.min_gap);
            if !active && run >= self.min_persistence && gap_ok {
                let kind = if d2 < 0.0 {
                    EventKind::Emergence
                } else {
                    EventKind::Dissolution
                };
                events.push(EmergenceEvent {
                    index: i,
                    magnitude: d2,
                    kind,
                    entropy_before: entropies[i - 1],
                    entropy_after: entropies[i + 1],
                    rules_added: Vec::new(),
                });
                active = true;
                last_event = Some(i);
            }

            if active && norm <= (threshold - self.hysteresis).max(0.0) {
                active = false;
            }
        }

        events
    }

    /// Robust data-derived threshold: `median + k * MAD` over the
    /// normalized curvature magnitudes. Falls back to the static
    /// threshold when the series is too short to carry curvature.
    fn adaptive_threshold(&self, entropies: &[f64]) -> f64 {
        let curvatures = curvatures(entropies);
        if curvatures.is_empty() {
            return self.threshold;
        }
        let max_entropy = max_or_one(entropies);
        let values: Vec<f64> = curvatures.iter().map(|c| c.abs() / max_entropy).collect();
        let center = median(&values);
        let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
        center + self.k * median(&deviations)
    }
}

fn curvatures(entropies: &[f64]) -> Vec<f64> {
    if entropies.len() < 3 {
        return Vec::new();
    }
    (1..entropies.len() - 1)
        .map(|i| entropies[i + 1] - 2.0 * entropies[i] + entropies[i - 1])
        .collect()
}

fn max_or_one(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(0.0f64, f64::max);
    if max == 0.0 {
        1.0
    } else {
        max
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("entropy values are finite"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        0.5 * (sorted[mid - 1] + sorted[mid])
    }
}
