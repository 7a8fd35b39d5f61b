//! Pipeline orchestration: induction, scoring, validation and emergence
//! detection over whole sequences or sliding windows.

use crate::emergence::{Detection, DetectorConfig, EmergenceDetector, EmergenceEvent};
use crate::error::ConfigError;
use crate::grammar::Grammar;
use crate::mdl::{self, MdlComponents};
use crate::repair;
use crate::symbol::{RuleId, Symbol};
use ahash::AHashSet;
use log::debug;
use std::collections::BTreeMap;
use std::hash::Hash;

/// Options for a single [`Engine::process`] invocation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineOptions {
    /// Run trace induction and the emergence detector.
    pub emergence: bool,
    pub detector: DetectorConfig,
    /// When set, analyze overlapping windows of this many tokens instead
    /// of the whole sequence. Must be at least 1.
    pub sliding_window: Option<usize>,
    /// Stride between windows; 0 means `window / 2` (at least 1).
    pub sliding_step: usize,
}

/// Structured outcome of one engine run.
///
/// The optional sections are filled depending on the pipeline: the
/// emergence fields for trace runs, the window fields for sliding runs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineResult<T> {
    pub compressed: Vec<Symbol<T>>,
    /// Final grammar as an `lhs → rhs` view.
    pub rules: BTreeMap<RuleId, Vec<Symbol<T>>>,
    pub mdl_total: f64,
    pub mdl_grammar_cost: f64,
    pub mdl_data_cost: f64,
    pub naive_mdl: f64,
    pub compression_ratio: f64,
    pub coverage: f64,
    /// Whether expanding the grammar reproduced the input exactly.
    /// False indicates an internal invariant violation, never a data
    /// error; callers should treat it as fatal.
    pub valid_lossless: bool,
    pub entropies: Option<Vec<f64>>,
    pub events: Option<Vec<EmergenceEvent>>,
    pub mdl_trajectory: Option<Vec<MdlComponents>>,
    pub windows_entropies: Option<Vec<f64>>,
    pub windows_mdl: Option<Vec<f64>>,
    pub window_events: Option<Vec<EmergenceEvent>>,
}

/// Engine tying together the inducer, the MDL scorer and the emergence
/// detector.
///
/// Every invocation allocates its own working state; nothing persists
/// across calls and results are bit-identical for identical inputs.
///
/// # Example
///
/// ```
/// use emergence_rs::{Engine, EngineOptions};
///
/// let tokens: Vec<char> = "abcabcabc".chars().collect();
/// let result = Engine::new()
///     .process(&tokens, &EngineOptions::default())
///     .unwrap();
///
/// assert!(result.valid_lossless);
/// assert_eq!(result.rules.len(), 1);
/// assert_eq!(result.compressed.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Runs the pipeline over `tokens`.
    ///
    /// Dispatches to [`Engine::process_sliding`] when
    /// `options.sliding_window` is set. Empty input yields a well-formed
    /// empty result with `valid_lossless = true`.
    pub fn process<T: Hash + Eq + Clone>(
        &self,
        tokens: &[T],
        options: &EngineOptions,
    ) -> Result<EngineResult<T>, ConfigError> {
        if let Some(window_size) = options.sliding_window {
            return self.process_sliding(tokens, window_size, options.sliding_step, options);
        }

        // Validate before doing any induction work.
        let detector = if options.emergence {
            Some(EmergenceDetector::new(options.detector.clone())?)
        } else {
            None
        };

        let (snapshots, compressed, grammar) = if options.emergence {
            let snapshots = repair::compress_trace(tokens);
            let last = snapshots.last().expect("trace always ends with a final snapshot");
            let (compressed, grammar) = (last.compressed.clone(), last.grammar.clone());
            (Some(snapshots), compressed, grammar)
        } else {
            let (compressed, grammar) = repair::compress(tokens);
            (None, compressed, grammar)
        };

        let sigma = distinct_count(tokens);
        let components = mdl::score_components(&grammar, &compressed, sigma);
        let ratio = mdl::compression_ratio(tokens, &compressed, &grammar);

        let reconstructed = repair::reconstruct(&compressed, &grammar);
        let valid_lossless = reconstructed.as_slice() == tokens;
        let coverage = repair::coverage(&compressed, &grammar);
        let naive = mdl::naive_baseline(tokens);

        let mut result = EngineResult {
            compressed,
            rules: grammar.as_tuples(),
            mdl_total: components.total,
            mdl_grammar_cost: components.grammar_cost,
            mdl_data_cost: components.data_cost,
            naive_mdl: naive,
            compression_ratio: ratio,
            coverage,
            valid_lossless,
            entropies: None,
            events: None,
            mdl_trajectory: None,
            windows_entropies: None,
            windows_mdl: None,
            window_events: None,
        };

        if let (Some(detector), Some(snapshots)) = (detector, snapshots) {
            let Detection {
                entropies,
                mut events,
            } = detector.detect(snapshots.iter().map(|s| &s.grammar));

            for event in &mut events {
                let i = event.index;
                if i >= 1 && i + 1 < snapshots.len() {
                    event.rules_added =
                        rules_added(&snapshots[i - 1].grammar, &snapshots[i + 1].grammar);
                }
            }

            let trajectory: Vec<MdlComponents> = snapshots
                .iter()
                .map(|s| mdl::score_components(&s.grammar, &s.compressed, sigma))
                .collect();

            debug!(
                "engine: {} snapshots, {} events",
                snapshots.len(),
                events.len()
            );
            result.entropies = Some(entropies);
            result.events = Some(events);
            result.mdl_trajectory = Some(trajectory);
        }

        Ok(result)
    }

    /// Induces a grammar per window and runs the detector across the
    /// window grammars.
    ///
    /// Windows start at `0, step, 2*step, …` while a full window fits;
    /// when none fits, the whole sequence is one window. The terminal
    /// alphabet for per-window MDL comes from the *full* token set so
    /// window scores stay comparable. The final window provides the
    /// representative compressed sequence, grammar and summary metrics.
    pub fn process_sliding<T: Hash + Eq + Clone>(
        &self,
        tokens: &[T],
        window_size: usize,
        step: usize,
        options: &EngineOptions,
    ) -> Result<EngineResult<T>, ConfigError> {
        if window_size == 0 {
            return Err(ConfigError::WindowSize);
        }
        let detector = EmergenceDetector::new(options.detector.clone())?;
        let step = if step == 0 { (window_size / 2).max(1) } else { step };

        let mut windows: Vec<&[T]> = Vec::new();
        let mut start = 0;
        while start + window_size <= tokens.len() {
            windows.push(&tokens[start..start + window_size]);
            start += step;
        }
        if windows.is_empty() {
            windows.push(tokens);
        }

        let sigma = distinct_count(tokens);
        let mut grammars = Vec::with_capacity(windows.len());
        let mut mdl_totals = Vec::with_capacity(windows.len());
        let mut last_compressed = Vec::new();
        let mut last_components = MdlComponents {
            grammar_cost: 0.0,
            data_cost: 0.0,
            total: 0.0,
        };

        for window in &windows {
            let (compressed, grammar) = repair::compress(window);
            last_components = mdl::score_components(&grammar, &compressed, sigma);
            mdl_totals.push(last_components.total);
            grammars.push(grammar);
            last_compressed = compressed;
        }

        let last_window = *windows.last().expect("at least one window exists");
        let last_grammar = grammars.last().expect("one grammar per window");

        let reconstructed = repair::reconstruct(&last_compressed, last_grammar);
        let valid_lossless = reconstructed.as_slice() == last_window;
        let coverage = repair::coverage(&last_compressed, last_grammar);
        let naive = mdl::naive_baseline(last_window);
        let ratio = mdl::compression_ratio(last_window, &last_compressed, last_grammar);

        let Detection {
            entropies,
            mut events,
        } = detector.detect(grammars.iter());
        for event in &mut events {
            let i = event.index;
            if i >= 1 && i + 1 < grammars.len() {
                event.rules_added = rules_added(&grammars[i - 1], &grammars[i + 1]);
            }
        }

        debug!(
            "engine: {} windows (size {}, step {}), {} events",
            windows.len(),
            window_size,
            step,
            events.len()
        );

        Ok(EngineResult {
            compressed: last_compressed,
            rules: last_grammar.as_tuples(),
            mdl_total: last_components.total,
            mdl_grammar_cost: last_components.grammar_cost,
            mdl_data_cost: last_components.data_cost,
            naive_mdl: naive,
            compression_ratio: ratio,
            coverage,
            valid_lossless,
            entropies: Some(entropies.clone()),
            events: Some(events.clone()),
            mdl_trajectory: None,
            windows_entropies: Some(entropies),
            windows_mdl: Some(mdl_totals),
            window_events: Some(events),
        })
    }
}

/// Rules present in `next` but not in `prev`, in ascending id order.
fn rules_added<T: Hash + Eq + Clone>(prev: &Grammar<T>, next: &Grammar<T>) -> Vec<RuleId> {
    next.rule_ids()
        .into_iter()
        .filter(|id| !prev.contains(*id))
        .collect()
}

fn distinct_count<T: Hash + Eq>(tokens: &[T]) -> usize {
    let distinct: AHashSet<&T> = tokens.iter().collect();
    distinct.len()
}
