//! # Emergence Engine - Grammar Compression with Structural Change Detection
//!
//! Compresses a sequence of discrete tokens into a context-free grammar,
//! scores the result under a two-part Minimum-Description-Length model,
//! and detects *emergence events*: points along the induction trajectory
//! where the grammar's rule-usage entropy bends sharply, indicating that
//! structure has crystallized or dissolved.
//!
//! The pipeline is built from three pieces:
//! 1. **RePair inducer** ([`repair`]): recursive digram replacement that
//!    can also record a trace of intermediate grammars after every
//!    substitution.
//! 2. **MDL scorer** ([`mdl`]): universal-code two-part cost over
//!    `(grammar, compressed sequence)` plus a grammar-free baseline.
//! 3. **Emergence detector** ([`EmergenceDetector`]): second-derivative
//!    analysis of the per-step entropy with adaptive thresholding,
//!    persistence, hysteresis and event classification.
//!
//! [`Engine`] ties them together and additionally verifies lossless
//! reconstruction, computes rule coverage, attributes events to the
//! rules they introduced, and offers a sliding-window mode.
//!
//! ## Example
//!
//! ```
//! use emergence_rs::{Engine, EngineOptions};
//!
//! let tokens: Vec<char> = "abcabcabc".chars().collect();
//! let result = Engine::new()
//!     .process(&tokens, &EngineOptions::default())
//!     .unwrap();
//!
//! // Reconstruction is exact and the grammar paid for itself.
//! assert!(result.valid_lossless);
//! assert_eq!(result.rules.len(), 1);
//! assert_eq!(result.compressed.len(), 3);
//! ```
//!
//! ## Emergence detection
//!
//! With `emergence` enabled the engine induces in trace mode and runs
//! the detector over the entropy of every intermediate grammar:
//!
//! ```
//! use emergence_rs::{Engine, EngineOptions};
//!
//! let tokens: Vec<char> = "abababab".chars().collect();
//! let options = EngineOptions {
//!     emergence: true,
//!     ..EngineOptions::default()
//! };
//! let result = Engine::new().process(&tokens, &options).unwrap();
//!
//! let entropies = result.entropies.unwrap();
//! assert_eq!(entropies.len(), result.mdl_trajectory.unwrap().len());
//! ```
//!
//! ## Determinism
//!
//! The core is single-threaded and allocation-local; for a given input
//! and configuration, results are bit-identical across runs. Digram ties
//! break to the leftmost occurrence, rule tables iterate in creation
//! order, and events come out sorted by index.

pub mod mdl;
pub mod repair;

mod digram;
mod emergence;
mod engine;
mod entropy;
mod error;
mod grammar;
mod symbol;


pub use emergence::{
    Detection, DetectorConfig, EmergenceDetector, EmergenceEvent, EventKind, Preset,
    ThresholdMode,
};
pub use engine::{Engine, EngineOptions, EngineResult};
pub use entropy::compute_entropy;
pub use error::ConfigError;
pub use grammar::{Grammar, ProductionRule};
pub use mdl::MdlComponents;
pub use repair::Snapshot;
pub use symbol::{RuleId, Symbol};
