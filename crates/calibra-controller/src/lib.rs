//! # calibra-controller
//!
//! The evaluation & rollout controller for the self-tuning forecast
//! ensemble. Each cycle scans running canary experiments, compares canary
//! and control accuracy/reliability over a trailing window, and either
//! propagates the canary's newest weight vector to the opted-in population
//! or leaves the population untouched — always moving the experiment to a
//! terminal state.

pub mod controller;
pub mod outcome;
pub mod stats;

pub use controller::RolloutController;
pub use outcome::{
    CycleSummary, Decision, DecisionMetrics, ExperimentOutcome, PropagationOutcome,
    PropagationReport, SkipReason,
};
