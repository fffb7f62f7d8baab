//! Two-layer feed-forward network trained with online backpropagation.
//!
//! Weights live in a [`WeightSet`] (an input→hidden and a hidden→output
//! [`Cluster`], bias in the last column of every row). A [`Network`] runs the
//! forward pass on a [`compute::ComputeBackend`], and a [`Trainer`] drives one
//! weight update per sample until an epoch classifies every sample correctly
//! or the epoch budget runs out.

mod activation;
pub mod codec;
pub mod compute;
mod config;
mod dataset;
mod error;
mod loader;
mod network;
mod observer;
mod report;
mod trainer;
mod weights;

pub use {
    activation::*,
    compute::{BackendKind, Precision},
    config::TrainConfig,
    dataset::{TrainPair, TrainingData},
    error::{Error, Result},
    loader::{load_input_rows, load_train_data, parse_input_rows, parse_train_data},
    network::{predict, predict_rows, Network},
    observer::{CancellationToken, NoopObserver, SnapshotWriter, TrainingObserver, WeightsOrigin},
    report::{Improvement, TrainingOutcome, TrainingReport, TrainingSummary, WeightsSnapshot},
    trainer::{random_seed, train, Trainer},
    weights::{generate_weights, Cluster, WeightSet, INIT_RANGE},
};

/// Values at or above this count as `1` once binarized.
pub const BINARIZE_THRESHOLD: f64 = 0.5;

#[inline(always)]
pub fn binarize(v: f64) -> f64 {
    if v >= BINARIZE_THRESHOLD { 1. } else { 0. }
}

/// Sum of squared differences.
pub fn calc_cost(present: &[f64], expected: &[f64]) -> f64 {
    present.iter().zip(expected.iter()).map(|(p, e)| (p - e).powi(2)).sum()
}

/// `true` when every output binarizes to the same value as its target.
pub fn is_prediction_ok(present: &[f64], expected: &[f64]) -> bool {
    present.iter().zip(expected.iter()).all(|(p, e)| binarize(*p) == binarize(*e))
}
