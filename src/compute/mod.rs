//! Execution backends for the four numeric kernels of backpropagation.
//!
//! A backend never owns weights: every kernel borrows the buffers the network
//! owns and writes its result into a caller-provided slice. Shape checks run
//! before any work so every backend rejects the same invalid input with the
//! same error.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Activation, Cluster, Error, Result};

mod cpu;
#[cfg(feature = "gpu")]
pub mod device;
#[cfg(feature = "gpu")]
mod gpu;

pub use cpu::{proceed, Parallel, Sequential};
#[cfg(feature = "gpu")]
pub use gpu::Gpu;

/// Floating point width a backend computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Double,
    /// Values are narrowed to `f32` on the way in and widened back on the way
    /// out, so results agree with `Double` only up to single-precision rounding.
    Single,
}

pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn precision(&self) -> Precision;

    /// `out[i] = f(bias_i + Σ_j input[j] · cluster[i][j])` for every row `i`.
    fn layer_output(&self, input: &[f64], cluster: &Cluster, activation: Activation, out: &mut [f64]) -> Result<()>;

    /// `out[h] = (Σ_o final_errors[o] · final_cluster[o][h]) · rate · df(hidden[h])`.
    fn hidden_errors(
        &self,
        final_cluster: &Cluster,
        final_errors: &[f64],
        hidden: &[f64],
        rate: f64,
        activation: Activation,
        out: &mut [f64],
    ) -> Result<()>;

    /// `final_errors[o] *= rate · df(output[o])`, in place.
    fn output_errors(&self, final_errors: &mut [f64], output: &[f64], rate: f64, activation: Activation) -> Result<()>;

    /// `cluster[r][c] += errors[r] · input[c]`, bias column `+= errors[r]`.
    fn update_weights(&self, cluster: &mut Cluster, input: &[f64], errors: &[f64]) -> Result<()>;
}

fn expect_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::DimensionMismatch { what, expected, actual });
    }
    Ok(())
}

pub(crate) fn check_layer_output(input: &[f64], cluster: &Cluster, out: &[f64]) -> Result<()> {
    expect_len("layer input", cluster.fan_in(), input.len())?;
    expect_len("layer output", cluster.rows(), out.len())
}

pub(crate) fn check_hidden_errors(
    final_cluster: &Cluster,
    final_errors: &[f64],
    hidden: &[f64],
    out: &[f64],
) -> Result<()> {
    expect_len("output errors", final_cluster.rows(), final_errors.len())?;
    expect_len("hidden layer", final_cluster.fan_in(), hidden.len())?;
    expect_len("hidden errors", final_cluster.fan_in(), out.len())
}

pub(crate) fn check_output_errors(final_errors: &[f64], output: &[f64]) -> Result<()> {
    expect_len("output layer", final_errors.len(), output.len())
}

pub(crate) fn check_update_weights(cluster: &Cluster, input: &[f64], errors: &[f64]) -> Result<()> {
    expect_len("update input", cluster.fan_in(), input.len())?;
    expect_len("update errors", cluster.rows(), errors.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendKind {
    Sequential,
    Parallel,
    Gpu,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Sequential
    }
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Sequential => "sequential",
            BackendKind::Parallel => "parallel",
            BackendKind::Gpu => "gpu",
        }
    }

    /// `threads` only applies to the parallel backend; `0` uses rayon's global pool.
    pub fn create(self, threads: usize) -> Result<Box<dyn ComputeBackend>> {
        match self {
            BackendKind::Sequential => Ok(Box::new(Sequential)),
            BackendKind::Parallel => Ok(Box::new(Parallel::new(threads)?)),
            #[cfg(feature = "gpu")]
            BackendKind::Gpu => Ok(Box::new(Gpu::new()?)),
            #[cfg(not(feature = "gpu"))]
            BackendKind::Gpu => Err(Error::BackendUnavailable(self.name().to_string())),
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "cpu" => Ok(BackendKind::Sequential),
            "parallel" => Ok(BackendKind::Parallel),
            "gpu" => Ok(BackendKind::Gpu),
            _ => Err(Error::UnknownBackend(s.to_string())),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BackendKind> for String {
    fn from(kind: BackendKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("Parallel".parse::<BackendKind>().unwrap(), BackendKind::Parallel);
        assert_eq!("cpu".parse::<BackendKind>().unwrap(), BackendKind::Sequential);
        assert!(matches!("cuda".parse::<BackendKind>(), Err(Error::UnknownBackend(_))));
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn gpu_is_unavailable_without_the_feature() {
        assert!(matches!(BackendKind::Gpu.create(0), Err(Error::BackendUnavailable(_))));
    }

    #[test]
    fn cpu_backends_report_double_precision() {
        assert_eq!(BackendKind::Sequential.create(0).unwrap().precision(), Precision::Double);
        assert_eq!(BackendKind::Parallel.create(2).unwrap().precision(), Precision::Double);
    }
}
