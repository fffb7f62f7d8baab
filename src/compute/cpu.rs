use rayon::prelude::*;

use super::{
    check_hidden_errors, check_layer_output, check_output_errors, check_update_weights, ComputeBackend, Precision,
};
use crate::{Activation, Cluster, Error, Result};

/// Rows handed to one rayon task; below this a split costs more than it saves.
const ROWS_PER_TASK: usize = 8;

/// Output of one neuron: `f(bias + Σ activations[j] · weights[j])`, where the
/// bias is the last element of `row`.
#[inline(always)]
pub fn proceed(row: &[f64], activations: &[f64], activation: Activation) -> f64 {
    let fan_in = row.len() - 1;
    let mut sum = row[fan_in];
    for j in 0..fan_in {
        sum += activations[j] * row[j];
    }
    activation.f(sum)
}

#[inline(always)]
fn hidden_error(
    final_cluster: &Cluster,
    final_errors: &[f64],
    h: usize,
    hidden: f64,
    rate: f64,
    activation: Activation,
) -> f64 {
    let mut sum = 0.;
    for o in 0..final_cluster.rows() {
        sum += final_errors[o] * final_cluster.get(o, h);
    }
    sum * rate * activation.df(hidden)
}

#[inline(always)]
fn update_row(row: &mut [f64], input: &[f64], error: f64) {
    let fan_in = row.len() - 1;
    for c in 0..fan_in {
        row[c] += error * input[c];
    }
    row[fan_in] += error;
}

/// Single-threaded `f64` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequential;

impl ComputeBackend for Sequential {
    fn name(&self) -> &'static str { "sequential" }

    fn precision(&self) -> Precision { Precision::Double }

    fn layer_output(&self, input: &[f64], cluster: &Cluster, activation: Activation, out: &mut [f64]) -> Result<()> {
        check_layer_output(input, cluster, out)?;
        for (i, o) in out.iter_mut().enumerate() {
            *o = proceed(cluster.row(i), input, activation);
        }
        Ok(())
    }

    fn hidden_errors(
        &self,
        final_cluster: &Cluster,
        final_errors: &[f64],
        hidden: &[f64],
        rate: f64,
        activation: Activation,
        out: &mut [f64],
    ) -> Result<()> {
        check_hidden_errors(final_cluster, final_errors, hidden, out)?;
        for (h, e) in out.iter_mut().enumerate() {
            *e = hidden_error(final_cluster, final_errors, h, hidden[h], rate, activation);
        }
        Ok(())
    }

    fn output_errors(&self, final_errors: &mut [f64], output: &[f64], rate: f64, activation: Activation) -> Result<()> {
        check_output_errors(final_errors, output)?;
        for (e, y) in final_errors.iter_mut().zip(output) {
            *e *= rate * activation.df(*y);
        }
        Ok(())
    }

    fn update_weights(&self, cluster: &mut Cluster, input: &[f64], errors: &[f64]) -> Result<()> {
        check_update_weights(cluster, input, errors)?;
        for (r, e) in errors.iter().enumerate() {
            update_row(cluster.row_mut(r), input, *e);
        }
        Ok(())
    }
}

/// Rayon backend: rows of a layer are spread over the pool. Each row is still
/// reduced in index order, so results are bitwise equal to [`Sequential`].
pub struct Parallel {
    pool: Option<rayon::ThreadPool>,
}

impl Parallel {
    /// `threads == 0` runs on rayon's global pool.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = if threads == 0 {
            None
        } else {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::InvalidConfig(format!("cannot build a {} thread pool: {}", threads, e)))?,
            )
        };
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.as_ref().map(|p| p.current_num_threads()).unwrap_or_else(rayon::current_num_threads)
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl ComputeBackend for Parallel {
    fn name(&self) -> &'static str { "parallel" }

    fn precision(&self) -> Precision { Precision::Double }

    fn layer_output(&self, input: &[f64], cluster: &Cluster, activation: Activation, out: &mut [f64]) -> Result<()> {
        check_layer_output(input, cluster, out)?;
        self.install(|| {
            out.par_iter_mut()
                .enumerate()
                .with_min_len(ROWS_PER_TASK)
                .for_each(|(i, o)| *o = proceed(cluster.row(i), input, activation))
        });
        Ok(())
    }

    fn hidden_errors(
        &self,
        final_cluster: &Cluster,
        final_errors: &[f64],
        hidden: &[f64],
        rate: f64,
        activation: Activation,
        out: &mut [f64],
    ) -> Result<()> {
        check_hidden_errors(final_cluster, final_errors, hidden, out)?;
        self.install(|| {
            out.par_iter_mut()
                .enumerate()
                .with_min_len(ROWS_PER_TASK)
                .for_each(|(h, e)| *e = hidden_error(final_cluster, final_errors, h, hidden[h], rate, activation))
        });
        Ok(())
    }

    fn output_errors(&self, final_errors: &mut [f64], output: &[f64], rate: f64, activation: Activation) -> Result<()> {
        check_output_errors(final_errors, output)?;
        self.install(|| {
            final_errors
                .par_iter_mut()
                .zip(output.par_iter())
                .with_min_len(ROWS_PER_TASK)
                .for_each(|(e, y)| *e *= rate * activation.df(*y))
        });
        Ok(())
    }

    fn update_weights(&self, cluster: &mut Cluster, input: &[f64], errors: &[f64]) -> Result<()> {
        check_update_weights(cluster, input, errors)?;
        let cols = cluster.cols();
        self.install(|| {
            cluster
                .as_mut_slice()
                .par_chunks_mut(cols)
                .zip(errors.par_iter())
                .with_min_len(ROWS_PER_TASK)
                .for_each(|(row, e)| update_row(row, input, *e))
        });
        Ok(())
    }
}
