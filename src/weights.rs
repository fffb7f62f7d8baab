use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{Error, Result};

/// Range the generator draws initial weights from.
pub const INIT_RANGE: std::ops::Range<f64> = -0.05..0.05;

/// Row-major weight matrix of one layer. Each row belongs to one neuron and its
/// last column holds that neuron's bias.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Cluster {
    pub fn zeroed(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.; rows * cols] }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>, cols: usize) -> Result<Self> {
        let count = rows.len();
        let mut data = Vec::with_capacity(count * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::DimensionMismatch { what: "cluster row", expected: cols, actual: row.len() });
            }
            data.extend(row);
        }
        Ok(Self { rows: count, cols, data })
    }

    pub fn rand<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: (0..rows * cols).map(|_| rng.gen_range(INIT_RANGE)).collect() }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize { self.rows }
    #[inline(always)]
    pub fn cols(&self) -> usize { self.cols }
    /// Number of weights per neuron, bias excluded.
    #[inline(always)]
    pub fn fan_in(&self) -> usize { self.cols - 1 }

    #[inline(always)]
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    #[inline(always)]
    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    #[inline(always)]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline(always)]
    pub fn bias(&self, r: usize) -> f64 {
        self.get(r, self.cols - 1)
    }

    pub fn iter_rows(&self) -> std::slice::Chunks<'_, f64> {
        self.data.chunks(self.cols)
    }

    pub fn as_slice(&self) -> &[f64] { &self.data }
    pub fn as_mut_slice(&mut self) -> &mut [f64] { &mut self.data }
}

/// Learned parameters of the two-layer network.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSet {
    input: usize,
    hidden: usize,
    output: usize,
    initial_cluster: Cluster,
    final_cluster: Cluster,
}

impl WeightSet {
    /// Fails unless the initial cluster is `hidden x (input + 1)` and the final
    /// cluster is `output x (hidden + 1)`.
    pub fn new(
        input: usize,
        hidden: usize,
        output: usize,
        initial_cluster: Cluster,
        final_cluster: Cluster,
    ) -> Result<Self> {
        check_dimensions(input, hidden, output)?;
        check_cluster("initial cluster", &initial_cluster, hidden, input + 1)?;
        check_cluster("final cluster", &final_cluster, output, hidden + 1)?;
        Ok(Self { input, hidden, output, initial_cluster, final_cluster })
    }

    pub fn zeroed(input: usize, hidden: usize, output: usize) -> Result<Self> {
        Self::new(input, hidden, output, Cluster::zeroed(hidden, input + 1), Cluster::zeroed(output, hidden + 1))
    }

    /// Seeded random weights; the same seed always yields the same set.
    pub fn generate(input: usize, hidden: usize, output: usize, seed: u64) -> Result<Self> {
        check_dimensions(input, hidden, output)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let initial_cluster = Cluster::rand(&mut rng, hidden, input + 1);
        let final_cluster = Cluster::rand(&mut rng, output, hidden + 1);
        Self::new(input, hidden, output, initial_cluster, final_cluster)
    }

    pub fn input(&self) -> usize { self.input }
    pub fn hidden(&self) -> usize { self.hidden }
    pub fn output(&self) -> usize { self.output }

    pub fn initial_cluster(&self) -> &Cluster { &self.initial_cluster }
    pub fn final_cluster(&self) -> &Cluster { &self.final_cluster }

    /// Both clusters at once, so a caller can read one while mutating the other.
    pub(crate) fn clusters_mut(&mut self) -> (&mut Cluster, &mut Cluster) {
        (&mut self.initial_cluster, &mut self.final_cluster)
    }

    pub fn is_finite(&self) -> bool {
        self.initial_cluster.as_slice().iter().chain(self.final_cluster.as_slice()).all(|w| w.is_finite())
    }
}

fn check_dimensions(input: usize, hidden: usize, output: usize) -> Result<()> {
    if input == 0 || hidden == 0 || output == 0 {
        return Err(Error::InvalidDimensions { input, hidden, output });
    }
    Ok(())
}

fn check_cluster(what: &'static str, cluster: &Cluster, rows: usize, cols: usize) -> Result<()> {
    if cluster.rows() != rows {
        return Err(Error::DimensionMismatch { what, expected: rows, actual: cluster.rows() });
    }
    if cluster.cols() != cols {
        return Err(Error::DimensionMismatch { what, expected: cols, actual: cluster.cols() });
    }
    Ok(())
}

/// `generateWeights` entry point.
pub fn generate_weights(input: usize, hidden: usize, output: usize, seed: u64) -> Result<WeightSet> {
    WeightSet::generate(input, hidden, output, seed)
}
