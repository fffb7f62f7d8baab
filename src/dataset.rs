use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainPair {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl TrainPair {
    pub fn new(input: Vec<f64>, output: Vec<f64>) -> Self {
        Self { input, output }
    }
}

/// Paired samples whose widths all match `inputs` / `outputs`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    inputs: usize,
    outputs: usize,
    pairs: Vec<TrainPair>,
}

impl TrainingData {
    pub fn new(inputs: usize, outputs: usize, pairs: Vec<TrainPair>) -> Result<Self> {
        if inputs == 0 || outputs == 0 {
            return Err(Error::InvalidConfig(format!(
                "training data needs at least one input and one output, got {} inputs and {} outputs",
                inputs, outputs
            )));
        }
        for pair in &pairs {
            if pair.input.len() != inputs {
                return Err(Error::DimensionMismatch {
                    what: "sample inputs",
                    expected: inputs,
                    actual: pair.input.len(),
                });
            }
            if pair.output.len() != outputs {
                return Err(Error::DimensionMismatch {
                    what: "sample outputs",
                    expected: outputs,
                    actual: pair.output.len(),
                });
            }
        }
        Ok(Self { inputs, outputs, pairs })
    }

    /// Builds the set from `(input, output)` rows, taking widths from the first row.
    pub fn from_rows<I: AsRef<[f64]>, O: AsRef<[f64]>>(rows: &[(I, O)]) -> Result<Self> {
        let (inputs, outputs) = rows.first().map(|(i, o)| (i.as_ref().len(), o.as_ref().len())).unwrap_or((0, 0));
        let pairs = rows.iter().map(|(i, o)| TrainPair::new(i.as_ref().to_vec(), o.as_ref().to_vec())).collect();
        Self::new(inputs, outputs, pairs)
    }

    pub fn samples(&self) -> usize { self.pairs.len() }
    pub fn inputs(&self) -> usize { self.inputs }
    pub fn outputs(&self) -> usize { self.outputs }
    pub fn pairs(&self) -> &[TrainPair] { &self.pairs }

    pub fn input(&self, sample: usize) -> &[f64] { &self.pairs[sample].input }
    pub fn output(&self, sample: usize) -> &[f64] { &self.pairs[sample].output }
}
