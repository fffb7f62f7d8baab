use crate::{
    compute::{BackendKind, ComputeBackend, Sequential},
    Activation, Error, Result, WeightSet,
};

/// Two-layer network: the live weights plus the buffers of the last forward
/// pass, which the trainer reuses for the backward pass of the same sample.
pub struct Network {
    weights: WeightSet,
    activation: Activation,
    backend: Box<dyn ComputeBackend>,
    hidden_layer: Vec<f64>,
    output_layer: Vec<f64>,
}

impl Network {
    pub fn new(weights: WeightSet, activation: Activation) -> Self {
        Self::with_backend(weights, activation, Box::new(Sequential))
    }

    pub fn with_backend(weights: WeightSet, activation: Activation, backend: Box<dyn ComputeBackend>) -> Self {
        let hidden_layer = vec![0.; weights.hidden()];
        let output_layer = vec![0.; weights.output()];
        Self { weights, activation, backend, hidden_layer, output_layer }
    }

    /// Forward pass. Returns the output layer; the hidden layer stays cached
    /// until the next call.
    pub fn proceed(&mut self, input: &[f64]) -> Result<&[f64]> {
        if input.len() != self.weights.input() {
            return Err(Error::DimensionMismatch {
                what: "network input",
                expected: self.weights.input(),
                actual: input.len(),
            });
        }
        self.backend
            .layer_output(input, self.weights.initial_cluster(), self.activation, &mut self.hidden_layer)?;
        self.backend
            .layer_output(&self.hidden_layer, self.weights.final_cluster(), self.activation, &mut self.output_layer)?;
        Ok(&self.output_layer)
    }

    #[inline(always)]
    pub fn weights(&self) -> &WeightSet { &self.weights }
    #[inline(always)]
    pub fn activation(&self) -> Activation { self.activation }
    #[inline(always)]
    pub fn backend(&self) -> &dyn ComputeBackend { self.backend.as_ref() }
    #[inline(always)]
    pub fn hidden_layer(&self) -> &[f64] { &self.hidden_layer }
    #[inline(always)]
    pub fn output_layer(&self) -> &[f64] { &self.output_layer }

    /// Everything the backward pass of one sample touches, borrowed at once.
    pub(crate) fn parts_mut(&mut self) -> (&mut WeightSet, &dyn ComputeBackend, &[f64], &[f64]) {
        (&mut self.weights, self.backend.as_ref(), &self.hidden_layer, &self.output_layer)
    }

    pub fn into_weights(self) -> WeightSet {
        self.weights
    }
}

/// Evaluates `weights` on a single input with the sequential backend.
/// `activation` is resolved by name and an unknown name is an error.
pub fn predict(weights: &WeightSet, activation: &str, input: &[f64]) -> Result<Vec<f64>> {
    let activation: Activation = activation.parse()?;
    let mut network = Network::new(weights.clone(), activation);
    network.proceed(input).map(<[f64]>::to_vec)
}

/// Same as [`predict`] over many rows, on a backend of choice.
pub fn predict_rows(
    weights: &WeightSet,
    activation: Activation,
    backend: BackendKind,
    rows: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>> {
    let mut network = Network::with_backend(weights.clone(), activation, backend.create(0)?);
    rows.iter().map(|row| network.proceed(row).map(<[f64]>::to_vec)).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{codec, Cluster};

    #[test]
    fn zero_weights_give_f_of_zero() {
        let weights = WeightSet::zeroed(1, 1, 1).unwrap();
        assert_eq!(predict(&weights, "sigmoid", &[0.7]).unwrap(), vec![0.5]);
        assert_eq!(predict(&weights, "tanh", &[0.7]).unwrap(), vec![0.]);
    }

    #[test]
    fn forward_pass_uses_biases() {
        // hidden = relu(1 * 2 + 1) = 3, out = relu(3 * 0.5 - 1) = 0.5
        let weights = WeightSet::new(
            1,
            1,
            1,
            Cluster::from_rows(vec![vec![2., 1.]], 2).unwrap(),
            Cluster::from_rows(vec![vec![0.5, -1.]], 2).unwrap(),
        )
        .unwrap();
        let mut network = Network::new(weights, Activation::Relu);
        let out = network.proceed(&[1.]).unwrap().to_vec();
        assert_eq!(network.hidden_layer(), &[3.]);
        assert_abs_diff_eq!(out[0], 0.5);
    }

    #[test]
    fn wrong_input_length_is_rejected() {
        let weights = WeightSet::zeroed(2, 1, 1).unwrap();
        let err = predict(&weights, "sigmoid", &[1.]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { what: "network input", expected: 2, actual: 1 }));
    }

    #[test]
    fn unknown_activation_name_is_rejected() {
        let weights = WeightSet::zeroed(1, 1, 1).unwrap();
        assert!(matches!(predict(&weights, "softmax", &[1.]), Err(Error::UnknownActivation(_))));
    }

    #[test]
    fn prediction_is_deterministic() {
        let weights = codec::deserialize("2 2 1\n0.3\t-0.2\t0.1\n0.7\t0.4\t-0.5\n1.2\t-0.9\t0.05\n").unwrap();
        let a = predict(&weights, "cube-root", &[0.25, -1.5]).unwrap();
        let b = predict(&weights, "cubeRoot", &[0.25, -1.5]).unwrap();
        assert_eq!(a, b);

        let rows = vec![vec![0.25, -1.5], vec![1., 1.]];
        let parallel = predict_rows(&weights, Activation::CubeRoot, BackendKind::Parallel, &rows).unwrap();
        assert_eq!(parallel[0], a);
    }
}
