use tracing::{debug, info, trace, warn};

use crate::{
    calc_cost, is_prediction_ok, CancellationToken, Error, Network, NoopObserver, Result, TrainConfig, TrainingData,
    TrainingObserver, TrainingReport, WeightSet, WeightsSnapshot,
};

/// Online backpropagation over a [`TrainingData`] set: one weight update per
/// sample, one improvement check per epoch.
pub struct Trainer<'a> {
    data: &'a TrainingData,
    network: Network,
    learning_rate: f64,
    max_epochs: usize,
    observer: Box<dyn TrainingObserver + 'a>,
    cancellation: Option<CancellationToken>,
    final_errors: Vec<f64>,
    initial_errors: Vec<f64>,
}

impl<'a> Trainer<'a> {
    pub fn new(data: &'a TrainingData, network: Network, learning_rate: f64, max_epochs: usize) -> Self {
        let final_errors = vec![0.; network.weights().output()];
        let initial_errors = vec![0.; network.weights().hidden()];
        Self {
            data,
            network,
            learning_rate,
            max_epochs,
            observer: Box::new(NoopObserver),
            cancellation: None,
            final_errors,
            initial_errors,
        }
    }

    pub fn with_observer(mut self, observer: impl TrainingObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn network(&self) -> &Network { &self.network }

    pub fn into_network(self) -> Network {
        self.network
    }

    fn check(&self) -> Result<()> {
        let weights = self.network.weights();
        if self.data.inputs() != weights.input() {
            return Err(Error::DimensionMismatch {
                what: "training data inputs",
                expected: weights.input(),
                actual: self.data.inputs(),
            });
        }
        if self.data.outputs() != weights.output() {
            return Err(Error::DimensionMismatch {
                what: "training data outputs",
                expected: weights.output(),
                actual: self.data.outputs(),
            });
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    /// Forward pass, error and weight update for one sample. Returns the
    /// squared error cost and whether the binarized prediction was wrong.
    fn train_sample(&mut self, epoch: usize, sample: usize) -> Result<(f64, bool)> {
        let data = self.data;
        let input = data.input(sample);
        let target = data.output(sample);
        let rate = self.learning_rate;
        let activation = self.network.activation();

        self.network.proceed(input)?;
        let (weights, backend, hidden, output) = self.network.parts_mut();

        for (neuron, ((e, t), y)) in self.final_errors.iter_mut().zip(target).zip(output).enumerate() {
            if !y.is_finite() {
                return Err(Error::NonFiniteOutput { epoch, sample, neuron, value: *y });
            }
            *e = t - y;
        }
        let cost = calc_cost(output, target);
        let mistake = !is_prediction_ok(output, target);

        let (initial_cluster, final_cluster) = weights.clusters_mut();
        // hidden errors read the final cluster before it is updated
        backend.hidden_errors(final_cluster, &self.final_errors, hidden, rate, activation, &mut self.initial_errors)?;
        backend.output_errors(&mut self.final_errors, output, rate, activation)?;
        backend.update_weights(final_cluster, hidden, &self.final_errors)?;
        backend.update_weights(initial_cluster, input, &self.initial_errors)?;

        Ok((cost, mistake))
    }

    pub fn run(&mut self) -> Result<TrainingReport> {
        self.check()?;

        let samples = self.data.samples();
        let weights = self.network.weights();
        info!(
            input = weights.input(),
            hidden = weights.hidden(),
            output = weights.output(),
            samples,
            activation = %self.network.activation(),
            backend = self.network.backend().name(),
            learning_rate = self.learning_rate,
            max_epochs = self.max_epochs,
            "training started"
        );

        let mut min_errors = samples + 1;
        let mut epoch_zero_errors = None;
        let mut epochs_executed = self.max_epochs;
        let mut improved_weights = Vec::new();

        for epoch in 0..self.max_epochs {
            let mut mistakes = 0;
            let mut cost_sum = 0.;
            for sample in 0..samples {
                let (cost, mistake) = self.train_sample(epoch, sample)?;
                cost_sum += cost;
                if mistake {
                    mistakes += 1;
                }
            }
            trace!(epoch, mistakes, cost = cost_sum, "epoch finished");

            if mistakes >= min_errors {
                continue;
            }
            min_errors = mistakes;
            debug!(epoch, errors = mistakes, "weights improved");

            let snapshot = WeightsSnapshot { epoch, errors: mistakes, weights: self.network.weights().clone() };
            self.observer.on_epoch_improved(&snapshot)?;
            improved_weights.push(snapshot);

            if mistakes == 0 {
                epoch_zero_errors = Some(epoch);
                epochs_executed = epoch + 1;
                break;
            }
            if self.cancellation.as_ref().map_or(false, CancellationToken::is_cancelled) {
                warn!(epoch, errors = mistakes, "training cancelled");
                return Err(Error::Cancelled { epoch });
            }
        }

        info!(epochs_executed, min_errors, converged = epoch_zero_errors.is_some(), "training finished");
        Ok(TrainingReport::new(epochs_executed, epoch_zero_errors, min_errors, improved_weights))
    }
}

/// Seed for runs that did not ask for one.
pub fn random_seed() -> u64 {
    rand::random()
}

/// Trains `weights`, or weights generated from `config.seed` when none are
/// given, and returns the report of the run.
pub fn train(data: &TrainingData, weights: Option<WeightSet>, config: &TrainConfig) -> Result<TrainingReport> {
    config.validate()?;
    let weights = match weights {
        Some(weights) => weights,
        None => {
            let seed = config.seed.unwrap_or_else(random_seed);
            WeightSet::generate(data.inputs(), config.hidden, data.outputs(), seed)?
        }
    };
    let network = Network::with_backend(weights, config.activation, config.backend.create(config.threads)?);
    Trainer::new(data, network, config.learning_rate, config.max_epochs).run()
}
