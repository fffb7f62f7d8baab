use std::cell::Cell;

use approx::assert_abs_diff_eq;
use bnn::{
    codec, predict, train, Activation, CancellationToken, Error, Network, SnapshotWriter, TrainConfig, Trainer,
    TrainingData, TrainingOutcome, WeightSet, WeightsSnapshot,
};

const AND_WEIGHTS: &str = "2 3 1
0.0412\t-0.0187\t0.0093
-0.0321\t0.0276\t-0.0044
0.0158\t0.0349\t-0.0402
-0.0233\t0.0301\t0.0117\t-0.0065
";

fn and_gate() -> TrainingData {
    TrainingData::from_rows(&[([0., 0.], [0.]), ([0., 1.], [0.]), ([1., 0.], [0.]), ([1., 1.], [1.])]).unwrap()
}

#[test]
fn all_zero_network_outputs_f_of_zero() {
    let weights = WeightSet::zeroed(1, 1, 1).unwrap();
    assert_eq!(predict(&weights, "sigmoid", &[0.]).unwrap(), vec![0.5]);
    assert_eq!(predict(&weights, "relu", &[3.]).unwrap(), vec![0.]);
    assert_eq!(predict(&weights, "signed_root", &[3.]).unwrap(), vec![0.]);
}

#[test]
fn training_stops_at_the_first_zero_error_epoch() {
    let data = and_gate();
    let calls = Cell::new(0);
    let network = Network::new(WeightSet::generate(2, 3, 1, 1).unwrap(), Activation::Sigmoid);
    let report = Trainer::new(&data, network, 0.5, 100_000)
        .with_observer(|_: &WeightsSnapshot| {
            calls.set(calls.get() + 1);
            Ok::<(), Error>(())
        })
        .run()
        .unwrap();

    let epoch = report.epoch_zero_errors().expect("and gate converges");
    assert_eq!(report.epochs_executed(), epoch + 1);
    assert_eq!(report.improved_weights().last().unwrap().epoch, epoch);
    assert_eq!(calls.get(), report.improved_weights().len());
}

#[test]
fn exhausted_run_reports_the_best_error_count() {
    let data = and_gate();
    let config = TrainConfig { max_epochs: 1, ..Default::default() };
    let report = train(&data, Some(codec::deserialize(AND_WEIGHTS).unwrap()), &config).unwrap();
    assert_eq!(report.epochs_executed(), 1);
    assert_eq!(report.epoch_zero_errors(), None);
    assert_eq!(report.min_errors(), 2);
    assert_eq!(report.outcome(), TrainingOutcome::Exhausted { min_errors: 2 });
    assert_eq!(report.improved_weights().len(), 1);
    assert_eq!((report.improved_weights()[0].epoch, report.improved_weights()[0].errors), (0, 2));
}

#[test]
fn mismatched_data_fails_before_the_first_epoch() {
    let data = and_gate();
    let weights = WeightSet::zeroed(2, 2, 3).unwrap();
    let calls = Cell::new(0);
    let err = Trainer::new(&data, Network::new(weights.clone(), Activation::Sigmoid), 0.5, 10)
        .with_observer(|_: &WeightsSnapshot| {
            calls.set(calls.get() + 1);
            Ok::<(), Error>(())
        })
        .run()
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { what: "training data outputs", expected: 3, actual: 1 }));
    assert!(err.is_precondition());
    assert_eq!(calls.get(), 0);

    assert!(matches!(train(&data, Some(weights), &TrainConfig::default()), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn overflowing_outputs_abort_the_run() {
    let data = TrainingData::from_rows(&[([1.], [1.]), ([1e300], [1.])]).unwrap();
    let weights = codec::deserialize("1 1 1\n1e300\t0\n1e300\t0\n").unwrap();
    let config = TrainConfig { activation: Activation::Relu, ..Default::default() };
    let err = train(&data, Some(weights), &config).unwrap_err();
    match err {
        Error::NonFiniteOutput { epoch, sample, neuron, value } => {
            assert_eq!((epoch, sample, neuron), (0, 0, 0));
            assert!(value.is_infinite());
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn nan_inputs_abort_the_run() {
    let data = TrainingData::from_rows(&[([0.], [0.]), ([f64::NAN], [1.])]).unwrap();
    let err = train(&data, Some(WeightSet::zeroed(1, 1, 1).unwrap()), &TrainConfig::default()).unwrap_err();
    assert!(matches!(err, Error::NonFiniteOutput { epoch: 0, sample: 1, .. }));
}

#[test]
fn cancellation_stops_after_the_first_improvement() {
    let data = and_gate();
    let token = CancellationToken::new();
    let seen = Cell::new(0);
    let observer_token = token.clone();
    let err = Trainer::new(&data, Network::new(WeightSet::zeroed(2, 2, 1).unwrap(), Activation::Sigmoid), 0.5, 1000)
        .with_cancellation(token)
        .with_observer(|s: &WeightsSnapshot| {
            seen.set(seen.get() + 1);
            assert_eq!(s.epoch, 0);
            observer_token.cancel();
            Ok::<(), Error>(())
        })
        .run()
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { epoch: 0 }));
    assert_eq!(seen.get(), 1);
}

#[test]
fn observer_errors_end_the_run() {
    let data = and_gate();
    let err = Trainer::new(&data, Network::new(WeightSet::zeroed(2, 2, 1).unwrap(), Activation::Sigmoid), 0.5, 1000)
        .with_observer(|_: &WeightsSnapshot| {
            Err::<(), Error>(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        })
        .run()
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn snapshot_writer_persists_every_improvement() {
    let dir = tempfile::tempdir().unwrap();
    let data = and_gate();
    let mut writer = SnapshotWriter::new(dir.path(), "W", 1000);
    let report = {
        let network = Network::new(WeightSet::generate(2, 3, 1, 2).unwrap(), Activation::Tanh);
        let mut trainer = Trainer::new(&data, network, 0.2, 1000)
            .with_observer(|s: &WeightsSnapshot| bnn::TrainingObserver::on_epoch_improved(&mut writer, s));
        trainer.run().unwrap()
    };
    assert_eq!(writer.written(), report.improved_weights().len());

    for (i, snapshot) in report.improved_weights().iter().enumerate() {
        let path = writer.snapshot_path(i + 1, snapshot);
        assert_eq!(codec::load(&path).unwrap(), snapshot.weights);
    }
}

#[test]
fn activations_train_without_numeric_errors() {
    let data = and_gate();
    let weights = codec::deserialize(AND_WEIGHTS).unwrap();
    // (activation, min errors, zero-error epoch) after 200 epochs at rate 0.05
    let expected = [
        (Activation::Sigmoid, 1, None),
        (Activation::Relu, 1, None),
        (Activation::Tanh, 0, Some(127)),
        (Activation::SignedRoot, 1, None),
        (Activation::CubeRoot, 0, Some(12)),
    ];
    for (activation, min_errors, epoch_zero_errors) in expected {
        let config = TrainConfig { learning_rate: 0.05, max_epochs: 200, activation, ..Default::default() };
        let report = train(&data, Some(weights.clone()), &config).unwrap();
        assert_eq!(report.min_errors(), min_errors, "{}", activation);
        assert_eq!(report.epoch_zero_errors(), epoch_zero_errors, "{}", activation);
        assert!(report.best_weights().unwrap().is_finite());
    }
}

#[test]
fn single_step_follows_the_update_rule() {
    // one epoch over one sample from zero weights: only the final cluster moves
    let data = TrainingData::from_rows(&[([2.], [0.])]).unwrap();
    let report = Trainer::new(&data, Network::new(WeightSet::zeroed(1, 1, 1).unwrap(), Activation::Sigmoid), 1., 1)
        .run()
        .unwrap();
    let weights = &report.improved_weights()[0].weights;
    // error = (0 - 0.5) * 0.25 = -0.125, hidden = 0.5
    assert_abs_diff_eq!(weights.final_cluster().get(0, 0), -0.0625);
    assert_abs_diff_eq!(weights.final_cluster().bias(0), -0.125);
    assert_eq!(weights.initial_cluster().row(0), &[0., 0.]);
}
