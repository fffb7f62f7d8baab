use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use bnn::{
    binarize, codec, generate_weights, load_input_rows, load_train_data, predict_rows, random_seed, Activation,
    BackendKind, Network, SnapshotWriter, TrainConfig, Trainer, TrainingObserver, WeightsOrigin, WeightsSnapshot,
};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod console;

/// Generate seeded random weights for a network
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct InitWeights {
    /// Number of input values
    #[clap(long)]
    input: usize,
    /// Number of hidden layer neurons
    #[clap(long)]
    hidden: usize,
    /// Number of output values
    #[clap(long)]
    output: usize,
    /// Seed for deterministic generation, random when omitted
    #[clap(short, long)]
    seed: Option<u64>,
    /// Where to write the weights, stdout when omitted
    #[clap(long)]
    output_file: Option<PathBuf>,
}

impl InitWeights {
    fn exec(self) -> Result<()> {
        let seed = self.seed.unwrap_or_else(random_seed);
        let weights = generate_weights(self.input, self.hidden, self.output, seed)?;
        match self.output_file {
            Some(path) => {
                console::info(&format!("Seed: {}", seed));
                codec::save(&path, &weights).with_context(|| format!("cannot write weights to {}", path.display()))?;
                console::success(&format!("Weights written to {}", path.display()));
            }
            None => {
                // stdout carries the weights file itself
                eprintln!("Seed: {}", seed);
                print!("{}", codec::serialize(&weights));
            }
        }
        Ok(())
    }
}

/// Train a network on a dataset, saving every improvement
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Train {
    /// Training dataset file
    #[clap(short, long)]
    data_file: PathBuf,
    /// Initial weights file, generated from the seed when omitted
    #[clap(short, long)]
    weights_file: Option<PathBuf>,
    /// Hidden layer size; taken from the weights file when one is given
    #[clap(long)]
    hidden: Option<usize>,
    #[clap(short = 'e', long)]
    max_epochs: Option<usize>,
    #[clap(short, long)]
    learning_rate: Option<f64>,
    #[clap(short, long)]
    seed: Option<u64>,
    /// sigmoid, relu, tanh, signedRoot or cubeRoot
    #[clap(short, long, value_parser)]
    activation: Option<Activation>,
    /// sequential, parallel or gpu
    #[clap(short, long, value_parser)]
    backend: Option<BackendKind>,
    /// Thread count of the parallel backend, 0 for all cores
    #[clap(long)]
    threads: Option<usize>,
    /// Prefix of the snapshot and parameters files
    #[clap(long)]
    output_prefix: Option<String>,
    /// Do not write a weights file on every improvement
    #[clap(long)]
    disable_improvement_weights: bool,
    /// YAML file with training settings; flags override its values
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Write a JSON summary of the run to this file
    #[clap(long)]
    report: Option<PathBuf>,
}

impl Train {
    fn config(&self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::load(path).with_context(|| format!("cannot load config {}", path.display()))?,
            None => TrainConfig::default(),
        };
        if let Some(hidden) = self.hidden {
            config.hidden = hidden;
        }
        if let Some(max_epochs) = self.max_epochs {
            config.max_epochs = max_epochs;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(activation) = self.activation {
            config.activation = activation;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(prefix) = &self.output_prefix {
            config.output_prefix = prefix.clone();
        }
        if self.disable_improvement_weights {
            config.save_improvements = false;
        }
        config.validate()?;
        Ok(config)
    }

    fn exec(self) -> Result<()> {
        let mut config = self.config()?;

        console::info(&format!(
            "Training with a max of {} epochs at learning rate {}, {} activation on the {} backend...",
            config.max_epochs, config.learning_rate, config.activation, config.backend
        ));

        let data = load_train_data(&self.data_file)
            .with_context(|| format!("cannot read training data from {}", self.data_file.display()))?;
        console::info(&format!(
            "Training data: {} samples, {} inputs, {} outputs.",
            data.samples(),
            data.inputs(),
            data.outputs()
        ));

        let (weights, origin) = match &self.weights_file {
            Some(path) => {
                let weights =
                    codec::load(path).with_context(|| format!("cannot read weights from {}", path.display()))?;
                if self.hidden.map_or(false, |h| h != weights.hidden()) {
                    console::warning(&format!("Using {} hidden neurons from the weights file.", weights.hidden()));
                }
                config.hidden = weights.hidden();
                console::info(&format!("Initial weights loaded from file: {}.", path.display()));
                (weights, WeightsOrigin::File(path.clone()))
            }
            None => {
                let seed = config.seed.unwrap_or_else(random_seed);
                config.seed = Some(seed);
                console::info(&format!("Initial weights generated using seed {}.", seed));
                (generate_weights(data.inputs(), config.hidden, data.outputs(), seed)?, WeightsOrigin::Seed(seed))
            }
        };
        println!();

        let mut writer = config
            .save_improvements
            .then(|| SnapshotWriter::new(".", config.output_prefix.as_str(), config.max_epochs));
        if let Some(writer) = &writer {
            writer.write_parameters(&origin, &config).context("cannot write the parameters file")?;
        }

        let network = Network::with_backend(weights, config.activation, config.backend.create(config.threads)?);
        let started = Instant::now();
        let report = Trainer::new(&data, network, config.learning_rate, config.max_epochs)
            .with_observer(|snapshot: &WeightsSnapshot| {
                println!("{} errors at epoch {}", snapshot.errors, snapshot.epoch);
                match writer.as_mut() {
                    Some(writer) => writer.on_epoch_improved(snapshot),
                    None => Ok(()),
                }
            })
            .run()?;
        let elapsed = started.elapsed().as_secs_f64();
        println!();

        if let Some(path) = &self.report {
            let json = serde_json::to_string_pretty(&report.summary())?;
            std::fs::write(path, json).with_context(|| format!("cannot write report to {}", path.display()))?;
        }

        match report.epoch_zero_errors() {
            Some(_) => console::success(&format!(
                "Network trained successfully in {} epochs with a duration of {:.3} seconds.",
                report.epochs_executed(),
                elapsed
            )),
            None => console::error(
                &format!(
                    "Network training completed after {} epochs with {} errors and a duration of {:.3} seconds.",
                    report.epochs_executed(),
                    report.min_errors(),
                    elapsed
                ),
                false,
            ),
        }
        Ok(())
    }
}

/// Run a trained network over a file of input rows
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Predict {
    /// Input rows, one sample per line
    #[clap(short, long)]
    data_file: PathBuf,
    #[clap(short, long)]
    weights_file: PathBuf,
    /// Also write the outputs here, one line per sample
    #[clap(short, long)]
    output_file: Option<PathBuf>,
    /// Map outputs to 0 or 1 with a 0.5 threshold
    #[clap(long)]
    binarize_output: bool,
    #[clap(short, long, value_parser, default_value = "sigmoid")]
    activation: Activation,
    #[clap(short, long, value_parser, default_value = "sequential")]
    backend: BackendKind,
}

impl Predict {
    fn exec(self) -> Result<()> {
        console::info("Loading data and weights...");
        let rows = load_input_rows(&self.data_file)
            .with_context(|| format!("cannot read input rows from {}", self.data_file.display()))?;
        let weights = codec::load(&self.weights_file)
            .with_context(|| format!("cannot read weights from {}", self.weights_file.display()))?;

        println!();
        console::info(&format!("Generating predictions with {} activation...", self.activation));
        println!();

        let outputs = predict_rows(&weights, self.activation, self.backend, &rows)?;
        let binarized: Option<Vec<Vec<f64>>> = self
            .binarize_output
            .then(|| outputs.iter().map(|row| row.iter().map(|v| binarize(*v)).collect()).collect());

        print!("{}", console::prediction_table(&rows, &outputs, binarized.as_deref()));

        if let Some(path) = &self.output_file {
            let written = binarized.as_ref().unwrap_or(&outputs);
            let text: Vec<String> = written
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" "))
                .collect();
            std::fs::write(path, text.join("\n") + "\n")
                .with_context(|| format!("cannot write predictions to {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    InitWeights(InitWeights),
    Train(Train),
    Predict(Predict),
}

/// Two-layer backpropagation network
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// trace, debug, info, warn or error
    #[clap(long, global = true, default_value = "warn")]
    log_level: Level,
    #[clap(subcommand)]
    command: SubCommand,
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        console::warning(&format!("logging disabled: {}", e));
    }

    let result = match cli.command {
        SubCommand::InitWeights(init) => init.exec(),
        SubCommand::Train(train) => train.exec(),
        SubCommand::Predict(predict) => predict.exec(),
    };

    if let Err(e) = result {
        console::error(&format!("{:#}", e), true);
        std::process::exit(1);
    }
}
