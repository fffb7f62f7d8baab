use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::debug;

use crate::{codec, Result, TrainConfig, WeightsSnapshot};

/// Receives every improvement while the run is still going.
pub trait TrainingObserver {
    fn on_epoch_improved(&mut self, snapshot: &WeightsSnapshot) -> Result<()>;
}

impl<F> TrainingObserver for F
where
    F: FnMut(&WeightsSnapshot) -> Result<()>,
{
    fn on_epoch_improved(&mut self, snapshot: &WeightsSnapshot) -> Result<()> {
        self(snapshot)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TrainingObserver for NoopObserver {
    fn on_epoch_improved(&mut self, _: &WeightsSnapshot) -> Result<()> {
        Ok(())
    }
}

/// Shared stop flag, polled by the trainer after each recorded improvement.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where the initial weights of a run came from.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightsOrigin {
    Seed(u64),
    File(PathBuf),
}

/// Persists each improvement as `<prefix><index>-<epoch>-<errors>.txt`, with
/// the 1-based index zero-padded to `ceil(log10(max_epochs))` digits.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
    prefix: String,
    index_width: usize,
    written: usize,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, max_epochs: usize) -> Self {
        Self { dir: dir.into(), prefix: prefix.into(), index_width: index_width(max_epochs), written: 0 }
    }

    pub fn written(&self) -> usize { self.written }

    pub fn snapshot_path(&self, index: usize, snapshot: &WeightsSnapshot) -> PathBuf {
        self.dir.join(format!(
            "{}{:0width$}-{}-{}.txt",
            self.prefix,
            index,
            snapshot.epoch,
            snapshot.errors,
            width = self.index_width
        ))
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.dir.join(format!("{}{:0width$}-parameters.txt", self.prefix, 0, width = self.index_width))
    }

    /// Records the settings of the run next to its snapshots.
    pub fn write_parameters(&self, origin: &WeightsOrigin, config: &TrainConfig) -> Result<PathBuf> {
        let origin = match origin {
            WeightsOrigin::Seed(seed) => format!("Seed={}", seed),
            WeightsOrigin::File(path) => format!("WeightsFile={}", absolute(path).display()),
        };
        let text = format!(
            "{}\nHidden={}\nLearningRate={}\nMaxEpochs={}\nActivation={}\nBackend={}\n",
            origin, config.hidden, config.learning_rate, config.max_epochs, config.activation, config.backend
        );

        let path = self.parameters_path();
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, text)?;
        Ok(path)
    }
}

impl TrainingObserver for SnapshotWriter {
    fn on_epoch_improved(&mut self, snapshot: &WeightsSnapshot) -> Result<()> {
        let path = self.snapshot_path(self.written + 1, snapshot);
        codec::save(&path, &snapshot.weights)?;
        self.written += 1;
        debug!(path = %path.display(), "weights snapshot written");
        Ok(())
    }
}

fn index_width(max_epochs: usize) -> usize {
    if max_epochs <= 1 {
        return 0;
    }
    (max_epochs as f64).log10().ceil() as usize
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
