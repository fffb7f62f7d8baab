use thiserror::Error;

/// Everything that can go wrong while building, training, persisting or
/// evaluating a network.
#[derive(Debug, Error)]
pub enum Error {
    #[error("dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid network dimensions {input}x{hidden}x{output}: every layer needs at least one neuron")]
    InvalidDimensions {
        input: usize,
        hidden: usize,
        output: usize,
    },

    #[error("unsupported activation function: {0} (expected one of: sigmoid, relu, tanh, signedRoot, cubeRoot)")]
    UnknownActivation(String),

    #[error("unknown execution backend: {0} (expected one of: sequential, parallel, gpu)")]
    UnknownBackend(String),

    #[error("execution backend `{0}` is not available in this build")]
    BackendUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("non-finite output {value} at neuron {neuron} (epoch {epoch}, sample {sample})")]
    NonFiniteOutput {
        epoch: usize,
        sample: usize,
        neuron: usize,
        value: f64,
    },

    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("compute device failure: {0}")]
    Device(String),

    #[error("training cancelled after epoch {epoch}")]
    Cancelled { epoch: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Error::Format {
            line,
            message: message.into(),
        }
    }

    /// Errors the caller could have avoided by passing consistent inputs.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::DimensionMismatch { .. }
                | Error::InvalidDimensions { .. }
                | Error::UnknownActivation(_)
                | Error::UnknownBackend(_)
                | Error::BackendUnavailable(_)
                | Error::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
