use thiserror::Error;

/// Rejected construction parameters. No cache is built when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("the number of cache lines must be a non-zero power of two, got {0}")]
    LineCountNotPowerOfTwo(usize),
    #[error("the line data size must be at least one byte")]
    ZeroLineSize,
    #[error("{lines_per_set} lines per set does not fit in a cache of {total_lines} lines")]
    AssociativityExceedsLines {
        lines_per_set: usize,
        total_lines: usize,
    },
}

/// Failures while replaying a trace against a cache
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("couldn't read the trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("couldn't parse trace line {line}: {text:?}")]
    Parse { line: usize, text: String },
    #[error("couldn't parse the cache configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("backing store failure on trace line {line}: {message}")]
    Backing { line: usize, message: String },
}
