use crate::harmonics::HarmonicIndex;

/// Axis of a 2D map, used in error and report payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Vertical,
    Horizontal,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Vertical => f.write_str("vertical"),
            Axis::Horizontal => f.write_str("horizontal"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("harmonic peak {harmonic} is out of image frequency range ({axis})")]
    HarmonicOutOfRange { harmonic: HarmonicIndex, axis: Axis },
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    #[error("invalid bounds for `{parameter}`: min {min} >= max {max}")]
    InvalidBounds {
        parameter: &'static str,
        min: f64,
        max: f64,
    },
    #[error("fit did not converge after {iterations} iterations: {reason}")]
    FitNonConvergence { iterations: usize, reason: String },
    #[error("singular least-squares system: {0}")]
    SingularFit(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("i/o error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;
