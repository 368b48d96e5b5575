// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski),
// licensed under the GNU Affero General Public License v3 or later.

//! Error taxonomy, per spec §7. Configuration/Geometry/Numerical errors are
//! fatal and abort the run; I/O errors are reported and swallowed so a step
//! continues without writing; resource exhaustion is fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DfcsrError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("numerical error at s={s}, x={x}, step={step}: {reason}")]
    Numerical {
        s: f64,
        x: f64,
        step: usize,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("resource exhaustion: {0}")]
    ResourceExhausted(String),
}

impl DfcsrError {
    /// Whether this error should abort the run (all kinds except I/O).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DfcsrError::Io(_))
    }
}

impl From<serde_yaml::Error> for DfcsrError {
    fn from(err: serde_yaml::Error) -> Self {
        DfcsrError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for DfcsrError {
    fn from(err: std::io::Error) -> Self {
        DfcsrError::Io(err.to_string())
    }
}
