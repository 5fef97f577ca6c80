/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the spectrum module

use thiserror::Error;

/// Result type for spectrum operations
pub type Result<T> = std::result::Result<T, SpectrumError>;

/// Errors raised while building spectra, basis sets and spectral windows
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectrumError {
    /// The requested ppm window does not overlap the sampled bandwidth
    #[error("ppm window [{low}, {high}] lies outside the sampled range [{min:.3}, {max:.3}]")]
    InvalidRange {
        low: f64,
        high: f64,
        min: f64,
        max: f64,
    },

    /// Two signals that must share a length do not
    #[error("Length mismatch: expected {expected} points, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// A signal with no samples was supplied
    #[error("Signal contains no samples")]
    EmptySignal,

    /// Metabolite group assignment is not a contiguous 0-based labelling
    #[error("Invalid metabolite groups: {0}")]
    InvalidGroups(String),

    /// Acquisition or header parameter out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
