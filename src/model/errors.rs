/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the model module

use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while setting up a forward model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model name not recognised
    #[error("Unknown model '{0}', expected 'lorentzian' or 'voigt'")]
    UnknownModel(String),

    /// A parameter vector does not match the model layout
    #[error("Parameter vector has {found} entries, layout expects {expected}")]
    LayoutMismatch { expected: usize, found: usize },

    /// Inputs to the model disagree in shape
    #[error("Model input mismatch: {0}")]
    InputMismatch(String),

    /// Error from the spectrum module
    #[error("Spectrum error: {0}")]
    Spectrum(#[from] crate::spectrum::SpectrumError),
}
