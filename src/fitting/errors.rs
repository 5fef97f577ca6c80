/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the fitting module

use thiserror::Error;

/// Result type for fitting operations
pub type Result<T> = std::result::Result<T, FittingError>;

/// Errors that can occur while configuring or running a fit
#[derive(Error, Debug)]
pub enum FittingError {
    /// Optimisation method name not recognised
    #[error("Unknown optimisation method '{0}'")]
    UnknownMethod(String),

    /// Configuration is inconsistent with the inputs
    #[error("Invalid fit configuration: {0}")]
    InvalidConfig(String),

    /// The derivative-free search backend failed
    #[error("Optimiser failure: {0}")]
    Optimizer(String),

    /// Error from the spectrum module
    #[error("Spectrum error: {0}")]
    Spectrum(#[from] crate::spectrum::SpectrumError),

    /// Error from the model module
    #[error("Model error: {0}")]
    Model(#[from] crate::model::ModelError),

    /// Error from the linear algebra utilities
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] crate::utils::UtilsError),
}

impl From<argmin::core::Error> for FittingError {
    fn from(err: argmin::core::Error) -> Self {
        FittingError::Optimizer(err.to_string())
    }
}
