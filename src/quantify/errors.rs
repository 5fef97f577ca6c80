/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the quantify module

use thiserror::Error;

/// Result type for quantification operations
pub type Result<T> = std::result::Result<T, QuantError>;

/// Errors that can occur while converting raw concentrations to physical units
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantError {
    /// A reference metabolite is not in the basis set
    #[error("Reference metabolite '{0}' is not a recognised metabolite")]
    ReferenceNotFound(String),

    /// No stored T2 preset for the field strength (T)
    #[error("No stored T2 values for a {0:.2}T scanner, specify values manually")]
    UnsupportedFieldStrength(f64),

    /// A scaling was requested before it was computed
    #[error("The '{0}' scaling has not been computed")]
    ScalingNotComputed(&'static str),

    /// A T2 dictionary lacks a required key
    #[error("Missing T2 value for '{0}'")]
    MissingT2Value(String),

    /// Tissue volume fractions are outside their physical range
    #[error("Invalid tissue fractions: {0}")]
    InvalidTissueFractions(String),

    /// An integrated peak area vanished
    #[error("Zero {0} area, cannot scale")]
    ZeroArea(String),

    /// The summed reference concentration is zero
    #[error("Reference concentration of {0} is zero")]
    ZeroReference(String),

    /// Error from the spectrum module
    #[error("Spectrum error: {0}")]
    Spectrum(#[from] crate::spectrum::SpectrumError),
}
