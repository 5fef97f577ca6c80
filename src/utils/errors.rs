/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Error types for the utils module

use thiserror::Error;

/// Errors that can occur in the utils module
#[derive(Error, Debug)]
pub enum UtilsError {
    /// Math-related errors
    #[error("Math error: {0}")]
    Math(String),

    /// Matrix or vector shapes do not agree
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A linear system could not be solved
    #[error("Singular matrix: {0}")]
    Singular(String),
}

/// A specialized Result type for utils operations
pub type Result<T> = std::result::Result<T, UtilsError>;
