/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Utility functions shared across the fitting and quantification code

pub mod constants;
pub mod errors;
pub mod linear_algebra;
pub mod math;

pub use errors::{Result, UtilsError};
pub use linear_algebra::{inverse, lstsq, solve};
pub use math::{linspace, trapz};
