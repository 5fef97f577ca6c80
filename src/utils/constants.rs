/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Physical constants used when building spectral axes

/// Gyromagnetic ratio of 1H in MHz/T
pub const H1_GAMMA: f64 = 42.576;

/// Chemical shift of the water resonance relative to TMS in ppm
pub const H2O_PPM_TO_TMS: f64 = 4.65;

/// Default 1H ppm range used when a spectral sub-window is needed but not given
pub const H1_PPM_RANGE: (f64, f64) = (0.2, 4.2);

/// Default 31P ppm range
pub const P31_PPM_RANGE: (f64, f64) = (-20.0, 10.0);
