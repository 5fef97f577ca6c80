/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Metabolite basis sets and group assignments

use super::errors::{Result, SpectrumError};
use super::Spectrum;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Per-entry metadata carried through fitting untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasisHeader {
    /// Spectrometer frequency of the simulation in MHz
    pub central_frequency: f64,
    /// Spectral width of the simulation in Hz
    pub bandwidth: f64,
    /// Intrinsic line width in Hz, when known
    pub fwhm: Option<f64>,
    /// Echo time of the simulated sequence in seconds
    pub echo_time: Option<f64>,
}

/// Ordered collection of named time-domain metabolite signals
///
/// Signals are stored column-wise: `fids[(t, j)]` is sample `t` of entry `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisSet {
    fids: Array2<Complex64>,
    names: Vec<String>,
    headers: Vec<BasisHeader>,
}

impl BasisSet {
    /// Create a basis set from a (points x entries) matrix
    ///
    /// An empty `headers` vector is accepted and filled with defaults.
    pub fn new(
        fids: Array2<Complex64>,
        names: Vec<String>,
        headers: Vec<BasisHeader>,
    ) -> Result<Self> {
        if fids.nrows() == 0 || fids.ncols() == 0 {
            return Err(SpectrumError::EmptySignal);
        }
        if names.len() != fids.ncols() {
            return Err(SpectrumError::LengthMismatch {
                expected: fids.ncols(),
                found: names.len(),
            });
        }
        let headers = if headers.is_empty() {
            vec![BasisHeader::default(); names.len()]
        } else if headers.len() != names.len() {
            return Err(SpectrumError::LengthMismatch {
                expected: names.len(),
                found: headers.len(),
            });
        } else {
            headers
        };
        Ok(Self {
            fids,
            names,
            headers,
        })
    }

    /// Create a basis set from one signal per entry
    pub fn from_columns(columns: Vec<Array1<Complex64>>, names: Vec<String>) -> Result<Self> {
        let n_points = columns.first().map(|c| c.len()).ok_or(SpectrumError::EmptySignal)?;
        let mut fids = Array2::<Complex64>::zeros((n_points, columns.len()));
        for (j, col) in columns.iter().enumerate() {
            if col.len() != n_points {
                return Err(SpectrumError::LengthMismatch {
                    expected: n_points,
                    found: col.len(),
                });
            }
            fids.column_mut(j).assign(col);
        }
        Self::new(fids, names, Vec::new())
    }

    pub fn fids(&self) -> &Array2<Complex64> {
        &self.fids
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn headers(&self) -> &[BasisHeader] {
        &self.headers
    }

    pub fn num_basis(&self) -> usize {
        self.names.len()
    }

    pub fn num_points(&self) -> usize {
        self.fids.nrows()
    }

    /// Signal of entry `j`
    pub fn column(&self, j: usize) -> ArrayView1<'_, Complex64> {
        self.fids.column(j)
    }

    /// Position of a named entry
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Sub-basis with the named entries in the requested order
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let mut idx = Vec::with_capacity(names.len());
        for name in names {
            idx.push(self.index_of(name).ok_or_else(|| {
                SpectrumError::InvalidParameter(format!("basis has no entry named '{}'", name))
            })?);
        }
        let fids = self.fids.select(Axis(1), &idx);
        let headers = idx.iter().map(|&i| self.headers[i].clone()).collect();
        Self::new(
            fids,
            names.iter().map(|s| s.to_string()).collect(),
            headers,
        )
    }

    /// Ensure the basis can model `spectrum`
    pub fn check_compatible(&self, spectrum: &Spectrum) -> Result<()> {
        if self.num_points() != spectrum.num_points() {
            return Err(SpectrumError::LengthMismatch {
                expected: spectrum.num_points(),
                found: self.num_points(),
            });
        }
        Ok(())
    }
}

/// Assignment of each basis entry to a line-shape group
///
/// Entries in the same group share broadening and shift parameters. Ids are
/// contiguous integers from zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetabGroups(Vec<usize>);

impl MetabGroups {
    /// Validate a group labelling for `n_basis` entries
    pub fn new(groups: Vec<usize>, n_basis: usize) -> Result<Self> {
        if groups.len() != n_basis {
            return Err(SpectrumError::InvalidGroups(format!(
                "{} group ids given for {} basis entries",
                groups.len(),
                n_basis
            )));
        }
        let n_groups = groups.iter().max().map_or(0, |m| m + 1);
        let mut seen = vec![false; n_groups];
        for &g in &groups {
            seen[g] = true;
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(SpectrumError::InvalidGroups(format!(
                "group ids must be contiguous, id {} is unused",
                missing
            )));
        }
        Ok(Self(groups))
    }

    /// Every entry in group 0
    pub fn single(n_basis: usize) -> Self {
        Self(vec![0; n_basis])
    }

    /// Group 0 for all entries except the named ones, which each get their own group
    ///
    /// When every entry is named the shared group would be empty, so the
    /// separate groups are numbered from 0 instead.
    pub fn from_names(names: &[String], separate: &[&str]) -> Self {
        let mut next = 1;
        let mut groups = vec![0; names.len()];
        for sep in separate {
            if let Some(i) = names.iter().position(|n| n == sep) {
                if groups[i] == 0 {
                    groups[i] = next;
                    next += 1;
                }
            }
        }
        if !groups.contains(&0) {
            groups.iter_mut().for_each(|g| *g -= 1);
        }
        Self(groups)
    }

    /// Number of distinct groups, `max(id) + 1`
    pub fn num_groups(&self) -> usize {
        self.0.iter().max().map_or(0, |m| m + 1)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_basis() -> BasisSet {
        let cols = vec![
            Array1::from_elem(8, Complex64::new(1.0, 0.0)),
            Array1::from_elem(8, Complex64::new(0.0, 1.0)),
            Array1::from_elem(8, Complex64::new(2.0, 0.0)),
        ];
        BasisSet::from_columns(cols, vec!["NAA".into(), "Cr".into(), "PCr".into()]).unwrap()
    }

    #[test]
    fn test_select_keeps_requested_order() {
        let b = toy_basis();
        let sub = b.select(&["PCr", "NAA"]).unwrap();
        assert_eq!(sub.names(), &["PCr".to_string(), "NAA".to_string()]);
        assert_eq!(sub.column(0)[0], Complex64::new(2.0, 0.0));
        assert!(b.select(&["GABA"]).is_err());
    }

    #[test]
    fn test_header_count_mismatch() {
        let fids = Array2::<Complex64>::zeros((4, 2));
        let err = BasisSet::new(fids, vec!["a".into(), "b".into()], vec![BasisHeader::default()]);
        assert!(err.is_err());
    }

    #[test]
    fn test_groups_must_be_contiguous() {
        assert!(MetabGroups::new(vec![0, 2, 2], 3).is_err());
        assert!(MetabGroups::new(vec![0, 1], 3).is_err());
        let g = MetabGroups::new(vec![0, 1, 1], 3).unwrap();
        assert_eq!(g.num_groups(), 2);
        assert_eq!(MetabGroups::single(4).num_groups(), 1);
    }

    #[test]
    fn test_groups_from_names() {
        let b = toy_basis();
        let g = MetabGroups::from_names(b.names(), &["Cr"]);
        assert_eq!(g.as_slice(), &[0, 1, 0]);
    }

    #[test]
    fn test_groups_from_names_stay_contiguous() {
        let names = vec!["Cr".to_string()];
        let g = MetabGroups::from_names(&names, &["Cr"]);
        assert_eq!(g.as_slice(), &[0]);
        assert_eq!(g.num_groups(), 1);

        let names: Vec<String> = ["Cr", "NAA"].iter().map(|s| s.to_string()).collect();
        let g = MetabGroups::from_names(&names, &["NAA", "Cr", "NAA"]);
        assert_eq!(g.as_slice(), &[1, 0]);
        assert_eq!(MetabGroups::new(g.as_slice().to_vec(), 2).unwrap(), g);
    }
}
