//! Asset correlation matrix.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::error::{CoreError, CoreResult};

/// Tolerance for symmetry and unit-diagonal checks.
const CORRELATION_TOLERANCE: f64 = 1e-9;

/// Dense, symmetric correlation matrix indexed by asset identifier.
///
/// The identifier-to-index map is fixed at construction; every pairwise
/// lookup is a hash lookup followed by a dense matrix read.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    values: DMatrix<f64>,
}

impl CorrelationMatrix {
    /// Creates a correlation matrix from labels and a square matrix.
    ///
    /// Validates squareness, unique labels, finiteness, range `[-1, 1]`,
    /// symmetry and a unit diagonal.
    pub fn new(labels: Vec<String>, values: DMatrix<f64>) -> CoreResult<Self> {
        let n = labels.len();
        if values.nrows() != n || values.ncols() != n {
            return Err(CoreError::invalid_correlation(format!(
                "{} labels but matrix is {}x{}",
                n,
                values.nrows(),
                values.ncols()
            )));
        }

        let mut index = HashMap::with_capacity(n);
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(CoreError::invalid_correlation(format!(
                    "duplicate label '{}'",
                    label
                )));
            }
        }

        for i in 0..n {
            for j in 0..n {
                let value = values[(i, j)];
                if !value.is_finite() || value.abs() > 1.0 + CORRELATION_TOLERANCE {
                    return Err(CoreError::invalid_correlation(format!(
                        "entry ({}, {}) = {} is outside [-1, 1]",
                        labels[i], labels[j], value
                    )));
                }
                if (value - values[(j, i)]).abs() > CORRELATION_TOLERANCE {
                    return Err(CoreError::invalid_correlation(format!(
                        "not symmetric at ({}, {})",
                        labels[i], labels[j]
                    )));
                }
            }
            if (values[(i, i)] - 1.0).abs() > CORRELATION_TOLERANCE {
                return Err(CoreError::invalid_correlation(format!(
                    "diagonal entry for '{}' is {}, expected 1",
                    labels[i],
                    values[(i, i)]
                )));
            }
        }

        Ok(Self {
            labels,
            index,
            values,
        })
    }

    /// Creates a correlation matrix from row vectors.
    pub fn from_rows(labels: Vec<String>, rows: &[Vec<f64>]) -> CoreResult<Self> {
        let n = labels.len();
        if rows.len() != n {
            return Err(CoreError::invalid_correlation(format!(
                "{} labels but {} rows",
                n,
                rows.len()
            )));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != n) {
            return Err(CoreError::invalid_correlation(format!(
                "row has {} columns, expected {}",
                row.len(),
                n
            )));
        }
        let values = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::new(labels, values)
    }

    /// Identity correlation (uncorrelated assets).
    #[must_use]
    pub fn identity(labels: Vec<String>) -> Self {
        let n = labels.len();
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Self {
            labels,
            index,
            values: DMatrix::identity(n, n),
        }
    }

    /// Asset identifiers in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of assets covered.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the matrix covers no assets.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// True if the asset has a row and column.
    pub fn contains(&self, asset: &str) -> bool {
        self.index.contains_key(asset)
    }

    /// Row index of an asset.
    pub fn index_of(&self, asset: &str) -> Option<usize> {
        self.index.get(asset).copied()
    }

    /// Correlation between two assets.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.values[(i, j)])
    }

    /// Extracts the sub-matrix for `assets`, in the order given.
    pub fn restricted_to<S: AsRef<str>>(&self, assets: &[S]) -> CoreResult<DMatrix<f64>> {
        let indices = assets
            .iter()
            .map(|asset| {
                self.index_of(asset.as_ref())
                    .ok_or_else(|| CoreError::MissingCorrelation {
                        asset: asset.as_ref().to_string(),
                    })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let n = indices.len();
        Ok(DMatrix::from_fn(n, n, |i, j| {
            self.values[(indices[i], indices[j])]
        }))
    }
}
