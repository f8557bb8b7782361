use std::collections::BTreeMap;
use std::fmt;

use crate::ClusterError;

/// Sparse N×N matrix of pairwise distances.
///
/// Only populated cells are stored; an absent cell means "no recorded
/// distance", never zero. Rows are kept as ordered column maps so iteration
/// is deterministic.
#[derive(Clone, Default, PartialEq)]
pub struct DistanceMatrix {
    dim: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl DistanceMatrix {
    /// Creates an empty `dim`×`dim` matrix.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: vec![BTreeMap::new(); dim],
        }
    }

    /// Builds a matrix from parallel coordinate arrays.
    ///
    /// When the same ordered cell appears more than once the last value wins.
    pub fn from_triplets(
        dim: usize,
        rows: &[usize],
        cols: &[usize],
        values: &[f64],
    ) -> Result<Self, ClusterError> {
        if rows.len() != cols.len() || rows.len() != values.len() {
            return Err(ClusterError::InvalidMatrix(format!(
                "triplet lengths differ: rows={}, cols={}, values={}",
                rows.len(),
                cols.len(),
                values.len()
            )));
        }
        let mut m = Self::new(dim);
        for ((&i, &j), &v) in rows.iter().zip(cols).zip(values) {
            m.set(i, j, v)?;
        }
        Ok(m)
    }

    /// Sets a single cell.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<(), ClusterError> {
        if i >= self.dim || j >= self.dim {
            return Err(ClusterError::InvalidMatrix(format!(
                "cell ({i}, {j}) out of bounds for dimension {}",
                self.dim
            )));
        }
        self.rows[i].insert(j, value);
        Ok(())
    }

    /// Mirrors every populated cell so that `M[i][j] == M[j][i]`.
    ///
    /// Runs over a snapshot of all cells, so it must be called once after
    /// loading. Where both directions were recorded with different values,
    /// both cells take the smaller distance.
    pub fn symmetrize(&mut self) {
        let mut out = vec![BTreeMap::new(); self.dim];
        for (i, row) in self.rows.iter().enumerate() {
            for (&j, &v) in row {
                let value = match self.rows[j].get(&i) {
                    Some(&w) => v.min(w),
                    None => v,
                };
                out[i].insert(j, value);
                out[j].insert(i, value);
            }
        }
        self.rows = out;
    }

    /// Returns the number of rows (and columns).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns true for a 0×0 matrix.
    pub fn is_empty(&self) -> bool {
        self.dim == 0
    }

    /// Returns the number of populated cells.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }

    /// Returns the value of a populated cell.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.rows.get(i).and_then(|r| r.get(&j)).copied()
    }

    /// Iterates the populated cells of row `i` in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows
            .get(i)
            .into_iter()
            .flat_map(|r| r.iter().map(|(&j, &v)| (j, v)))
    }

    /// Iterates every populated cell as `(row, col, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, r)| r.iter().map(move |(&j, &v)| (i, j, v)))
    }

    /// Reports whether every populated cell has an equal mirror.
    pub fn is_symmetric(&self) -> bool {
        self.iter().all(|(i, j, v)| self.get(j, i) == Some(v))
    }
}

impl fmt::Debug for DistanceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistanceMatrix")
            .field("dim", &self.dim)
            .field("nnz", &self.nnz())
            .finish()
    }
}
