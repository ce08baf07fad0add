use crate::error::{FtrlErr, Result};

/// A sparse row-major matrix in compressed sparse row layout.
///
/// The nonzero entries of row `i` live at `indptr[i]..indptr[i + 1]` of
/// `indices` (their columns) and `data` (their values).
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl CsrMatrix {
    /// Creates a new `CsrMatrix` from its raw parts.
    ///
    /// Values aren't checked here, non-finite values are rejected by the engine
    /// before a batch touches the model's state.
    ///
    /// # Returns
    /// An `InvalidInput` error if the parts don't describe a valid matrix.
    pub fn new(
        nrows: usize,
        ncols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f32>,
    ) -> Result<Self> {
        let invalid = |reason: String| -> Result<Self> { Err(FtrlErr::InvalidInput(reason)) };

        if indptr.len() != nrows + 1 {
            return invalid(format!(
                "indptr has {} entries, expected {}",
                indptr.len(),
                nrows + 1
            ));
        }

        if indices.len() != data.len() {
            return invalid(format!(
                "{} column indices for {} values",
                indices.len(),
                data.len()
            ));
        }

        if indptr[0] != 0 || indptr[nrows] != data.len() {
            return invalid("indptr must start at 0 and end at the amount of nonzeros".into());
        }

        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return invalid("indptr must be non-decreasing".into());
        }

        if let Some(&col) = indices.iter().find(|&&col| col >= ncols) {
            return invalid(format!("column index {col} out of bounds for {ncols} columns"));
        }

        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        })
    }

    /// Creates a new `CsrMatrix` from a list of rows of `(column, value)` entries.
    ///
    /// # Arguments
    /// * `ncols` - The amount of columns of the matrix.
    /// * `rows` - The nonzero entries of every row.
    pub fn from_rows<R>(ncols: usize, rows: R) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = (usize, f32)>,
    {
        let mut indptr = vec![0];
        let mut indices = Vec::new();
        let mut data = Vec::new();

        for row in rows {
            for (col, value) in row {
                indices.push(col);
                data.push(value);
            }

            indptr.push(indices.len());
        }

        Self::new(indptr.len() - 1, ncols, indptr, indices, data)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// The amount of stored entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Iterates the `(column, value)` entries of a row.
    ///
    /// # Panics
    /// If `row` is out of bounds.
    pub fn row(&self, row: usize) -> impl ExactSizeIterator<Item = (usize, f32)> + '_ {
        let range = self.indptr[row]..self.indptr[row + 1];

        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    /// Whether every stored value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
