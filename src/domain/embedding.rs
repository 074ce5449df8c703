// ============================================================
// Layer 3 — Embedding Matrices
// ============================================================
// EmbeddingMatrix   — row-major [rows, dim] f32 matrix, grows
//                     by appending rows along the sample axis
// PairedEmbeddings  — interleaved matrix of 2N rows where rows
//                     2k and 2k+1 are view 0 and view 1 of the
//                     same sample, plus one identifier per row
//
// Interleaving contract:
//   row 2k     → sample k, view 0
//   row 2k + 1 → sample k, view 1
//
// Clustering and scoring work on the first-view subsequence,
// obtained by stride-2 selection (rows 0, 2, 4, ...).

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    dim:  usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// An empty accumulator of shape [0, dim].
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    /// Build from a flat row-major buffer.
    pub fn from_flat(dim: usize, data: Vec<f32>) -> EvalResult<Self> {
        if dim == 0 {
            return Err(EvalError::InvalidParameter {
                name:    "dim",
                message: "must be at least 1".to_string(),
            });
        }
        if data.len() % dim != 0 {
            return Err(EvalError::ShapeMismatch {
                context:  "flat embedding buffer",
                expected: dim,
                found:    data.len() % dim,
            });
        }
        Ok(Self { dim, data })
    }

    /// Build from one Vec per row; all rows must share a length.
    pub fn from_rows(rows: &[Vec<f32>]) -> EvalResult<Self> {
        let first = rows.first().ok_or(EvalError::EmptyInput)?;
        let dim = first.len();
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(EvalError::DimensionMismatch { expected: dim, found: row.len() });
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(dim, data)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_rows(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.n_rows(), self.dim]
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim.max(1))
    }

    /// Owned copy in the `&[Vec<f32>]` form the clustering code takes.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    /// Append a flat row-major block of rows.
    pub fn append(&mut self, block: &[f32]) -> EvalResult<()> {
        if self.dim == 0 {
            return Err(EvalError::InvalidParameter {
                name:    "dim",
                message: "cannot append to a zero-width matrix".to_string(),
            });
        }
        if block.len() % self.dim != 0 {
            return Err(EvalError::ShapeMismatch {
                context:  "appended block",
                expected: self.dim,
                found:    block.len() % self.dim,
            });
        }
        self.data.extend_from_slice(block);
        Ok(())
    }

    /// Gather the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.dim);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self { dim: self.dim, data }
    }

    /// Stride-2 selection: rows 0, 2, 4, ...
    ///
    /// Fails with `InvalidShape` when the row count is odd, since the
    /// matrix then cannot be an interleaved view-pair matrix.
    pub fn first_views(&self) -> EvalResult<Self> {
        let rows = self.n_rows();
        if rows % 2 != 0 {
            return Err(EvalError::InvalidShape { rows });
        }
        let even: Vec<usize> = (0..rows).step_by(2).collect();
        Ok(self.select_rows(&even))
    }
}

/// Interleaved view-pair embeddings with one identifier per row.
#[derive(Debug, Clone)]
pub struct PairedEmbeddings {
    matrix: EmbeddingMatrix,
    ids:    Vec<String>,
}

impl PairedEmbeddings {
    pub fn new(dim: usize) -> Self {
        Self { matrix: EmbeddingMatrix::new(dim), ids: Vec::new() }
    }

    /// Interleave one batch of view-0 and view-1 vectors.
    ///
    /// `view_0` and `view_1` are flat [batch, dim] buffers; `ids` has one
    /// identifier per sample. Each sample contributes two adjacent rows and
    /// its identifier twice.
    pub fn push_pairs(&mut self, view_0: &[f32], view_1: &[f32], ids: &[String]) -> EvalResult<()> {
        let dim = self.matrix.dim();
        if view_0.len() != view_1.len() {
            return Err(EvalError::ShapeMismatch {
                context:  "view pair batch",
                expected: view_0.len() / dim.max(1),
                found:    view_1.len() / dim.max(1),
            });
        }
        if view_0.len() != ids.len() * dim {
            return Err(EvalError::ShapeMismatch {
                context:  "identifiers per batch",
                expected: view_0.len() / dim.max(1),
                found:    ids.len(),
            });
        }

        let mut block = Vec::with_capacity(view_0.len() * 2);
        for (a, b) in view_0.chunks_exact(dim).zip(view_1.chunks_exact(dim)) {
            block.extend_from_slice(a);
            block.extend_from_slice(b);
        }
        self.push_interleaved(&block, ids)
    }

    /// Append a block that is already interleaved: rows 2k and 2k+1 are the
    /// two views of `ids[k]`.
    pub fn push_interleaved(&mut self, block: &[f32], ids: &[String]) -> EvalResult<()> {
        let expected = ids.len() * 2 * self.matrix.dim();
        if block.len() != expected {
            return Err(EvalError::ShapeMismatch {
                context:  "interleaved block",
                expected,
                found:    block.len(),
            });
        }
        self.matrix.append(block)?;
        for id in ids {
            self.ids.push(id.clone());
            self.ids.push(id.clone());
        }
        Ok(())
    }

    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.n_rows() / 2
    }

    /// One representative (view 0) per sample, with matching identifiers.
    pub fn first_views(&self) -> EvalResult<(EmbeddingMatrix, Vec<String>)> {
        let matrix = self.matrix.first_views()?;
        let ids = self.ids.iter().step_by(2).cloned().collect();
        Ok((matrix, ids))
    }

    pub fn into_parts(self) -> (EmbeddingMatrix, Vec<String>) {
        (self.matrix, self.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_views_takes_even_rows() {
        let m = EmbeddingMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 2.0],
            vec![3.0, 3.0],
        ])
        .unwrap();
        let first = m.first_views().unwrap();
        assert_eq!(first.n_rows(), 2);
        assert_eq!(first.row(0), &[0.0, 0.0]);
        assert_eq!(first.row(1), &[2.0, 2.0]);
    }

    #[test]
    fn test_first_views_rejects_odd_rows() {
        let m = EmbeddingMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        assert!(matches!(m.first_views(), Err(EvalError::InvalidShape { rows: 3 })));
    }

    #[test]
    fn test_push_pairs_interleaves_views() {
        let mut p = PairedEmbeddings::new(2);
        p.push_pairs(&[1.0, 1.0, 2.0, 2.0], &[-1.0, -1.0, -2.0, -2.0], &ids(&["a", "b"]))
            .unwrap();
        p.push_pairs(&[3.0, 3.0], &[-3.0, -3.0], &ids(&["c"])).unwrap();

        assert_eq!(p.matrix().shape(), [6, 2]);
        assert_eq!(p.matrix().row(0), &[1.0, 1.0]);
        assert_eq!(p.matrix().row(1), &[-1.0, -1.0]);
        assert_eq!(p.matrix().row(4), &[3.0, 3.0]);
        assert_eq!(p.matrix().row(5), &[-3.0, -3.0]);

        for k in 0..p.n_samples() {
            assert_eq!(p.ids()[2 * k], p.ids()[2 * k + 1]);
        }

        let (first, first_ids) = p.first_views().unwrap();
        assert_eq!(first.n_rows(), 3);
        assert_eq!(first_ids, ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_push_pairs_rejects_unequal_views() {
        let mut p = PairedEmbeddings::new(1);
        let err = p.push_pairs(&[1.0, 2.0], &[1.0], &ids(&["a", "b"])).unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_append_rejects_ragged_block() {
        let mut m = EmbeddingMatrix::new(3);
        assert!(m.append(&[1.0, 2.0]).is_err());
        assert!(m.append(&[1.0, 2.0, 3.0]).is_ok());
        assert_eq!(m.n_rows(), 1);
    }
}
