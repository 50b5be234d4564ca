//! Multi-index ↔ linear-index mapping
//!
//! Row-major (C order) stride arithmetic shared by the in-memory gather and
//! the chunked on-disk reader. All indices are 0-based.
//!
//! # Examples
//!
//! ```
//! use tenring_core::LinearIndexer;
//!
//! let idx = LinearIndexer::new(&[2, 3, 4]);
//! assert_eq!(idx.strides(), &[12, 4, 1]);
//! assert_eq!(idx.linear(&[1, 0, 2]), Some(14));
//! assert_eq!(idx.multi(14), Some(vec![1, 0, 2]));
//! ```

/// Row-major index mapper for a fixed shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearIndexer {
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl LinearIndexer {
    /// Build the mapper for `shape`
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            strides: row_major_strides(shape),
        }
    }

    /// Shape this mapper was built for
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major strides (elements, not bytes)
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Stride of a single mode
    pub fn stride(&self, mode: usize) -> usize {
        self.strides[mode]
    }

    /// Number of addressable elements
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the shape contains a zero-sized mode
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear offset of a multi-index, `None` when out of bounds
    pub fn linear(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &dim), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            if i >= dim {
                return None;
            }
            offset += i * stride;
        }
        Some(offset)
    }

    /// Multi-index of a linear offset, `None` when out of bounds
    pub fn multi(&self, linear: usize) -> Option<Vec<usize>> {
        if linear >= self.len() {
            return None;
        }
        let mut remaining = linear;
        let mut index = vec![0; self.shape.len()];
        for mode in (0..self.shape.len()).rev() {
            index[mode] = remaining % self.shape[mode];
            remaining /= self.shape[mode];
        }
        Some(index)
    }

    /// Offset of the first element of the mode-`mode` fiber through `index`
    ///
    /// `index[mode]` is ignored; the remaining fiber elements live at
    /// `base + k * stride(mode)` for `k in 0..shape[mode]`.
    pub fn fiber_base(&self, mode: usize, index: &[usize]) -> Option<usize> {
        if mode >= self.shape.len() || index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (m, (&i, (&dim, &stride))) in index
            .iter()
            .zip(self.shape.iter().zip(&self.strides))
            .enumerate()
        {
            if m == mode {
                continue;
            }
            if i >= dim {
                return None;
            }
            offset += i * stride;
        }
        Some(offset)
    }
}

/// Row-major strides for `shape`
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for mode in (0..shape.len().saturating_sub(1)).rev() {
        strides[mode] = strides[mode + 1] * shape[mode + 1];
    }
    strides
}
