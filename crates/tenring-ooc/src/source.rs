//! Storage adapter: uniform fiber access for in-memory and on-disk tensors
//!
//! The sampled solver only ever needs two things from the data tensor:
//! mode-`n` fibers at sampled multi-indices, and (optionally) the whole
//! tensor for an error check. [`TensorSource`] exposes exactly that, with
//! two implementations:
//!
//! - [`DenseND<f64>`]: direct gather from flat storage using row-major strides
//! - [`DiskSource`]: slab reads from a binary tensor file, `num_increments`
//!   contiguous ranges along the target mode at a time
//!
//! Both paths copy raw values, so for the same sample indices they return
//! bit-identical fiber blocks.

use crate::chunking::ModeChunks;
use crate::error::{StorageError, StorageResult};
use crate::mmap_io::MmapTensor;
use crate::tracing_support::record_slab_read;
use scirs2_core::ndarray_ext::{Array2, ArrayView2};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tenring_core::{DenseND, LinearIndexer};

/// Read access to an N-way `f64` tensor
pub trait TensorSource {
    /// Shape `(sz_0, …, sz_{N-1})`, available without loading data
    fn shape(&self) -> &[usize];

    /// Number of modes
    fn n_modes(&self) -> usize {
        self.shape().len()
    }

    /// Fetch one full mode-`mode` fiber per sample row
    ///
    /// `samples` has shape `(J, N)`; column `mode` is ignored. Row `j` of the
    /// `(J, sz_mode)` result holds `X[s_j0, …, :, …, s_j(N-1)]`.
    ///
    /// `num_increments` bounds how the data is read (`0` = one read); it
    /// never changes the returned values.
    fn fetch_mode_fibers(
        &self,
        mode: usize,
        samples: ArrayView2<'_, usize>,
        num_increments: usize,
    ) -> StorageResult<Array2<f64>>;

    /// Materialise the full tensor
    ///
    /// Fails with [`StorageError::OutOfMemory`] when the tensor does not fit.
    fn read_full(&self) -> StorageResult<Cow<'_, DenseND<f64>>>;
}

/// Validate a `(J, N)` sample block against `shape` for a fetch along `mode`
pub fn validate_samples(
    shape: &[usize],
    mode: usize,
    samples: &ArrayView2<'_, usize>,
) -> StorageResult<()> {
    let n_modes = shape.len();
    if mode >= n_modes {
        return Err(StorageError::InvalidMode { mode, n_modes });
    }
    if samples.ncols() != n_modes {
        return Err(StorageError::ShapeMismatch(format!(
            "sample block has {} columns, tensor has {} modes",
            samples.ncols(),
            n_modes
        )));
    }
    for (j, row) in samples.outer_iter().enumerate() {
        for (m, (&idx, &dim)) in row.iter().zip(shape).enumerate() {
            if m != mode && idx >= dim {
                return Err(StorageError::IndexOutOfBounds(format!(
                    "sample {} has index {} on mode {} of size {}",
                    j, idx, m, dim
                )));
            }
        }
    }
    Ok(())
}

/// Gather fibers of `data` (row-major, `indexer.shape()`) into columns
/// `col_offset..col_offset + indexer.shape()[mode]` of `out`
fn gather_fibers(
    data: &[f64],
    indexer: &LinearIndexer,
    mode: usize,
    samples: &ArrayView2<'_, usize>,
    out: &mut Array2<f64>,
    col_offset: usize,
) -> StorageResult<()> {
    let stride = indexer.stride(mode);
    let width = indexer.shape()[mode];
    let mut index = vec![0; indexer.shape().len()];

    for (j, row) in samples.outer_iter().enumerate() {
        for (slot, &v) in index.iter_mut().zip(row.iter()) {
            *slot = v;
        }
        index[mode] = 0;
        let base = indexer.fiber_base(mode, &index).ok_or_else(|| {
            StorageError::IndexOutOfBounds(format!("sample {} outside {:?}", j, indexer.shape()))
        })?;
        for k in 0..width {
            out[[j, col_offset + k]] = data[base + k * stride];
        }
    }
    Ok(())
}

impl TensorSource for DenseND<f64> {
    fn shape(&self) -> &[usize] {
        DenseND::shape(self)
    }

    fn fetch_mode_fibers(
        &self,
        mode: usize,
        samples: ArrayView2<'_, usize>,
        _num_increments: usize,
    ) -> StorageResult<Array2<f64>> {
        validate_samples(DenseND::shape(self), mode, &samples)?;

        let indexer = LinearIndexer::new(DenseND::shape(self));
        let mut out = Array2::<f64>::zeros((samples.nrows(), indexer.shape()[mode]));
        gather_fibers(self.as_slice(), &indexer, mode, &samples, &mut out, 0)?;
        Ok(out)
    }

    fn read_full(&self) -> StorageResult<Cow<'_, DenseND<f64>>> {
        Ok(Cow::Borrowed(self))
    }
}

/// Tensor stored in a binary tensor file
///
/// Only the path and shape are kept; every fetch re-opens the file, so a
/// container that disappears or becomes unreadable mid-run surfaces as
/// [`StorageError::Io`] on the next access.
#[derive(Debug, Clone)]
pub struct DiskSource {
    path: PathBuf,
    shape: Vec<usize>,
}

impl DiskSource {
    /// Open a tensor file and record its shape
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let mapped = MmapTensor::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), shape = ?mapped.shape(), "opened disk tensor");
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            shape: mapped.shape().to_vec(),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reopen(&self) -> StorageResult<MmapTensor> {
        let mapped = MmapTensor::open(&self.path)?;
        if mapped.shape() != self.shape.as_slice() {
            return Err(StorageError::ShapeMismatch(format!(
                "{} changed shape from {:?} to {:?}",
                self.path.display(),
                self.shape,
                mapped.shape()
            )));
        }
        Ok(mapped)
    }
}

impl TensorSource for DiskSource {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[tracing::instrument(level = "debug", skip(self, samples), fields(rows = samples.nrows()))]
    fn fetch_mode_fibers(
        &self,
        mode: usize,
        samples: ArrayView2<'_, usize>,
        num_increments: usize,
    ) -> StorageResult<Array2<f64>> {
        validate_samples(&self.shape, mode, &samples)?;

        let mapped = self.reopen()?;
        let mut out = Array2::<f64>::zeros((samples.nrows(), self.shape[mode]));

        for range in ModeChunks::split(self.shape[mode], num_increments).iter() {
            let started = Instant::now();
            let slab = mapped.read_mode_range(mode, range.start, range.end)?;
            record_slab_read(
                &self.path,
                mode,
                range.clone(),
                slab.len() * std::mem::size_of::<f64>(),
                started.elapsed(),
            );

            let local = LinearIndexer::new(slab.shape());
            gather_fibers(slab.as_slice(), &local, mode, &samples, &mut out, range.start)?;
        }

        Ok(out)
    }

    fn read_full(&self) -> StorageResult<Cow<'_, DenseND<f64>>> {
        let mapped = self.reopen()?;
        Ok(Cow::Owned(mapped.to_dense()?))
    }
}
