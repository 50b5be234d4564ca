//! Memory-mapped tensor I/O
//!
//! Binary tensor files are the persistent-storage container read by
//! [`crate::DiskSource`]. A file holds a single named-by-path `f64` tensor.
//!
//! # Binary Format
//!
//! - Magic bytes: "TRNG" (4 bytes)
//! - Version: u32 (4 bytes)
//! - Rank: u32 (4 bytes)
//! - Padding: 4 bytes (for 8-byte alignment)
//! - Shape: [u64; rank] (8 * rank bytes)
//! - Data: [f64; product(shape)] little-endian, row-major
//!
//! # Example
//!
//! ```ignore
//! use tenring_core::DenseND;
//! use tenring_ooc::mmap_io::{MmapTensor, write_tensor_binary};
//!
//! let tensor = DenseND::<f64>::zeros(&[100, 100, 100]);
//! write_tensor_binary("large_tensor.bin", &tensor)?;
//!
//! let mapped = MmapTensor::open("large_tensor.bin")?;
//! // Slab 10..20 along mode 1, all other modes full
//! let slab = mapped.read_mode_range(1, 10, 20)?;
//! assert_eq!(slab.shape(), &[100, 10, 100]);
//! ```

use crate::error::{try_buffer, StorageError, StorageResult};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tenring_core::DenseND;

/// Magic bytes for tensor binary format
const MAGIC: &[u8; 4] = b"TRNG";

/// Current binary format version
const VERSION: u32 = 1;

/// Offset of the shape table (after magic, version, rank and padding)
const SHAPE_OFFSET: usize = 16;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Memory-mapped read-only tensor
///
/// The header is validated on open; element reads decode little-endian
/// bytes so no alignment requirement is placed on the mapping.
#[derive(Debug)]
pub struct MmapTensor {
    mmap: Mmap,
    path: PathBuf,
    shape: Vec<usize>,
    data_offset: usize,
}

impl MmapTensor {
    /// Open a memory-mapped tensor from a binary file
    ///
    /// # Errors
    ///
    /// - [`StorageError::Io`] if the file cannot be opened or mapped
    /// - [`StorageError::InvalidFormat`] for bad magic, version or truncated data
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| StorageError::io(&path, e))?;
        // Safety: the mapping is read-only and the file is not modified by this process.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| StorageError::io(&path, e))?;

        if mmap.len() < SHAPE_OFFSET || &mmap[0..4] != MAGIC {
            return Err(StorageError::invalid_format(&path, "invalid magic bytes"));
        }

        let version = read_u32(&mmap, 4);
        if version != VERSION {
            return Err(StorageError::invalid_format(
                &path,
                format!("unsupported version {}", version),
            ));
        }

        let rank = read_u32(&mmap, 8) as usize;
        let data_offset = rank
            .checked_mul(8)
            .and_then(|table| table.checked_add(SHAPE_OFFSET))
            .filter(|&offset| offset <= mmap.len())
            .ok_or_else(|| StorageError::invalid_format(&path, "truncated shape table"))?;

        let shape = (0..rank)
            .map(|i| usize::try_from(read_u64(&mmap, SHAPE_OFFSET + i * 8)).ok())
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| StorageError::invalid_format(&path, "dimension exceeds address space"))?;

        // header values are untrusted: overflow means a corrupt file
        let expected = shape
            .iter()
            .try_fold(F64_BYTES, |bytes, &dim| bytes.checked_mul(dim))
            .ok_or_else(|| {
                StorageError::invalid_format(&path, format!("shape {:?} overflows the data size", shape))
            })?;
        let actual = mmap.len() - data_offset;
        if actual < expected {
            return Err(StorageError::invalid_format(
                &path,
                format!(
                    "insufficient data: expected {} bytes, found {}",
                    expected, actual
                ),
            ));
        }

        Ok(Self {
            mmap,
            path,
            shape,
            data_offset,
        })
    }

    /// Get the shape of the tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Path the tensor was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `count` consecutive elements starting at linear offset `start`
    fn extend_run(&self, start: usize, count: usize, out: &mut Vec<f64>) {
        let begin = self.data_offset + start * F64_BYTES;
        let bytes = &self.mmap[begin..begin + count * F64_BYTES];
        out.extend(bytes.chunks_exact(F64_BYTES).map(|b| {
            let mut buf = [0u8; F64_BYTES];
            buf.copy_from_slice(b);
            f64::from_le_bytes(buf)
        }));
    }

    /// Read a contiguous range `start..end` along `mode`, all other modes full
    ///
    /// The returned tensor has the file's shape with `shape[mode]` replaced
    /// by `end - start`. In row-major order this slab is `prod(shape[..mode])`
    /// runs of `(end - start) * prod(shape[mode+1..])` contiguous elements.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidMode`] / [`StorageError::IndexOutOfBounds`] for a bad range
    /// - [`StorageError::OutOfMemory`] if the slab buffer cannot be allocated
    pub fn read_mode_range(&self, mode: usize, start: usize, end: usize) -> StorageResult<DenseND<f64>> {
        let n_modes = self.shape.len();
        if mode >= n_modes {
            return Err(StorageError::InvalidMode { mode, n_modes });
        }
        if start > end || end > self.shape[mode] {
            return Err(StorageError::IndexOutOfBounds(format!(
                "range {}..{} along mode {} of size {}",
                start, end, mode, self.shape[mode]
            )));
        }

        let outer: usize = self.shape[..mode].iter().product();
        let inner: usize = self.shape[mode + 1..].iter().product();
        let run = (end - start) * inner;

        let mut data = try_buffer(outer * run)?;
        for o in 0..outer {
            let offset = (o * self.shape[mode] + start) * inner;
            self.extend_run(offset, run, &mut data);
        }

        let mut slab_shape = self.shape.clone();
        slab_shape[mode] = end - start;
        DenseND::from_vec(data, &slab_shape).map_err(|e| StorageError::Tensor(e.to_string()))
    }

    /// Convert to a DenseND tensor (copies data)
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OutOfMemory`] when the full buffer cannot be allocated.
    pub fn to_dense(&self) -> StorageResult<DenseND<f64>> {
        let len = self.len();
        let mut data = try_buffer(len)?;
        self.extend_run(0, len, &mut data);
        DenseND::from_vec(data, &self.shape).map_err(|e| StorageError::Tensor(e.to_string()))
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// Write a tensor to a binary file in mmap-compatible format
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the file cannot be created or written.
pub fn write_tensor_binary<P: AsRef<Path>>(path: P, tensor: &DenseND<f64>) -> StorageResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_body(&mut writer, tensor)
        .and_then(|_| writer.flush())
        .map_err(|e| StorageError::io(path, e))
}

fn write_body<W: Write>(writer: &mut W, tensor: &DenseND<f64>) -> std::io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&(tensor.rank() as u32).to_le_bytes())?;
    writer.write_all(&[0u8; 4])?;
    for &dim in tensor.shape() {
        writer.write_all(&(dim as u64).to_le_bytes())?;
    }
    for &value in tensor.as_slice() {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Read a whole tensor from a binary file
pub fn read_tensor_binary<P: AsRef<Path>>(path: P) -> StorageResult<DenseND<f64>> {
    MmapTensor::open(path)?.to_dense()
}
