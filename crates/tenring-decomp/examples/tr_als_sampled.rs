//! Sampled TR-ALS Example
//!
//! Decomposes a synthetic tensor with exact TR-ranks, first in memory and
//! then from a binary tensor file read in slabs, and compares full and
//! partial resampling.
//!
//! Run with:
//! ```bash
//! RUST_LOG=tenring_decomp=info cargo run --example tr_als_sampled
//! ```

use scirs2_core::random::{rngs::StdRng, SeedableRng};
use tenring_decomp::{tr_als_sampled, StorageIncrements, TrAlsConfig, TrDecomp};
use tenring_ooc::{init_tracing, write_tensor_binary, DiskSource, TracingConfig};

fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::default())?;

    println!("{}", "=".repeat(80));
    println!("Sampled Tensor Ring ALS Example");
    println!("{}", "=".repeat(80));
    println!();

    let shape = vec![20, 20, 20];
    let ranks = vec![3, 3, 3];
    let embedding = vec![200, 200, 200];

    let mut rng = StdRng::seed_from_u64(2024);
    let truth = TrDecomp::random(&shape, &ranks, 1.0, &mut rng)?;
    let tensor = truth.reconstruct()?;

    // ========================================================================
    // Example 1: in-memory tensor, full resampling
    // ========================================================================
    println!("Example 1: in-memory tensor, full resampling");
    println!("{}", "-".repeat(80));

    let config = TrAlsConfig::new().tol(0.0).max_iters(30).seed(7).verbose(true);
    let start = std::time::Instant::now();
    let result = tr_als_sampled(&tensor, &ranks, &embedding, &config)?;
    let elapsed = start.elapsed();

    println!("  - Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    println!("  - Sweeps: {} ({:?})", result.iters, result.status);
    for (n, core) in result.decomp.cores.iter().enumerate() {
        println!("  - Core {}: {:?}", n, core.shape());
    }
    println!("  - Relative error: {:.3e}", result.decomp.relative_error(&tensor)?);
    println!("  - Compression ratio: {:.1}x", result.decomp.compression_ratio());
    println!();

    // ========================================================================
    // Example 2: partial resampling with convergence check
    // ========================================================================
    println!("Example 2: partial resampling, tol = 1e-6");
    println!("{}", "-".repeat(80));

    let config = TrAlsConfig::new().tol(1e-6).max_iters(50).resample(false).seed(7);
    let result = tr_als_sampled(&tensor, &ranks, &embedding, &config)?;

    println!("  - Sweeps: {} ({:?})", result.iters, result.status);
    if let Some(last) = result.error_history.last() {
        println!("  - Last checked error: {:.3e}", last);
    }
    println!();

    // ========================================================================
    // Example 3: out-of-core tensor
    // ========================================================================
    println!("Example 3: tensor file read in 4 slabs per fetch");
    println!("{}", "-".repeat(80));

    let path = std::env::temp_dir().join("tenring_example_tensor.bin");
    write_tensor_binary(&path, &tensor)?;
    let source = DiskSource::open(&path)?;

    let config = TrAlsConfig::new()
        .tol(0.0)
        .max_iters(30)
        .seed(7)
        .storage_increments(StorageIncrements::Uniform(4));
    let result = tr_als_sampled(&source, &ranks, &embedding, &config)?;

    println!("  - Sweeps: {}", result.iters);
    println!("  - Relative error: {:.3e}", result.decomp.relative_error(&tensor)?);
    std::fs::remove_file(&path)?;

    println!();
    println!("{}", "=".repeat(80));
    Ok(())
}
