//! Property-based tests for chunked fiber fetches

#[cfg(test)]
mod tests {
    use crate::{write_tensor_binary, DiskSource, ModeChunks, TensorSource};
    use proptest::prelude::*;
    use scirs2_core::ndarray_ext::Array2;
    use tenring_core::DenseND;

    // Each case writes a file, keep the count low
    fn proptest_config() -> ProptestConfig {
        ProptestConfig {
            cases: 16,
            ..ProptestConfig::default()
        }
    }

    proptest! {
        #[test]
        fn prop_chunks_partition_range(len in 0usize..200, increments in 0usize..50) {
            let chunks = ModeChunks::split(len, increments);
            let covered: usize = chunks.iter().map(|r| r.len()).sum();
            prop_assert_eq!(covered, len);
            if len > 0 {
                prop_assert!(chunks.num_chunks() <= increments.max(1));
            }
        }
    }

    proptest! {
        #![proptest_config(proptest_config())]

        #[test]
        fn prop_disk_fetch_matches_memory(
            shape in prop::collection::vec(1usize..6, 2..=4),
            mode_seed in 0usize..4,
            increments in 0usize..8,
            picks in prop::collection::vec(0usize..1000, 1..10),
        ) {
            let mode = mode_seed % shape.len();
            let total: usize = shape.iter().product();
            let tensor = DenseND::from_vec(
                (0..total).map(|x| (x as f64 * 0.37).cos()).collect(),
                &shape,
            )
            .unwrap();

            let mut samples = Array2::<usize>::zeros((picks.len(), shape.len()));
            for (j, &p) in picks.iter().enumerate() {
                for (m, &d) in shape.iter().enumerate() {
                    samples[[j, m]] = (p + 7 * m) % d;
                }
            }

            let path = std::env::temp_dir().join(format!(
                "tenring_prop_{}_{}_{}.bin",
                std::process::id(),
                total,
                picks.iter().sum::<usize>()
            ));
            write_tensor_binary(&path, &tensor).unwrap();
            let disk = DiskSource::open(&path).unwrap();

            let expected = tensor.fetch_mode_fibers(mode, samples.view(), 0).unwrap();
            let got = disk.fetch_mode_fibers(mode, samples.view(), increments).unwrap();
            std::fs::remove_file(&path).ok();

            prop_assert_eq!(got, expected);
        }
    }
}
