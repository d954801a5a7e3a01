pub mod error;
pub mod math;
pub mod mode;
pub mod progress;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::math::Vec3;
    use crate::progress::{MemoryStorage, PROGRESS_KEY, ProgressStore, StorageBackend};

    /// Assert two floats are within `eps` of each other.
    #[track_caller]
    pub fn assert_approx(actual: f32, expected: f32, eps: f32) {
        assert!(
            (actual - expected).abs() <= eps,
            "expected {expected} ± {eps}, got {actual}"
        );
    }

    /// Assert two f64 values are within `eps` of each other.
    #[track_caller]
    pub fn assert_approx_f64(actual: f64, expected: f64, eps: f64) {
        assert!(
            (actual - expected).abs() <= eps,
            "expected {expected} ± {eps}, got {actual}"
        );
    }

    /// Assert two vectors are component-wise within `eps`.
    #[track_caller]
    pub fn assert_vec_approx(actual: Vec3, expected: Vec3, eps: f32) {
        assert!(
            (actual.x - expected.x).abs() <= eps
                && (actual.y - expected.y).abs() <= eps
                && (actual.z - expected.z).abs() <= eps,
            "expected {expected:?} ± {eps}, got {actual:?}"
        );
    }

    /// A progress store whose backend already holds `raw` under the progress key.
    pub fn store_with_raw(raw: &str) -> ProgressStore<MemoryStorage> {
        let mut backend = MemoryStorage::new();
        backend
            .set(PROGRESS_KEY, raw)
            .expect("memory storage never fails");
        ProgressStore::new(backend)
    }

    /// A fresh progress store with nothing persisted.
    pub fn empty_store() -> ProgressStore<MemoryStorage> {
        ProgressStore::new(MemoryStorage::new())
    }
}
