//! Parallel utilities with feature-gated implementations
//!
//! With the `parallel` feature these run on rayon, otherwise they fall back
//! to plain sequential iterators with the same signatures.

/// Number of worker threads a parallel section would use
#[cfg(feature = "parallel")]
pub fn worker_count() -> usize {
    rayon::current_num_threads()
}

/// Number of worker threads a parallel section would use
#[cfg(not(feature = "parallel"))]
pub fn worker_count() -> usize {
    1
}

/// Fallible parallel map over `0..count`, stopping at the first error
#[cfg(feature = "parallel")]
pub fn try_parallel_map_indexed<U, E, F>(count: usize, f: F) -> Result<Vec<U>, E>
where
    U: Send,
    E: Send,
    F: Fn(usize) -> Result<U, E> + Sync + Send,
{
    use rayon::prelude::*;
    (0..count).into_par_iter().map(f).collect()
}

/// Fallible sequential map (fallback)
#[cfg(not(feature = "parallel"))]
pub fn try_parallel_map_indexed<U, E, F>(count: usize, f: F) -> Result<Vec<U>, E>
where
    F: Fn(usize) -> Result<U, E>,
{
    (0..count).map(f).collect()
}
