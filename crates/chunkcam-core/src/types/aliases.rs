//! Type aliases for shared state.

use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe vector.
///
/// Listeners are handed to the engine by reference but may be observed from
/// the thread that launched the computation.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// Create an empty [`ThreadSafeVec`].
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}
