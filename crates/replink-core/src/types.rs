//! Type aliases for commonly used complex types.
//!
//! Gives meaningful names to the shared-state and callback shapes used
//! throughout the workspace, so `Arc<Mutex<VecDeque<...>>>` soup stays out
//! of signatures.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe reader-writer lock wrapper for read-heavy state.
///
/// Used for the machine-state and options snapshots, which are replaced
/// wholesale on each successful poll and read by every render pass.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// A simple callback with no parameters or return value.
///
/// Thread-safe, suitable for cross-thread event notification.
pub type Callback = Box<dyn Fn() + Send + Sync>;

/// A callback that receives a single parameter.
///
/// Thread-safe, suitable for cross-thread data notification.
pub type DataCallback<T> = Box<dyn Fn(T) + Send + Sync>;

/// A progress callback receiving (current, total) byte counts.
///
/// Used for file uploads.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;
