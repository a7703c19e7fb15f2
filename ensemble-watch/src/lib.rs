//! Watch mode: rebuild a repository and its dependents when its sources
//! change.

pub mod error;
pub mod filter;
pub mod runtime;

pub use error::WatchError;
pub use filter::{Debouncer, DEBOUNCE_WINDOW, IGNORED_DIRS};
pub use runtime::{run, start_blocking, Rebuilder, WatchConfig};
