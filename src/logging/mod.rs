//! Console and run-log output.
//!
//! Everything goes through [`Log`]. [`Logger`] turns messages into
//! `tracing` events for the subscriber from [`init_subscriber`] and keeps
//! the per-directive summary; [`MemoryLog`] captures messages in tests.

mod logger;
mod memory;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use memory::{Level, MemoryLog};
pub use subscriber::{Verbosity, init_subscriber};
pub use types::{DirectiveEntry, DirectiveStatus, Log};

/// Serializes `XDG_CACHE_HOME` manipulation across parallel test threads.
#[cfg(test)]
static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with `XDG_CACHE_HOME` pointing at `dir`, then unset it again.
#[cfg(test)]
pub(crate) fn with_cache_home<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    let _lock = TEST_ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    // SAFETY: every writer of XDG_CACHE_HOME holds TEST_ENV_MUTEX.
    #[allow(unsafe_code)]
    unsafe {
        std::env::set_var("XDG_CACHE_HOME", dir);
    }
    let out = f();
    #[allow(unsafe_code)]
    unsafe {
        std::env::remove_var("XDG_CACHE_HOME");
    }
    out
}

/// A [`Logger`] whose run log lives in a fresh temp directory, with a
/// thread-local subscriber writing to it.
///
/// Keep the guard alive for the whole test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let (file_layer, log) = with_cache_home(tmp.path(), || {
        (
            subscriber::FileLayer::new().expect("failed to create file layer"),
            Logger::new(),
        )
    });
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}
