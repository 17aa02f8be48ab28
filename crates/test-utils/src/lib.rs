//! Shared helpers for the integration test suites.

pub mod assertions;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Upper bound applied by [`with_timeout`]; generous enough for the slowest
/// live-process test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install the tracing subscriber once per test binary.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests (or under `--nocapture`). Set `RUST_LOG` to raise the level, for
/// example `RUST_LOG=termrun=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Bound `future` by [`TEST_TIMEOUT`], panicking when it does not finish in
/// time. Keeps a hung child process from stalling the whole suite.
pub async fn with_timeout<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TEST_TIMEOUT, future)
        .await
        .expect("test future timed out")
}
