//! Shared helpers for the `sitepipe` integration tests.

pub mod builders;
pub mod fake_executor;
pub mod fixtures;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single awaited operation in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-captured tracing subscriber once per test binary.
///
/// Reads the same `SITEPIPE_LOG` directives as the binary, so
/// `SITEPIPE_LOG=sitepipe::engine=debug cargo test -- --nocapture` shows the
/// orchestrator's decisions for a failing test.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(sitepipe::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn,sitepipe=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}
