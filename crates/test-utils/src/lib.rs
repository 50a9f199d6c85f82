//! Shared helpers for `sitewatch` integration tests.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// How long any single awaited step in a test may take.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Pick the filter directive for test logs: `RUST_LOG` wins, then
/// `SITEWATCH_LOG` (the variable the binary reads), then `info`.
pub fn log_directive(rust_log: Option<String>, sitewatch_log: Option<String>) -> String {
    rust_log
        .or(sitewatch_log)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured by the harness and only shown for failing tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let directive = log_directive(
            std::env::var("RUST_LOG").ok(),
            std::env::var("SITEWATCH_LOG").ok(),
        );
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}
