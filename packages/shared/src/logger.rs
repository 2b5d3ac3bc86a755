//! Logging setup for Kakehashi binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// The filter is taken from `RUST_LOG` when set. Otherwise `default_log_level`
/// is applied to the broker crates and to the binary itself, so that noisy
/// dependencies (hyper, tungstenite) stay at their own defaults.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "kakehashi_server")
/// * `default_log_level` - The default log level (e.g., "debug", "info")
///
/// # Examples
///
/// ```no_run
/// use kakehashi_shared::logger::setup_logger;
///
/// setup_logger("kakehashi_server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Build the fallback filter directives used when `RUST_LOG` is unset.
fn default_directives(binary_name: &str, level: &str) -> String {
    let binary = binary_name.replace('-', "_");
    format!(
        "kakehashi_server={level},kakehashi_shared={level},{binary}={level},tower_http=info"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_normalize_binary_name() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに変換される
        // given (前提条件):
        let binary_name = "kakehashi-server";

        // when (操作):
        let directives = default_directives(binary_name, "debug");

        // then (期待する結果):
        assert!(directives.contains("kakehashi_server=debug"));
        assert!(!directives.contains("kakehashi-server"));
    }

    #[test]
    fn test_default_directives_include_shared_crate() {
        // テスト項目: 共有クレートにも同じログレベルが適用される
        // given (前提条件):

        // when (操作):
        let directives = default_directives("server", "warn");

        // then (期待する結果):
        assert!(directives.contains("kakehashi_shared=warn"));
        assert!(directives.contains("server=warn"));
    }
}
