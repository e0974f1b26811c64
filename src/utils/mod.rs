use std::{
    env,
    path::PathBuf,
    sync::{Once, OnceLock},
};

use spendwise_config::Config;

/// Environment variable that relocates all SpendWise data.
pub const HOME_ENV: &str = "SPENDWISE_HOME";

const DEFAULT_DIRECTIVE: &str = "spendwise=info";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber. `RUST_LOG` wins over
/// `filter`, which wins over the default `spendwise=info`. Events go to
/// stderr so command output stays pipeable.
pub fn init_tracing(filter: Option<&str>) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .ok()
            .or_else(|| filter.and_then(|directive| EnvFilter::try_new(directive).ok()))
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE));

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Directory holding the config file: an explicit override, then
/// `SPENDWISE_HOME`, then the platform data directory.
pub fn app_base_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| {
            env::var_os(HOME_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(Config::default_base_dir)
}

/// Directory holding ledger blobs and backups. Overrides (flag or
/// environment) take precedence over the config's `data_dir`.
pub fn app_data_dir(explicit: Option<PathBuf>, config: &Config) -> PathBuf {
    let overridden = explicit.is_some() || env::var_os(HOME_ENV).is_some_and(|v| !v.is_empty());
    let base = app_base_dir(explicit);
    if overridden {
        base
    } else {
        config.resolve_data_dir(&base)
    }
}

/// Version string with the build metadata stamped in by `build.rs`.
pub fn long_version() -> &'static str {
    static LONG_VERSION: OnceLock<String> = OnceLock::new();
    LONG_VERSION.get_or_init(|| {
        format!(
            "{} ({} {}, built {} {})",
            env!("CARGO_PKG_VERSION"),
            env!("SPENDWISE_BUILD_HASH"),
            env!("SPENDWISE_BUILD_STATUS"),
            env!("SPENDWISE_BUILD_TIMESTAMP"),
            env!("SPENDWISE_BUILD_PROFILE"),
        )
    })
}
