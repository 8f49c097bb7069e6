pub mod config;
pub mod errors;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use routes::router;
pub use state::AppState;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG`-style filtering, defaulting to `info`. Set `LOG_FORMAT=json` for JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
