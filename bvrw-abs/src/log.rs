/*!

Logging facade. The rewriter logs through these re-exports rather than calling into `tracing`
directly, so the backend can be swapped without touching call sites in `bvrw-core` (mirrors
`mod2_abs::log`, which wraps its own backend behind `debug!`/`info!`).

*/

pub use tracing::{debug, error, info, trace, warn};

/// Installs a process-wide subscriber that prints to stderr, honoring `RUST_LOG`. Intended for
/// test harnesses and any future binary; idempotent (a second call is a harmless no-op) because
/// `tracing`'s global dispatcher can only be set once per process.
pub fn init_default_subscriber() {
  use tracing_subscriber::{fmt, EnvFilter};

  let _ = fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
      .with_test_writer()
      .try_init();
}
