//! ## Logging Configuration
//!
//! Logging is set up at load time using the `ctor` crate and is controlled by the
//! `DEBUG_SCORECARD_FEATURES` environment variable:
//!
//! - **Disabled** (default): unset, empty, `"0"` or `"false"`.
//! - **Enabled**: any other value, with a maximum log level of `DEBUG`.
//!
//! ```sh
//! export DEBUG_SCORECARD_FEATURES=true
//! ```

use ctor::ctor;
use tracing::Level;

fn logging_enabled(value: Option<&str>) -> bool {
    !matches!(value, None | Some("") | Some("0") | Some("false"))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var("DEBUG_SCORECARD_FEATURES").ok();
    if logging_enabled(value.as_deref()) {
        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
