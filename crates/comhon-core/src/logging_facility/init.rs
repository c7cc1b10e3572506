//! Subscriber installation per profile

use serde::Deserialize;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Output profile, read from the `log_profile` configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Human readable, debug and above
    #[default]
    Development,
    /// JSON lines, info and above
    Production,
    /// Nothing is installed; tests call [`super::init_test_capture`]
    Test,
}

impl Profile {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development => "comhon=debug,comhon_core=debug",
            Profile::Production | Profile::Test => "comhon=info,comhon_core=info",
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_filter()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber of `profile`
///
/// Only the first call has an effect. Logs go to stderr so that command
/// output on stdout stays clean.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(profile.filter())
            .with_writer(std::io::stderr);
        match profile {
            Profile::Development => builder.init(),
            Profile::Production => builder.json().init(),
            Profile::Test => {}
        }
    });
}
