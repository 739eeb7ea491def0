//! Application configuration
//!
//! Where the booking settings and session markers live, plus the engine
//! policy. The booking settings themselves are a separate JSON document
//! owned by the settings store.

use std::path::PathBuf;

use booking_flow::FlowPolicy;
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "settings.json";
pub const SESSION_DIR: &str = "session";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Booking settings document.
    pub settings_path: PathBuf,
    /// Directory holding the run markers that survive page navigations.
    pub session_dir: PathBuf,
    pub policy: FlowPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            settings_path: data_dir.join(SETTINGS_FILE),
            session_dir: data_dir.join(SESSION_DIR),
            policy: FlowPolicy::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("railbook"))
        .unwrap_or_else(|| PathBuf::from(".railbook"))
}
