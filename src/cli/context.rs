use std::path::{Path, PathBuf};
use std::sync::Arc;

use booking_flow::FlowPolicy;
use railbook_state_center::{JsonSettingsStore, SessionMarkers};

use crate::config::AppConfig;

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn policy(&self) -> &FlowPolicy {
        &self.config.policy
    }

    pub fn settings_path(&self) -> &Path {
        &self.config.settings_path
    }

    pub fn session_dir(&self) -> &Path {
        &self.config.session_dir
    }

    pub fn settings_store(&self) -> JsonSettingsStore {
        JsonSettingsStore::new(self.settings_path())
    }

    pub fn session_markers(&self) -> SessionMarkers {
        SessionMarkers::in_dir(self.session_dir())
    }
}
