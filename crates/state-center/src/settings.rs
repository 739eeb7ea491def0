use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use railbook_core_types::BookingConfig;
use serde_json::to_writer_pretty;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable storage for the booking configuration.
///
/// Both operations are best effort: a failed load yields defaults and a
/// failed save is logged and dropped.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> BookingConfig;
    fn save(&self, config: &BookingConfig);
}

/// Pretty-printed JSON file.
#[derive(Clone, Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn try_load(&self) -> Result<BookingConfig, SettingsError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        let config: BookingConfig =
            serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(config.normalized())
    }

    pub fn try_save(&self, config: &BookingConfig) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let file = File::create(&self.path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, config)
            .map_err(|err| io_err(io::Error::new(io::ErrorKind::Other, err)))?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> BookingConfig {
        match self.try_load() {
            Ok(config) => config,
            Err(SettingsError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                BookingConfig::default()
            }
            Err(err) => {
                warn!(error = %err, "failed to load settings, using defaults");
                BookingConfig::default()
            }
        }
    }

    fn save(&self, config: &BookingConfig) {
        if let Err(err) = self.try_save(config) {
            warn!(error = %err, "failed to save settings");
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    config: Mutex<Option<BookingConfig>>,
}

impl MemorySettingsStore {
    pub fn new(config: BookingConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> BookingConfig {
        self.config.lock().clone().unwrap_or_default()
    }

    fn save(&self, config: &BookingConfig) {
        *self.config.lock() = Some(config.clone());
    }
}
