//! Local persistence of the form state.
//!
//! The whole form is one JSON document in a single file. Saving happens after
//! every edit; loading happens once at startup. A corrupt file never blocks
//! the user: it is reported and a fresh form is used instead.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::FormState;
use crate::error::JubboError;

pub struct FormStore {
    path: PathBuf,
}

impl FormStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved form. `None` when nothing is saved or the file is
    /// unreadable as a form.
    pub fn load(&self) -> Option<FormState> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("restoring form state from {} failed: {}", self.path.display(), e);
                return None;
            }
        };
        match Self::parse(&raw) {
            Ok(form) => {
                debug!("restored form state from {}", self.path.display());
                Some(form)
            }
            Err(e) => {
                warn!("restoring form state from {} failed: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Load the saved form or start a fresh one.
    pub fn load_or_default(&self) -> FormState {
        self.load().unwrap_or_default()
    }

    /// Parse a form document, normalizing the ad order.
    pub fn parse(raw: &str) -> Result<FormState, JubboError> {
        let mut form: FormState = serde_json::from_str(raw)?;
        form.normalize();
        Ok(form)
    }

    pub fn save(&self, form: &FormState) -> Result<(), JubboError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| JubboError::io(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(form)?;
        std::fs::write(&self.path, json).map_err(|e| JubboError::io(&self.path, e))?;
        debug!("saved form state to {}", self.path.display());
        Ok(())
    }

    /// Forget the saved form. Clearing an empty store is fine.
    pub fn clear(&self) -> Result<(), JubboError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(JubboError::io(&self.path, e)),
        }
    }
}
