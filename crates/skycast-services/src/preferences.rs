//! Display preferences.

use crate::kv_store::{Storage, StoreResult};

pub const DARK_MODE_KEY: &str = "darkMode";

#[derive(Clone)]
pub struct Preferences {
    storage: Storage,
    default_dark_mode: bool,
}

impl Preferences {
    /// `default_dark_mode` applies until the user picks a theme.
    pub fn new(storage: Storage, default_dark_mode: bool) -> Self {
        Self {
            storage,
            default_dark_mode,
        }
    }

    pub fn dark_mode(&self) -> bool {
        self.storage.get_or(DARK_MODE_KEY, self.default_dark_mode)
    }

    pub fn set_dark_mode(&self, enabled: bool) -> StoreResult<()> {
        self.storage.set(DARK_MODE_KEY, &enabled)
    }

    /// Flip the theme and return the new value.
    pub fn toggle_dark_mode(&self) -> StoreResult<bool> {
        let enabled = !self.dark_mode();
        self.set_dark_mode(enabled)?;
        tracing::debug!(enabled, "Dark mode toggled");
        Ok(enabled)
    }
}
