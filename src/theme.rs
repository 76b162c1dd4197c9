//! Theme store: the user's light/dark preference.

use crate::persist::{rehydrate, write_through};
use crate::storage::StorageBackend;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionManager};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage key for the persisted theme state.
pub const THEME_STORAGE_KEY: &str = "theme-storage";

/// Display theme preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the platform preference.
    #[default]
    System,
}

/// Events emitted after theme mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeEvent {
    ThemeChanged { theme: Theme },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedTheme {
    theme: Theme,
}

/// The theme store.
pub struct ThemeStore {
    theme: RwLock<Theme>,
    storage: Arc<dyn StorageBackend>,
    subscriptions: SubscriptionManager<ThemeEvent>,
}

impl ThemeStore {
    /// Create a theme store over `storage`, rehydrating any persisted
    /// preference. Absent or malformed state falls back to [`Theme::System`].
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let persisted: PersistedTheme =
            rehydrate(storage.as_ref(), THEME_STORAGE_KEY).unwrap_or_default();

        Self {
            theme: RwLock::new(persisted.theme),
            storage,
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Subscribe to theme events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<ThemeEvent> {
        self.subscriptions.subscribe(config)
    }

    /// Current preference.
    pub fn theme(&self) -> Theme {
        *self.theme.read()
    }

    /// Set the preference.
    pub fn set_theme(&self, theme: Theme) {
        {
            let mut current = self.theme.write();
            if *current == theme {
                return;
            }
            *current = theme;
        }

        self.persist();
        self.subscriptions
            .broadcast(ThemeEvent::ThemeChanged { theme });
    }

    /// Flip between light and dark: dark becomes light, anything else
    /// becomes dark.
    pub fn toggle_theme(&self) {
        let next = match self.theme() {
            Theme::Dark => Theme::Light,
            Theme::Light | Theme::System => Theme::Dark,
        };
        self.set_theme(next);
    }

    fn persist(&self) {
        let persisted = PersistedTheme {
            theme: self.theme(),
        };
        write_through(self.storage.as_ref(), THEME_STORAGE_KEY, &persisted);
    }
}
