//! Session tying the stores together over one storage backend.
//!
//! One `Session` per client process: stores are created once, rehydrate at
//! construction, and live until the process exits. There is no teardown —
//! every mutation already wrote through to storage.

use crate::cart::CartStore;
use crate::error::Result;
use crate::favorites::FavoritesStore;
use crate::storage::{FileStorage, MemoryStorage, StorageBackend};
use crate::theme::ThemeStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Base path for file-backed storage.
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./storage"),
        }
    }
}

/// A client session owning the cart, favorites, and theme stores.
///
/// The stores share one backend but persist under independent keys, so each
/// rehydrates and recovers on its own.
pub struct Session {
    cart: CartStore,
    favorites: FavoritesStore,
    theme: ThemeStore,
}

impl Session {
    /// Open a session with file-backed storage, rehydrating each store from
    /// any state a previous session left behind.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(&config.path)?);
        Ok(Self::with_storage(storage))
    }

    /// Open a session with no durability. State lives for the session only.
    pub fn in_memory() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    /// Open a session over an arbitrary backend.
    pub fn with_storage(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            cart: CartStore::new(storage.clone()),
            favorites: FavoritesStore::new(storage.clone()),
            theme: ThemeStore::new(storage),
        }
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItemInput;
    use crate::theme::Theme;
    use crate::types::{ProductId, VariantId};
    use tempfile::TempDir;

    fn input(variant_id: u64) -> CartItemInput {
        CartItemInput {
            variant_id: VariantId(variant_id),
            product_id: 1,
            product_name: "Mug".to_string(),
            product_slug: "mug".to_string(),
            price: 12.5,
            original_price: Some(15.0),
            quantity: 1,
            image_url: None,
            options: Vec::new(),
            stock: 3,
        }
    }

    #[test]
    fn test_in_memory_session() {
        let session = Session::in_memory();
        session.cart().add_item(input(1));
        session.favorites().add_to_favorites(ProductId::from("p1"), None);

        assert!(session.cart().is_in_cart(VariantId(1)));
        assert!(session.favorites().is_favorite(&ProductId::from("p1")));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let config = SessionConfig {
            path: dir.path().join("storage"),
        };

        {
            let session = Session::open(config.clone()).unwrap();
            session.cart().add_item(input(1));
            session.favorites().add_to_favorites(ProductId::from("p1"), None);
            session.theme().set_theme(Theme::Dark);
        }

        let session = Session::open(config).unwrap();
        assert!(session.cart().is_in_cart(VariantId(1)));
        assert!(session.favorites().is_favorite(&ProductId::from("p1")));
        assert_eq!(session.theme().theme(), Theme::Dark);
    }

    #[test]
    fn test_stores_are_independent() {
        let session = Session::in_memory();
        session.cart().add_item(input(1));

        // Cart activity never touches favorites state and vice versa
        assert!(session.favorites().all_favorites().is_empty());
        session.favorites().add_to_favorites(ProductId::from("p1"), None);
        assert_eq!(session.cart().len(), 1);
    }
}
