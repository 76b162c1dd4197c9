//! # Basket
//!
//! Client-side state management for a storefront: the cart, favorites, and
//! theme stores behind the UI.
//!
//! ## Core Concepts
//!
//! - **Cart**: line items keyed by variant, with quantity clamping and
//!   derived checkout totals
//! - **Favorites**: named collections of products plus a denormalized union
//!   set for O(1) global membership checks
//! - **Persistence**: full state written through to a key-value backend on
//!   every mutation, rehydrated at construction, defaults on corrupt data
//! - **Subscriptions**: events broadcast to bounded channels after each
//!   state-changing mutation
//!
//! ## Example
//!
//! ```ignore
//! use basket::{Session, SessionConfig, CartItemInput, VariantId};
//!
//! let session = Session::open(SessionConfig {
//!     path: "./storage".into(),
//! })?;
//!
//! session.cart().add_item(CartItemInput {
//!     variant_id: VariantId(42),
//!     quantity: 2,
//!     ..snapshot_from_catalog()
//! });
//!
//! session.favorites().add_to_favorites("p1".into(), None);
//! assert!(session.favorites().is_favorite(&"p1".into()));
//! ```

pub mod cart;
pub mod error;
pub mod favorites;
pub(crate) mod persist;
pub mod session;
pub mod storage;
pub mod subscriptions;
pub mod theme;
pub mod types;

// Re-exports
pub use cart::{CartEvent, CartItem, CartItemInput, CartStore, VariantOption, CART_STORAGE_KEY};
pub use error::{Result, StoreError};
pub use favorites::{
    Collection, FavoritesEvent, FavoritesStore, DEFAULT_COLLECTION_ID, FAVORITES_STORAGE_KEY,
};
pub use session::{Session, SessionConfig};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionId};
pub use theme::{Theme, ThemeEvent, ThemeStore, THEME_STORAGE_KEY};
pub use types::{CollectionId, ProductId, Timestamp, VariantId};
