//! Favorites store: named collections of products plus a denormalized
//! union set for O(1) global membership checks.
//!
//! The union cache (`all_product_ids`) must equal the union of every
//! per-collection set after each mutation completes; that is the central
//! correctness property of this store.

use crate::persist::{rehydrate, write_through};
use crate::storage::StorageBackend;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionManager};
use crate::types::{CollectionId, ProductId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Storage key for the persisted favorites state.
pub const FAVORITES_STORAGE_KEY: &str = "favorites-storage";

/// Id of the built-in collection that always exists and cannot be deleted.
pub const DEFAULT_COLLECTION_ID: &str = "default";

const DEFAULT_COLLECTION_NAME: &str = "Favorites";

/// A named collection of favorited products.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub created_at: Timestamp,
}

/// Events emitted after favorites mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum FavoritesEvent {
    FavoriteAdded {
        product_id: ProductId,
        collection_id: CollectionId,
    },
    /// `collection_id` is `None` for a full purge across all collections.
    FavoriteRemoved {
        product_id: ProductId,
        collection_id: Option<CollectionId>,
    },
    CollectionCreated { collection_id: CollectionId },
    CollectionDeleted { collection_id: CollectionId },
    CollectionRenamed { collection_id: CollectionId },
}

/// In-memory favorites state.
struct FavoritesState {
    collections: HashMap<CollectionId, Collection>,
    product_ids_by_collection: HashMap<CollectionId, HashSet<ProductId>>,
    /// Union of every per-collection set.
    all_product_ids: HashSet<ProductId>,
}

impl FavoritesState {
    fn default_state() -> Self {
        let default_id = CollectionId::from(DEFAULT_COLLECTION_ID);

        let mut collections = HashMap::new();
        collections.insert(
            default_id.clone(),
            Collection {
                id: default_id.clone(),
                name: DEFAULT_COLLECTION_NAME.to_string(),
                created_at: Timestamp::now(),
            },
        );

        let mut product_ids_by_collection = HashMap::new();
        product_ids_by_collection.insert(default_id, HashSet::new());

        Self {
            collections,
            product_ids_by_collection,
            all_product_ids: HashSet::new(),
        }
    }

    /// Rebuild the union cache from the per-collection sets.
    fn recompute_union(&mut self) {
        self.all_product_ids = self
            .product_ids_by_collection
            .values()
            .flatten()
            .cloned()
            .collect();
    }
}

/// Serializable form of the favorites state. Sets cross the persistence
/// boundary as sorted arrays.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedFavorites {
    collections: Vec<Collection>,
    product_ids_by_collection: BTreeMap<String, Vec<String>>,
    all_product_ids: Vec<String>,
}

impl PersistedFavorites {
    fn from_state(state: &FavoritesState) -> Self {
        let mut collections: Vec<_> = state.collections.values().cloned().collect();
        collections.sort_by(|a, b| a.id.cmp(&b.id));

        let product_ids_by_collection = state
            .product_ids_by_collection
            .iter()
            .map(|(id, products)| {
                let mut products: Vec<_> =
                    products.iter().map(|p| p.0.clone()).collect();
                products.sort();
                (id.0.clone(), products)
            })
            .collect();

        let mut all_product_ids: Vec<_> =
            state.all_product_ids.iter().map(|p| p.0.clone()).collect();
        all_product_ids.sort();

        Self {
            collections,
            product_ids_by_collection,
            all_product_ids,
        }
    }

    fn into_state(self) -> FavoritesState {
        let collections: HashMap<_, _> = self
            .collections
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let product_ids_by_collection = self
            .product_ids_by_collection
            .into_iter()
            .map(|(id, products)| {
                (
                    CollectionId(id),
                    products.into_iter().map(ProductId).collect(),
                )
            })
            .collect();

        let all_product_ids = self.all_product_ids.into_iter().map(ProductId).collect();

        let mut state = FavoritesState {
            collections,
            product_ids_by_collection,
            all_product_ids,
        };

        // The default collection is protected; restore it if the persisted
        // state predates it or was hand-edited.
        let default_id = CollectionId::from(DEFAULT_COLLECTION_ID);
        state
            .collections
            .entry(default_id.clone())
            .or_insert_with(|| Collection {
                id: default_id.clone(),
                name: DEFAULT_COLLECTION_NAME.to_string(),
                created_at: Timestamp::now(),
            });
        state
            .product_ids_by_collection
            .entry(default_id)
            .or_default();

        state
    }
}

/// The favorites store.
pub struct FavoritesStore {
    state: RwLock<FavoritesState>,
    storage: Arc<dyn StorageBackend>,
    subscriptions: SubscriptionManager<FavoritesEvent>,
    /// Disambiguates collection ids created within the same millisecond.
    next_collection_seq: AtomicU64,
}

impl FavoritesStore {
    /// Create a favorites store over `storage`, rehydrating any persisted
    /// state.
    ///
    /// Absent or malformed persisted state yields the default state: only
    /// the protected default collection, nothing favorited.
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let state = rehydrate::<PersistedFavorites>(storage.as_ref(), FAVORITES_STORAGE_KEY)
            .map(PersistedFavorites::into_state)
            .unwrap_or_else(FavoritesState::default_state);

        Self {
            state: RwLock::new(state),
            storage,
            subscriptions: SubscriptionManager::new(),
            next_collection_seq: AtomicU64::new(1),
        }
    }

    /// Subscribe to favorites events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<FavoritesEvent> {
        self.subscriptions.subscribe(config)
    }

    // --- Mutations ---

    /// Add a product to a collection (the default collection when `None`).
    ///
    /// Creates the per-collection membership set if needed and inserts into
    /// the union. Idempotent: adding a product already in the collection
    /// changes nothing.
    pub fn add_to_favorites(&self, product_id: ProductId, collection_id: Option<CollectionId>) {
        let collection_id =
            collection_id.unwrap_or_else(|| CollectionId::from(DEFAULT_COLLECTION_ID));

        let changed = {
            let mut state = self.state.write();
            let inserted = state
                .product_ids_by_collection
                .entry(collection_id.clone())
                .or_default()
                .insert(product_id.clone());
            state.all_product_ids.insert(product_id.clone());
            inserted
        };

        if !changed {
            return;
        }

        self.persist();
        self.subscriptions.broadcast(FavoritesEvent::FavoriteAdded {
            product_id,
            collection_id,
        });
    }

    /// Remove a product from one collection, or from everywhere.
    ///
    /// With `Some(collection_id)` the product leaves that collection only;
    /// it stays in the union as long as any other collection still contains
    /// it. With `None` the product is purged from every collection and the
    /// union unconditionally.
    pub fn remove_from_favorites(
        &self,
        product_id: ProductId,
        collection_id: Option<CollectionId>,
    ) {
        let changed = {
            let mut state = self.state.write();
            match &collection_id {
                Some(target) => {
                    let removed = state
                        .product_ids_by_collection
                        .get_mut(target)
                        .map(|products| products.remove(&product_id))
                        .unwrap_or(false);

                    let in_other_collection = state
                        .product_ids_by_collection
                        .iter()
                        .any(|(id, products)| id != target && products.contains(&product_id));

                    let dropped_from_union = if in_other_collection {
                        false
                    } else {
                        state.all_product_ids.remove(&product_id)
                    };

                    removed || dropped_from_union
                }
                None => {
                    let mut removed = state.all_product_ids.remove(&product_id);
                    for products in state.product_ids_by_collection.values_mut() {
                        removed |= products.remove(&product_id);
                    }
                    removed
                }
            }
        };

        if !changed {
            return;
        }

        self.persist();
        self.subscriptions
            .broadcast(FavoritesEvent::FavoriteRemoved {
                product_id,
                collection_id,
            });
    }

    /// Toggle a product's favorite status against a collection (the default
    /// collection when `None`).
    ///
    /// Dispatches on the *global* favorite status: a product favorited in
    /// any collection is removed from the target collection, never added to
    /// a second one. Double-toggling the same arguments returns to the
    /// original global status.
    pub fn toggle_favorite(&self, product_id: ProductId, collection_id: Option<CollectionId>) {
        if self.is_favorite(&product_id) {
            let target = collection_id
                .unwrap_or_else(|| CollectionId::from(DEFAULT_COLLECTION_ID));
            self.remove_from_favorites(product_id, Some(target));
        } else {
            self.add_to_favorites(product_id, collection_id);
        }
    }

    /// Create a new collection, returning its fresh id.
    pub fn create_collection(&self, name: &str) -> CollectionId {
        let id = {
            let mut state = self.state.write();

            // The sequence restarts on every rehydration, so within the
            // same millisecond a restarted session could re-mint an id a
            // previous session already used; skip over any taken id rather
            // than wiping its collection.
            let id = loop {
                let seq = self.next_collection_seq.fetch_add(1, Ordering::SeqCst);
                let candidate =
                    CollectionId(format!("collection-{}-{}", Timestamp::now().0, seq));
                if !state.collections.contains_key(&candidate)
                    && !state.product_ids_by_collection.contains_key(&candidate)
                {
                    break candidate;
                }
            };

            state.collections.insert(
                id.clone(),
                Collection {
                    id: id.clone(),
                    name: name.to_string(),
                    created_at: Timestamp::now(),
                },
            );
            state
                .product_ids_by_collection
                .insert(id.clone(), HashSet::new());
            id
        };

        self.persist();
        self.subscriptions
            .broadcast(FavoritesEvent::CollectionCreated {
                collection_id: id.clone(),
            });
        id
    }

    /// Delete a collection and its membership set.
    ///
    /// The default collection is protected: deleting it is a no-op. The
    /// union is rebuilt from scratch from the remaining sets, which flushes
    /// any stale entries.
    pub fn delete_collection(&self, collection_id: &CollectionId) {
        if collection_id.as_str() == DEFAULT_COLLECTION_ID {
            return;
        }

        let removed = {
            let mut state = self.state.write();
            let removed_collection = state.collections.remove(collection_id).is_some();
            let removed_products = state
                .product_ids_by_collection
                .remove(collection_id)
                .is_some();

            if removed_collection || removed_products {
                state.recompute_union();
                true
            } else {
                false
            }
        };

        if !removed {
            return;
        }

        self.persist();
        self.subscriptions
            .broadcast(FavoritesEvent::CollectionDeleted {
                collection_id: collection_id.clone(),
            });
    }

    /// Rename a collection. No-op if the id is unknown.
    pub fn rename_collection(&self, collection_id: &CollectionId, name: &str) {
        let renamed = {
            let mut state = self.state.write();
            match state.collections.get_mut(collection_id) {
                Some(collection) => {
                    collection.name = name.to_string();
                    true
                }
                None => false,
            }
        };

        if !renamed {
            return;
        }

        self.persist();
        self.subscriptions
            .broadcast(FavoritesEvent::CollectionRenamed {
                collection_id: collection_id.clone(),
            });
    }

    // --- Reads ---

    /// Whether a product is favorited anywhere (union membership).
    pub fn is_favorite(&self, product_id: &ProductId) -> bool {
        self.state.read().all_product_ids.contains(product_id)
    }

    /// Products in a collection, sorted for stable iteration. Empty for
    /// unknown collection ids.
    pub fn collection_products(&self, collection_id: &CollectionId) -> Vec<ProductId> {
        let state = self.state.read();
        let mut products: Vec<_> = state
            .product_ids_by_collection
            .get(collection_id)
            .map(|products| products.iter().cloned().collect())
            .unwrap_or_default();
        products.sort();
        products
    }

    /// Every favorited product (the union), sorted.
    pub fn all_favorites(&self) -> Vec<ProductId> {
        let mut products: Vec<_> = self.state.read().all_product_ids.iter().cloned().collect();
        products.sort();
        products
    }

    /// Collection metadata, sorted by creation time then id.
    pub fn collections(&self) -> Vec<Collection> {
        let mut collections: Vec<_> = self.state.read().collections.values().cloned().collect();
        collections.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        collections
    }

    /// Get one collection's metadata.
    pub fn collection(&self, collection_id: &CollectionId) -> Option<Collection> {
        self.state.read().collections.get(collection_id).cloned()
    }

    /// Ids of every membership set, including sets kept for collections
    /// without metadata.
    pub fn collection_ids(&self) -> Vec<CollectionId> {
        let mut ids: Vec<_> = self
            .state
            .read()
            .product_ids_by_collection
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    // --- Persistence ---

    fn persist(&self) {
        let persisted = PersistedFavorites::from_state(&self.state.read());
        write_through(self.storage.as_ref(), FAVORITES_STORAGE_KEY, &persisted);
    }
}
