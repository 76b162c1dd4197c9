//! Cart store: line items keyed by variant, with derived totals.
//!
//! Prices and stock are snapshots taken when an item enters the cart; the
//! store performs no live catalog lookups. Every mutation clamps quantities
//! into `1..=stock`, writes the full state through to storage, and
//! broadcasts a [`CartEvent`].

use crate::persist::{rehydrate, write_through};
use crate::storage::StorageBackend;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionManager};
use crate::types::VariantId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Storage key for the persisted cart state.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// One attribute of a variant, e.g. `{"Color", "Navy"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantOption {
    pub title: String,
    pub value: String,
}

/// A line item in the cart.
///
/// Product fields are denormalized so the UI can render the line without a
/// second catalog lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub variant_id: VariantId,
    pub product_id: u64,
    pub product_name: String,
    pub product_slug: String,
    /// Unit price at the time the item was added.
    pub price: f64,
    /// Pre-discount unit price, if the product was on sale when added.
    pub original_price: Option<f64>,
    pub quantity: u32,
    /// Whether this line is included in the checkout totals.
    pub selected: bool,
    pub image_url: Option<String>,
    #[serde(default)]
    pub options: Vec<VariantOption>,
    /// Stock ceiling at the time the item was added.
    pub stock: u32,
}

/// Input for adding an item: every [`CartItem`] field except `selected`,
/// which the store assigns.
#[derive(Clone, Debug)]
pub struct CartItemInput {
    pub variant_id: VariantId,
    pub product_id: u64,
    pub product_name: String,
    pub product_slug: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub quantity: u32,
    pub image_url: Option<String>,
    pub options: Vec<VariantOption>,
    pub stock: u32,
}

/// Events emitted after cart mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    /// An item was inserted, or an existing line's quantity grew.
    ItemAdded { variant_id: VariantId },
    ItemRemoved { variant_id: VariantId },
    QuantityChanged { variant_id: VariantId, quantity: u32 },
    /// One or more lines changed their checkout selection.
    SelectionChanged,
    Cleared,
}

/// Serializable form of the cart state. The item map crosses the
/// persistence boundary as an array.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCart {
    items: Vec<CartItem>,
}

/// The cart store.
pub struct CartStore {
    items: RwLock<HashMap<VariantId, CartItem>>,
    storage: Arc<dyn StorageBackend>,
    subscriptions: SubscriptionManager<CartEvent>,
}

impl CartStore {
    /// Create a cart store over `storage`, rehydrating any persisted state.
    ///
    /// Absent or malformed persisted state yields an empty cart.
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let persisted: PersistedCart =
            rehydrate(storage.as_ref(), CART_STORAGE_KEY).unwrap_or_default();

        let items = persisted
            .items
            .into_iter()
            .map(|item| (item.variant_id, item))
            .collect();

        Self {
            items: RwLock::new(items),
            storage,
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Subscribe to cart events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<CartEvent> {
        self.subscriptions.subscribe(config)
    }

    // --- Mutations ---

    /// Add an item, or grow an existing line's quantity.
    ///
    /// For an existing line the new quantity is
    /// `min(existing.quantity + input.quantity, input.stock)` — the latest
    /// stock ceiling wins, but the originally recorded price and product
    /// snapshot are kept. A new line is inserted with `selected = true` and
    /// its quantity clamped into `1..=stock`. An out-of-stock snapshot
    /// (`stock == 0`) clamps every quantity to zero, so the add is treated
    /// as a removal of the line, like `update_quantity(.., 0)`.
    pub fn add_item(&self, input: CartItemInput) {
        let variant_id = input.variant_id;

        if input.stock == 0 {
            self.remove_item(variant_id);
            return;
        }

        {
            let mut items = self.items.write();
            match items.get_mut(&variant_id) {
                Some(existing) => {
                    existing.quantity =
                        (existing.quantity.saturating_add(input.quantity)).min(input.stock);
                }
                None => {
                    let quantity = input.quantity.min(input.stock).max(1);
                    items.insert(
                        variant_id,
                        CartItem {
                            variant_id,
                            product_id: input.product_id,
                            product_name: input.product_name,
                            product_slug: input.product_slug,
                            price: input.price,
                            original_price: input.original_price,
                            quantity,
                            selected: true,
                            image_url: input.image_url,
                            options: input.options,
                            stock: input.stock,
                        },
                    );
                }
            }
        }

        self.persist();
        self.subscriptions
            .broadcast(CartEvent::ItemAdded { variant_id });
    }

    /// Remove a line. No-op if absent.
    pub fn remove_item(&self, variant_id: VariantId) {
        let removed = self.items.write().remove(&variant_id).is_some();
        if !removed {
            return;
        }

        self.persist();
        self.subscriptions
            .broadcast(CartEvent::ItemRemoved { variant_id });
    }

    /// Set a line's quantity.
    ///
    /// Absent line: no-op. `quantity == 0`: the line is removed. Otherwise
    /// the quantity is clamped to the line's stock ceiling.
    pub fn update_quantity(&self, variant_id: VariantId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(variant_id);
            return;
        }

        let clamped = {
            let mut items = self.items.write();
            match items.get_mut(&variant_id) {
                Some(item) => {
                    item.quantity = quantity.min(item.stock);
                    item.quantity
                }
                None => return,
            }
        };

        self.persist();
        self.subscriptions.broadcast(CartEvent::QuantityChanged {
            variant_id,
            quantity: clamped,
        });
    }

    /// Flip a line's checkout selection. No-op if absent.
    pub fn toggle_select(&self, variant_id: VariantId) {
        {
            let mut items = self.items.write();
            match items.get_mut(&variant_id) {
                Some(item) => item.selected = !item.selected,
                None => return,
            }
        }

        self.persist();
        self.subscriptions.broadcast(CartEvent::SelectionChanged);
    }

    /// Set every line's checkout selection uniformly.
    pub fn select_all(&self, selected: bool) {
        let changed = {
            let mut items = self.items.write();
            let mut changed = false;
            for item in items.values_mut() {
                if item.selected != selected {
                    item.selected = selected;
                    changed = true;
                }
            }
            changed
        };

        if !changed {
            return;
        }

        self.persist();
        self.subscriptions.broadcast(CartEvent::SelectionChanged);
    }

    /// Empty the cart.
    pub fn clear(&self) {
        {
            let mut items = self.items.write();
            if items.is_empty() {
                return;
            }
            items.clear();
        }

        self.persist();
        self.subscriptions.broadcast(CartEvent::Cleared);
    }

    // --- Reads ---

    /// Get a line by variant. Returns a copy; the store owns the state.
    pub fn item(&self, variant_id: VariantId) -> Option<CartItem> {
        self.items.read().get(&variant_id).cloned()
    }

    /// All lines, ordered by variant id for stable iteration.
    pub fn items(&self) -> Vec<CartItem> {
        let mut items: Vec<_> = self.items.read().values().cloned().collect();
        items.sort_by_key(|item| item.variant_id);
        items
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Sum of quantities over all lines.
    pub fn total_items(&self) -> u64 {
        self.items
            .read()
            .values()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Sum of `price * quantity` over all lines.
    pub fn total_price(&self) -> f64 {
        self.items
            .read()
            .values()
            .map(|item| item.price * f64::from(item.quantity))
            .sum()
    }

    /// Lines currently selected for checkout.
    pub fn selected_items(&self) -> Vec<CartItem> {
        let mut items: Vec<_> = self
            .items
            .read()
            .values()
            .filter(|item| item.selected)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.variant_id);
        items
    }

    /// Sum of `price * quantity` over selected lines only.
    pub fn selected_price(&self) -> f64 {
        self.items
            .read()
            .values()
            .filter(|item| item.selected)
            .map(|item| item.price * f64::from(item.quantity))
            .sum()
    }

    /// Sum of quantities over selected lines only.
    pub fn selected_count(&self) -> u64 {
        self.items
            .read()
            .values()
            .filter(|item| item.selected)
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Whether a variant has a line in the cart.
    pub fn is_in_cart(&self, variant_id: VariantId) -> bool {
        self.items.read().contains_key(&variant_id)
    }

    // --- Persistence ---

    fn persist(&self) {
        let persisted = PersistedCart { items: self.items() };
        write_through(self.storage.as_ref(), CART_STORAGE_KEY, &persisted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::time::Duration;

    fn test_input(variant_id: u64, quantity: u32, stock: u32, price: f64) -> CartItemInput {
        CartItemInput {
            variant_id: VariantId(variant_id),
            product_id: 10,
            product_name: "Wool Sweater".to_string(),
            product_slug: "wool-sweater".to_string(),
            price,
            original_price: None,
            quantity,
            image_url: None,
            options: vec![VariantOption {
                title: "Size".to_string(),
                value: "M".to_string(),
            }],
            stock,
        }
    }

    fn test_store() -> CartStore {
        CartStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_add_new_item_is_selected() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));

        let item = cart.item(VariantId(1)).unwrap();
        assert!(item.selected);
        assert_eq!(item.quantity, 2);
        assert!(cart.is_in_cart(VariantId(1)));
    }

    #[test]
    fn test_add_existing_accumulates_quantity() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.add_item(test_input(1, 2, 5, 100.0));

        assert_eq!(cart.item(VariantId(1)).unwrap().quantity, 4);
    }

    #[test]
    fn test_add_clamps_to_stock_ceiling() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.add_item(test_input(1, 10, 5, 100.0));

        assert_eq!(cart.item(VariantId(1)).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_with_zero_stock_inserts_nothing() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 0, 100.0));

        assert!(cart.is_empty());
        assert!(!cart.is_in_cart(VariantId(1)));
    }

    #[test]
    fn test_add_with_zero_stock_removes_existing_line() {
        // A refreshed snapshot saying the variant is out of stock drops the
        // line rather than leaving it at quantity zero.
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.add_item(test_input(1, 1, 0, 100.0));

        assert!(!cart.is_in_cart(VariantId(1)));
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_add_existing_keeps_price_snapshot() {
        let cart = test_store();
        cart.add_item(test_input(1, 1, 5, 100.0));
        // Second add carries a refreshed price; the original snapshot wins.
        cart.add_item(test_input(1, 1, 5, 120.0));

        assert_eq!(cart.item(VariantId(1)).unwrap().price, 100.0);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.update_quantity(VariantId(1), 0);

        assert!(!cart.is_in_cart(VariantId(1)));
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_update_quantity_clamps() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.update_quantity(VariantId(1), 99);

        assert_eq!(cart.item(VariantId(1)).unwrap().quantity, 5);
    }

    #[test]
    fn test_update_quantity_absent_is_noop() {
        let cart = test_store();
        cart.update_quantity(VariantId(7), 3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let cart = test_store();
        cart.add_item(test_input(1, 1, 5, 100.0));
        cart.remove_item(VariantId(2));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_totals() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.add_item(test_input(2, 3, 10, 50.0));

        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), 350.0);
    }

    #[test]
    fn test_selected_totals_follow_toggle() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.add_item(test_input(2, 3, 10, 50.0));

        cart.toggle_select(VariantId(2));

        assert_eq!(cart.selected_count(), 2);
        assert_eq!(cart.selected_price(), 200.0);
        assert_eq!(cart.selected_items().len(), 1);

        // Total aggregates are unaffected by selection
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), 350.0);
    }

    #[test]
    fn test_select_all_false_zeroes_selected_aggregates() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.add_item(test_input(2, 3, 10, 50.0));
        cart.toggle_select(VariantId(1));

        cart.select_all(false);

        assert_eq!(cart.selected_count(), 0);
        assert_eq!(cart.selected_price(), 0.0);
        assert!(cart.selected_items().is_empty());

        cart.select_all(true);
        assert_eq!(cart.selected_count(), 5);
    }

    #[test]
    fn test_clear() {
        let cart = test_store();
        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), 0.0);
    }

    #[test]
    fn test_rehydrates_from_storage() {
        let storage = Arc::new(MemoryStorage::new());

        {
            let cart = CartStore::new(storage.clone());
            cart.add_item(test_input(1, 2, 5, 100.0));
            cart.toggle_select(VariantId(1));
        }

        let cart = CartStore::new(storage);
        let item = cart.item(VariantId(1)).unwrap();
        assert_eq!(item.quantity, 2);
        assert!(!item.selected);
    }

    #[test]
    fn test_malformed_storage_yields_empty_cart() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(CART_STORAGE_KEY, "not json at all").unwrap();

        let cart = CartStore::new(storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_events() {
        let cart = test_store();
        let handle = cart.subscribe(SubscriptionConfig::default());

        cart.add_item(test_input(1, 2, 5, 100.0));
        cart.update_quantity(VariantId(1), 3);
        cart.remove_item(VariantId(1));

        assert_eq!(
            handle.recv_timeout(Duration::from_millis(100)).unwrap(),
            CartEvent::ItemAdded {
                variant_id: VariantId(1)
            }
        );
        assert_eq!(
            handle.recv_timeout(Duration::from_millis(100)).unwrap(),
            CartEvent::QuantityChanged {
                variant_id: VariantId(1),
                quantity: 3
            }
        );
        assert_eq!(
            handle.recv_timeout(Duration::from_millis(100)).unwrap(),
            CartEvent::ItemRemoved {
                variant_id: VariantId(1)
            }
        );
    }

    #[test]
    fn test_noop_mutations_emit_nothing() {
        let cart = test_store();
        let handle = cart.subscribe(SubscriptionConfig::default());

        cart.remove_item(VariantId(1));
        cart.toggle_select(VariantId(1));
        cart.update_quantity(VariantId(1), 4);
        cart.clear();
        cart.select_all(true);

        assert!(handle.drain().is_empty());
    }
}
