//! CartStore - カートのファサード（編集は自動保存）

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::domain::{Action, Cart, CartItem, CartItemPatch, CartLineId, StoreError, StoreState};
use crate::ports::{Clock, IdGenerator, KeyValueStore};
use crate::query::{self, CartTotals};
use crate::store::{AutoPersistScheduler, PersistenceGateway, Store};

/// A product configuration to put in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: u64,
    pub quantity: u32,
    pub options: BTreeMap<String, String>,
}

pub struct CartStore {
    store: Arc<Store<Cart>>,
    gateway: PersistenceGateway<Vec<CartItem>>,
    autosave: Arc<AutoPersistScheduler<Cart>>,
    ids: Arc<dyn IdGenerator>,
}

impl CartStore {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let store = Arc::new(Store::new(clock));
        let gateway = PersistenceGateway::new(kv, config.keys.cart.clone());
        let autosave =
            AutoPersistScheduler::attach(&store, gateway.clone(), config.autosave_delay());
        Self {
            store,
            gateway,
            autosave,
            ids,
        }
    }

    pub fn store(&self) -> &Arc<Store<Cart>> {
        &self.store
    }

    pub fn state(&self) -> StoreState<Cart> {
        self.store.state()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.store.value().items().to_vec()
    }

    pub async fn load(&self) -> StoreState<Cart> {
        self.store.load_from(&self.gateway).await
    }

    /// Add a line, or raise the quantity of an identical configuration.
    /// Returns the id of the line holding the item.
    pub fn add_item(&self, item: NewCartItem) -> Result<CartLineId, StoreError> {
        let record = CartItem {
            id: self.ids.cart_line_id(),
            product_id: item.product_id,
            name: item.name,
            unit_price_cents: item.unit_price_cents,
            quantity: item.quantity,
            options: item.options,
        };
        let state = self.store.dispatch(Action::AppendRecord(record.clone()))?;
        let line = state
            .value
            .items()
            .iter()
            .find(|i| i.product_id == record.product_id && i.options == record.options)
            .map(|i| i.id)
            .unwrap_or(record.id);
        Ok(line)
    }

    /// Quantity taps on a line that is already gone are ignored.
    pub fn set_quantity(&self, id: &CartLineId, quantity: u32) -> Result<(), StoreError> {
        self.store.dispatch(Action::UpdateRecord {
            key: *id,
            patch: CartItemPatch { quantity },
        })?;
        Ok(())
    }

    pub fn remove_item(&self, id: &CartLineId) -> Result<bool, StoreError> {
        if self.store.value().get(id).is_none() {
            return Ok(false);
        }
        self.store.dispatch(Action::RemoveRecord(*id))?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.dispatch(Action::SetValue(Cart::default()))?;
        Ok(())
    }

    pub fn totals(&self) -> CartTotals {
        query::cart_totals(&self.store.value())
    }

    pub async fn flush(&self) -> Result<bool, StoreError> {
        self.autosave.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryKeyValueStore;
    use crate::ports::{SystemClock, UlidGenerator};
    use std::time::Duration;

    fn open(kv: &Arc<InMemoryKeyValueStore>) -> CartStore {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        CartStore::new(
            kv.clone(),
            &StoreConfig::default(),
            clock.clone(),
            Arc::new(UlidGenerator::new(clock)),
        )
    }

    fn shirt(collar: &str, quantity: u32) -> NewCartItem {
        NewCartItem {
            product_id: "oxford-shirt".into(),
            name: "Oxford shirt".into(),
            unit_price_cents: 8_900,
            quantity,
            options: BTreeMap::from([("collar".to_string(), collar.to_string())]),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn same_configuration_merges_into_one_line() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let cart = open(&kv);

        let first = cart.add_item(shirt("spread", 1)).unwrap();
        let again = cart.add_item(shirt("spread", 2)).unwrap();
        let other = cart.add_item(shirt("button-down", 1)).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(
            cart.totals(),
            CartTotals {
                item_count: 4,
                subtotal_cents: 4 * 8_900
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn edits_are_autosaved_and_survive_reopen() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let cart = open(&kv);
        let line = cart.add_item(shirt("spread", 1)).unwrap();
        cart.set_quantity(&line, 3).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(kv.write_count("@cart"), 1);

        let reopened = open(&kv);
        let state = reopened.load().await;
        assert_eq!(state.value.get(&line).unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let cart = open(&kv);
        let line = cart.add_item(shirt("spread", 1)).unwrap();

        assert!(matches!(cart.set_quantity(&line, 0), Err(StoreError::Validation(_))));
        assert!(cart.add_item(shirt("spread", 0)).is_err());
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[tokio::test]
    async fn missing_lines_are_ignored() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let cart = open(&kv);
        let line = cart.add_item(shirt("spread", 1)).unwrap();

        assert!(cart.remove_item(&line).unwrap());
        assert!(!cart.remove_item(&line).unwrap());
        cart.set_quantity(&line, 2).unwrap();
        assert!(cart.items().is_empty());
    }

    #[tokio::test]
    async fn clear_then_flush_stores_an_empty_cart() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let cart = open(&kv);
        cart.add_item(shirt("spread", 1)).unwrap();
        cart.clear().unwrap();

        assert!(cart.flush().await.unwrap());
        assert_eq!(kv.raw("@cart").as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn huge_prices_do_not_break_totals() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let cart = open(&kv);
        let mut item = shirt("spread", 2);
        item.unit_price_cents = u64::MAX / 2 + 1;
        cart.add_item(item).unwrap();

        assert_eq!(
            cart.totals(),
            CartTotals {
                item_count: 2,
                subtotal_cents: u64::MAX
            }
        );
    }
}
