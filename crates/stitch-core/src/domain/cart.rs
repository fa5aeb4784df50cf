//! Shopping cart lines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StoreError;
use super::ids::CartLineId;
use super::value::{DomainValue, Loaded};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartLineId,
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: u64,
    pub quantity: u32,
    /// Chosen customizations (fabric, collar, fit, ...).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl CartItem {
    /// Saturates at `u64::MAX` rather than wrapping.
    pub fn line_total_cents(&self) -> u64 {
        self.unit_price_cents.saturating_mul(u64::from(self.quantity))
    }

    fn same_configuration(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id && self.options == other.options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItemPatch {
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(Vec<CartItem>);

impl Cart {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self(items)
    }

    pub fn items(&self) -> &[CartItem] {
        &self.0
    }

    pub fn get(&self, id: &CartLineId) -> Option<&CartItem> {
        self.0.iter().find(|i| &i.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn check_quantity(quantity: u32) -> Result<(), StoreError> {
    if quantity == 0 {
        return Err(StoreError::Validation("quantity must be at least 1".into()));
    }
    Ok(())
}

impl DomainValue for Cart {
    type Key = CartLineId;
    type Record = CartItem;
    type Patch = CartItemPatch;
    type Stored = Vec<CartItem>;

    const RECORD_NAME: &'static str = "cart line";
    // Quantity taps on a line that was just removed elsewhere are harmless.
    const STRICT_UPDATE: bool = false;

    /// Same product with the same options merges into the existing line.
    fn append(&self, record: CartItem) -> Result<Self, StoreError> {
        check_quantity(record.quantity)?;
        let mut next = self.0.clone();
        match next.iter_mut().find(|i| i.same_configuration(&record)) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(record.quantity),
            None => next.push(record),
        }
        Ok(Self(next))
    }

    fn update(
        &self,
        key: &CartLineId,
        patch: &CartItemPatch,
        _now: DateTime<Utc>,
    ) -> Result<Option<Self>, StoreError> {
        check_quantity(patch.quantity)?;
        let Some(pos) = self.0.iter().position(|i| &i.id == key) else {
            return Ok(None);
        };
        let mut next = self.0.clone();
        next[pos].quantity = patch.quantity;
        Ok(Some(Self(next)))
    }

    fn remove(&self, key: &CartLineId) -> Option<Self> {
        let pos = self.0.iter().position(|i| &i.id == key)?;
        let mut next = self.0.clone();
        next.remove(pos);
        Some(Self(next))
    }

    fn to_stored(&self, _saved_at: DateTime<Utc>) -> Vec<CartItem> {
        self.0.clone()
    }

    fn from_stored(stored: Vec<CartItem>) -> Loaded<Self> {
        Loaded {
            value: Self(stored),
            last_updated: None,
        }
    }
}
