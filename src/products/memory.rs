use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreError;
use crate::products::repo::InventoryStore;
use crate::products::repo_types::{
    Product, ProductFields, Receipt, ReservationOutcome, StockReservation,
};

#[derive(Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    receipts: Vec<Receipt>,
}

/// Process-local inventory. A single mutex plays the role of the row lock, so the
/// check and the decrement in [`InventoryStore::reserve`] can never interleave.
#[derive(Default)]
pub struct InMemoryInventoryStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next reservation abort after its stock check, before anything is
    /// written, the way a dropped connection would abort a transaction.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn receipts(&self) -> Vec<Receipt> {
        self.tables
            .lock()
            .map(|t| t.receipts.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn find_receipt(tables: &Tables, user_id: Uuid, key: &str) -> Option<Receipt> {
    tables
        .receipts
        .iter()
        .find(|r| r.user_id == user_id && r.idempotency_key.as_deref() == Some(key))
        .cloned()
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self.lock()?.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn create(&self, fields: ProductFields) -> Result<Product, StoreError> {
        let product = Product {
            id: Uuid::new_v4(),
            name: fields.name,
            description: fields.description,
            price: fields.price,
            quantity: fields.quantity,
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock()?.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, fields: ProductFields) -> Result<Option<Product>, StoreError> {
        let mut tables = self.lock()?;
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        product.name = fields.name;
        product.description = fields.description;
        product.price = fields.price;
        product.quantity = fields.quantity;
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.products.remove(&id).is_some())
    }

    async fn find_receipt(
        &self,
        user_id: Uuid,
        idempotency_key: &str,
    ) -> Result<Option<Receipt>, StoreError> {
        Ok(find_receipt(&*self.lock()?, user_id, idempotency_key))
    }

    async fn reserve(&self, order: &StockReservation) -> Result<ReservationOutcome, StoreError> {
        let mut tables = self.lock()?;

        if let Some(key) = order.idempotency_key.as_deref() {
            if let Some(receipt) = find_receipt(&tables, order.user_id, key) {
                return Ok(ReservationOutcome::Replayed(receipt));
            }
        }

        let Some(current) = tables.products.get(&order.product_id).map(|p| p.quantity) else {
            return Ok(ReservationOutcome::ProductNotFound);
        };
        if current < order.quantity {
            return Ok(ReservationOutcome::InsufficientStock);
        }

        // Stage both writes, then apply them together.
        let remaining = current - order.quantity;
        let receipt = Receipt {
            id: Uuid::new_v4(),
            product_id: order.product_id,
            user_id: order.user_id,
            quantity_purchased: order.quantity,
            idempotency_key: order.idempotency_key.clone(),
            purchased_at: OffsetDateTime::now_utc(),
        };

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("transaction aborted before commit".into()));
        }

        if let Some(product) = tables.products.get_mut(&order.product_id) {
            product.quantity = remaining;
        }
        tables.receipts.push(receipt.clone());
        Ok(ReservationOutcome::Reserved(receipt))
    }
}
