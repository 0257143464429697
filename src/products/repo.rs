use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::StoreError;
use crate::products::repo_types::{
    Product, ProductFields, Receipt, ReservationOutcome, StockReservation,
};

/// Product rows plus the purchase-side conditional decrement.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn create(&self, fields: ProductFields) -> Result<Product, StoreError>;
    async fn update(&self, id: Uuid, fields: ProductFields) -> Result<Option<Product>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_receipt(
        &self,
        user_id: Uuid,
        idempotency_key: &str,
    ) -> Result<Option<Receipt>, StoreError>;

    /// Decrements stock by `quantity` only if at least that much is available and
    /// records the receipt, as one atomic unit. Either both land or neither does.
    async fn reserve(&self, order: &StockReservation) -> Result<ReservationOutcome, StoreError>;
}

#[derive(Clone)]
pub struct PgInventoryStore {
    db: PgPool,
}

impl PgInventoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const RECEIPT_COLUMNS: &str = "id, product_id, user_id, quantity, idempotency_key, purchased_at";

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, quantity, created_at
            FROM products
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, quantity, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, fields: ProductFields) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, price, quantity, created_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.quantity)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, fields: ProductFields) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, quantity = $5
            WHERE id = $1
            RETURNING id, name, description, price, quantity, created_at
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.quantity)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_receipt(
        &self,
        user_id: Uuid,
        idempotency_key: &str,
    ) -> Result<Option<Receipt>, StoreError> {
        let receipt = sqlx::query_as::<_, Receipt>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM purchases WHERE user_id = $1 AND idempotency_key = $2"
        ))
        .bind(user_id)
        .bind(idempotency_key)
        .fetch_optional(&self.db)
        .await?;
        Ok(receipt)
    }

    async fn reserve(&self, order: &StockReservation) -> Result<ReservationOutcome, StoreError> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.db.begin().await?;

        if let Some(key) = order.idempotency_key.as_deref() {
            let prior = sqlx::query_as::<_, Receipt>(&format!(
                "SELECT {RECEIPT_COLUMNS} FROM purchases WHERE user_id = $1 AND idempotency_key = $2"
            ))
            .bind(order.user_id)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
            if let Some(receipt) = prior {
                return Ok(ReservationOutcome::Replayed(receipt));
            }
        }

        // Single conditional update: the row lock it takes serialises concurrent
        // buyers, and the predicate is re-evaluated against the committed quantity.
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity - $2
            WHERE id = $1 AND quantity >= $2
            RETURNING quantity
            "#,
        )
        .bind(order.product_id)
        .bind(order.quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(remaining) = remaining else {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                    .bind(order.product_id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Ok(if exists {
                ReservationOutcome::InsufficientStock
            } else {
                ReservationOutcome::ProductNotFound
            });
        };

        let inserted = sqlx::query_as::<_, Receipt>(&format!(
            r#"
            INSERT INTO purchases (user_id, product_id, quantity, idempotency_key)
            VALUES ($1, $2, $3, $4)
            RETURNING {RECEIPT_COLUMNS}
            "#
        ))
        .bind(order.user_id)
        .bind(order.product_id)
        .bind(order.quantity)
        .bind(&order.idempotency_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from);

        let receipt = match (inserted, order.idempotency_key.as_deref()) {
            (Ok(receipt), _) => receipt,
            (Err(StoreError::UniqueViolation { .. }), Some(key)) => {
                // A concurrent request with the same key committed first.
                drop(tx);
                warn!(product_id = %order.product_id, "idempotency key raced; replaying");
                return match self.find_receipt(order.user_id, key).await? {
                    Some(receipt) => Ok(ReservationOutcome::Replayed(receipt)),
                    None => Err(StoreError::Unavailable(
                        "idempotent purchase vanished after conflict".into(),
                    )),
                };
            }
            (Err(e), _) => return Err(e),
        };

        tx.commit().await?;
        debug!(product_id = %order.product_id, remaining, "stock decremented");
        Ok(ReservationOutcome::Reserved(receipt))
    }
}
