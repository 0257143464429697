use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cards::repo_types::{CreditCard, NewCard};
use crate::db::StoreError;

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn create(&self, card: NewCard) -> Result<CreditCard, StoreError>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CreditCard>, StoreError>;
}

#[derive(Clone)]
pub struct PgCardStore {
    db: PgPool,
}

impl PgCardStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CardStore for PgCardStore {
    async fn create(&self, card: NewCard) -> Result<CreditCard, StoreError> {
        let row = sqlx::query_as::<_, CreditCard>(
            r#"
            INSERT INTO credit_cards (user_id, card_number, expiry_month, expiry_year, cvv, name_on_card)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, card_number, expiry_month, expiry_year, cvv, name_on_card, created_at
            "#,
        )
        .bind(card.user_id)
        .bind(&card.card_number)
        .bind(&card.expiry_month)
        .bind(&card.expiry_year)
        .bind(&card.cvv)
        .bind(&card.name_on_card)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CreditCard>, StoreError> {
        let rows = sqlx::query_as::<_, CreditCard>(
            r#"
            SELECT id, user_id, card_number, expiry_month, expiry_year, cvv, name_on_card, created_at
            FROM credit_cards
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
