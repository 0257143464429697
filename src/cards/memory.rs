use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cards::repo::CardStore;
use crate::cards::repo_types::{CreditCard, NewCard};
use crate::db::StoreError;

#[derive(Default)]
pub struct InMemoryCardStore {
    cards: Mutex<Vec<CreditCard>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn create(&self, card: NewCard) -> Result<CreditCard, StoreError> {
        let row = CreditCard {
            id: Uuid::new_v4(),
            user_id: card.user_id,
            card_number: card.card_number,
            expiry_month: card.expiry_month,
            expiry_year: card.expiry_year,
            cvv: card.cvv,
            name_on_card: card.name_on_card,
            created_at: OffsetDateTime::now_utc(),
        };
        self.cards
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .push(row.clone());
        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CreditCard>, StoreError> {
        let cards = self
            .cards
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(cards
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(user_id: Uuid, number: &str) -> NewCard {
        NewCard {
            user_id,
            card_number: number.into(),
            expiry_month: "12".into(),
            expiry_year: "2031".into(),
            cvv: "123".into(),
            name_on_card: "Card Holder".into(),
        }
    }

    #[tokio::test]
    async fn lists_only_the_owners_cards_newest_first() {
        let store = InMemoryCardStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create(card(alice, "4111111111111111")).await.unwrap();
        store.create(card(bob, "5555555555554444")).await.unwrap();
        store.create(card(alice, "4242424242424242")).await.unwrap();

        let mine = store.list_for_user(alice).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|c| c.user_id == alice));
        assert_eq!(mine[0].card_number, "4242424242424242");
        assert!(store.list_for_user(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
