use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Credit card row. Owned by exactly one user.
#[derive(Debug, Clone, FromRow)]
pub struct CreditCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
    pub name_on_card: String,
    pub created_at: OffsetDateTime,
}

/// Insert payload. `user_id` always comes from the authenticated caller.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub user_id: Uuid,
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
    pub name_on_card: String,
}

/// What a client gets to see of a stored card.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub name_on_card: String,
}

pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    let visible = digits.len().saturating_sub(4);
    digits
        .iter()
        .enumerate()
        .map(|(i, c)| if i < visible { '*' } else { *c })
        .collect()
}

impl From<CreditCard> for CardView {
    fn from(c: CreditCard) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            card_number: mask_card_number(&c.card_number),
            expiry_month: c.expiry_month,
            expiry_year: c.expiry_year,
            name_on_card: c.name_on_card,
        }
    }
}
