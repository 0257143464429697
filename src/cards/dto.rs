use serde::Deserialize;
use uuid::Uuid;

use crate::cards::repo_types::NewCard;
use crate::error::ApiError;

/// Request body for `POST /credit-cards`. The owner comes from the token, never the body.
#[derive(Debug, Deserialize)]
pub struct AddCardRequest {
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
    pub name_on_card: String,
}

fn digits_only(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(*c, ' ' | '-'))
        .collect();
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}

impl AddCardRequest {
    pub fn into_new_card(self, owner: Uuid) -> Result<NewCard, ApiError> {
        let invalid = |msg: &str| ApiError::Validation(msg.into());

        let card_number = digits_only(&self.card_number)
            .filter(|n| (12..=19).contains(&n.len()))
            .ok_or_else(|| invalid("card_number must be 12 to 19 digits"))?;

        let expiry_month = self.expiry_month.trim();
        match expiry_month.parse::<u8>() {
            Ok(m) if (1..=12).contains(&m) => {}
            _ => return Err(invalid("expiry_month must be between 1 and 12")),
        }

        let expiry_year = self.expiry_year.trim();
        if expiry_year.len() != 4 || !expiry_year.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expiry_year must be a 4-digit year"));
        }

        let cvv = self.cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("cvv must be 3 or 4 digits"));
        }

        let name_on_card = self.name_on_card.trim();
        if name_on_card.is_empty() {
            return Err(invalid("name_on_card is required"));
        }

        Ok(NewCard {
            user_id: owner,
            card_number,
            expiry_month: expiry_month.to_string(),
            expiry_year: expiry_year.to_string(),
            cvv: cvv.to_string(),
            name_on_card: name_on_card.to_string(),
        })
    }
}
