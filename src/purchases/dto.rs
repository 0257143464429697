use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::products::repo_types::Receipt;
use crate::purchases::services::PurchaseRequest;

/// Form body of `POST /buy`. Every field is optional here so missing ones surface as
/// a 400 with a precise message rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct BuyForm {
    #[serde(rename = "productID")]
    pub product_id: Option<String>,
    /// Payment-source token for the charge; not the bearer credential.
    pub token: Option<String>,
    pub amount: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl BuyForm {
    pub fn into_request(self, idempotency_key: Option<String>) -> Result<PurchaseRequest, ApiError> {
        let product_id = present(self.product_id)
            .ok_or_else(|| ApiError::Validation("missing productID parameter".into()))?;
        let product_id = Uuid::parse_str(&product_id)
            .map_err(|_| ApiError::Validation("productID must be a UUID".into()))?;
        let payment_token = present(self.token)
            .ok_or_else(|| ApiError::Validation("missing token parameter".into()))?;
        let quantity = match present(self.amount) {
            None => 1,
            Some(raw) => match raw.parse::<i32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ApiError::Validation(
                        "amount must be a positive integer".into(),
                    ))
                }
            },
        };
        Ok(PurchaseRequest {
            product_id,
            quantity,
            payment_token,
            idempotency_key: present(idempotency_key),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub status: &'static str,
    pub replayed: bool,
    pub receipt: Receipt,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(product_id: Option<&str>, token: Option<&str>, amount: Option<&str>) -> BuyForm {
        BuyForm {
            product_id: product_id.map(Into::into),
            token: token.map(Into::into),
            amount: amount.map(Into::into),
        }
    }

    #[test]
    fn amount_defaults_to_one() {
        let id = Uuid::new_v4().to_string();
        let req = form(Some(&id), Some("tok"), None).into_request(None).unwrap();
        assert_eq!(req.quantity, 1);
        assert!(req.idempotency_key.is_none());
    }

    #[test]
    fn missing_fields_are_validation_errors() {
        let id = Uuid::new_v4().to_string();
        for f in [
            form(None, Some("tok"), Some("1")),
            form(Some(&id), None, Some("1")),
            form(Some(&id), Some("  "), Some("1")),
            form(Some("not-a-uuid"), Some("tok"), Some("1")),
            form(Some(&id), Some("tok"), Some("0")),
            form(Some(&id), Some("tok"), Some("two")),
        ] {
            assert!(matches!(f.into_request(None), Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn deserializes_wire_field_names() {
        let id = Uuid::new_v4();
        let f: BuyForm = serde_json::from_value(serde_json::json!({
            "productID": id.to_string(),
            "token": "tok_1",
            "amount": "3",
        }))
        .unwrap();
        let req = f.into_request(Some("key".into())).unwrap();
        assert_eq!(req.product_id, id);
        assert_eq!(req.quantity, 3);
        assert_eq!(req.idempotency_key.as_deref(), Some("key"));
    }
}
