use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// A charge to authorize before any stock is touched.
#[derive(Debug, Clone)]
pub struct Charge {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub amount: Decimal,
    /// Opaque payment-source token supplied by the client.
    pub payment_token: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("payment authority unavailable: {0}")]
    Unavailable(String),
}

/// External charge authorization. Must finish before the inventory transaction
/// opens, so no row lock is ever held across this call.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    async fn authorize(&self, charge: &Charge) -> Result<(), PaymentError>;
}

/// Accepts every charge. Used when no payment authority is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllPayments;

#[async_trait]
impl PaymentAuthorizer for AcceptAllPayments {
    async fn authorize(&self, _charge: &Charge) -> Result<(), PaymentError> {
        Ok(())
    }
}
