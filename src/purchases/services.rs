use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::db::StoreError;
use crate::products::repo::InventoryStore;
use crate::products::repo_types::{Receipt, ReservationOutcome, StockReservation};
use crate::purchases::payment::{Charge, PaymentAuthorizer, PaymentError};

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("{0}")]
    Validation(String),
    #[error("product not found")]
    ProductNotFound,
    #[error("insufficient stock")]
    InsufficientStock,
    #[error(transparent)]
    Payment(#[from] PaymentError),
    /// Not safe to retry blindly unless an idempotency key was supplied.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A validated purchase request.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub payment_token: String,
    pub idempotency_key: Option<String>,
}

/// Outcome handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub receipt: Receipt,
    /// True when an earlier purchase with the same idempotency key was returned.
    pub replayed: bool,
}

#[derive(Clone)]
pub struct PurchaseService {
    inventory: Arc<dyn InventoryStore>,
    payments: Arc<dyn PaymentAuthorizer>,
}

impl PurchaseService {
    pub fn new(inventory: Arc<dyn InventoryStore>, payments: Arc<dyn PaymentAuthorizer>) -> Self {
        Self {
            inventory,
            payments,
        }
    }

    /// Buys `quantity` units for an authenticated caller.
    ///
    /// The caller is authenticated before this runs (an [`AuthUser`] only exists for a
    /// validated token). The stock check and decrement happen in one conditional store
    /// operation, so concurrent buyers can never oversell; the receipt is written in
    /// the same unit.
    #[instrument(skip(self, buyer, req), fields(user_id = %buyer.user_id(), product_id = %req.product_id, quantity = req.quantity))]
    pub async fn purchase(
        &self,
        buyer: &AuthUser,
        req: PurchaseRequest,
    ) -> Result<Purchase, PurchaseError> {
        if req.quantity <= 0 {
            return Err(PurchaseError::Validation(
                "amount must be a positive integer".into(),
            ));
        }
        let user_id = buyer.user_id();

        if let Some(key) = req.idempotency_key.as_deref() {
            if let Some(receipt) = self.inventory.find_receipt(user_id, key).await? {
                info!(receipt_id = %receipt.id, "purchase replayed");
                return Ok(Purchase {
                    receipt,
                    replayed: true,
                });
            }
        }

        let product = self
            .inventory
            .get(req.product_id)
            .await?
            .ok_or(PurchaseError::ProductNotFound)?;

        let amount = product
            .price
            .checked_mul(Decimal::from(req.quantity))
            .ok_or_else(|| {
                warn!(price = %product.price, "charge amount out of range");
                PurchaseError::Validation("order total is out of range".into())
            })?;

        // Payment completes before the inventory transaction opens.
        let charge = Charge {
            user_id,
            product_id: product.id,
            quantity: req.quantity,
            amount,
            payment_token: req.payment_token,
        };
        self.payments.authorize(&charge).await.map_err(|e| {
            warn!(error = %e, "payment not authorized");
            e
        })?;

        let order = StockReservation {
            product_id: product.id,
            user_id,
            quantity: req.quantity,
            idempotency_key: req.idempotency_key,
        };
        match self.inventory.reserve(&order).await {
            Ok(ReservationOutcome::Reserved(receipt)) => {
                info!(receipt_id = %receipt.id, "purchase reserved");
                Ok(Purchase {
                    receipt,
                    replayed: false,
                })
            }
            Ok(ReservationOutcome::Replayed(receipt)) => {
                info!(receipt_id = %receipt.id, "purchase replayed");
                Ok(Purchase {
                    receipt,
                    replayed: true,
                })
            }
            Ok(ReservationOutcome::InsufficientStock) => {
                warn!("insufficient stock");
                Err(PurchaseError::InsufficientStock)
            }
            Ok(ReservationOutcome::ProductNotFound) => Err(PurchaseError::ProductNotFound),
            Err(e) => {
                error!(error = %e, "stock reservation failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenService;
    use crate::config::JwtConfig;
    use crate::products::memory::InMemoryInventoryStore;
    use crate::products::repo_types::ProductFields;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn buyer() -> AuthUser {
        let tokens = TokenService::new(&JwtConfig {
            secret: "test-secret".into(),
        });
        let token = tokens.issue(Uuid::new_v4()).unwrap();
        tokens.authenticate(&token).unwrap()
    }

    async fn setup(quantity: i32) -> (Arc<InMemoryInventoryStore>, PurchaseService, Uuid) {
        let store = Arc::new(InMemoryInventoryStore::new());
        let product = store
            .create(ProductFields {
                name: "widget".into(),
                description: Some("a widget".into()),
                price: Decimal::new(250, 2),
                quantity,
            })
            .await
            .unwrap();
        let service = PurchaseService::new(store.clone(), Arc::new(crate::purchases::payment::AcceptAllPayments));
        (store, service, product.id)
    }

    fn request(product_id: Uuid, quantity: i32) -> PurchaseRequest {
        PurchaseRequest {
            product_id,
            quantity,
            payment_token: "tok_visa".into(),
            idempotency_key: None,
        }
    }

    async fn stock(store: &InMemoryInventoryStore, id: Uuid) -> i32 {
        store.get(id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn purchase_decrements_and_returns_receipt() {
        let (store, service, id) = setup(5).await;
        let who = buyer();
        let done = service.purchase(&who, request(id, 1)).await.unwrap();
        assert!(!done.replayed);
        assert_eq!(done.receipt.product_id, id);
        assert_eq!(done.receipt.user_id, who.user_id());
        assert_eq!(done.receipt.quantity_purchased, 1);
        assert_eq!(stock(&store, id).await, 4);
    }

    #[tokio::test]
    async fn purchase_rejects_when_stock_runs_out() {
        let (store, service, id) = setup(1).await;
        let who = buyer();
        service.purchase(&who, request(id, 1)).await.unwrap();
        let err = service.purchase(&who, request(id, 1)).await.unwrap_err();
        assert!(matches!(err, PurchaseError::InsufficientStock));
        assert_eq!(stock(&store, id).await, 0);
    }

    #[tokio::test]
    async fn purchase_unknown_product() {
        let (_, service, _) = setup(1).await;
        let err = service
            .purchase(&buyer(), request(Uuid::new_v4(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::ProductNotFound));
    }

    #[tokio::test]
    async fn purchase_rejects_non_positive_quantity() {
        let (store, service, id) = setup(3).await;
        for qty in [0, -2] {
            let err = service.purchase(&buyer(), request(id, qty)).await.unwrap_err();
            assert!(matches!(err, PurchaseError::Validation(_)));
        }
        assert_eq!(stock(&store, id).await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_buyers_never_oversell() {
        let (store, service, id) = setup(1).await;
        let a = {
            let service = service.clone();
            let who = buyer();
            tokio::spawn(async move { service.purchase(&who, request(id, 1)).await })
        };
        let b = {
            let service = service.clone();
            let who = buyer();
            tokio::spawn(async move { service.purchase(&who, request(id, 1)).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let out_of_stock = results
            .iter()
            .filter(|r| matches!(r, Err(PurchaseError::InsufficientStock)))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(out_of_stock, 1);
        assert_eq!(stock(&store, id).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn many_concurrent_buyers_sell_exactly_the_stock() {
        let (store, service, id) = setup(10).await;
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let service = service.clone();
                let who = buyer();
                tokio::spawn(async move { service.purchase(&who, request(id, 1)).await })
            })
            .collect();
        let mut sold = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                sold += 1;
            }
        }
        assert_eq!(sold, 10);
        assert_eq!(stock(&store, id).await, 0);
        assert_eq!(store.receipts().len(), 10);
    }

    #[tokio::test]
    async fn aborted_transaction_keeps_quantity() {
        let (store, service, id) = setup(5).await;
        store.fail_next_commit();
        let err = service.purchase(&buyer(), request(id, 2)).await.unwrap_err();
        assert!(matches!(err, PurchaseError::Store(_)));
        assert_eq!(stock(&store, id).await, 5);
        assert!(store.receipts().is_empty());
    }

    #[tokio::test]
    async fn idempotency_key_prevents_double_decrement() {
        let (store, service, id) = setup(5).await;
        let who = buyer();
        let mut req = request(id, 2);
        req.idempotency_key = Some("order-42".into());

        let first = service.purchase(&who, req.clone()).await.unwrap();
        let second = service.purchase(&who, req).await.unwrap();
        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.receipt, second.receipt);
        assert_eq!(stock(&store, id).await, 3);
    }

    struct Declining(AtomicUsize);

    #[async_trait]
    impl PaymentAuthorizer for Declining {
        async fn authorize(&self, _charge: &Charge) -> Result<(), PaymentError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(PaymentError::Declined("card declined".into()))
        }
    }

    #[tokio::test]
    async fn declined_payment_leaves_inventory_untouched() {
        let (store, _, id) = setup(5).await;
        let payments = Arc::new(Declining(AtomicUsize::new(0)));
        let service = PurchaseService::new(store.clone(), payments.clone());
        let err = service.purchase(&buyer(), request(id, 1)).await.unwrap_err();
        assert!(matches!(err, PurchaseError::Payment(PaymentError::Declined(_))));
        assert_eq!(payments.0.load(Ordering::SeqCst), 1);
        assert_eq!(stock(&store, id).await, 5);
    }

    #[tokio::test]
    async fn order_total_overflow_is_a_validation_error() {
        let store = Arc::new(InMemoryInventoryStore::new());
        let product = store
            .create(ProductFields {
                name: "priceless".into(),
                description: None,
                price: Decimal::MAX,
                quantity: 5,
            })
            .await
            .unwrap();
        let service = PurchaseService::new(store.clone(), Arc::new(crate::purchases::payment::AcceptAllPayments));

        let err = service
            .purchase(&buyer(), request(product.id, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::Validation(_)));
        assert_eq!(stock(&store, product.id).await, 5);
        assert!(store.receipts().is_empty());
    }
}
