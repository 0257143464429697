use crate::auth::{
    jwt::TokenService,
    memory::InMemoryCredentialStore,
    password::PasswordHasher,
    repo::{CredentialStore, PgCredentialStore},
    services::AuthService,
};
use crate::cards::{
    memory::InMemoryCardStore,
    repo::{CardStore, PgCardStore},
};
use crate::config::AppConfig;
use crate::products::{
    memory::InMemoryInventoryStore,
    repo::{InventoryStore, PgInventoryStore},
};
use crate::purchases::{
    payment::{AcceptAllPayments, PaymentAuthorizer},
    services::PurchaseService,
};
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared handles injected into every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub auth: AuthService,
    pub purchases: PurchaseService,
    pub inventory: Arc<dyn InventoryStore>,
    pub cards: Arc<dyn CardStore>,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl AppState {
    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn CredentialStore>,
        inventory: Arc<dyn InventoryStore>,
        cards: Arc<dyn CardStore>,
        payments: Arc<dyn PaymentAuthorizer>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.jwt);
        let hasher = Arc::new(PasswordHasher::new()?);
        let auth = AuthService::new(users, hasher, tokens.clone());
        let purchases = PurchaseService::new(inventory.clone(), payments);
        Ok(Self {
            config,
            tokens,
            auth,
            purchases,
            inventory,
            cards,
        })
    }

    /// Postgres-backed state. The pool stays owned by the caller, which closes it on
    /// shutdown.
    pub fn postgres(config: Arc<AppConfig>, db: PgPool) -> anyhow::Result<Self> {
        Self::from_parts(
            config,
            Arc::new(PgCredentialStore::new(db.clone())),
            Arc::new(PgInventoryStore::new(db.clone())),
            Arc::new(PgCardStore::new(db)),
            Arc::new(AcceptAllPayments),
        )
    }

    /// Fully in-process state for tests and local experiments.
    pub fn in_memory(config: Arc<AppConfig>, inventory: Arc<InMemoryInventoryStore>) -> anyhow::Result<Self> {
        Self::from_parts(
            config,
            Arc::new(InMemoryCredentialStore::new()),
            inventory,
            Arc::new(InMemoryCardStore::new()),
            Arc::new(AcceptAllPayments),
        )
    }
}
