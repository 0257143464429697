use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::{LoginRequest, SignupRequest};
use crate::auth::jwt::{TokenError, TokenService};
use crate::auth::password::{HashError, PasswordHasher};
use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::{NewUser, PublicUser};
use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    /// Username or email already registered. Does not say which.
    #[error("an account with these details already exists")]
    DuplicateEmail,
    /// Unknown user and wrong password are indistinguishable to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation { .. } => AuthError::DuplicateEmail,
            other => AuthError::Store(other),
        }
    }
}

/// A freshly issued token together with the user it was issued for.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Signup and login on top of the credential store, hasher and token service.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        hasher: Arc<PasswordHasher>,
        tokens: TokenService,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    #[instrument(skip_all, fields(username = %req.username))]
    pub async fn sign_up(&self, req: SignupRequest) -> Result<Session, AuthError> {
        require("username", &req.username)?;
        require("email", &req.email)?;
        require("password", &req.password)?;

        let username = req.username.trim().to_string();
        let email = req.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            warn!("invalid email");
            return Err(AuthError::Validation("invalid email".into()));
        }

        let password_hash = self.hash(req.password).await?;
        let user = self
            .users
            .create(NewUser {
                username,
                email,
                password_hash,
            })
            .await
            .map_err(|e| {
                match &e {
                    StoreError::UniqueViolation { constraint } => {
                        warn!(constraint = ?constraint, "signup rejected: duplicate account")
                    }
                    other => error!(error = %other, "create user failed"),
                }
                AuthError::from(e)
            })?;

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "user registered");
        Ok(Session {
            token,
            user: user.into(),
        })
    }

    #[instrument(skip_all, fields(username = %req.username))]
    pub async fn log_in(&self, req: LoginRequest) -> Result<Session, AuthError> {
        let username = req.username.trim().to_string();
        let stored = self.users.find_by_username(&username).await.map_err(|e| {
            error!(error = %e, "find_by_username failed");
            AuthError::from(e)
        })?;

        let Some(user) = stored else {
            let hasher = self.hasher.clone();
            let password = req.password;
            tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
                .await
                .map_err(|e| AuthError::Hash(HashError::from_join(e)))?;
            warn!("login unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify(req.password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(Session {
            token,
            user: user.into(),
        })
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(PublicUser::from)
            .ok_or(AuthError::UserNotFound)
    }

    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(HashError::from_join)??;
        Ok(hash)
    }

    async fn verify(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(HashError::from_join)??;
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::InMemoryCredentialStore;
    use crate::config::JwtConfig;

    fn service() -> (AuthService, TokenService) {
        let tokens = TokenService::new(&JwtConfig {
            secret: "test-secret".into(),
        });
        let auth = AuthService::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(PasswordHasher::new().unwrap()),
            tokens.clone(),
        );
        (auth, tokens)
    }

    fn signup(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[tokio::test]
    async fn signup_then_login_yields_token_for_same_user() {
        let (auth, tokens) = service();
        let created = auth.sign_up(signup("alice", "a@x.com", "pw")).await.unwrap();
        assert_eq!(tokens.validate(&created.token).unwrap().sub, created.user.id);

        let session = auth.log_in(login("alice", "pw")).await.unwrap();
        assert_eq!(session.user.id, created.user.id);
        assert_eq!(tokens.validate(&session.token).unwrap().sub, created.user.id);
    }

    #[tokio::test]
    async fn signup_rejects_empty_fields() {
        let (auth, _) = service();
        for req in [
            signup("", "a@x.com", "pw"),
            signup("alice", "  ", "pw"),
            signup("alice", "a@x.com", ""),
        ] {
            assert!(matches!(
                auth.sign_up(req).await,
                Err(AuthError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn duplicate_email_rejected_regardless_of_username() {
        let (auth, _) = service();
        auth.sign_up(signup("alice", "a@x.com", "pw")).await.unwrap();
        let err = auth
            .sign_up(signup("someone-else", "A@x.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn duplicate_username_reported_with_same_shape() {
        let (auth, _) = service();
        auth.sign_up(signup("alice", "a@x.com", "pw")).await.unwrap();
        let err = auth
            .sign_up(signup("alice", "b@x.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_identical() {
        let (auth, _) = service();
        auth.sign_up(signup("alice", "a@x.com", "pw")).await.unwrap();

        let wrong = auth.log_in(login("alice", "nope")).await.unwrap_err();
        let unknown = auth.log_in(login("mallory", "pw")).await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn current_user_never_includes_hash() {
        let (auth, _) = service();
        let created = auth.sign_up(signup("alice", "a@x.com", "pw")).await.unwrap();
        let me = auth.current_user(created.user.id).await.unwrap();
        let json = serde_json::to_string(&me).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("argon2"));
    }
}
