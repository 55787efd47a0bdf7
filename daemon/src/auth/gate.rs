use crate::auth::accounts::{Account, AccountBook, AccountPaths, PendingRegistration};
use crate::auth::config::AuthConfig;
use crate::auth::jwt::{now_secs, JwtCodec, SessionClaims};
use crate::auth::password::{hash_password, verify_password};
use lazy_static::lazy_static;
use log::{error, info, warn};
use regex::Regex;
use thiserror::Error;
use tokio::sync::Mutex;
use warden_protocol::user::{PendingRegistrationInfo, Role};

pub const INVALID_CREDENTIALS: &str = "invalid username or password";
pub const PENDING_APPROVAL: &str = "pending approval";
const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref USERNAME_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9_]{3,16}$").expect("Failed to compile USERNAME_PATTERN regex");
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("{0}")]
    Auth(String),
    #[error("insufficient role")]
    Forbidden,
    #[error("username already taken: {0}")]
    Conflict(String),
    #[error("no pending registration for {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Internal(String),
}

/// Identity resolved from a live session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub jti: String,
    pub expires_at: u64,
}

#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: String,
    pub session: Session,
}

pub struct AccessGate {
    book: Mutex<AccountBook>,
    paths: Option<AccountPaths>,
    /// jti -> expiry of every session that was issued and not logged out
    sessions: scc::HashMap<String, u64, ahash::RandomState>,
    secret: String,
    session_ttl: u64,
}

impl AccessGate {
    pub fn open(paths: AccountPaths, auth: &AuthConfig) -> Self {
        Self {
            book: Mutex::new(AccountBook::load(&paths)),
            paths: Some(paths),
            sessions: scc::HashMap::default(),
            secret: auth.jwt_secret.clone(),
            session_ttl: auth.session_ttl_secs,
        }
    }

    #[cfg(test)]
    pub fn in_memory(auth: &AuthConfig) -> Self {
        Self {
            book: Mutex::new(AccountBook::default()),
            paths: None,
            sessions: scc::HashMap::default(),
            secret: auth.jwt_secret.clone(),
            session_ttl: auth.session_ttl_secs,
        }
    }

    fn persist(&self, book: &AccountBook) {
        if let Some(paths) = &self.paths {
            if let Err(err) = book.save(paths) {
                error!("could not persist account store: {}", err);
            }
        }
    }

    fn validate_credentials(username: &str, password: &str) -> Result<(), GateError> {
        if !USERNAME_PATTERN.is_match(username) {
            return Err(GateError::InvalidInput(
                "username must be 3-16 letters, digits or underscores".into(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(GateError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    fn hash(password: &str) -> Result<String, GateError> {
        hash_password(password).map_err(|_| GateError::Internal("could not hash password".into()))
    }

    /// Creates an approved account directly, bypassing the approval queue.
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), GateError> {
        Self::validate_credentials(username, password)?;
        let password_hash = Self::hash(password)?;

        let mut book = self.book.lock().await;
        book.insert_account(Account {
            username: username.to_string(),
            password_hash,
            role,
            approved: true,
        })?;
        self.persist(&book);
        Ok(())
    }

    /// Seeds the `admin` account on a fresh store.
    pub async fn bootstrap_admin(&self, password: Option<String>) {
        if self.book.lock().await.has_accounts() {
            return;
        }
        match password {
            Some(password) => match self.create_account("admin", &password, Role::Admin).await {
                Ok(()) => info!("created initial admin account `admin`"),
                Err(err) => error!("could not create initial admin account: {}", err),
            },
            None => warn!(
                "no accounts exist; set WARDEN_ADMIN_PASSWORD to create the initial admin account"
            ),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, GateError> {
        let book = self.book.lock().await;

        let Some(account) = book.account(username) else {
            let pending_match = book
                .pending(username)
                .is_some_and(|p| verify_password(password, &p.password_hash));
            return Err(GateError::Auth(
                if pending_match {
                    PENDING_APPROVAL
                } else {
                    INVALID_CREDENTIALS
                }
                .into(),
            ));
        };

        if !verify_password(password, &account.password_hash) {
            return Err(GateError::Auth(INVALID_CREDENTIALS.into()));
        }
        if !account.approved {
            return Err(GateError::Auth(PENDING_APPROVAL.into()));
        }

        let claims = SessionClaims::new(&account.username, account.role, self.session_ttl);
        drop(book);

        let token = claims
            .to_token(&self.secret)
            .map_err(|err| GateError::Internal(err.to_string()))?;

        let now = now_secs();
        self.sessions.retain(|_, expires_at| *expires_at > now);
        let _ = self.sessions.insert(claims.jti.clone(), claims.exp);

        info!("{} logged in", claims.sub);
        Ok(LoginGrant {
            token,
            session: Session {
                username: claims.sub,
                role: claims.role,
                jti: claims.jti,
                expires_at: claims.exp,
            },
        })
    }

    /// Resolves a token to its session. The role is re-read from the account so
    /// demotions and deletions apply to sessions already issued.
    pub async fn resolve(&self, token: &str) -> Result<Session, GateError> {
        let claims = SessionClaims::from_token(token.trim(), &self.secret)
            .map_err(|_| GateError::Auth("invalid or expired session".into()))?;
        if !self.sessions.contains(&claims.jti) {
            return Err(GateError::Auth("session has ended".into()));
        }

        let book = self.book.lock().await;
        let account = book
            .account(&claims.sub)
            .filter(|account| account.approved)
            .ok_or_else(|| GateError::Auth("account no longer exists".into()))?;

        Ok(Session {
            username: claims.sub,
            role: account.role,
            jti: claims.jti,
            expires_at: claims.exp,
        })
    }

    pub async fn logout(&self, token: &str) -> Result<(), GateError> {
        let session = self.resolve(token).await?;
        self.sessions.remove(&session.jti);
        info!("{} logged out", session.username);
        Ok(())
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), GateError> {
        Self::validate_credentials(username, password)?;
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if email.is_some_and(|e| !e.contains('@')) {
            return Err(GateError::InvalidInput("invalid email address".into()));
        }
        let password_hash = Self::hash(password)?;

        let mut book = self.book.lock().await;
        book.add_pending(PendingRegistration {
            username: username.to_string(),
            password_hash,
            email: email.map(str::to_string),
            created_at: chrono::Utc::now(),
        })?;
        self.persist(&book);
        info!("registration of {} is awaiting approval", username);
        Ok(())
    }

    fn require_admin(actor: &Session) -> Result<(), GateError> {
        if actor.role.satisfies(Role::Admin) {
            Ok(())
        } else {
            Err(GateError::Forbidden)
        }
    }

    pub async fn approve(&self, actor: &Session, username: &str) -> Result<(), GateError> {
        Self::require_admin(actor)?;
        let mut book = self.book.lock().await;
        book.approve(username)?;
        self.persist(&book);
        info!("{} approved registration of {}", actor.username, username);
        Ok(())
    }

    pub async fn reject(&self, actor: &Session, username: &str) -> Result<(), GateError> {
        Self::require_admin(actor)?;
        let mut book = self.book.lock().await;
        book.reject(username)?;
        self.persist(&book);
        info!("{} rejected registration of {}", actor.username, username);
        Ok(())
    }

    pub async fn list_pending(
        &self,
        actor: &Session,
    ) -> Result<Vec<PendingRegistrationInfo>, GateError> {
        Self::require_admin(actor)?;
        Ok(self.book.lock().await.list_pending())
    }
}
