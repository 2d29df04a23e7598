//! Claim and donate orchestration over a pool store and secret cipher.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::crypto::{
    CipherError, Keypair, KeypairError, SecretCipher, MAX_IDENTIFIER_LEN, MIN_IDENTIFIER_LEN,
    SECRET_MATERIAL_LEN,
};
use crate::matcher::{SuffixTarget, DEFAULT_SUFFIX, MAX_SUFFIX_LEN};

use crate::config::AppConfig;

use super::store::{PoolStore, SqlitePoolStore};

/// Errors returned by pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Vanity pool not configured: {0}")]
    Unconfigured(&'static str),

    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Encryption error: {0}")]
    Crypto(#[from] CipherError),
}

impl PoolError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result of a claim attempt.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// The caller now exclusively owns this keypair.
    Claimed(Keypair),
    /// The pool had nothing usable for the suffix; grind instead or retry.
    NotAvailable,
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed(_))
    }

    pub fn into_keypair(self) -> Option<Keypair> {
        match self {
            ClaimOutcome::Claimed(keypair) => Some(keypair),
            ClaimOutcome::NotAvailable => None,
        }
    }
}

/// Why a taken entry could not be handed out.
#[derive(Debug, thiserror::Error)]
enum Corruption {
    #[error(transparent)]
    Decrypt(#[from] CipherError),

    #[error("stored secret is not a valid keypair: {0}")]
    Keypair(#[from] KeypairError),

    #[error("stored identifier does not match the secret")]
    IdentifierMismatch,
}

#[derive(Clone)]
struct Backend {
    store: Arc<dyn PoolStore>,
    cipher: SecretCipher,
}

/// The only entry point callers use to reach the pool.
#[derive(Clone)]
pub struct PoolService {
    backend: Result<Backend, &'static str>,
    default_suffix: String,
    max_suffix_len: usize,
}

impl PoolService {
    /// Creates a service over `store`, encrypting secrets with `cipher`.
    pub fn new(store: Arc<dyn PoolStore>, cipher: SecretCipher) -> Self {
        Self {
            backend: Ok(Backend { store, cipher }),
            default_suffix: DEFAULT_SUFFIX.to_string(),
            max_suffix_len: MAX_SUFFIX_LEN,
        }
    }

    /// Creates a disabled service; every operation fails with [`PoolError::Unconfigured`].
    pub fn unconfigured(reason: &'static str) -> Self {
        Self {
            backend: Err(reason),
            default_suffix: DEFAULT_SUFFIX.to_string(),
            max_suffix_len: MAX_SUFFIX_LEN,
        }
    }

    /// Builds the service described by `config`.
    ///
    /// A missing encryption key or an unreachable database yields an
    /// unconfigured service; a key that is present but too weak is an error.
    pub async fn open(config: &AppConfig) -> Result<Self, CipherError> {
        let with_policy = |service: Self| {
            service.with_suffix_policy(&config.pool.default_suffix, config.pool.max_suffix_len)
        };

        let Some(secret) = config.pool.encryption_key.as_deref() else {
            warn!("vanity pool disabled: no encryption key configured");
            return Ok(with_policy(Self::unconfigured("encryption key not set")));
        };
        let cipher = SecretCipher::from_secret(secret)?;

        match SqlitePoolStore::connect(&config.database.url, config.database.max_connections).await
        {
            Ok(store) => Ok(with_policy(Self::new(Arc::new(store), cipher))),
            Err(e) => {
                error!(error = %e, "vanity pool disabled: database unavailable");
                Ok(with_policy(Self::unconfigured("database unavailable")))
            }
        }
    }

    /// Overrides the suffix default and length cap.
    pub fn with_suffix_policy(mut self, default_suffix: impl Into<String>, max_len: usize) -> Self {
        self.default_suffix = default_suffix.into();
        self.max_suffix_len = max_len;
        self
    }

    /// Returns true when both storage and encryption are available.
    pub fn is_configured(&self) -> bool {
        self.backend.is_ok()
    }

    /// Normalizes caller input into the pool partition key.
    pub fn normalize_suffix(&self, raw: Option<&str>) -> SuffixTarget {
        SuffixTarget::normalize_with(raw, &self.default_suffix, self.max_suffix_len)
    }

    fn backend(&self) -> Result<&Backend, PoolError> {
        self.backend.as_ref().map_err(|reason| PoolError::Unconfigured(*reason))
    }

    /// Takes the oldest keypair for the suffix.
    ///
    /// An entry that fails to decrypt or rebuild is already deleted by the
    /// take; it is logged and reported as [`ClaimOutcome::NotAvailable`].
    /// Calling `claim` again moves on to the next-oldest entry.
    pub async fn claim(&self, suffix: Option<&str>) -> Result<ClaimOutcome, PoolError> {
        let backend = self.backend()?;
        let suffix = self.normalize_suffix(suffix);

        let Some(entry) = backend.store.take_oldest(&suffix).await? else {
            debug!(%suffix, "vanity pool empty");
            return Ok(ClaimOutcome::NotAvailable);
        };

        match backend.open(&entry.encrypted_secret, &entry.public_identifier) {
            Ok(keypair) => {
                info!(%suffix, identifier = %entry.public_identifier, "claimed pooled keypair");
                Ok(ClaimOutcome::Claimed(keypair))
            }
            Err(reason) => {
                error!(id = %entry.id, %suffix, %reason, "purged corrupt vanity pool entry");
                Ok(ClaimOutcome::NotAvailable)
            }
        }
    }

    /// Stores an unused keypair for a future claimant.
    ///
    /// Malformed input is rejected before the store is touched.
    pub async fn donate(
        &self,
        suffix: Option<&str>,
        public_identifier: &str,
        secret_material: &[u8],
    ) -> Result<Uuid, PoolError> {
        let backend = self.backend()?;
        let suffix = self.normalize_suffix(suffix);
        let public_identifier = public_identifier.trim();

        if !(MIN_IDENTIFIER_LEN..=MAX_IDENTIFIER_LEN).contains(&public_identifier.len()) {
            return Err(PoolError::validation(format!(
                "publicIdentifier must be {}-{} characters",
                MIN_IDENTIFIER_LEN, MAX_IDENTIFIER_LEN
            )));
        }
        if secret_material.len() != SECRET_MATERIAL_LEN {
            return Err(PoolError::validation(format!(
                "secretMaterial must be exactly {} bytes, got {}",
                SECRET_MATERIAL_LEN,
                secret_material.len()
            )));
        }
        let keypair = Keypair::from_secret_material(secret_material)
            .map_err(|e| PoolError::validation(e.to_string()))?;
        if keypair.public_identifier() != public_identifier {
            return Err(PoolError::validation(
                "publicIdentifier does not belong to secretMaterial",
            ));
        }

        let encrypted = backend.cipher.encrypt(secret_material)?;
        let id = backend
            .store
            .insert(&suffix, public_identifier, &encrypted)
            .await?;

        info!(%id, %suffix, identifier = public_identifier, "vanity keypair donated");
        Ok(id)
    }

    /// Returns how many keypairs are waiting for the suffix.
    pub async fn available(&self, suffix: Option<&str>) -> Result<u64, PoolError> {
        let backend = self.backend()?;
        Ok(backend.store.count(&self.normalize_suffix(suffix)).await?)
    }
}

impl Backend {
    fn open(&self, encrypted_secret: &str, public_identifier: &str) -> Result<Keypair, Corruption> {
        let secret = self.cipher.decrypt(encrypted_secret)?;
        let keypair = Keypair::from_secret_material(&secret)?;
        if keypair.public_identifier() != public_identifier {
            return Err(Corruption::IdentifierMismatch);
        }
        Ok(keypair)
    }
}
