use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::UserRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("user file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("user file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of recording a successful payment for an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidTransition {
    Flipped,
    AlreadyPaid,
    UnknownUser,
}

/// Users kept in one JSON file, rewritten whole on every change.
pub struct UserStore {
    path: PathBuf,
    users: RwLock<Vec<UserRecord>>,
}

impl UserStore {
    /// Loads `path`; a missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let users = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice::<Vec<UserRecord>>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("User file {} not found, starting with an empty store", path.display());
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!("Loaded {} users from {}", users.len(), path.display());
        Ok(Self {
            path,
            users: RwLock::new(users),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<UserRecord, StoreError> {
        let email = normalize_email(email);
        if self.find(&email).await.is_some() {
            return Err(StoreError::DuplicateEmail);
        }

        // Hash outside the lock so lookups are not held up by it
        let password_hash = hash_password(password).await?;

        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            email,
            name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            password_hash,
            paid: false,
            created_at: Utc::now(),
            paid_at: None,
        };
        users.push(record.clone());
        if let Err(e) = self.persist(&users).await {
            users.pop();
            return Err(e);
        }

        info!("Registered user {}", record.id);
        Ok(record)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, StoreError> {
        let user = self
            .find(email)
            .await
            .ok_or(StoreError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn find(&self, email: &str) -> Option<UserRecord> {
        let email = normalize_email(email);
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Flips the paid flag from false to true; it never flips back.
    pub async fn mark_paid(&self, email: &str) -> Result<PaidTransition, StoreError> {
        let email = normalize_email(email);
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.email == email) else {
            return Ok(PaidTransition::UnknownUser);
        };
        if user.paid {
            return Ok(PaidTransition::AlreadyPaid);
        }

        user.paid = true;
        user.paid_at = Some(Utc::now());
        let id = user.id;
        if let Err(e) = self.persist(&users).await {
            if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                user.paid = false;
                user.paid_at = None;
            }
            return Err(e);
        }

        info!("User {} marked as paid", id);
        Ok(PaidTransition::Flipped)
    }

    async fn persist(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let data = serde_json::to_vec_pretty(users)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Argon2 is CPU-bound; both directions run on the blocking pool.
async fn hash_password(password: &str) -> Result<String, StoreError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| StoreError::Hash(e.to_string()))?
}

async fn verify_password(password: &str, stored: &str) -> Result<bool, StoreError> {
    let password = password.to_owned();
    let stored = stored.to_owned();
    tokio::task::spawn_blocking(move || match PasswordHash::new(&stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    })
    .await
    .map_err(|e| StoreError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_authenticate() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json")).await.unwrap();

        let user = store
            .register("Ana@Example.com ", "segredo1", Some("Ana".to_string()))
            .await
            .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(!user.paid);
        assert_ne!(user.password_hash, "segredo1");

        assert!(store.authenticate("ana@example.com", "segredo1").await.is_ok());
        assert!(matches!(
            store.authenticate("ana@example.com", "errada").await,
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("ninguem@example.com", "segredo1").await,
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json")).await.unwrap();
        store.register("ana@example.com", "segredo1", None).await.unwrap();
        assert!(matches!(
            store.register("ANA@example.com", "outra123", None).await,
            Err(StoreError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn paid_flag_flips_once_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("users.json");
        let store = UserStore::open(&path).await.unwrap();
        store.register("ana@example.com", "segredo1", None).await.unwrap();

        assert_eq!(store.mark_paid("ana@example.com").await.unwrap(), PaidTransition::Flipped);
        assert_eq!(store.mark_paid("ana@example.com").await.unwrap(), PaidTransition::AlreadyPaid);
        assert_eq!(store.mark_paid("bia@example.com").await.unwrap(), PaidTransition::UnknownUser);

        let reopened = UserStore::open(&path).await.unwrap();
        let user = reopened.find("ana@example.com").await.unwrap();
        assert!(user.paid);
        assert!(user.paid_at.is_some());
    }

    #[tokio::test]
    async fn lookups_do_not_wait_for_a_password_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json")).await.unwrap();

        let register = store.register("ana@example.com", "segredo1", None);
        tokio::pin!(register);
        tokio::select! {
            biased;
            result = &mut register => {
                result.unwrap();
            }
            _ = tokio::task::yield_now() => {
                // Hash in flight on the blocking pool; the user list stays free
                assert!(store.users.try_write().is_ok());
                register.await.unwrap();
            }
        }
        assert!(store.find("ana@example.com").await.is_some());
    }

    #[tokio::test]
    async fn concurrent_registrations_of_one_email_keep_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json")).await.unwrap();

        let (a, b) = tokio::join!(
            store.register("ana@example.com", "segredo1", None),
            store.register("ANA@example.com", "outra123", None),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert!(matches!(a.err().or(b.err()), Some(StoreError::DuplicateEmail)));
        assert_eq!(store.users.read().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_registration_behind() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        let store = UserStore::open(blocker.join("users.json")).await.unwrap();

        // A plain file where the data directory should be
        std::fs::write(&blocker, "").unwrap();
        assert!(matches!(
            store.register("ana@example.com", "segredo1", None).await,
            Err(StoreError::Io(_))
        ));
        assert!(store.find("ana@example.com").await.is_none());

        std::fs::remove_file(&blocker).unwrap();
        assert!(store.register("ana@example.com", "segredo1", None).await.is_ok());
    }

    #[tokio::test]
    async fn failed_write_leaves_the_user_unpaid() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let store = UserStore::open(data.join("users.json")).await.unwrap();
        store.register("ana@example.com", "segredo1", None).await.unwrap();

        std::fs::remove_dir_all(&data).unwrap();
        std::fs::write(&data, "").unwrap();
        assert!(store.mark_paid("ana@example.com").await.is_err());
        let user = store.find("ana@example.com").await.unwrap();
        assert!(!user.paid);
        assert!(user.paid_at.is_none());

        std::fs::remove_file(&data).unwrap();
        assert_eq!(store.mark_paid("ana@example.com").await.unwrap(), PaidTransition::Flipped);
    }

    #[tokio::test]
    async fn corrupt_user_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(UserStore::open(&path).await, Err(StoreError::Json(_))));
    }
}
