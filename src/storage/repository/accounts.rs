// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bank account records backing the balance facility.
//!
//! Accounts are keyed by the digest of the holder's normalized email and
//! are seeded at startup from a JSON file (see [`AccountRepository::seed_from_file`]).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::{hash_password, CryptoError};
use crate::identity::{email_key, same_email};

use super::super::{FsStorage, StorageError, StorageResult};

/// One end user's bank account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankAccount {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
    pub account_number: String,
    /// Balance in minor units (cents)
    pub balance_minor: i64,
    pub currency: String,
}

impl BankAccount {
    /// Balance as a decimal string with two fraction digits.
    pub fn formatted_balance(&self) -> String {
        let sign = if self.balance_minor < 0 { "-" } else { "" };
        let abs = self.balance_minor.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Entry of the seed file. Passwords are given in plaintext and hashed on load.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAccount {
    #[serde(default)]
    pub user_id: Option<String>,
    pub email: String,
    pub password: String,
    pub account_number: String,
    #[serde(default)]
    pub balance_minor: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

/// Errors from loading the seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to hash seed password: {0}")]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Repository for bank accounts.
pub struct AccountRepository<'a> {
    storage: &'a FsStorage,
}

impl<'a> AccountRepository<'a> {
    pub fn new(storage: &'a FsStorage) -> Self {
        Self { storage }
    }

    /// Insert or replace the account of `account.email`.
    pub fn upsert(&self, account: &BankAccount) -> StorageResult<()> {
        self.storage
            .write_json(self.storage.paths().account(&email_key(&account.email)), account)
    }

    pub fn get_by_email(&self, email: &str) -> StorageResult<BankAccount> {
        let path = self.storage.paths().account(&email_key(email));
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Account for {email}")));
        }
        self.storage.read_json(path)
    }

    pub fn get_by_user_id(&self, user_id: &str) -> StorageResult<BankAccount> {
        self.list_all()?
            .into_iter()
            .find(|a| a.user_id == user_id)
            .ok_or_else(|| StorageError::NotFound(format!("Account of user {user_id}")))
    }

    pub fn list_all(&self) -> StorageResult<Vec<BankAccount>> {
        let dir = self.storage.paths().accounts_dir();
        Ok(self
            .storage
            .list_files(&dir, "json")?
            .iter()
            .filter_map(|key| self.storage.read_json(self.storage.paths().account(key)).ok())
            .collect())
    }

    /// Load accounts from a JSON array of [`SeedAccount`].
    ///
    /// Existing accounts keep their user id so sessions stay bound to them.
    pub fn seed_from_file(&self, path: impl AsRef<Path>) -> Result<usize, SeedError> {
        let content = std::fs::read(path.as_ref())?;
        let seeds: Vec<SeedAccount> = serde_json::from_slice(&content)?;

        for seed in &seeds {
            let user_id = match self.get_by_email(&seed.email) {
                Ok(existing) if same_email(&existing.email, &seed.email) => existing.user_id,
                _ => seed
                    .user_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            };
            self.upsert(&BankAccount {
                user_id,
                email: seed.email.clone(),
                password_hash: hash_password(&seed.password)?,
                account_number: seed.account_number.clone(),
                balance_minor: seed.balance_minor,
                currency: seed.currency.clone(),
            })?;
        }

        Ok(seeds.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_password;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = FsStorage::new(StoragePaths::new(temp.path().join("data")));
        storage.initialize().unwrap();
        (temp, storage)
    }

    #[test]
    fn formatted_balance_uses_two_decimals() {
        let mut account = BankAccount {
            user_id: "42".into(),
            email: "u@x.com".into(),
            password_hash: String::new(),
            account_number: "ACC-1".into(),
            balance_minor: 123_456,
            currency: "INR".into(),
        };
        assert_eq!(account.formatted_balance(), "1234.56");
        account.balance_minor = -5;
        assert_eq!(account.formatted_balance(), "-0.05");
    }

    #[test]
    fn seed_hashes_passwords_and_keeps_user_ids() {
        let (temp, storage) = setup();
        let repo = AccountRepository::new(&storage);
        let seed_path = temp.path().join("accounts.json");
        std::fs::write(
            &seed_path,
            r#"[
                {"user_id": "42", "email": "User@Bank.com", "password": "pw",
                 "account_number": "ACC-42", "balance_minor": 1000},
                {"email": "other@bank.com", "password": "pw2", "account_number": "ACC-43"}
            ]"#,
        )
        .unwrap();

        assert_eq!(repo.seed_from_file(&seed_path).unwrap(), 2);

        let account = repo.get_by_email("user@bank.com").unwrap();
        assert_eq!(account.user_id, "42");
        assert_eq!(account.currency, "INR");
        assert!(verify_password("pw", &account.password_hash));
        assert_ne!(account.password_hash, "pw");

        let other = repo.get_by_email("other@bank.com").unwrap();
        // Reseeding keeps the generated id.
        repo.seed_from_file(&seed_path).unwrap();
        assert_eq!(repo.get_by_email("other@bank.com").unwrap().user_id, other.user_id);
        assert_eq!(repo.get_by_user_id("42").unwrap().account_number, "ACC-42");
    }

    #[test]
    fn missing_seed_file_is_reported() {
        let (temp, storage) = setup();
        let repo = AccountRepository::new(&storage);
        let result = repo.seed_from_file(temp.path().join("missing.json"));
        assert!(matches!(result, Err(SeedError::Read(_))));
    }
}
