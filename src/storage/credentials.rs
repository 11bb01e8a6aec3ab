//! Encrypted exchange API credential rows
//!
//! Ciphertexts are produced by `crypto::CredentialCipher`; this module never
//! sees plaintext.

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::database::Database;
use super::error::{StorageError, StorageResult};
use super::types::ExchangeCredential;

impl Database {
    /// Store an encrypted credential pair
    pub fn insert_credential(
        &self,
        user_id: &str,
        exchange: &str,
        label: Option<&str>,
        api_key_ciphertext: String,
        api_secret_ciphertext: String,
        now: DateTime<Utc>,
    ) -> StorageResult<ExchangeCredential> {
        let credential = ExchangeCredential {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            exchange: exchange.to_lowercase(),
            label: label.map(str::to_string),
            api_key_ciphertext,
            api_secret_ciphertext,
            created_at: now,
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO exchange_credentials
             (id, user_id, exchange, label, api_key_ciphertext, api_secret_ciphertext, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                credential.id,
                credential.user_id,
                credential.exchange,
                credential.label,
                credential.api_key_ciphertext,
                credential.api_secret_ciphertext,
                credential.created_at,
            ],
        )?;

        tracing::info!(user_id = %user_id, exchange = %credential.exchange, "Stored exchange credential");
        Ok(credential)
    }

    /// Credentials of a user, newest first
    pub fn list_credentials(&self, user_id: &str) -> StorageResult<Vec<ExchangeCredential>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, exchange, label, api_key_ciphertext, api_secret_ciphertext, created_at
             FROM exchange_credentials WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let credentials = stmt
            .query_map(params![user_id], |row| {
                Ok(ExchangeCredential {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    exchange: row.get(2)?,
                    label: row.get(3)?,
                    api_key_ciphertext: row.get(4)?,
                    api_secret_ciphertext: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(credentials)
    }

    /// Remove a credential
    pub fn delete_credential(&self, user_id: &str, credential_id: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM exchange_credentials WHERE id = ?1 AND user_id = ?2",
            params![credential_id, user_id],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("credential {}", credential_id)));
        }
        Ok(())
    }
}
