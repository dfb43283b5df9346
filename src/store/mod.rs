//! Admin account directory.
//!
//! The guard never touches this module; it only serves the login and
//! password-reset handlers. The trait keeps the backing store pluggable and
//! the in-memory implementation is seeded from a JSON document at startup.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

use crate::access::roles::Role;

/// One admin account as known to the directory.
#[derive(Clone, Debug)]
pub struct AdminRecord {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
}

/// Lookup and credential checks against the account store.
pub trait AdminDirectory: Send + Sync {
    /// Check a credential pair. `None` covers both unknown accounts and bad
    /// passwords so callers cannot tell the difference.
    fn verify_credentials(&self, email: &str, password: &str) -> Option<AdminRecord>;

    fn find_by_email(&self, email: &str) -> Option<AdminRecord>;
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    #[serde(default)]
    id: Option<Uuid>,
    email: String,
    password_sha256: String,
    role: Role,
    #[serde(default)]
    email_verified: bool,
}

struct StoredAdmin {
    record: AdminRecord,
    password_sha256: String,
}

/// JSON-seeded directory held entirely in memory.
pub struct InMemoryDirectory {
    admins: HashMap<String, StoredAdmin>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            admins: HashMap::new(),
        }
    }

    /// Parse a seed document: a JSON array of accounts with hex-encoded
    /// SHA-256 password digests.
    ///
    /// # Errors
    /// Returns an error when the document is not valid JSON for the expected
    /// shape.
    pub fn from_json_str(seed: &str) -> anyhow::Result<Self> {
        let entries: Vec<SeedEntry> = serde_json::from_str(seed)?;
        let mut admins = HashMap::new();
        for entry in entries {
            let email = entry.email.trim().to_lowercase();
            admins.insert(
                email.clone(),
                StoredAdmin {
                    record: AdminRecord {
                        id: entry.id.unwrap_or_else(Uuid::new_v4),
                        email,
                        role: entry.role,
                        email_verified: entry.email_verified,
                    },
                    password_sha256: entry.password_sha256.to_lowercase(),
                },
            );
        }
        Ok(Self { admins })
    }
}

impl AdminDirectory for InMemoryDirectory {
    fn verify_credentials(&self, email: &str, password: &str) -> Option<AdminRecord> {
        let stored = self.admins.get(&email.trim().to_lowercase())?;
        let digest = hex_sha256(password);
        if !constant_time_eq(digest.as_bytes(), stored.password_sha256.as_bytes()) {
            return None;
        }
        Some(stored.record.clone())
    }

    fn find_by_email(&self, email: &str) -> Option<AdminRecord> {
        self.admins
            .get(&email.trim().to_lowercase())
            .map(|stored| stored.record.clone())
    }
}

fn hex_sha256(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Length-then-content comparison without early exit on content.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
