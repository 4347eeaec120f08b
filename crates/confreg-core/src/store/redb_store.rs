//! # redb-backed Office Storage
//!
//! A disk-backed `OfficeStore` using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded. Numeric ids and audit sequence numbers are
//! kept in the `metadata` table so they survive restarts.

use super::{Change, IdKind, OfficeStore};
use crate::audit::{AuditEntry, AuditRecord};
use crate::content::ContentPage;
use crate::impersonation::ImpersonationGrant;
use crate::registration::Registration;
use crate::roles::User;
use crate::submissions::AbstractSubmission;
use crate::{AuditSeq, ConfError, RegistrationId, SubmissionId, UserId};
use redb::{
    Database, Key, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

type IdTable = TableDefinition<'static, u64, &'static [u8]>;
type KeyTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Table for users: UserId(u64) -> serialized User
const USERS: IdTable = TableDefinition::new("users");

/// Table for registrations: RegistrationId(u64) -> serialized Registration
const REGISTRATIONS: IdTable = TableDefinition::new("registrations");

/// Table for abstracts: SubmissionId(u64) -> serialized AbstractSubmission
const SUBMISSIONS: IdTable = TableDefinition::new("submissions");

/// Table for CMS pages: slug -> serialized ContentPage
const PAGES: KeyTable = TableDefinition::new("pages");

/// Table for impersonation grants: token hash -> serialized ImpersonationGrant
const GRANTS: KeyTable = TableDefinition::new("grants");

/// Table for the audit trail: seq(u64) -> serialized AuditEntry
const AUDIT: IdTable = TableDefinition::new("audit");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const AUDIT_SEQ_KEY: &str = "next_audit_seq";

fn io_err(e: impl std::fmt::Display) -> ConfError {
    ConfError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ConfError> {
    postcard::to_allocvec(value).map_err(|e| ConfError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConfError> {
    postcard::from_bytes(bytes).map_err(|e| ConfError::SerializationError(e.to_string()))
}

/// A disk-backed office store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create an office database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            for table in [USERS, REGISTRATIONS, SUBMISSIONS, AUDIT] {
                let _ = write_txn.open_table(table).map_err(io_err)?;
            }
            for table in [PAGES, GRANTS] {
                let _ = write_txn.open_table(table).map_err(io_err)?;
            }
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file. Returns whether any space was reclaimed.
    pub fn compact(&mut self) -> Result<bool, ConfError> {
        self.db.compact().map_err(io_err)
    }

    fn get_by_id<T: DeserializeOwned>(
        &self,
        table: IdTable,
        id: u64,
    ) -> Result<Option<T>, ConfError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let t = read_txn.open_table(table).map_err(io_err)?;
        let found = match t.get(id).map_err(io_err)? {
            Some(data) => Some(decode(data.value())?),
            None => None,
        };
        Ok(found)
    }

    fn get_by_key<T: DeserializeOwned>(
        &self,
        table: KeyTable,
        key: &str,
    ) -> Result<Option<T>, ConfError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let t = read_txn.open_table(table).map_err(io_err)?;
        let found = match t.get(key).map_err(io_err)? {
            Some(data) => Some(decode(data.value())?),
            None => None,
        };
        Ok(found)
    }

    /// Every value of a table in key order.
    fn scan<K: Key + 'static, T: DeserializeOwned>(
        &self,
        table: TableDefinition<'static, K, &'static [u8]>,
    ) -> Result<Vec<T>, ConfError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let t = read_txn.open_table(table).map_err(io_err)?;
        let mut out = Vec::new();
        for entry in t.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }
}

fn insert_by_id(
    txn: &WriteTransaction,
    table: IdTable,
    id: u64,
    bytes: &[u8],
) -> Result<(), ConfError> {
    let mut t = txn.open_table(table).map_err(io_err)?;
    t.insert(id, bytes).map_err(io_err)?;
    Ok(())
}

fn insert_by_key(
    txn: &WriteTransaction,
    table: KeyTable,
    key: &str,
    bytes: &[u8],
) -> Result<(), ConfError> {
    let mut t = txn.open_table(table).map_err(io_err)?;
    t.insert(key, bytes).map_err(io_err)?;
    Ok(())
}

// =============================================================================
// OFFICESTORE TRAIT IMPLEMENTATION
// =============================================================================

impl OfficeStore for RedbStore {
    fn allocate_id(&mut self, kind: IdKind) -> Result<u64, ConfError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let next = {
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            let current = meta
                .get(kind.counter_key())
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            let next = current.saturating_add(1);
            meta.insert(kind.counter_key(), next).map_err(io_err)?;
            next
        };
        write_txn.commit().map_err(io_err)?;
        Ok(next)
    }

    /// Record, sequence number and audit entry share one write transaction.
    fn commit(&mut self, change: Change<'_>, record: AuditRecord) -> Result<AuditEntry, ConfError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        match change {
            Change::User(user) => insert_by_id(&write_txn, USERS, user.id.0, &encode(user)?)?,
            Change::Registration(registration) => insert_by_id(
                &write_txn,
                REGISTRATIONS,
                registration.id.0,
                &encode(registration)?,
            )?,
            Change::Submission(submission) => insert_by_id(
                &write_txn,
                SUBMISSIONS,
                submission.id.0,
                &encode(submission)?,
            )?,
            Change::Page(page) => insert_by_key(&write_txn, PAGES, &page.slug, &encode(page)?)?,
            Change::Grant(grant) => {
                insert_by_key(&write_txn, GRANTS, &grant.token_hash, &encode(grant)?)?;
            }
        }

        let entry = {
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            let seq = meta
                .get(AUDIT_SEQ_KEY)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0)
                .saturating_add(1);
            meta.insert(AUDIT_SEQ_KEY, seq).map_err(io_err)?;
            record.with_seq(AuditSeq(seq))
        };
        insert_by_id(&write_txn, AUDIT, entry.seq.0, &encode(&entry)?)?;

        // Dropping an uncommitted transaction aborts it.
        write_txn.commit().map_err(io_err)?;
        Ok(entry)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>, ConfError> {
        self.get_by_id(USERS, id.0)
    }

    fn users(&self) -> Result<Vec<User>, ConfError> {
        self.scan(USERS)
    }

    fn get_registration(&self, id: RegistrationId) -> Result<Option<Registration>, ConfError> {
        self.get_by_id(REGISTRATIONS, id.0)
    }

    fn registrations(&self) -> Result<Vec<Registration>, ConfError> {
        self.scan(REGISTRATIONS)
    }

    fn get_submission(&self, id: SubmissionId) -> Result<Option<AbstractSubmission>, ConfError> {
        self.get_by_id(SUBMISSIONS, id.0)
    }

    fn submissions(&self) -> Result<Vec<AbstractSubmission>, ConfError> {
        self.scan(SUBMISSIONS)
    }

    fn get_page(&self, slug: &str) -> Result<Option<ContentPage>, ConfError> {
        self.get_by_key(PAGES, slug)
    }

    fn pages(&self) -> Result<Vec<ContentPage>, ConfError> {
        self.scan(PAGES)
    }

    fn get_grant(&self, token_hash: &str) -> Result<Option<ImpersonationGrant>, ConfError> {
        self.get_by_key(GRANTS, token_hash)
    }

    fn grants(&self) -> Result<Vec<ImpersonationGrant>, ConfError> {
        self.scan(GRANTS)
    }

    fn audit_entries(&self) -> Result<Vec<AuditEntry>, ConfError> {
        self.scan(AUDIT)
    }

    fn audit_len(&self) -> Result<usize, ConfError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let t = read_txn.open_table(AUDIT).map_err(io_err)?;
        let len = t.len().map_err(io_err)?;
        Ok(len as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
