//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own the tree namespace: identifier allocation and the record set.
//! - Provide create, read, append and count primitives over `records`/`facts`.
//!
//! # Invariants
//! - Identifier allocation and the record insert happen in one immediate
//!   transaction, so no two writers on the same file receive the same xref.
//! - `append_fact` adds exactly one fact at the end of the sequence and never
//!   rewrites earlier facts or the record identifier.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::fact::{FactLine, Tag};
use crate::model::record::{Fact, Record, RecordKind};
use crate::model::xref::{TreeName, Xref};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,4}$").expect("valid prefix regex"));

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from record repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Tree namespace has not been created.
    TreeNotFound(TreeName),
    /// Target record does not exist in the tree.
    NotFound { tree: TreeName, xref: Xref },
    /// Fact cannot be stored (for example a level-0 line).
    InvalidFact(String),
    /// Identifier prefix configuration is invalid.
    InvalidPrefix(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::TreeNotFound(tree) => write!(f, "tree not found: {tree}"),
            Self::NotFound { tree, xref } => write!(f, "record not found: {tree}/{xref}"),
            Self::InvalidFact(message) => write!(f, "invalid fact: {message}"),
            Self::InvalidPrefix(value) => write!(f, "invalid xref prefix: `{value}`"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Per-kind prefixes for newly allocated identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefPrefixes {
    pub individual: String,
    pub family: String,
}

impl Default for XrefPrefixes {
    fn default() -> Self {
        Self {
            individual: "I".to_string(),
            family: "F".to_string(),
        }
    }
}

impl XrefPrefixes {
    pub fn validate(&self) -> RepoResult<()> {
        for prefix in [&self.individual, &self.family] {
            if !PREFIX_RE.is_match(prefix) {
                return Err(RepoError::InvalidPrefix(prefix.clone()));
            }
        }
        Ok(())
    }

    fn for_kind(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::Individual => &self.individual,
            RecordKind::Family => &self.family,
        }
    }
}

/// Namespace capability injected into services.
///
/// Implementations must guarantee that concurrent `create_record` calls never
/// return the same xref within one tree, and that concurrent `append_fact`
/// calls on one record do not lose updates.
pub trait RecordRepository {
    /// Creates the tree namespace when missing. Idempotent.
    fn ensure_tree(&self, tree: &TreeName) -> RepoResult<()>;
    /// Allocates a fresh xref and stores a new record with `facts` in order.
    fn create_record(
        &self,
        tree: &TreeName,
        kind: RecordKind,
        facts: &[FactLine],
    ) -> RepoResult<Record>;
    /// Loads one record by xref.
    fn get_record(&self, tree: &TreeName, xref: &Xref) -> RepoResult<Option<Record>>;
    /// Appends one fact at the end of an existing record.
    ///
    /// `update_change` controls whether the record change timestamp advances.
    fn append_fact(
        &self,
        tree: &TreeName,
        xref: &Xref,
        fact: &FactLine,
        update_change: bool,
    ) -> RepoResult<Record>;
    /// Counts records in a tree, optionally filtered by kind.
    fn count_records(&self, tree: &TreeName, kind: Option<RecordKind>) -> RepoResult<u64>;
}

impl<R: RecordRepository + ?Sized> RecordRepository for &R {
    fn ensure_tree(&self, tree: &TreeName) -> RepoResult<()> {
        (**self).ensure_tree(tree)
    }

    fn create_record(
        &self,
        tree: &TreeName,
        kind: RecordKind,
        facts: &[FactLine],
    ) -> RepoResult<Record> {
        (**self).create_record(tree, kind, facts)
    }

    fn get_record(&self, tree: &TreeName, xref: &Xref) -> RepoResult<Option<Record>> {
        (**self).get_record(tree, xref)
    }

    fn append_fact(
        &self,
        tree: &TreeName,
        xref: &Xref,
        fact: &FactLine,
        update_change: bool,
    ) -> RepoResult<Record> {
        (**self).append_fact(tree, xref, fact, update_change)
    }

    fn count_records(&self, tree: &TreeName, kind: Option<RecordKind>) -> RepoResult<u64> {
        (**self).count_records(tree, kind)
    }
}

/// SQLite-backed record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
    prefixes: XrefPrefixes,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Creates repository from a migrated connection with default prefixes.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_prefixes(conn, XrefPrefixes::default())
    }

    pub fn with_prefixes(conn: &'conn Connection, prefixes: XrefPrefixes) -> RepoResult<Self> {
        prefixes.validate()?;
        ensure_connection_ready(conn)?;
        Ok(Self { conn, prefixes })
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn ensure_tree(&self, tree: &TreeName) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO trees (name) VALUES (?1)
             ON CONFLICT(name) DO NOTHING;",
            [tree.as_str()],
        )?;
        Ok(())
    }

    fn create_record(
        &self,
        tree: &TreeName,
        kind: RecordKind,
        facts: &[FactLine],
    ) -> RepoResult<Record> {
        if let Some(line) = facts.iter().find(|line| line.level == 0) {
            return Err(RepoError::InvalidFact(format!(
                "level 0 is reserved for the record header: `{}`",
                line.to_line()
            )));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let xref = allocate_xref(&tx, tree, self.prefixes.for_kind(kind))?;

        tx.execute(
            "INSERT INTO records (tree, xref, kind) VALUES (?1, ?2, ?3);",
            params![tree.as_str(), xref.as_str(), kind.header_tag()],
        )?;
        for (seq, line) in facts.iter().enumerate() {
            insert_fact(&tx, tree, &xref, seq as i64, line)?;
        }
        tx.commit()?;

        load_required_record(self.conn, tree, &xref)
    }

    fn get_record(&self, tree: &TreeName, xref: &Xref) -> RepoResult<Option<Record>> {
        load_record(self.conn, tree, xref)
    }

    fn append_fact(
        &self,
        tree: &TreeName,
        xref: &Xref,
        fact: &FactLine,
        update_change: bool,
    ) -> RepoResult<Record> {
        if fact.level == 0 {
            return Err(RepoError::InvalidFact(format!(
                "cannot append a level-0 line: `{}`",
                fact.to_line()
            )));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !record_exists(&tx, tree, xref.as_str())? {
            return Err(RepoError::NotFound {
                tree: tree.clone(),
                xref: xref.clone(),
            });
        }

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), -1) + 1
             FROM facts
             WHERE tree = ?1 AND xref = ?2;",
            params![tree.as_str(), xref.as_str()],
            |row| row.get(0),
        )?;
        insert_fact(&tx, tree, xref, seq, fact)?;

        if update_change {
            tx.execute(
                "UPDATE records
                 SET updated_at = (strftime('%s', 'now') * 1000)
                 WHERE tree = ?1 AND xref = ?2;",
                params![tree.as_str(), xref.as_str()],
            )?;
        }
        tx.commit()?;

        load_required_record(self.conn, tree, xref)
    }

    fn count_records(&self, tree: &TreeName, kind: Option<RecordKind>) -> RepoResult<u64> {
        let count: i64 = match kind {
            Some(kind) => self.conn.query_row(
                "SELECT COUNT(*) FROM records WHERE tree = ?1 AND kind = ?2;",
                params![tree.as_str(), kind.header_tag()],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM records WHERE tree = ?1;",
                [tree.as_str()],
                |row| row.get(0),
            )?,
        };
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative record count `{count}`")))
    }
}

fn allocate_xref(conn: &Connection, tree: &TreeName, prefix: &str) -> RepoResult<Xref> {
    let mut counter: i64 = conn
        .query_row(
            "SELECT next_xref FROM trees WHERE name = ?1;",
            [tree.as_str()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| RepoError::TreeNotFound(tree.clone()))?;

    // Imported records may already occupy counter values.
    let candidate = loop {
        let candidate = format!("{prefix}{counter}");
        counter += 1;
        if !record_exists(conn, tree, &candidate)? {
            break candidate;
        }
    };

    conn.execute(
        "UPDATE trees SET next_xref = ?2 WHERE name = ?1;",
        params![tree.as_str(), counter],
    )?;

    Xref::parse(&candidate)
        .map_err(|err| RepoError::InvalidData(format!("allocated identifier rejected: {err}")))
}

fn record_exists(conn: &Connection, tree: &TreeName, xref: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM records WHERE tree = ?1 AND xref = ?2);",
        params![tree.as_str(), xref],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn insert_fact(
    conn: &Connection,
    tree: &TreeName,
    xref: &Xref,
    seq: i64,
    line: &FactLine,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO facts (tree, xref, seq, level, tag, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            tree.as_str(),
            xref.as_str(),
            seq,
            i64::from(line.level),
            line.tag.as_str(),
            line.value.as_str(),
        ],
    )?;
    Ok(())
}

fn load_required_record(conn: &Connection, tree: &TreeName, xref: &Xref) -> RepoResult<Record> {
    load_record(conn, tree, xref)?.ok_or_else(|| RepoError::NotFound {
        tree: tree.clone(),
        xref: xref.clone(),
    })
}

fn load_record(conn: &Connection, tree: &TreeName, xref: &Xref) -> RepoResult<Option<Record>> {
    let header: Option<(String, i64, i64)> = conn
        .query_row(
            "SELECT kind, created_at, updated_at
             FROM records
             WHERE tree = ?1 AND xref = ?2;",
            params![tree.as_str(), xref.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let Some((kind_text, created_at, updated_at)) = header else {
        return Ok(None);
    };

    let kind = RecordKind::parse_header_tag(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid record kind `{kind_text}` in records.kind"))
    })?;

    let mut stmt = conn.prepare(
        "SELECT seq, level, tag, value
         FROM facts
         WHERE tree = ?1 AND xref = ?2
         ORDER BY seq ASC;",
    )?;
    let mut rows = stmt.query(params![tree.as_str(), xref.as_str()])?;
    let mut facts = Vec::new();
    while let Some(row) = rows.next()? {
        let seq: i64 = row.get("seq")?;
        let level_raw: i64 = row.get("level")?;
        let level = u8::try_from(level_raw).map_err(|_| {
            RepoError::InvalidData(format!("invalid level `{level_raw}` in facts.level"))
        })?;
        let tag_text: String = row.get("tag")?;
        let tag = Tag::parse(&tag_text).map_err(|_| {
            RepoError::InvalidData(format!("invalid tag `{tag_text}` in facts.tag"))
        })?;
        facts.push(Fact {
            seq,
            line: FactLine::new(level, tag, row.get::<_, String>("value")?),
        });
    }

    Ok(Some(Record {
        tree: tree.clone(),
        xref: xref.clone(),
        kind,
        facts,
        created_at,
        updated_at,
    }))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{RepoError, XrefPrefixes};

    #[test]
    fn prefixes_must_be_short_alphabetic() {
        assert!(XrefPrefixes::default().validate().is_ok());
        let bad = XrefPrefixes {
            individual: "I1".to_string(),
            family: "F".to_string(),
        };
        assert!(matches!(bad.validate(), Err(RepoError::InvalidPrefix(p)) if p == "I1"));
    }
}
