use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, ReplytreeError};
use crate::model::{Checkpoint, PostRecord};
use crate::permalink::{handle_key, normalize_permalink};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS checkpoints (
    owner TEXT PRIMARY KEY,
    resume_id TEXT NOT NULL,
    exclusive INTEGER NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Drop everything captured before the checkpoint post.
///
/// An exclusive checkpoint also drops the post itself. A checkpoint that does
/// not occur in the capture leaves it untouched.
pub fn apply_checkpoint(
    records: Vec<PostRecord>,
    checkpoint: &Checkpoint,
    warnings: &mut Vec<String>,
) -> Vec<PostRecord> {
    let resume_id = normalize_permalink(&checkpoint.resume_id);
    let Some(position) = records.iter().position(|record| record.id == resume_id) else {
        warnings.push(format!(
            "checkpoint post {resume_id} not found in capture; rendering everything"
        ));
        return records;
    };

    let skip = if checkpoint.exclusive {
        position + 1
    } else {
        position
    };
    tracing::debug!(skip, exclusive = checkpoint.exclusive, "applied checkpoint");
    records.into_iter().skip(skip).collect()
}

/// Checkpoint that resumes strictly after the last captured post.
pub fn next_checkpoint(records: &[PostRecord]) -> Option<Checkpoint> {
    records.last().map(|record| Checkpoint {
        resume_id: record.id.clone(),
        exclusive: true,
    })
}

/// Per-owner checkpoints kept in a small sqlite database.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    conn: Connection,
}

impl CheckpointStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ReplytreeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)
            .and_then(|conn| conn.execute(SCHEMA, []).map(|_| conn))
            .map_err(|source| ReplytreeError::Sqlite {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, owner: &str) -> Result<Option<Checkpoint>> {
        self.query_checkpoint(&handle_key(owner))
            .map_err(|source| self.sqlite_error(source))
    }

    pub fn save(&self, owner: &str, checkpoint: &Checkpoint) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO checkpoints (owner, resume_id, exclusive, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner) DO UPDATE SET
                    resume_id = excluded.resume_id,
                    exclusive = excluded.exclusive,
                    updated_at = excluded.updated_at",
                params![
                    handle_key(owner),
                    checkpoint.resume_id,
                    i64::from(checkpoint.exclusive),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map(|_| ())
            .map_err(|source| self.sqlite_error(source))
    }

    fn query_checkpoint(
        &self,
        owner_key: &str,
    ) -> std::result::Result<Option<Checkpoint>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT resume_id, exclusive FROM checkpoints WHERE owner = ?1 LIMIT 1")?;
        stmt.query_row([owner_key], |row| {
            Ok(Checkpoint {
                resume_id: row.get::<_, String>(0)?,
                exclusive: row.get::<_, i64>(1)? != 0,
            })
        })
        .optional()
    }

    fn sqlite_error(&self, source: rusqlite::Error) -> ReplytreeError {
        ReplytreeError::Sqlite {
            path: self.path.clone(),
            source,
        }
    }
}
