// CsvLedger: CommentLedger backed by a single CSV file.
//
// Columns: comment, username, timestamp, profile_color, avatar, is_toxic.
//
// Every operation takes the same tokio Mutex, so appends never interleave and
// a backfill rewrite cannot race an append. The lock is held only around
// synchronous file work; nothing awaits while holding it besides acquiring it.
//
// Appends open the file in append mode and write one record. Backfill and
// schema migration rewrite the whole file to a temp file and rename it over
// the existing one, so a crash mid-rewrite leaves the old contents intact.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::{Author, Comment, NewComment, TIMESTAMP_FORMAT};
use super::traits::CommentLedger;
use crate::classifier::traits::ToxicityClassifier;
use crate::error::ModerationError;
use crate::training::corpus::parse_label;

const HEADER: [&str; 6] = [
    "comment",
    "username",
    "timestamp",
    "profile_color",
    "avatar",
    "is_toxic",
];

/// Timestamp layouts accepted when reading; the first is the one written.
const READ_FORMATS: [&str; 3] = [TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// One row exactly as stored. Missing columns deserialize as empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct LedgerRecord {
    comment: String,
    username: String,
    timestamp: String,
    profile_color: String,
    avatar: String,
    is_toxic: String,
}

enum HeaderState {
    Missing,
    Current,
    /// Written by an older version, e.g. without the is_toxic column
    Legacy,
}

pub struct CsvLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header_state(&self) -> Result<HeaderState> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HeaderState::Missing),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", self.path.display()))
            }
        };
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let headers = rdr.headers()?;
        if headers.is_empty() {
            Ok(HeaderState::Missing)
        } else if headers.iter().map(str::trim).eq(HEADER) {
            Ok(HeaderState::Current)
        } else {
            Ok(HeaderState::Legacy)
        }
    }

    /// All rows with their line numbers, or None if the file does not exist.
    fn read_records(&self) -> Result<Option<Vec<(u64, LedgerRecord)>>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", self.path.display()))
            }
        };

        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let headers = rdr.headers()?.clone();
        let trimmed: csv::StringRecord = headers.iter().map(str::trim).collect();

        let mut records = Vec::new();
        for result in rdr.records() {
            let raw = result.with_context(|| format!("Failed to read {}", self.path.display()))?;
            let line = raw.position().map(|p| p.line()).unwrap_or(0);
            let record: LedgerRecord = raw
                .deserialize(Some(&trimmed))
                .with_context(|| format!("Failed to decode ledger row at line {line}"))?;
            records.push((line, record));
        }
        Ok(Some(records))
    }

    fn append_record(&self, record: &LedgerRecord, write_header: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for ledger: {}", parent.display())
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {} for append", self.path.display()))?;

        // A last row without a line terminator would swallow the new record
        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if write_header {
            wtr.write_record(HEADER)?;
        }
        wtr.serialize(record)?;
        wtr.flush()?;
        wtr.get_ref().sync_all()?;
        Ok(())
    }

    /// Replace the file contents with `records` via temp file + rename.
    fn rewrite<'a>(&self, records: impl IntoIterator<Item = &'a LedgerRecord>) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "ledger.csv".to_string());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));

        let write = || -> Result<()> {
            let file = fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            wtr.write_record(HEADER)?;
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
            wtr.get_ref().sync_all()?;
            Ok(())
        };

        if let Err(e) = write().and_then(|_| {
            fs::rename(&tmp, &self.path)
                .with_context(|| format!("Failed to replace {}", self.path.display()))
        }) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentLedger for CsvLedger {
    async fn append(&self, comment: NewComment) -> Result<Comment> {
        let _guard = self.lock.lock().await;

        let now = Local::now().naive_local();
        let record = LedgerRecord {
            comment: comment.text.clone(),
            username: comment.author.display_name.clone(),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            profile_color: comment.author.color.clone(),
            avatar: comment.author.avatar.clone(),
            is_toxic: flag(comment.is_toxic).to_string(),
        };

        match self.header_state()? {
            HeaderState::Missing => self.append_record(&record, true)?,
            HeaderState::Current => self.append_record(&record, false)?,
            HeaderState::Legacy => {
                let mut records: Vec<LedgerRecord> = self
                    .read_records()?
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(_, r)| r)
                    .collect();
                records.push(record.clone());
                info!(rows = records.len(), "Migrating ledger to current column layout");
                self.rewrite(&records)?;
            }
        }

        debug!(
            is_toxic = comment.is_toxic,
            username = %comment.author.display_name,
            "Appended comment to ledger"
        );

        Ok(Comment {
            text: comment.text,
            author: comment.author,
            submitted_at: parse_timestamp(&record.timestamp),
            is_toxic: comment.is_toxic,
        })
    }

    async fn load_all(&self, classifier: &dyn ToxicityClassifier) -> Result<Vec<Comment>> {
        let _guard = self.lock.lock().await;

        let layout = self.header_state()?;
        let Some(mut records) = self.read_records()? else {
            debug!("No ledger at {} yet", self.path.display());
            return Ok(Vec::new());
        };

        let mut comments = Vec::with_capacity(records.len());
        let mut backfilled = 0usize;

        for (line, record) in records.iter_mut() {
            let submitted_at = parse_timestamp(&record.timestamp);
            if submitted_at.is_none() && !record.timestamp.trim().is_empty() {
                let err = ModerationError::MalformedPersistedRow {
                    line: *line,
                    field: "timestamp",
                    value: record.timestamp.clone(),
                };
                warn!(error = %err, "Keeping row with unknown timestamp");
            }

            let stored = match record.is_toxic.trim() {
                "" => None,
                raw => {
                    let parsed = parse_label(raw);
                    if parsed.is_none() {
                        let err = ModerationError::MalformedPersistedRow {
                            line: *line,
                            field: "is_toxic",
                            value: raw.to_string(),
                        };
                        warn!(error = %err, "Re-deriving label for row");
                    }
                    parsed
                }
            };

            let is_toxic = match stored {
                Some(v) => v,
                None => {
                    let v = if record.comment.trim().is_empty() {
                        false
                    } else {
                        classifier.is_toxic(&record.comment).with_context(|| {
                            format!("Failed to backfill label for ledger row at line {line}")
                        })?
                    };
                    record.is_toxic = flag(v).to_string();
                    backfilled += 1;
                    v
                }
            };

            comments.push(Comment {
                text: record.comment.clone(),
                author: Author {
                    display_name: record.username.clone(),
                    color: record.profile_color.clone(),
                    avatar: record.avatar.clone(),
                },
                submitted_at,
                is_toxic,
            });
        }

        let legacy = matches!(layout, HeaderState::Legacy);
        if backfilled > 0 || legacy {
            self.rewrite(records.iter().map(|(_, r)| r))?;
            info!(
                backfilled,
                rows = records.len(),
                "Persisted backfilled labels to {}",
                self.path.display()
            );
        }

        Ok(comments)
    }

    async fn count(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.read_records()?.map(|r| r.len()).unwrap_or(0))
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    READ_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
