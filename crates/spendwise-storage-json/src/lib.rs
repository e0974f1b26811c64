use std::{
    cmp::Reverse,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use spendwise_core::{
    backup_to_json, parse_backup, storage::BlobStore, BackupDocument, CoreError, ImportBatch,
};
use tracing::{debug, warn};

const BLOB_EXTENSION: &str = "json";
const BACKUP_PREFIX: &str = "spendwise_backup_";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";
const TMP_SUFFIX: &str = "tmp";
pub const DEFAULT_RETENTION: usize = 5;

/// Directories used by [`JsonBlobStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub blob_root: PathBuf,
    pub backup_root: PathBuf,
}

impl StoragePaths {
    /// `<data_dir>/ledger` for blobs and `<data_dir>/backups` for backups.
    pub fn under(data_dir: &Path) -> Self {
        Self {
            blob_root: data_dir.join("ledger"),
            backup_root: data_dir.join("backups"),
        }
    }
}

/// A backup file found on disk.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    /// File name, used as the backup's identifier.
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Filesystem-backed blob store: one file per key plus timestamped backups.
#[derive(Debug, Clone)]
pub struct JsonBlobStorage {
    blob_root: PathBuf,
    backup_root: PathBuf,
    retention: usize,
}

impl JsonBlobStorage {
    pub fn new(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.blob_root)?;
        fs::create_dir_all(&paths.backup_root)?;
        Ok(Self {
            blob_root: paths.blob_root,
            backup_root: paths.backup_root,
            retention: retention.max(1),
        })
    }

    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.blob_root
            .join(format!("{}.{}", canonical_name(key), BLOB_EXTENSION))
    }

    pub fn backup_path(&self, backup_id: &str) -> PathBuf {
        self.backup_root.join(backup_id)
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Writes `document` as `spendwise_backup_<YYYYmmdd_HHMM>[_note].json`,
    /// stamped with the document's timestamp, then prunes old backups.
    /// A second backup with the same minute and note replaces the first.
    pub fn write_backup(
        &self,
        document: &BackupDocument,
        note: Option<&str>,
    ) -> Result<BackupInfo, CoreError> {
        fs::create_dir_all(&self.backup_root)?;
        let timestamp = document.timestamp.format(BACKUP_TIMESTAMP_FORMAT);
        let mut stem = format!("{BACKUP_PREFIX}{timestamp}");
        let note = sanitize_backup_note(note);
        if let Some(label) = note.as_deref() {
            stem.push('_');
            stem.push_str(label);
        }
        let file_name = format!("{}.{}", stem, BLOB_EXTENSION);
        let path = self.backup_path(&file_name);
        let data = backup_to_json(document)?;
        replace_file(&path, &data)?;
        debug!(backup = %file_name, "backup written");
        self.prune_backups()?;
        Ok(BackupInfo {
            created_at: parse_backup_timestamp(&file_name),
            size_bytes: data.len() as u64,
            id: file_name,
            note,
            path,
        })
    }

    /// Backups newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, CoreError> {
        if !self.backup_root.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backup_root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(BLOB_EXTENSION) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !file_name.starts_with(BACKUP_PREFIX) {
                continue;
            }
            let size_bytes = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
            entries.push(BackupInfo {
                id: file_name.to_string(),
                created_at: parse_backup_timestamp(file_name),
                note: parse_backup_note(file_name),
                size_bytes,
                path: path.clone(),
            });
        }
        entries.sort_by(|a, b| {
            Reverse(a.created_at)
                .cmp(&Reverse(b.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    /// Reads and validates a backup by id (its file name).
    pub fn read_backup(&self, backup_id: &str) -> Result<ImportBatch, CoreError> {
        let path = self.existing_backup(backup_id)?;
        parse_backup(&fs::read_to_string(path)?)
    }

    pub fn delete_backup(&self, backup_id: &str) -> Result<(), CoreError> {
        let path = self.existing_backup(backup_id)?;
        fs::remove_file(path)?;
        debug!(backup = %backup_id, "backup deleted");
        Ok(())
    }

    /// Resolves an id to a file directly inside the backups directory.
    fn existing_backup(&self, backup_id: &str) -> Result<PathBuf, CoreError> {
        let path = self.backup_path(backup_id);
        let escapes = backup_id.contains(|c: char| c == '/' || c == '\\') || backup_id == "..";
        if escapes || !path.is_file() {
            return Err(CoreError::Storage(format!("backup `{backup_id}` not found")));
        }
        Ok(path)
    }

    fn prune_backups(&self) -> Result<(), CoreError> {
        for entry in self.list_backups()?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                warn!(backup = %entry.id, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl BlobStore for JsonBlobStorage {
    fn read_blob(&self, key: &str) -> Result<Option<String>, CoreError> {
        match fs::read_to_string(self.blob_path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_blob(&self, key: &str, value: &str) -> Result<(), CoreError> {
        replace_file(&self.blob_path(key), value)
    }

    fn remove_blob(&self, key: &str) -> Result<(), CoreError> {
        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Writes `data` next to `path` and renames it into place.
pub fn replace_file(path: &Path, data: &str) -> Result<(), CoreError> {
    let tmp = tmp_path(path);
    write_atomic(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches(|c: char| c == '_' || c == '-').is_empty() {
        "blob".into()
    } else {
        sanitized
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn backup_stem(name: &str) -> Option<&str> {
    name.strip_suffix(&format!(".{}", BLOB_EXTENSION))?
        .strip_prefix(BACKUP_PREFIX)
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = backup_stem(name)?;
    let raw = stem.get(..13)?;
    NaiveDateTime::parse_from_str(raw, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn parse_backup_note(name: &str) -> Option<String> {
    backup_stem(name)?
        .get(13..)?
        .strip_prefix('_')
        .filter(|note| !note.is_empty())
        .map(str::to_string)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
