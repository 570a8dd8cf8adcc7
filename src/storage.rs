use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::Local;
use directories::ProjectDirs;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    constants::{FILE_PATHS, MAX_BACKUPS, PROJECT_DIRS},
    domain::Store,
    error::Result,
    repair::repair_record,
};

/// Where the serialized record lives. The tracker only ever reads it once at
/// startup and writes it whole after each change.
pub trait RecordStore {
    fn read_raw(&self) -> Result<Option<String>>;
    fn write_raw(&self, content: &str) -> Result<()>;
}

pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(FILE_PATHS.record))
    }
}

impl RecordStore for FileRecordStore {
    fn read_raw(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_raw(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&self.path, content)
    }
}

/// Read and repair the record. Anything unreadable or structurally broken
/// yields an empty store.
pub fn load_store(backend: &dyn RecordStore, now: i64) -> Store {
    let raw = match backend.read_raw() {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no stopwatch record yet, starting empty");
            return Store::empty();
        }
        Err(e) => {
            warn!(error = %e, "could not read stopwatch record, starting empty");
            return Store::empty();
        }
    };

    match parse_store(&raw, now) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "discarding malformed stopwatch record");
            Store::empty()
        }
    }
}

pub fn parse_store(raw: &str, now: i64) -> Result<Store> {
    let value: Value = serde_json::from_str(raw)?;
    repair_record(&value, now)
}

pub fn save_store(backend: &dyn RecordStore, store: &Store) -> Result<()> {
    let json = serde_json::to_string_pretty(store)?;
    backend.write_raw(&json)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(
        PROJECT_DIRS.qualifier,
        PROJECT_DIRS.organization,
        PROJECT_DIRS.application,
    )
}

pub fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join(FILE_PATHS.config))
        .unwrap_or_else(|| PathBuf::from(FILE_PATHS.config))
}

/// Write a file that is not the record, such as an export. No backup is kept.
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    replace_file(path, content)
}

pub fn create_backup(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let backup_dir = path
        .parent()
        .unwrap_or(Path::new("."))
        .join(FILE_PATHS.backups);
    fs::create_dir_all(&backup_dir)?;

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let timestamp = Local::now().format("%Y%m%d_%H%M%S%.3f");
    let mut backup_path = backup_dir.join(format!("{file_name}.{timestamp}"));
    let mut suffix = 1;
    while backup_path.exists() {
        backup_path = backup_dir.join(format!("{file_name}.{timestamp}-{suffix}"));
        suffix += 1;
    }
    fs::copy(path, &backup_path)?;

    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    if let Ok(entries) = fs::read_dir(&backup_dir) {
        let mut backups: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(&*stem))
            .collect();
        backups.sort_by_key(|e| e.file_name());

        let excess = backups.len().saturating_sub(MAX_BACKUPS);
        for oldest in backups.iter().take(excess) {
            let _ = fs::remove_file(oldest.path());
        }
    }

    Ok(())
}

pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        create_backup(path)?;
    }
    replace_file(path, content)
}

fn replace_file(path: &Path, content: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(content.as_bytes())?;
    tmp_file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
