// Atomic JSON file operations

use crate::error::{DownloadError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref FILE_LOCK: Mutex<()> = Mutex::new(());
}

fn lock() -> Result<std::sync::MutexGuard<'static, ()>> {
    FILE_LOCK
        .lock()
        .map_err(|e| DownloadError::Persistence(format!("Lock error: {}", e)))
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let _lock = lock()?;

    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    Ok(serde_json::from_str(&contents)?)
}

/// Writes pretty JSON atomically using write-to-temp-then-rename
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let _lock = lock()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json_string = serde_json::to_string_pretty(data)?;
    let temp_path = path.with_extension("tmp");

    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(json_string.as_bytes())?;
    temp_file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}

pub fn read_json_file_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        read_json_file(path)
    } else {
        Ok(T::default())
    }
}
