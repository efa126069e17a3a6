//! # File I/O Module
//!
//! JSON documents (settings, trait and experiment batches, fibre rows) are
//! read and written through this module:
//! - **Atomic saves**: write to a `.tmp` sibling, fsync, rename over the target
//! - **Version validation**: settings files must match the schema major version
//!
//! ## Example
//!
//! ```rust,no_run
//! use mech_core::file_io::{load_settings, save_settings};
//! use mech_core::settings::Settings;
//! use std::path::Path;
//!
//! let path = Path::new("mech-settings.json");
//! save_settings(&Settings::default(), path)?;
//! let settings = load_settings(path)?;
//! # Ok::<(), mech_core::errors::MechError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::errors::{MechError, MechResult};
use crate::settings::{Settings, SCHEMA_VERSION};

/// Read a file to a string.
pub fn read_text(path: &Path) -> MechResult<String> {
    let mut file = File::open(path).map_err(|e| MechError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| MechError::file_error("read", path.display().to_string(), e.to_string()))?;
    Ok(contents)
}

/// Write `contents` to `path` atomically.
///
/// The save process:
/// 1. Write to a temporary file next to the target
/// 2. Sync to disk (fsync)
/// 3. Rename over the target (atomic on most filesystems)
pub fn write_text_atomic(path: &Path, contents: &str) -> MechResult<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name).to_path_buf();

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| MechError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .write_all(contents.as_bytes())
        .map_err(|e| MechError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .sync_all()
        .map_err(|e| MechError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        MechError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!(path = %path.display(), bytes = contents.len(), "Saved file");
    Ok(())
}

/// Load any JSON document.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> MechResult<T> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| MechError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))
}

/// Save any serializable value as pretty JSON, atomically.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> MechResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_text_atomic(path, &json)
}

/// Load a settings file and check its schema version.
pub fn load_settings(path: &Path) -> MechResult<Settings> {
    let settings: Settings = load_json(path)?;
    validate_version(&settings.version)?;
    settings.validate()?;
    Ok(settings)
}

/// Save a settings file atomically.
pub fn save_settings(settings: &Settings, path: &Path) -> MechResult<()> {
    save_json(settings, path)
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> MechResult<()> {
    let mismatch = || MechError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // On 0.x a newer minor may carry breaking changes
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("mech_test_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_settings_roundtrip() {
        let path = temp_path("settings");
        let mut settings = Settings::default();
        settings.bundle.options.strain_points = 500;
        save_settings(&settings, &path).unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.bundle.options.strain_points, 500);
        assert_eq!(loaded.trait_types, settings.trait_types);
        assert_eq!(loaded.base_units, settings.base_units);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_path("atomic");
        save_json(&vec![1, 2, 3], &path).unwrap();

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        assert!(!Path::new(&tmp).exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version("0.1.0").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_json::<Settings>(Path::new("/nonexistent/mech/settings.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_load_invalid_json() {
        let path = temp_path("invalid");
        fs::write(&path, "{not json").unwrap();
        let err = load_json::<Settings>(&path).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
        let _ = fs::remove_file(&path);
    }
}
