//! Save file discovery
//!
//! Uses the configured path when one is set, otherwise probes
//! `<data dir>/EldenRing/<steam id>/ER0000.sl2`.

use std::fs;
use std::path::{Path, PathBuf};

use deathwatch_types::AppConfig;
use thiserror::Error;

pub const SAVE_DIR_NAME: &str = "EldenRing";
pub const SAVE_FILE_NAME: &str = "ER0000.sl2";

/// Every variant means "not found"; callers retry later.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("save file not found at configured path: {0}")]
    ConfiguredPathMissing(PathBuf),

    #[error("user data directory could not be determined")]
    NoDataDir,

    #[error("EldenRing folder not found at {0}")]
    SaveDirMissing(PathBuf),

    #[error("save file ER0000.sl2 not found under {0}")]
    SaveFileMissing(PathBuf),
}

/// Resolve the save file for `config`, or probe the default location when no
/// config (or no configured path) is given.
pub fn resolve_save_path(config: Option<&AppConfig>) -> Result<PathBuf, LocateError> {
    if let Some(configured) = config.and_then(AppConfig::save_path) {
        let path = PathBuf::from(configured);
        return if path.exists() {
            Ok(path)
        } else {
            Err(LocateError::ConfiguredPathMissing(path))
        };
    }

    let root = default_save_root().ok_or(LocateError::NoDataDir)?;
    find_save_in(&root)
}

/// `%APPDATA%\EldenRing` on Windows; the platform data dir elsewhere.
pub fn default_save_root() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(SAVE_DIR_NAME))
}

/// First `<subdir>/ER0000.sl2` under `root`, visiting subdirectories in
/// name order.
pub fn find_save_in(root: &Path) -> Result<PathBuf, LocateError> {
    let entries =
        fs::read_dir(root).map_err(|_| LocateError::SaveDirMissing(root.to_path_buf()))?;

    let mut subdirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();
    subdirs.sort();

    subdirs
        .into_iter()
        .map(|dir| dir.join(SAVE_FILE_NAME))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| LocateError::SaveFileMissing(root.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_configured_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let save = dir.path().join(SAVE_FILE_NAME);
        let config = AppConfig {
            save_path: Some(save.to_string_lossy().to_string()),
            ..AppConfig::default()
        };

        assert!(matches!(
            resolve_save_path(Some(&config)),
            Err(LocateError::ConfiguredPathMissing(_))
        ));

        fs::write(&save, b"").unwrap();
        assert_eq!(resolve_save_path(Some(&config)).unwrap(), save);
    }

    #[test]
    fn test_probe_finds_first_subdir_with_save() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("100")).unwrap();
        fs::create_dir(root.path().join("200")).unwrap();
        fs::create_dir(root.path().join("300")).unwrap();
        fs::write(root.path().join("200").join(SAVE_FILE_NAME), b"").unwrap();
        fs::write(root.path().join("300").join(SAVE_FILE_NAME), b"").unwrap();
        // Loose files at the root are ignored
        fs::write(root.path().join(SAVE_FILE_NAME), b"").unwrap();

        let found = find_save_in(root.path()).unwrap();
        assert_eq!(found, root.path().join("200").join(SAVE_FILE_NAME));
    }

    #[test]
    fn test_probe_missing_root() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join(SAVE_DIR_NAME);
        assert!(matches!(
            find_save_in(&missing),
            Err(LocateError::SaveDirMissing(_))
        ));
    }

    #[test]
    fn test_probe_no_save_file() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("100")).unwrap();
        assert!(matches!(
            find_save_in(root.path()),
            Err(LocateError::SaveFileMissing(_))
        ));
    }
}
