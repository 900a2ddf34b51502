use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::LoggingConfig;

pub fn config_path(root: &Path) -> PathBuf {
    root.join("config").join("logging.json")
}

/// Load the persisted logging config, seeding the default on first use.
pub fn read_config(root: &Path) -> LoggingConfig {
    if !config_path(root).exists() {
        let cfg = LoggingConfig::default();
        let _ = write_config_atomic(root, &cfg);
        return cfg;
    }
    peek_config(root)
}

/// Load the persisted logging config without creating anything on disk.
pub fn peek_config(root: &Path) -> LoggingConfig {
    fs::read_to_string(config_path(root))
        .ok()
        .and_then(|contents| serde_json::from_str(&contents).ok())
        .unwrap_or_default()
}

pub fn write_config_atomic(root: &Path, cfg: &LoggingConfig) -> Result<()> {
    let path = config_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating logging config dir {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(cfg).context("serializing logging config")?;

    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp_path)
            .with_context(|| format!("opening {}", tmp_path.display()))?;
        std::io::Write::write_all(&mut file, &data)
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing {}", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, &path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_seeds_default() {
        let temp_dir = TempDir::new().unwrap();

        let cfg = read_config(temp_dir.path());

        assert_eq!(cfg, LoggingConfig::default());
        assert!(config_path(temp_dir.path()).exists());
    }

    #[test]
    fn peek_leaves_missing_config_absent() {
        let temp_dir = TempDir::new().unwrap();

        let cfg = peek_config(temp_dir.path());

        assert_eq!(cfg, LoggingConfig::default());
        assert!(!config_path(temp_dir.path()).exists());
        assert!(!temp_dir.path().join("config").exists());
    }

    #[test]
    fn peek_reads_existing_config() {
        let temp_dir = TempDir::new().unwrap();
        write_config_atomic(temp_dir.path(), &LoggingConfig::default().with_level("warn"))
            .unwrap();

        assert_eq!(peek_config(temp_dir.path()).level, "warn");
    }

    #[test]
    fn written_config_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = LoggingConfig::default().with_level("debug");

        write_config_atomic(temp_dir.path(), &cfg).unwrap();

        assert_eq!(read_config(temp_dir.path()).level, "debug");
        assert!(!config_path(temp_dir.path())
            .with_extension("json.tmp")
            .exists());
    }

    #[test]
    fn corrupt_config_falls_back_to_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(temp_dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{not json").unwrap();

        assert_eq!(read_config(temp_dir.path()), LoggingConfig::default());
    }

    #[test]
    fn older_config_without_file_flag_enables_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_path(temp_dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, br#"{"enabled":false,"level":"warn"}"#).unwrap();

        let cfg = read_config(temp_dir.path());
        assert!(!cfg.enabled);
        assert!(cfg.to_file);
    }
}
