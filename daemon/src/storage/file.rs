use log::warn;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub trait FileIoWithBackup {
    /// Writes the given content to a file and creates a backup of the file before writing.
    fn write_with_backup<P: AsRef<Path>>(path: P, content: &str) -> Result<(), std::io::Error> {
        let path = path.as_ref();

        if path.exists() {
            let backup_path = path.with_extension("bak");

            // Create a backup of the file
            std::fs::copy(path, backup_path)?;
        }

        // Write the content to the file
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Trait for json documents kept on disk: the app config and the daemon's data files.
pub trait Config: FileIoWithBackup {
    type ConfigType: Serialize + for<'de> Deserialize<'de>;

    fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Self::ConfigType> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self::ConfigType = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn save_config<P: AsRef<Path>>(path: P, config: &Self::ConfigType) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(config)?;
        Self::write_with_backup(path, &content)?;
        Ok(())
    }

    /// Missing file: the default is written out. Unreadable or malformed file: the
    /// default is used and the file is left as it is.
    fn load_config_or_default<P: AsRef<Path>, F: FnOnce() -> Self::ConfigType>(
        path: P,
        default: F,
    ) -> Self::ConfigType {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => match Self::load_config(path) {
                Ok(config) => config,
                Err(err) => {
                    warn!("could not load {}, using defaults: {}", path.display(), err);
                    default()
                }
            },
            _ => {
                let config = default();
                if let Err(err) = Self::save_config(path, &config) {
                    warn!("could not write {}: {}", path.display(), err);
                }
                config
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Scores;
    impl FileIoWithBackup for Scores {}
    impl Config for Scores {
        type ConfigType = BTreeMap<String, u32>;
    }

    #[test]
    fn missing_file_is_created_from_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");

        let loaded = Scores::load_config_or_default(&path, || BTreeMap::from([("a".into(), 1)]));
        assert_eq!(loaded.get("a"), Some(&1));
        assert!(path.exists());
    }

    #[test]
    fn malformed_file_falls_back_and_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = Scores::load_config_or_default(&path, BTreeMap::new);
        assert!(loaded.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn save_keeps_previous_version_as_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");

        Scores::save_config(&path, &BTreeMap::from([("a".into(), 1)])).unwrap();
        Scores::save_config(&path, &BTreeMap::from([("a".into(), 2)])).unwrap();

        let backup = Scores::load_config(path.with_extension("bak")).unwrap();
        assert_eq!(backup.get("a"), Some(&1));
        assert_eq!(Scores::load_config(&path).unwrap().get("a"), Some(&2));
    }
}
