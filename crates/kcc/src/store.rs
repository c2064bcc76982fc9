//! JSON-backed profile store.
//!
//! The file is read once when the store is opened and written back only by
//! `save`, after a mutating command. Writes go through a temporary file in
//! the same directory and are renamed into place.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{ProfileKind, StoreError};
use crate::model::{BuildProfile, MapProfile, ProfileFile, scaffold_build, scaffold_map};

#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    file: ProfileFile,
    dirty: bool,
}

impl ProfileStore {
    /// Open the store at `path`. A missing or blank file yields an empty
    /// store; malformed JSON is an error so it is never overwritten.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = if !path.exists() {
            tracing::info!("no profile file at {}; starting empty", path.display());
            ProfileFile::default()
        } else {
            let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            if content.trim().is_empty() {
                tracing::warn!(
                    "{} does not contain any JSON; creating new config",
                    path.display()
                );
                ProfileFile::default()
            } else {
                serde_json::from_str(&content).map_err(|e| StoreError::Decode {
                    path: path.to_path_buf(),
                    source: e,
                })?
            }
        };
        tracing::debug!(
            "loaded {} build profile(s), {} map profile(s) from {}",
            file.builds.len(),
            file.maps.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_build_profile(&self, name: &str) -> Result<&BuildProfile, StoreError> {
        self.file
            .builds
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| StoreError::NotFound {
                kind: ProfileKind::Build,
                name: name.to_string(),
            })
    }

    pub fn get_map_profile(&self, name: &str) -> Result<&MapProfile, StoreError> {
        self.file
            .maps
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| StoreError::NotFound {
                kind: ProfileKind::Map,
                name: name.to_string(),
            })
    }

    pub fn list_build_profiles(&self) -> &[BuildProfile] {
        &self.file.builds
    }

    pub fn list_map_profiles(&self) -> &[MapProfile] {
        &self.file.maps
    }

    pub fn create_build_profile(&mut self, name: &str) -> Result<&BuildProfile, StoreError> {
        check_name(ProfileKind::Build, name)?;
        if self.get_build_profile(name).is_ok() {
            return Err(StoreError::AlreadyExists {
                kind: ProfileKind::Build,
                name: name.to_string(),
            });
        }
        tracing::info!("creating build profile '{}'", name);
        self.file.builds.push(scaffold_build(name));
        self.dirty = true;
        Ok(&self.file.builds[self.file.builds.len() - 1])
    }

    pub fn create_map_profile(&mut self, name: &str) -> Result<&MapProfile, StoreError> {
        check_name(ProfileKind::Map, name)?;
        if self.get_map_profile(name).is_ok() {
            return Err(StoreError::AlreadyExists {
                kind: ProfileKind::Map,
                name: name.to_string(),
            });
        }
        tracing::info!("creating map profile '{}'", name);
        self.file.maps.push(scaffold_map(name));
        self.dirty = true;
        Ok(&self.file.maps[self.file.maps.len() - 1])
    }

    /// Write the store back if anything changed. Returns whether it wrote.
    pub fn save(&mut self) -> Result<bool, StoreError> {
        if !self.dirty {
            return Ok(false);
        }
        let mut json = serde_json::to_string_pretty(&self.file)?;
        json.push('\n');

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |e: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source: e,
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        // The temp file is private; carry over the mode of the file it replaces.
        if let Ok(existing) = std::fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(existing.permissions())
                .map_err(io_err)?;
        }
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        tracing::debug!("saved profiles to {}", self.path.display());
        self.dirty = false;
        Ok(true)
    }
}

fn check_name(kind: ProfileKind, name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::EmptyName { kind });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "builds": [
    {
      "name": "fast",
      "tools": [
        { "name": "qbsp", "path": false, "args": ["-nofill", "<SRC>"] }
      ]
    }
  ],
  "maps": [
    { "name": "e1m1", "game": "quake", "map_source": "/maps/e1m1.map", "map_dest": "/game/maps" }
  ]
}"#;

    #[test]
    fn missing_and_blank_files_open_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::open(&dir.path().join("config.json")).unwrap();
        assert!(store.list_build_profiles().is_empty());
        assert!(store.list_map_profiles().is_empty());

        let blank = dir.path().join("blank.json");
        std::fs::write(&blank, "  \n").unwrap();
        let store = ProfileStore::open(&blank).unwrap();
        assert!(store.list_build_profiles().is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{\"builds\": [").unwrap();
        assert!(matches!(
            ProfileStore::open(&path),
            Err(StoreError::Decode { .. })
        ));
    }

    #[test]
    fn lookups_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let store = ProfileStore::open(&path).unwrap();

        let build = store.get_build_profile("fast").unwrap();
        assert_eq!(build.tools[0].args, vec!["-nofill", "<SRC>"]);
        assert_eq!(
            store.get_map_profile("e1m1").unwrap().map_dest,
            "/game/maps"
        );
        assert!(matches!(
            store.get_build_profile("slow"),
            Err(StoreError::NotFound { kind: ProfileKind::Build, .. })
        ));
        assert!(matches!(
            store.get_map_profile("e1m2"),
            Err(StoreError::NotFound { kind: ProfileKind::Map, .. })
        ));
    }

    #[test]
    fn create_persists_scaffolds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut store = ProfileStore::open(&path).unwrap();

        let b = store.create_build_profile("fast").unwrap();
        assert_eq!(b.tools.len(), 3);
        store.create_map_profile("e1m1").unwrap();
        assert!(store.save().unwrap());
        assert!(!store.save().unwrap());

        let reopened = ProfileStore::open(&path).unwrap();
        let names: Vec<&str> = reopened.list_build_profiles()[0]
            .tools
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["qbsp", "light", "vis"]);
        assert_eq!(reopened.list_map_profiles()[0].name, "e1m1");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["builds"][0]["tools"][0]["path"], serde_json::json!(false));
        assert_eq!(raw["maps"][0]["map_source"], serde_json::json!(""));
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_existing_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut store = ProfileStore::open(&path).unwrap();
        store.create_map_profile("e1m2").unwrap();
        assert!(store.save().unwrap());

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert_eq!(
            ProfileStore::open(&path).unwrap().list_map_profiles().len(),
            2
        );
    }

    #[test]
    fn duplicates_and_empty_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let mut store = ProfileStore::open(&path).unwrap();

        assert!(matches!(
            store.create_build_profile("fast"),
            Err(StoreError::AlreadyExists { kind: ProfileKind::Build, .. })
        ));
        assert!(matches!(
            store.create_map_profile("e1m1"),
            Err(StoreError::AlreadyExists { kind: ProfileKind::Map, .. })
        ));
        assert!(matches!(
            store.create_map_profile(""),
            Err(StoreError::EmptyName { .. })
        ));
        assert!(!store.save().unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }
}
