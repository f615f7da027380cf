//! Ephemeral storage of private key material.

use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use russh::keys::{load_secret_key, PrivateKey};
use tempfile::TempDir;
use tracing::{debug, error};

use crate::error::SessionError;

/// Private key written to a directory only accessible by the current user.
///
/// The directory is removed by [`EphemeralKey::remove`] or, at the latest, when the
/// key is dropped.
#[derive(Debug)]
pub struct EphemeralKey {
    dir: TempDir,
    path: PathBuf,
}

impl EphemeralKey {
    /// Write the given key material to a fresh directory within `parent` or the
    /// system's temporary directory.
    pub fn create(parent: Option<&Path>, material: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("hostcheck-key-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        fs::set_permissions(dir.path(), Permissions::from_mode(0o700))?;
        let path = dir.path().join("id_key");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)?;
        file.write_all(material.as_bytes())?;
        if !material.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        file.sync_all()?;
        debug!("wrote ephemeral private key to {path:?}");
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the stored key.
    pub fn load(&self) -> Result<PrivateKey, SessionError> {
        load_secret_key(&self.path, None).map_err(|error| SessionError::KeyMaterial(error.to_string()))
    }

    /// Remove the key and its directory.
    pub fn remove(self) {
        let dir = self.dir.path().to_owned();
        if let Err(error) = self.dir.close() {
            error!("unable to remove ephemeral key directory {dir:?}: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_file_is_private_and_removed() {
        let parent = tempfile::tempdir().unwrap();
        let key = EphemeralKey::create(Some(parent.path()), "material").unwrap();
        let path = key.path().to_owned();
        assert!(path.starts_with(parent.path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "material\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        key.remove();
        assert!(!path.exists());
        assert_eq!(fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_key_file_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let key = EphemeralKey::create(Some(parent.path()), "material\n").unwrap();
        let path = key.path().to_owned();
        drop(key);
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_material_is_rejected() {
        let parent = tempfile::tempdir().unwrap();
        let key = EphemeralKey::create(Some(parent.path()), "not a private key").unwrap();
        assert!(matches!(key.load(), Err(SessionError::KeyMaterial(_))));
    }
}
