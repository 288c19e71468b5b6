//! secrets::file_store
//!
//! Saved credentials in `~/.latchkey/credentials.toml`.
//!
//! Every mutation is a locked read-modify-write: take an exclusive `fs2` lock
//! on `credentials.lock`, load the table, apply the change, write a 0600 temp
//! file and rename it over the original. A session token and its user record
//! therefore appear or disappear in one rename, and two `lk` processes never
//! drop each other's keys.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use fs2::FileExt;

use super::traits::{SecretError, SecretStore};

type Table = BTreeMap<String, String>;

/// TOML-backed credential store, the default provider.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
}

/// Held for the duration of one mutation.
struct FileLock(File);

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileSecretStore {
    /// Store at `~/.latchkey/credentials.toml`.
    pub fn new() -> Result<Self, SecretError> {
        dirs::home_dir()
            .map(|home| Self::with_path(home.join(".latchkey").join("credentials.toml")))
            .ok_or_else(|| SecretError::Unavailable("no home directory for credentials".into()))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<FileLock, SecretError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| SecretError::Write(format!("{}: {}", dir.display(), e)))?;

        let lock_path = self.path.with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| SecretError::Write(format!("{}: {}", lock_path.display(), e)))?;
        file.lock_exclusive()
            .map_err(|e| SecretError::Write(format!("lock {}: {}", lock_path.display(), e)))?;
        Ok(FileLock(file))
    }

    fn load(&self) -> Result<Table, SecretError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Table::new()),
            Err(e) => return Err(SecretError::Read(format!("{}: {}", self.path.display(), e))),
        };
        // toml's error text quotes the offending line, which may hold a token.
        toml::from_str(&text).map_err(|_| {
            SecretError::Read(format!("{} is not a valid credentials file", self.path.display()))
        })
    }

    fn commit(&self, table: &Table) -> Result<(), SecretError> {
        let staged = self.path.with_extension("toml.tmp");
        let text = toml::to_string(table)
            .map_err(|e| SecretError::Write(format!("encode credentials: {}", e)))?;

        let mut options = OpenOptions::new();
        options.create(true).truncate(true).write(true);
        #[cfg(unix)]
        options.mode(0o600);

        let write = |file: &mut File| -> std::io::Result<()> {
            #[cfg(unix)]
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
            file.write_all(text.as_bytes())?;
            file.sync_all()
        };
        options
            .open(&staged)
            .and_then(|mut file| write(&mut file))
            .and_then(|()| fs::rename(&staged, &self.path))
            .map_err(|e| SecretError::Write(format!("{}: {}", self.path.display(), e)))
    }

    /// Run `change` against the locked table; persist only if it reports a change.
    fn mutate(&self, change: impl FnOnce(&mut Table) -> bool) -> Result<(), SecretError> {
        let _guard = self.lock()?;
        let mut table = self.load()?;
        if change(&mut table) {
            self.commit(&table)?;
        }
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        self.set_many(&[(key, value)])
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        self.delete_many(&[key])
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), SecretError> {
        self.mutate(|table| {
            table.extend(entries.iter().map(|(k, v)| (k.to_string(), v.to_string())));
            !entries.is_empty()
        })
    }

    fn delete_many(&self, keys: &[&str]) -> Result<(), SecretError> {
        self.mutate(|table| {
            keys.iter()
                .fold(false, |changed, key| table.remove(*key).is_some() || changed)
        })
        .map_err(|e| match e {
            SecretError::Write(detail) => SecretError::Delete(detail),
            other => other,
        })
    }
}
