// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::error::{self, Result};
use log::debug;
use snafu::ResultExt;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `Datastore` persists TUF metadata files, one file per role, in a single
/// directory. A datastore belongs to exactly one updater; there is no
/// cross-process locking.
#[derive(Debug, Clone)]
pub(crate) struct Datastore {
    path: PathBuf,
}

impl Datastore {
    pub(crate) fn new(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path).context(error::DirCreate { path: &path })?;
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read a file from the datastore, returning `None` if it does not
    /// exist.
    pub(crate) fn bytes(&self, file: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path.join(file);
        let mut f = match File::open(&path) {
            Ok(f) => f,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => return Ok(None),
                _ => return Err(err).context(error::FileOpen { path }),
            },
        };
        let mut data = Vec::new();
        f.read_to_end(&mut data).context(error::FileRead { path })?;
        Ok(Some(data))
    }

    /// Write a file into the datastore, atomically: the bytes go to a
    /// temporary file in the same directory which is then renamed over the
    /// destination. An interrupted write leaves the previous contents in
    /// place; the temporary file is removed when it is dropped.
    pub(crate) fn write(&self, file: &str, data: &[u8]) -> Result<()> {
        let path = self.path.join(file);
        debug!("persisting '{}'", path.display());
        let mut temp = NamedTempFile::new_in(&self.path).context(error::TempFileCreate {
            path: &self.path,
        })?;
        temp.write_all(data).context(error::FileWrite { path: &path })?;
        temp.persist(&path).context(error::TempFilePersist { path })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Datastore;

    #[test]
    fn write_then_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let datastore = Datastore::new(dir.path().to_owned()).unwrap();
        assert_eq!(datastore.bytes("root.json").unwrap(), None);
        datastore.write("root.json", b"{}").unwrap();
        assert_eq!(datastore.bytes("root.json").unwrap(), Some(b"{}".to_vec()));
        datastore.write("root.json", b"{\"a\":1}").unwrap();
        assert_eq!(
            datastore.bytes("root.json").unwrap(),
            Some(b"{\"a\":1}".to_vec())
        );
    }
}
