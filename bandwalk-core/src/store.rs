// Storage for downloaded page bodies

use crate::error::StoreError;
use bandwalk_scanner::url_key;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub enum ContentStore {
    Memory(HashMap<PathBuf, String>),
    Directory(PathBuf),
}

impl Default for ContentStore {
    fn default() -> Self {
        ContentStore::Memory(HashMap::new())
    }
}

impl ContentStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn directory(root: impl Into<PathBuf>) -> Self {
        ContentStore::Directory(root.into())
    }

    /// Where the page at `url` lives for `subject`: `<subject>/<key>.html`,
    /// with the page key's spaces written as underscores. Distinct keys never
    /// share a reference.
    pub fn reference(&self, subject: &str, url: &str) -> PathBuf {
        let name = url_key(url).replace(' ', "_");
        let relative = Path::new(subject).join(format!("{}.html", name));
        match self {
            ContentStore::Memory(_) => relative,
            ContentStore::Directory(root) => root.join(relative),
        }
    }

    /// Stores `content` under `reference`. An existing entry is left as is.
    pub fn write(&mut self, reference: &Path, content: &str) -> Result<(), StoreError> {
        match self {
            ContentStore::Memory(pages) => {
                pages
                    .entry(reference.to_path_buf())
                    .or_insert_with(|| content.to_string());
                Ok(())
            }
            ContentStore::Directory(_) => {
                let io_error = |source| StoreError::Io {
                    path: reference.to_path_buf(),
                    source,
                };

                if let Some(parent) = reference.parent() {
                    fs::create_dir_all(parent).map_err(io_error)?;
                }

                match OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(reference)
                {
                    Ok(mut file) => file.write_all(content.as_bytes()).map_err(io_error),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        debug!("Keeping existing {}", reference.display());
                        Ok(())
                    }
                    Err(e) => Err(io_error(e)),
                }
            }
        }
    }

    pub fn read(&self, reference: &Path) -> Result<String, StoreError> {
        match self {
            ContentStore::Memory(pages) => pages
                .get(reference)
                .cloned()
                .ok_or_else(|| StoreError::Missing(reference.to_path_buf())),
            ContentStore::Directory(_) => fs::read_to_string(reference).map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    StoreError::Missing(reference.to_path_buf())
                } else {
                    StoreError::Io {
                        path: reference.to_path_buf(),
                        source,
                    }
                }
            }),
        }
    }
}
