//! Descriptor and mirror loading
//!
//! The manifest directory holds one TOML descriptor per component. The
//! mirror directory holds prebuilt dependency payloads named
//! `<name>-<version>`; scanning it yields both the version index used for
//! locking and the fetcher that serves the payload bytes.

use crate::error::CliError;
use deskbuild_errors::Error;
use deskbuild_store::{Fetcher, InMemoryIndex};
use deskbuild_types::{ComponentDescriptor, RawDescriptor, Version};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};

/// Load and validate every `*.toml` descriptor in a directory
pub async fn load_descriptors(dir: &Path) -> Result<Vec<ComponentDescriptor>, CliError> {
    let mut descriptors = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "toml") {
            continue;
        }
        let text = tokio::fs::read_to_string(&path).await?;
        let raw = RawDescriptor::from_toml(&text)?;
        descriptors.push(raw.validate(dir)?);
    }

    if descriptors.is_empty() {
        return Err(CliError::InvalidArguments(format!(
            "no component descriptors found in {}",
            dir.display()
        )));
    }

    // Deterministic input order regardless of directory iteration order
    descriptors.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(descriptors)
}

/// Serves dependency payloads from a local mirror directory
pub struct MirrorFetcher {
    root: PathBuf,
}

impl MirrorFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Fetcher for MirrorFetcher {
    fn fetch<'a>(
        &'a self,
        name: &'a str,
        version: &'a Version,
    ) -> BoxFuture<'a, Result<Vec<u8>, Error>> {
        Box::pin(async move {
            let path = self.root.join(format!("{name}-{version}"));
            tokio::fs::read(&path)
                .await
                .map_err(|e| Error::io_with_path(&e, &path))
        })
    }
}

/// Build a version index from a mirror directory
///
/// Every file named `<name>-<version>` becomes a candidate pinned to the
/// blake3 hash of its content. A missing mirror directory yields an empty
/// index: components without build dependencies still build fine.
pub async fn scan_mirror(dir: &Path) -> Result<InMemoryIndex, CliError> {
    let mut index = InMemoryIndex::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(index),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((name, version)) = split_ident(file_name) else {
            continue;
        };
        let bytes = tokio::fs::read(&path).await?;
        let hash = blake3::hash(&bytes).to_hex().to_string();
        index.publish(name, version, hash);
    }

    Ok(index)
}

/// Split `<name>-<version>` at the last hyphen that starts a valid version
///
/// Component names may themselves contain hyphens, so the split scans from
/// the right.
fn split_ident(file_name: &str) -> Option<(&str, Version)> {
    for (pos, _) in file_name.rmatch_indices('-') {
        if let Ok(version) = Version::parse(&file_name[pos + 1..]) {
            if pos > 0 {
                return Some((&file_name[..pos], version));
            }
        }
    }
    None
}
