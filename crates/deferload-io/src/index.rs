// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The module index: which file backs which export of which module.
//!
//! The index is the only thing a [`DirectorySource`](crate::DirectorySource)
//! consults before touching the disk. It is stored either as a packed
//! bincode list (`index.bin`) or as a hand-written RON manifest (`index.ron`):
//!
//! ```text
//! [
//!     (
//!         module: "components/Carousel",
//!         kind: "html",
//!         exports: {
//!             "default": "carousel/index.html",
//!             "CarouselClient": "carousel/client.html",
//!         },
//!     ),
//! ]
//! ```

use deferload_core::{LoadFailure, ModuleSpecifier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// File name of the packed bincode index.
pub const BINARY_INDEX_FILE: &str = "index.bin";

/// File name of the RON manifest.
pub const MANIFEST_INDEX_FILE: &str = "index.ron";

/// Describes one module and the files behind its exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// The module path requests use.
    pub module: String,
    /// The content kind, used by the loader to pick a decoder.
    pub kind: String,
    /// Export name to file path, relative to the source root.
    pub exports: BTreeMap<String, PathBuf>,
}

/// An error raised while building, reading or writing a [`ModuleIndex`].
#[derive(Debug, Error)]
pub enum IndexError {
    /// Neither index file exists in the directory.
    #[error("no index.bin or index.ron found in '{}'", .root.display())]
    Missing {
        /// The directory that was searched.
        root: PathBuf,
    },
    /// Reading an index file failed.
    #[error("failed to read index '{}': {source}", .path.display())]
    Io {
        /// The index file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The packed index could not be decoded.
    #[error("invalid binary index: {0}")]
    Decode(String),
    /// The index could not be encoded.
    #[error("failed to encode index: {0}")]
    Encode(String),
    /// The RON manifest could not be parsed.
    #[error("invalid index manifest: {0}")]
    Manifest(String),
    /// Two entries describe the same module.
    #[error("module '{0}' is listed more than once")]
    DuplicateModule(String),
    /// An export path is absolute or leaves the source root.
    #[error("export path '{}' of module '{module}' must stay inside the source root", .path.display())]
    UnsafePath {
        /// The offending module.
        module: String,
        /// The offending path.
        path: PathBuf,
    },
}

/// In-memory lookup table from module path to [`ModuleMetadata`].
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    entries: HashMap<String, ModuleMetadata>,
}

impl ModuleIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a list of entries.
    ///
    /// # Errors
    /// Fails on duplicate modules and on export paths that escape the root.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ModuleMetadata>,
    ) -> Result<Self, IndexError> {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry)?;
        }
        Ok(index)
    }

    /// Adds one entry.
    ///
    /// # Errors
    /// Fails if the module is already present or an export path is unsafe.
    pub fn insert(&mut self, metadata: ModuleMetadata) -> Result<(), IndexError> {
        if let Some(path) = metadata.exports.values().find(|p| !is_contained(p)) {
            return Err(IndexError::UnsafePath {
                module: metadata.module.clone(),
                path: path.clone(),
            });
        }
        if self.entries.contains_key(&metadata.module) {
            return Err(IndexError::DuplicateModule(metadata.module));
        }
        self.entries.insert(metadata.module.clone(), metadata);
        Ok(())
    }

    /// Looks up a module's metadata.
    pub fn get(&self, module: &str) -> Option<&ModuleMetadata> {
        self.entries.get(module)
    }

    /// The number of modules in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no modules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over module paths, in no particular order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Finds the metadata and relative file path behind a specifier.
    ///
    /// # Errors
    /// [`LoadFailure::NotFound`] or [`LoadFailure::MissingExport`].
    pub fn resolve(
        &self,
        specifier: &ModuleSpecifier,
    ) -> Result<(&ModuleMetadata, &Path), LoadFailure> {
        let metadata = self
            .get(specifier.module())
            .ok_or_else(|| LoadFailure::NotFound {
                module: specifier.module().to_string(),
            })?;
        let path = metadata
            .exports
            .get(specifier.export())
            .ok_or_else(|| LoadFailure::MissingExport {
                module: specifier.module().to_string(),
                export: specifier.export().to_string(),
            })?;
        Ok((metadata, path.as_path()))
    }

    /// Decodes a packed index.
    pub fn from_bincode(bytes: &[u8]) -> Result<Self, IndexError> {
        let config = bincode::config::standard();
        let (entries, _): (Vec<ModuleMetadata>, _) =
            bincode::serde::decode_from_slice(bytes, config)
                .map_err(|e| IndexError::Decode(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// Encodes the index in packed form. Entries are sorted by module path
    /// so the output is deterministic.
    pub fn to_bincode(&self) -> Result<Vec<u8>, IndexError> {
        bincode::serde::encode_to_vec(self.sorted_entries(), bincode::config::standard())
            .map_err(|e| IndexError::Encode(e.to_string()))
    }

    /// Parses a RON manifest.
    pub fn from_ron_str(manifest: &str) -> Result<Self, IndexError> {
        let entries: Vec<ModuleMetadata> =
            ron::from_str(manifest).map_err(|e| IndexError::Manifest(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// Renders the index as a pretty-printed RON manifest.
    pub fn to_ron_string(&self) -> Result<String, IndexError> {
        ron::ser::to_string_pretty(&self.sorted_entries(), ron::ser::PrettyConfig::default())
            .map_err(|e| IndexError::Encode(e.to_string()))
    }

    /// Reads the index stored in `root`, preferring `index.bin` over `index.ron`.
    pub async fn read_from_dir(root: &Path) -> Result<Self, IndexError> {
        let binary = root.join(BINARY_INDEX_FILE);
        if tokio::fs::try_exists(&binary).await.unwrap_or(false) {
            let bytes = read_file(&binary).await?;
            log::debug!("Loading binary module index from '{}'", binary.display());
            return Self::from_bincode(&bytes);
        }

        let manifest = root.join(MANIFEST_INDEX_FILE);
        if tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
            let bytes = read_file(&manifest).await?;
            let text = String::from_utf8(bytes)
                .map_err(|e| IndexError::Manifest(e.to_string()))?;
            log::debug!("Loading module manifest from '{}'", manifest.display());
            return Self::from_ron_str(&text);
        }

        Err(IndexError::Missing {
            root: root.to_path_buf(),
        })
    }

    fn sorted_entries(&self) -> Vec<&ModuleMetadata> {
        let mut entries: Vec<&ModuleMetadata> = self.entries.values().collect();
        entries.sort_by(|a, b| a.module.cmp(&b.module));
        entries
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, IndexError> {
    tokio::fs::read(path).await.map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A path is contained if it is relative and never steps above its start.
fn is_contained(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carousel() -> ModuleMetadata {
        ModuleMetadata {
            module: "components/Carousel".into(),
            kind: "html".into(),
            exports: BTreeMap::from([
                ("default".into(), PathBuf::from("carousel/index.html")),
                ("CarouselClient".into(), PathBuf::from("carousel/client.html")),
            ]),
        }
    }

    #[test]
    fn resolve_finds_export_path() {
        let index = ModuleIndex::from_entries([carousel()]).unwrap();

        let (meta, path) = index
            .resolve(&"components/Carousel#CarouselClient".into())
            .unwrap();
        assert_eq!(meta.kind, "html");
        assert_eq!(path, Path::new("carousel/client.html"));

        assert!(matches!(
            index.resolve(&"components/Missing".into()),
            Err(LoadFailure::NotFound { .. })
        ));
        assert!(matches!(
            index.resolve(&"components/Carousel#Nope".into()),
            Err(LoadFailure::MissingExport { .. })
        ));
    }

    #[test]
    fn rejects_paths_outside_root() {
        for bad in ["../secret.html", "/etc/passwd", "a/../../b", ""] {
            let mut meta = carousel();
            meta.exports.insert("default".into(), PathBuf::from(bad));
            assert!(
                matches!(ModuleIndex::from_entries([meta]), Err(IndexError::UnsafePath { .. })),
                "path '{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn rejects_duplicates() {
        let result = ModuleIndex::from_entries([carousel(), carousel()]);
        assert!(matches!(result, Err(IndexError::DuplicateModule(m)) if m == "components/Carousel"));
    }

    #[test]
    fn bincode_round_trip_keeps_entries() {
        let index = ModuleIndex::from_entries([carousel()]).unwrap();
        let bytes = index.to_bincode().unwrap();
        let decoded = ModuleIndex::from_bincode(&bytes).unwrap();
        assert_eq!(decoded.get("components/Carousel"), Some(&carousel()));
    }

    #[test]
    fn parses_ron_manifest() {
        let manifest = r#"[
            (
                module: "unit-a",
                kind: "text",
                exports: { "default": "a.txt" },
            ),
        ]"#;
        let index = ModuleIndex::from_ron_str(manifest).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.modules().collect::<Vec<_>>(), vec!["unit-a"]);
    }

    #[test]
    fn garbage_manifest_is_an_error() {
        assert!(matches!(
            ModuleIndex::from_ron_str("not ron at all ("),
            Err(IndexError::Manifest(_))
        ));
        assert!(matches!(
            ModuleIndex::from_bincode(&[0xff, 0xff, 0xff]),
            Err(IndexError::Decode(_))
        ));
    }
}
