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

use crate::index::{IndexError, ModuleIndex};
use crate::source::{FetchedModule, ModuleSource};
use async_trait::async_trait;
use deferload_core::{LoadFailure, ModuleSpecifier};
use std::path::{Path, PathBuf};

/// A [`ModuleSource`] that reads export files from a directory.
///
/// Which file backs which export is decided entirely by the [`ModuleIndex`];
/// the directory is never listed. Export paths were validated when the index
/// was built, so joining them onto the root cannot escape it.
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
    index: ModuleIndex,
}

impl DirectorySource {
    /// Creates a source over `root` with an already-built index.
    pub fn new(root: impl Into<PathBuf>, index: ModuleIndex) -> Self {
        Self {
            root: root.into(),
            index,
        }
    }

    /// Opens `root`, reading its `index.bin` or `index.ron`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let root = root.into();
        let index = ModuleIndex::read_from_dir(&root).await?;
        log::info!(
            "DirectorySource: {} module(s) indexed under '{}'",
            index.len(),
            root.display()
        );
        Ok(Self { root, index })
    }

    /// The directory export paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The index this source resolves specifiers with.
    pub fn index(&self) -> &ModuleIndex {
        &self.index
    }
}

#[async_trait]
impl ModuleSource for DirectorySource {
    async fn fetch(&self, specifier: &ModuleSpecifier) -> Result<FetchedModule, LoadFailure> {
        let (metadata, relative) = self.index.resolve(specifier)?;
        let path = self.root.join(relative);

        let bytes = tokio::fs::read(&path).await.map_err(|e| LoadFailure::Io {
            module: specifier.module().to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;

        log::trace!(
            "DirectorySource: read '{}' for '{specifier}' ({} bytes)",
            path.display(),
            bytes.len()
        );

        Ok(FetchedModule {
            kind: metadata.kind.clone(),
            bytes,
        })
    }

    fn contains(&self, module: &str) -> bool {
        self.index.get(module).is_some()
    }
}
