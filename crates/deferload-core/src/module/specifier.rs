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

use serde::{Deserialize, Serialize};
use std::fmt;

/// The export used when a specifier does not name one.
pub const DEFAULT_EXPORT: &str = "default";

/// Separates the module path from the export name in the string form.
const EXPORT_SEPARATOR: char = '#';

/// The opaque key naming what a deferred unit should load.
///
/// A specifier is a module path plus the name of one of the module's
/// exports. Its string form is `"path/to/Module"` (default export) or
/// `"path/to/Module#NamedExport"`.
///
/// Parsing never fails. A malformed or empty key is still a valid request;
/// the load simply ends up `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleSpecifier {
    module: String,
    export: String,
}

impl ModuleSpecifier {
    /// Creates a specifier for the default export of `module`.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            export: DEFAULT_EXPORT.to_string(),
        }
    }

    /// Returns a copy of this specifier pointing at the named export instead.
    pub fn with_export(mut self, export: impl Into<String>) -> Self {
        let export = export.into();
        self.export = if export.is_empty() {
            DEFAULT_EXPORT.to_string()
        } else {
            export
        };
        self
    }

    /// Parses the `module#export` string form.
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once(EXPORT_SEPARATOR) {
            Some((module, export)) => Self::new(module).with_export(export),
            None => Self::new(raw),
        }
    }

    /// The module path.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The export name, `"default"` unless set otherwise.
    pub fn export(&self) -> &str {
        &self.export
    }

    /// Returns `true` if this specifier targets the module's default export.
    pub fn is_default_export(&self) -> bool {
        self.export == DEFAULT_EXPORT
    }
}

impl fmt::Display for ModuleSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default_export() {
            write!(f, "{}", self.module)
        } else {
            write!(f, "{}{}{}", self.module, EXPORT_SEPARATOR, self.export)
        }
    }
}

impl From<&str> for ModuleSpecifier {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for ModuleSpecifier {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&ModuleSpecifier> for ModuleSpecifier {
    fn from(specifier: &ModuleSpecifier) -> Self {
        specifier.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_module_uses_default_export() {
        let specifier = ModuleSpecifier::parse("components/Carousel");
        assert_eq!(specifier.module(), "components/Carousel");
        assert_eq!(specifier.export(), DEFAULT_EXPORT);
        assert!(specifier.is_default_export());
    }

    #[test]
    fn named_export_is_split_off() {
        let specifier = ModuleSpecifier::parse("components/Carousel#CarouselClient");
        assert_eq!(specifier.module(), "components/Carousel");
        assert_eq!(specifier.export(), "CarouselClient");
        assert_eq!(specifier.to_string(), "components/Carousel#CarouselClient");
    }

    #[test]
    fn empty_export_falls_back_to_default() {
        let specifier = ModuleSpecifier::parse("widgets/Map#");
        assert_eq!(specifier.export(), DEFAULT_EXPORT);
        assert_eq!(specifier.to_string(), "widgets/Map");
    }

    #[test]
    fn whitespace_is_part_of_the_key() {
        let padded = ModuleSpecifier::parse(" unit-a");
        assert_eq!(padded.module(), " unit-a");
        assert_ne!(padded, ModuleSpecifier::parse("unit-a"));

        let export = ModuleSpecifier::parse("unit-a# Client");
        assert_eq!(export.export(), " Client");
    }

    #[test]
    fn empty_input_is_still_a_specifier() {
        let specifier = ModuleSpecifier::from("");
        assert_eq!(specifier.module(), "");
        assert!(specifier.is_default_export());
    }
}
