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

//! A registry of decoders, selected by the kind name a source reports.

use deferload_core::{LoadFailure, ModuleDecoder, ModuleSpecifier, Renderable};
use deferload_io::FetchedModule;
use std::collections::HashMap;
use std::fmt;

/// Maps content kinds (`"html"`, `"text"`, ...) to the decoder that turns
/// bytes of that kind into an `R`.
pub struct DecoderRegistry<R: Renderable> {
    decoders: HashMap<String, Box<dyn ModuleDecoder<R>>>,
}

impl<R: Renderable> DecoderRegistry<R> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers `decoder` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: &str, decoder: impl ModuleDecoder<R> + 'static) {
        if self
            .decoders
            .insert(kind.to_string(), Box::new(decoder))
            .is_some()
        {
            log::debug!("DecoderRegistry: replaced decoder for kind '{kind}'");
        }
    }

    /// Returns `true` if a decoder is registered for `kind`.
    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// The registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Decodes a fetched module with the decoder registered for its kind.
    ///
    /// # Errors
    /// [`LoadFailure::NoDecoder`] if the kind is unknown,
    /// [`LoadFailure::Decode`] if the decoder fails.
    pub fn decode(
        &self,
        specifier: &ModuleSpecifier,
        fetched: &FetchedModule,
    ) -> Result<R, LoadFailure> {
        let decoder = self
            .decoders
            .get(&fetched.kind)
            .ok_or_else(|| LoadFailure::NoDecoder {
                module: specifier.module().to_string(),
                kind: fetched.kind.clone(),
            })?;

        decoder
            .decode(&fetched.bytes)
            .map_err(|e| LoadFailure::Decode {
                module: specifier.module().to_string(),
                reason: e.to_string(),
            })
    }
}

impl<R: Renderable> Default for DecoderRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Renderable> fmt::Debug for DecoderRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferload_core::module::Utf8Decoder;

    fn fetched(kind: &str, bytes: &[u8]) -> FetchedModule {
        FetchedModule {
            kind: kind.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn decodes_with_matching_kind() {
        let mut registry = DecoderRegistry::new();
        registry.register("html", Utf8Decoder);

        let specifier = ModuleSpecifier::new("unit-a");
        let value = registry.decode(&specifier, &fetched("html", b"<a/>")).unwrap();
        assert_eq!(value, "<a/>");
    }

    #[test]
    fn unknown_kind_is_no_decoder() {
        let registry = DecoderRegistry::<String>::new();
        let failure = registry
            .decode(&ModuleSpecifier::new("m"), &fetched("svg", b""))
            .unwrap_err();
        assert_eq!(
            failure,
            LoadFailure::NoDecoder {
                module: "m".into(),
                kind: "svg".into()
            }
        );
    }

    #[test]
    fn decoder_errors_become_decode_failures() {
        let mut registry = DecoderRegistry::new();
        registry.register("text", Utf8Decoder);

        let failure = registry
            .decode(&ModuleSpecifier::new("bin"), &fetched("text", &[0xc3, 0x28]))
            .unwrap_err();
        assert!(matches!(failure, LoadFailure::Decode { ref module, .. } if module == "bin"));
    }

    #[test]
    fn kinds_are_sorted() {
        let mut registry = DecoderRegistry::<String>::new();
        registry.register("text", Utf8Decoder);
        registry.register("html", Utf8Decoder);
        assert_eq!(registry.kinds(), vec!["html", "text"]);
    }
}
