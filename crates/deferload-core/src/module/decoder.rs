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

use super::Renderable;
use std::error::Error;

/// A trait for types that turn the raw bytes of a module into a renderable value.
///
/// Decoders are the CPU side of a load. Sources only deliver bytes and a kind
/// name; the decoder registered for that kind does the parsing.
///
/// Any `Fn(&[u8]) -> Result<R, E>` closure is a decoder.
pub trait ModuleDecoder<R: Renderable>: Send + Sync {
    /// Parses `bytes` into an instance of `R`.
    ///
    /// # Returns
    /// The decoded value, or a boxed, thread-safe error describing why the
    /// bytes could not be decoded.
    fn decode(&self, bytes: &[u8]) -> Result<R, Box<dyn Error + Send + Sync>>;
}

impl<R, F, E> ModuleDecoder<R> for F
where
    R: Renderable,
    F: Fn(&[u8]) -> Result<R, E> + Send + Sync,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn decode(&self, bytes: &[u8]) -> Result<R, Box<dyn Error + Send + Sync>> {
        self(bytes).map_err(Into::into)
    }
}

/// Decodes UTF-8 module bytes into a `String`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Decoder;

impl ModuleDecoder<String> for Utf8Decoder {
    fn decode(&self, bytes: &[u8]) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_decoder_accepts_text() {
        let text = Utf8Decoder.decode(b"<p>carousel</p>").unwrap();
        assert_eq!(text, "<p>carousel</p>");
    }

    #[test]
    fn utf8_decoder_rejects_invalid_bytes() {
        assert!(Utf8Decoder.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn closures_are_decoders() {
        let upper = |bytes: &[u8]| -> Result<String, std::str::Utf8Error> {
            Ok(std::str::from_utf8(bytes)?.to_uppercase())
        };
        assert_eq!(upper.decode(b"map").unwrap(), "MAP");
    }
}
