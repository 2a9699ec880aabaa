//! The decoder contract shared by every label resolver.
//!
//! A label pipeline hands a decoder the raw bytes of a label value together with
//! the per-field [`DecoderConfig`] and receives the replacement bytes. Decoders
//! that keep state (such as the cgroup path cache) take `&mut self`, so a single
//! instance is confined to one execution context unless it is wrapped in a
//! [`SharedDecoder`].
mod error;
mod set;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

pub use error::{Error, Result};
pub use set::DecoderSet;

/// Per-field decoder configuration.
///
/// `options` is reserved for per-field settings; the resolvers in this crate
/// accept it but do not read it yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct DecoderConfig {
    pub name: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl DecoderConfig {
    /// Creates a config that selects the decoder registered under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }
}

/// Turns raw label bytes into replacement label bytes.
pub trait Decoder {
    /// Decodes `input` into the replacement label value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `input` is structurally invalid, or a
    /// decoder specific error if the input refers to an entity that exists but
    /// cannot be described.
    fn decode(&mut self, input: &[u8], config: &DecoderConfig) -> Result<Vec<u8>>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decode(&mut self, input: &[u8], config: &DecoderConfig) -> Result<Vec<u8>> {
        (**self).decode(input, config)
    }
}

/// Parses ASCII decimal label bytes, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the bytes are not a valid integer of type `T`.
pub fn parse_integer<T>(input: &[u8]) -> Result<T>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    let text = String::from_utf8_lossy(input);
    text.trim()
        .parse::<T>()
        .map_err(|source| Error::MalformedInput {
            input: text.into_owned(),
            source,
        })
}

/// A decoder guarded by a mutex so that one instance can serve several threads.
#[derive(Debug, Default)]
pub struct SharedDecoder<D> {
    inner: Mutex<D>,
}

impl<D: Decoder> SharedDecoder<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            inner: Mutex::new(decoder),
        }
    }

    /// Decodes `input` while holding the lock for the whole call, including any
    /// cache refresh the call triggers.
    pub fn decode(&self, input: &[u8], config: &DecoderConfig) -> Result<Vec<u8>> {
        // A panic in another decode call leaves the cache valid, only possibly stale.
        let mut decoder = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        decoder.decode(input, config)
    }

    pub fn into_inner(self) -> D {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
