use std::collections::HashMap;

use super::{Decoder, DecoderConfig, Error, Result};

/// Decoders addressable by the name a [`DecoderConfig`] carries.
#[derive(Default)]
pub struct DecoderSet {
    decoders: HashMap<String, Box<dyn Decoder + Send>>,
}

impl std::fmt::Debug for DecoderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.decoders.keys().collect();
        names.sort();
        f.debug_struct("DecoderSet").field("decoders", &names).finish()
    }
}

impl DecoderSet {
    /// Registers `decoder` under `name`, replacing any decoder already registered there.
    pub fn register(&mut self, name: impl Into<String>, decoder: impl Decoder + Send + 'static) {
        self.decoders.insert(name.into(), Box::new(decoder));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Decodes `input` with the decoder named by `config.name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDecoder`] if no decoder is registered under that
    /// name, or the decoder's own error.
    pub fn decode(&mut self, input: &[u8], config: &DecoderConfig) -> Result<Vec<u8>> {
        let decoder = self
            .decoders
            .get_mut(&config.name)
            .ok_or_else(|| Error::UnknownDecoder(config.name.clone()))?;
        decoder.decode(input, config)
    }

    /// Applies `configs` in order, feeding each decoder the previous output.
    ///
    /// An empty chain returns `input` unchanged.
    pub fn decode_chain(&mut self, input: &[u8], configs: &[DecoderConfig]) -> Result<Vec<u8>> {
        let mut value = input.to_vec();
        for config in configs {
            value = self.decode(&value, config)?;
        }
        Ok(value)
    }
}
