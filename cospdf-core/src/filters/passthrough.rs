use super::StreamFilter;
use crate::error::Result;
use crate::objects::Dictionary;

/// Image codecs whose payload the core treats as opaque: decoding and encoding both
/// return the bytes unchanged and leave interpretation to the consumer.
#[derive(Debug, Clone, Copy)]
pub struct PassthroughFilter {
    name: &'static str,
}

impl PassthroughFilter {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl StreamFilter for PassthroughFilter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn effective_parameters(&self, params: Option<&Dictionary>) -> Option<Dictionary> {
        params.cloned()
    }
}
