//! Decode and encode a payload through a stream's filter chain.

use super::{stage_parameters, DecodeResult, FilterChain, FilterRegistry, StreamFilter};
use crate::error::{PdfError, Result};
use crate::objects::Dictionary;
use tracing::{debug, trace, warn};

/// Attempts made while shrinking from the declared length.
const DECLARED_LENGTH_ATTEMPTS: usize = 5;
/// Attempts made while shrinking from the bytes actually available.
const AVAILABLE_LENGTH_ATTEMPTS: usize = 4;

/// Filter invocations made for one stage before a decode gives up.
pub const MAX_DECODE_ATTEMPTS: usize = DECLARED_LENGTH_ATTEMPTS + AVAILABLE_LENGTH_ATTEMPTS;

/// Decode physical stream bytes into their logical content.
///
/// Filters run in `/Filter` array order. A stage whose input is empty is skipped and
/// yields empty output. When a stage fails, its input is retried shorter by one byte at
/// a time, first from the declared `/Length`, then from the bytes actually available,
/// for at most [`MAX_DECODE_ATTEMPTS`] invocations. Unknown filters fail immediately.
pub fn decode(
    dictionary: &Dictionary,
    physical: &[u8],
    registry: &FilterRegistry,
) -> Result<(Vec<u8>, DecodeResult)> {
    let chain = FilterChain::from_dictionary(dictionary)?;
    if chain.is_empty() {
        return Ok((physical.to_vec(), DecodeResult::default()));
    }

    let declared = declared_length(dictionary, physical.len());
    let mut result = DecodeResult::default();
    let mut current: Option<Vec<u8>> = None;

    for (index, name) in chain.names().iter().enumerate() {
        let filter = registry.get(name)?;
        let params = stage_parameters(dictionary, index);
        let input = current.as_deref().unwrap_or(physical);
        let stage_declared = if index == 0 { declared } else { input.len() };

        let output = decode_stage(filter, input, stage_declared, params)?;
        result.parameters = filter.effective_parameters(params);
        current = Some(output);
    }

    Ok((current.unwrap_or_default(), result))
}

/// Encode logical content into physical stream bytes, running the chain in reverse.
pub fn encode(
    dictionary: &Dictionary,
    logical: &[u8],
    registry: &FilterRegistry,
) -> Result<Vec<u8>> {
    let chain = FilterChain::from_dictionary(dictionary)?;
    let mut current: Option<Vec<u8>> = None;

    for (index, name) in chain.names().iter().enumerate().rev() {
        let filter = registry.get(name)?;
        let input = current.as_deref().unwrap_or(logical);
        current = Some(filter.encode(input, stage_parameters(dictionary, index))?);
    }

    Ok(current.unwrap_or_else(|| logical.to_vec()))
}

fn declared_length(dictionary: &Dictionary, available: usize) -> usize {
    dictionary
        .get_integer("Length")
        .and_then(|length| usize::try_from(length).ok())
        .unwrap_or(available)
}

fn decode_stage(
    filter: &dyn StreamFilter,
    input: &[u8],
    declared: usize,
    params: Option<&Dictionary>,
) -> Result<Vec<u8>> {
    let available = input.len();
    if declared == 0 && available == 0 {
        trace!(filter = filter.name(), "skipping empty stage");
        return Ok(Vec::new());
    }

    let mut attempts = 0;
    let mut last_error = None;

    // both passes keep retrying at length 0 once the input is used up
    let passes = [
        (declared.min(available), DECLARED_LENGTH_ATTEMPTS),
        (available, AVAILABLE_LENGTH_ATTEMPTS),
    ];
    for (start, budget) in passes {
        let mut length = start;
        for _ in 0..budget {
            attempts += 1;
            match filter.decode(&input[..length], params) {
                Ok(output) => {
                    return Ok(recovered(filter, output, attempts, available - length))
                }
                Err(e) => {
                    trace!(filter = filter.name(), length, error = %e, "decode attempt failed");
                    last_error = Some(e);
                    length = length.saturating_sub(1);
                }
            }
        }
    }

    let message = last_error.map(|e| e.to_string()).unwrap_or_default();
    warn!(filter = filter.name(), attempts, %message, "stream could not be decoded");
    Err(PdfError::DecodeFailed {
        filter: filter.name().to_string(),
        attempts,
        message,
    })
}

fn recovered(filter: &dyn StreamFilter, output: Vec<u8>, attempts: usize, dropped: usize) -> Vec<u8> {
    if attempts > 1 {
        debug!(
            filter = filter.name(),
            attempts, dropped, "stream decoded after retrying with a shorter length"
        );
    }
    output
}
