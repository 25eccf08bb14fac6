//! Base64 codec of binary attribute payloads.

use crate::Error;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

// Payloads are written without padding; padded payloads are still accepted.
const BINARY_PAYLOAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub(crate) fn encode(raw: &[u8]) -> String {
    BINARY_PAYLOAD.encode(raw)
}

pub(crate) fn decode(payload: &str) -> Result<Vec<u8>, Error> {
    Ok(BINARY_PAYLOAD.decode(payload)?)
}
