//! Error envelope decoding.
//!
//! A generator reports failure by returning `e` followed by
//! `{"err": "<message>"}`. Anything else is a successful payload.

use serde::Deserialize;

use crate::error::Error;
use crate::error::Result;

/// First byte of an error envelope (`0x65`).
pub const ERROR_SENTINEL: u8 = b'e';

#[derive(Deserialize)]
struct Envelope {
    err: String,
}

/// Splits a raw output buffer into a payload or the error it reports.
pub fn decode(output: Vec<u8>) -> Result<Vec<u8>> {
    match output.split_first() {
        Some((&ERROR_SENTINEL, body)) => {
            let envelope: Envelope =
                serde_json::from_slice(body).map_err(Error::MalformedErrorEnvelope)?;
            Err(Error::GeneratorReportedError(envelope.err))
        }
        _ => Ok(output),
    }
}
