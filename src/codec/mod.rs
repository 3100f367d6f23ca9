//! Result document codec
//!
//! Encodes an [`AggregatedSet`] to JSON and back. Decoding is tolerant:
//! unknown failure classes and value types become placeholders instead of
//! failing the whole document. Encoding a decoded document yields the same
//! JSON as the document it was decoded from.

mod document;
mod failure;
mod value;

use std::io::{Read, Write};

use crate::results::AggregatedSet;

pub use document::{DatumEntry, ResultDatum, ResultDocument, WireStatus};
pub use failure::{
    decode_datum, decode_failure, FailureDatum, CLASS_KEY, EXPECTED_ACTUAL_CLASS, OPAQUE_CLASS,
    TIMEOUT_CLASS,
};
pub use value::{decode_input, decode_typed, decode_untyped, encode_input, encode_value};

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed result document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to transfer result document: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;

pub fn to_value(set: &AggregatedSet) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(ResultDocument::from(set))?)
}

pub fn to_string(set: &AggregatedSet) -> Result<String> {
    Ok(serde_json::to_string(&ResultDocument::from(set))?)
}

pub fn to_string_pretty(set: &AggregatedSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ResultDocument::from(set))?)
}

/// Write the document and flush the writer
pub fn to_writer<W: Write>(mut writer: W, set: &AggregatedSet, pretty: bool) -> Result<()> {
    let doc = ResultDocument::from(set);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &doc)?;
    } else {
        serde_json::to_writer(&mut writer, &doc)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn from_value(value: serde_json::Value) -> Result<AggregatedSet> {
    let doc: ResultDocument = serde_json::from_value(value)?;
    Ok(doc.into())
}

pub fn from_str(s: &str) -> Result<AggregatedSet> {
    let doc: ResultDocument = serde_json::from_str(s)?;
    Ok(doc.into())
}

pub fn from_reader<R: Read>(mut reader: R) -> Result<AggregatedSet> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    from_str(&text)
}
