//! Wire encodings for the two delivery attempts.

use crate::app::ports::UpstreamRequest;
use crate::constants::{FORM_ACCEPT, FORM_CONTENT_TYPE, JSON_ACCEPT, JSON_CONTENT_TYPE};
use crate::domain::{Encoding, SubmissionRecord};
use crate::error::Result;

/// Build the request for one attempt.
pub fn encode(record: &SubmissionRecord, encoding: Encoding) -> Result<UpstreamRequest> {
    match encoding {
        Encoding::Json => encode_json(record),
        Encoding::FormUrlEncoded => encode_form(record),
    }
}

/// The record as a JSON object; absent optional fields are omitted.
pub fn encode_json(record: &SubmissionRecord) -> Result<UpstreamRequest> {
    Ok(UpstreamRequest {
        content_type: JSON_CONTENT_TYPE,
        accept: JSON_ACCEPT,
        body: serde_json::to_vec(record)?,
    })
}

/// Form body with every key present; absent optional fields become "".
pub fn encode_form(record: &SubmissionRecord) -> Result<UpstreamRequest> {
    let pairs = [
        ("email", record.email()),
        ("role", record.role().unwrap_or("")),
        ("source", record.source().unwrap_or("")),
        ("message", record.message().unwrap_or("")),
    ];
    let body = serde_urlencoded::to_string(pairs)?;

    Ok(UpstreamRequest {
        content_type: FORM_CONTENT_TYPE,
        accept: FORM_ACCEPT,
        body: body.into_bytes(),
    })
}
