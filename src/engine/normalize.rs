//! Response normalization shared by vendor adapters.
//!
//! Backends answer in JSON (older API versions) or CBOR (current ones). The
//! façade only ever sees the canonical CBOR operation record, and every
//! non-success response becomes problem details carrying the HTTP status.

use super::scrub::sanitize_body;
use super::traits::EngineResult;
use crate::operation::{OperationStatus, OperationWire};
use crate::problem::ProblemDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Cbor,
}

pub fn sniff(body: &[u8]) -> Option<BodyFormat> {
    let first = body.iter().copied().find(|b| !b.is_ascii_whitespace())?;
    Some(if matches!(first, b'{' | b'[') {
        BodyFormat::Json
    } else {
        BodyFormat::Cbor
    })
}

/// Re-encode a JSON or CBOR operation body as the canonical CBOR record.
///
/// Missing fields are preserved as missing so the façade can tell a contract
/// violation apart from a reported problem. Known status spellings are
/// rewritten to their canonical form.
pub fn normalize_operation(body: &[u8]) -> EngineResult<Vec<u8>> {
    let mut wire: OperationWire = match sniff(body) {
        Some(BodyFormat::Json) => serde_json::from_slice(body).map_err(|e| {
            ProblemDetails::malformed(format!("operation body is not a JSON object: {e}"))
        })?,
        Some(BodyFormat::Cbor) => serde_cbor::from_slice(body).map_err(|e| {
            ProblemDetails::malformed(format!("operation body is not a CBOR map: {e}"))
        })?,
        None => return Err(ProblemDetails::malformed("empty operation body")),
    };

    if let Some(status) = wire
        .status
        .as_deref()
        .and_then(|s| s.parse::<OperationStatus>().ok())
    {
        wire.status = Some(status.to_string());
    }

    Ok(wire.to_cbor())
}

/// Decode a JSON or CBOR document with text keys.
pub fn decode_document(body: &[u8]) -> Option<serde_json::Value> {
    match sniff(body)? {
        BodyFormat::Json => serde_json::from_slice(body).ok(),
        BodyFormat::Cbor => serde_cbor::from_slice(body).ok(),
    }
}

/// Problem details for a non-success response. A vendor problem document is
/// used when the body carries one; the HTTP status always wins as the
/// response code.
pub fn problem_from_response(status: u16, body: &[u8]) -> ProblemDetails {
    match ProblemDetails::decode(body) {
        Some(mut problem) => {
            problem.response_code = status;
            problem
        }
        None => ProblemDetails::from_status(status, sanitize_body(body)),
    }
}
