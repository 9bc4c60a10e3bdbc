//! Problem details (RFC 9290 / RFC 7807 style) carried on the error channel of
//! every engine operation.

use serde::{Deserialize, Serialize};
use serde_cbor::Value as CborValue;
use std::fmt;

pub const PROBLEM_UNSUPPORTED: &str = "urn:scrapi:problem:unsupported-operation";
pub const PROBLEM_PROPAGATION_PENDING: &str = "urn:scrapi:problem:propagation-pending";
pub const PROBLEM_MALFORMED: &str = "urn:scrapi:problem:malformed-response";
pub const PROBLEM_TRANSPORT: &str = "urn:scrapi:problem:transport";
pub const PROBLEM_NOT_FOUND: &str = "urn:scrapi:problem:not-found";
pub const PROBLEM_VALIDATION: &str = "urn:scrapi:problem:validation-error";

const TRANSIENT_RESPONSE_CODES: [u16; 4] = [408, 425, 429, 503];

// RFC 9290 integer labels.
const LABEL_TITLE: i128 = -1;
const LABEL_DETAIL: i128 = -2;
const LABEL_INSTANCE: i128 = -3;
const LABEL_RESPONSE_CODE: i128 = -4;

fn default_problem_type() -> String {
    "about:blank".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProblemWire")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(rename = "response-code")]
    pub response_code: u16,
}

/// Incoming problem document. RFC 7807 bodies carry `status`, SCRAPI ones
/// `response-code`, and some vendors send both.
#[derive(Deserialize)]
struct ProblemWire {
    #[serde(rename = "type", default = "default_problem_type")]
    problem_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    instance: Option<String>,
    #[serde(rename = "response-code", alias = "responseCode", default)]
    response_code: Option<u16>,
    #[serde(default)]
    status: Option<u16>,
}

impl From<ProblemWire> for ProblemDetails {
    fn from(wire: ProblemWire) -> Self {
        Self {
            problem_type: wire.problem_type,
            title: wire.title,
            detail: wire.detail,
            instance: wire.instance,
            response_code: wire.response_code.or(wire.status).unwrap_or_default(),
        }
    }
}

impl ProblemDetails {
    pub fn new(
        problem_type: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
        response_code: u16,
    ) -> Self {
        Self {
            problem_type: problem_type.into(),
            title: title.into(),
            detail: detail.into(),
            instance: None,
            response_code,
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// The engine does not implement `operation`.
    pub fn unsupported(operation: &str, detail: impl Into<String>) -> Self {
        Self::new(PROBLEM_UNSUPPORTED, "Unsupported Operation", detail, 501)
            .with_instance(operation)
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(PROBLEM_MALFORMED, "Malformed Response", detail, 502)
    }

    /// The backend could not be reached at all.
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::new(PROBLEM_TRANSPORT, "Service Unavailable", detail, 503)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(PROBLEM_NOT_FOUND, "Not Found", detail, 404)
    }

    pub fn propagation_pending(detail: impl Into<String>) -> Self {
        Self::new(PROBLEM_PROPAGATION_PENDING, "Propagation Pending", detail, 400)
    }

    /// Problem synthesized from a non-success HTTP status whose body was not a
    /// problem document.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let title = match status {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            409 => "Conflict",
            429 => "Too Many Requests",
            500..=599 => "Server Error",
            _ => "Unexpected Response",
        };
        Self::new(PROBLEM_TRANSPORT, title, detail, status)
    }

    pub fn is_unsupported(&self) -> bool {
        self.problem_type == PROBLEM_UNSUPPORTED
    }

    /// The backend answered with something that could not be parsed.
    pub fn is_malformed(&self) -> bool {
        self.problem_type == PROBLEM_MALFORMED
    }

    /// Problems that may resolve on their own if the same request is repeated
    /// later (premature queries, rate limits, temporary outages).
    pub fn is_transient(&self) -> bool {
        self.problem_type == PROBLEM_PROPAGATION_PENDING
            || TRANSIENT_RESPONSE_CODES.contains(&self.response_code)
    }

    /// Decode a vendor error body as problem details.
    ///
    /// Accepts RFC 7807 JSON objects and RFC 9290 CBOR maps (text or integer
    /// labels). Returns `None` when the body is not recognizably a problem
    /// document; callers then synthesize one from the HTTP status.
    pub fn decode(body: &[u8]) -> Option<Self> {
        let first = body.iter().copied().find(|b| !b.is_ascii_whitespace())?;
        if first == b'{' {
            let problem: Self = serde_json::from_slice(body).ok()?;
            return problem.has_content().then_some(problem);
        }

        let CborValue::Map(map) = serde_cbor::from_slice::<CborValue>(body).ok()? else {
            return None;
        };

        let mut problem = Self::new(default_problem_type(), "", "", 0);
        let mut status = 0;
        for (key, value) in map {
            match (key, value) {
                (CborValue::Text(k), CborValue::Text(v)) if k == "type" => problem.problem_type = v,
                (CborValue::Text(k), CborValue::Text(v)) if k == "title" => problem.title = v,
                (CborValue::Text(k), CborValue::Text(v)) if k == "detail" => problem.detail = v,
                (CborValue::Text(k), CborValue::Text(v)) if k == "instance" => {
                    problem.instance = Some(v);
                }
                (CborValue::Text(k), CborValue::Integer(v))
                    if k == "response-code" || k == "responseCode" =>
                {
                    problem.response_code = u16::try_from(v).unwrap_or_default();
                }
                (CborValue::Text(k), CborValue::Integer(v)) if k == "status" => {
                    status = u16::try_from(v).unwrap_or_default();
                }
                (CborValue::Integer(LABEL_TITLE), CborValue::Text(v)) => problem.title = v,
                (CborValue::Integer(LABEL_DETAIL), CborValue::Text(v)) => problem.detail = v,
                (CborValue::Integer(LABEL_INSTANCE), CborValue::Text(v)) => {
                    problem.instance = Some(v);
                }
                (CborValue::Integer(LABEL_RESPONSE_CODE), CborValue::Integer(v)) => {
                    problem.response_code = u16::try_from(v).unwrap_or_default();
                }
                _ => {}
            }
        }
        if problem.response_code == 0 {
            problem.response_code = status;
        }

        problem.has_content().then_some(problem)
    }

    /// CBOR encoding with text labels.
    pub fn to_cbor(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).unwrap_or_default()
    }

    fn has_content(&self) -> bool {
        !self.title.is_empty() || !self.detail.is_empty() || self.problem_type != "about:blank"
    }
}

impl fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.response_code)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}
