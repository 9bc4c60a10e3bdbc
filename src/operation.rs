//! Long-running registration operations and their canonical wire form.

use crate::error::{Result, ScrapiError};
use crate::problem::ProblemDetails;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OperationStatus {
    Running,
    #[serde(alias = "success")]
    #[strum(to_string = "succeeded", serialize = "success")]
    Succeeded,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Canonical `{operationID, status, entryID?}` map exchanged between engines
/// and the façade.
///
/// Every field is optional on the wire so that a backend omitting one can be
/// told apart from a backend reporting a problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationWire {
    #[serde(
        rename = "operationID",
        alias = "operationId",
        alias = "operation_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        rename = "entryID",
        alias = "entryId",
        alias = "entry_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub entry_id: Option<String>,
}

impl OperationWire {
    pub fn new(operation_id: &str, status: OperationStatus) -> Self {
        Self {
            operation_id: Some(operation_id.to_string()),
            status: Some(status.to_string()),
            entry_id: None,
        }
    }

    pub fn with_entry_id(mut self, entry_id: &str) -> Self {
        self.entry_id = Some(entry_id.to_string());
        self
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).unwrap_or_default()
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        serde_cbor::from_slice(bytes).map_err(|e| {
            ScrapiError::MalformedBackendResponse(format!("operation record is not CBOR: {e}"))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub operation_id: String,
    pub status: OperationStatus,
    pub entry_id: Option<String>,
}

impl OperationRecord {
    /// Validate a decoded wire record.
    ///
    /// `operationID` and `status` must be present and the status must be one
    /// of the known states. A `succeeded` record must name its entry.
    pub fn try_from_wire(wire: OperationWire) -> Result<Self> {
        let operation_id = wire.operation_id.ok_or_else(|| {
            ScrapiError::MalformedBackendResponse("no operationID in operation record".into())
        })?;
        let raw_status = wire.status.ok_or_else(|| {
            ScrapiError::MalformedBackendResponse(format!(
                "no status for operation {operation_id}"
            ))
        })?;
        let status: OperationStatus = raw_status.parse().map_err(|_| {
            ScrapiError::MalformedBackendResponse(format!(
                "unknown status '{raw_status}' for operation {operation_id}"
            ))
        })?;

        if status == OperationStatus::Succeeded && wire.entry_id.is_none() {
            return Err(ScrapiError::MalformedBackendResponse(format!(
                "operation {operation_id} succeeded without an entryID"
            )));
        }

        Ok(Self {
            operation_id,
            status,
            entry_id: wire.entry_id,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::try_from_wire(OperationWire::from_cbor(bytes)?)
    }
}

/// Result of a register or check call as seen by the caller: either a
/// backend-reported problem or a well-formed operation record, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Error(ProblemDetails),
    Operation(OperationRecord),
}

impl RegistrationOutcome {
    pub fn operation(&self) -> Option<&OperationRecord> {
        match self {
            Self::Operation(record) => Some(record),
            Self::Error(_) => None,
        }
    }

    pub fn problem(&self) -> Option<&ProblemDetails> {
        match self {
            Self::Error(problem) => Some(problem),
            Self::Operation(_) => None,
        }
    }
}

/// Result of fetching a terminal artifact (receipt, statement, configuration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Error(ProblemDetails),
    Resolved(T),
}

impl<T> Resolution<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    pub fn problem(&self) -> Option<&ProblemDetails> {
        match self {
            Self::Error(problem) => Some(problem),
            Self::Resolved(_) => None,
        }
    }
}
