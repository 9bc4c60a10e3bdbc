//! Attribute lifting for engines that record statements as native ledger
//! events rather than through a SCITT endpoint.
//!
//! Which asset an event lands on, and which statement headers become
//! searchable event attributes, is a deployment decision. The default
//! [`DailyAssetPolicy`] groups all statements of a UTC calendar day on one
//! asset.

use crate::statement::SignedStatement;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SIGNED_STATEMENT_ATTRIBUTE: &str = "signed_statement";

/// Asset that registered events are attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub attributes: BTreeMap<String, String>,
    /// Attribute names that identify an existing asset.
    pub selector: Vec<String>,
    pub behaviours: Vec<String>,
}

pub trait AttributePolicy: Send + Sync {
    fn name(&self) -> &str;

    fn asset(&self) -> AssetSpec;

    /// Event attributes for `statement`. Must include the base64 envelope
    /// under [`SIGNED_STATEMENT_ATTRIBUTE`] so it can be resolved later.
    fn lift(&self, statement: &SignedStatement) -> Map<String, Value> {
        lift_statement_attributes(statement)
    }
}

/// Meta-map entries, issuer and subject as attributes, plus the envelope
/// itself base64-encoded for safe transit.
pub fn lift_statement_attributes(statement: &SignedStatement) -> Map<String, Value> {
    let mut attrs: Map<String, Value> = statement
        .meta()
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    attrs.insert(
        SIGNED_STATEMENT_ATTRIBUTE.into(),
        Value::String(STANDARD.encode(statement.as_bytes())),
    );
    if let Some(subject) = statement.subject() {
        attrs.insert("subject".into(), Value::String(subject.to_string()));
    }
    if let Some(issuer) = statement.issuer() {
        attrs.insert("issuer".into(), Value::String(issuer.to_string()));
    }
    attrs
}

#[derive(Debug, Clone)]
pub struct DailyAssetPolicy {
    date: NaiveDate,
    prefix: String,
    display_type: String,
    target_artifact: String,
    description: String,
}

impl DailyAssetPolicy {
    pub fn today() -> Self {
        Self::for_date(Utc::now().date_naive())
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            prefix: "droid".into(),
            display_type: "scitt_droid".into(),
            target_artifact: "vCon".into(),
            description: "Daily Event Accumulator For vCon SCITT Events".into(),
        }
    }

    pub fn with_target_artifact(mut self, target_artifact: &str) -> Self {
        target_artifact.clone_into(&mut self.target_artifact);
        self
    }

    pub fn asset_name(&self) -> String {
        format!("{}_{}", self.prefix, self.date.format("%Y%m%d"))
    }
}

impl AttributePolicy for DailyAssetPolicy {
    fn name(&self) -> &str {
        "daily-asset"
    }

    fn asset(&self) -> AssetSpec {
        let attributes = BTreeMap::from([
            ("arc_display_name".to_string(), self.asset_name()),
            ("arc_display_type".to_string(), self.display_type.clone()),
            ("target_artifact".to_string(), self.target_artifact.clone()),
            ("arc_description".to_string(), self.description.clone()),
        ]);
        AssetSpec {
            attributes,
            selector: vec![
                "arc_display_name".into(),
                "arc_display_type".into(),
                "target_artifact".into(),
            ],
            behaviours: vec!["RecordEvidence".into()],
        }
    }
}
