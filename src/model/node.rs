//! Property records: the per-node payload described above
//!
//! A [`PropertyRecord`] is `{ function_tag, args, ...kind-specific fields }`.
//! The kind-specific fields are all optional and only populated for the node
//! kinds that need them (declarations, step functions, sequence constraints);
//! `#[serde(skip_serializing_if = "Option::is_none")]` keeps the wire form
//! compact, matching the "elided when default" rule for presence status.

use serde::{Deserialize, Serialize};

use crate::argument::{Argument, RefId};

/// Tri-state presence ( "Presence status"). `Present` is the
/// default and is elided on the wire by [`PropertyRecord::presence_status`]
/// being `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Present,
    Optional,
    Absent,
}

impl Default for PresenceStatus {
    fn default() -> Self {
        PresenceStatus::Present
    }
}

/// `{ function_tag, args, ...fields }`. One record is owned by
/// each [`crate::argument::Node`]; declarations additionally live at a fixed
/// index in the model's reference table.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyRecord {
    pub function_tag: String,
    pub args: Vec<Argument>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,

    /// `floatVar` uses these instead of `min`/`max` (same wire keys; the two
    /// are mutually exclusive since a record is exactly one node kind).
    #[serde(rename = "min", skip_serializing_if = "Option::is_none")]
    pub float_min: Option<f64>,
    #[serde(rename = "max", skip_serializing_if = "Option::is_none")]
    pub float_max: Option<f64>,

    #[serde(rename = "startMin", skip_serializing_if = "Option::is_none")]
    pub start_min: Option<i64>,
    #[serde(rename = "startMax", skip_serializing_if = "Option::is_none")]
    pub start_max: Option<i64>,
    #[serde(rename = "endMin", skip_serializing_if = "Option::is_none")]
    pub end_min: Option<i64>,
    #[serde(rename = "endMax", skip_serializing_if = "Option::is_none")]
    pub end_max: Option<i64>,
    #[serde(rename = "lengthMin", skip_serializing_if = "Option::is_none")]
    pub length_min: Option<i64>,
    #[serde(rename = "lengthMax", skip_serializing_if = "Option::is_none")]
    pub length_max: Option<i64>,

    #[serde(rename = "presenceStatus", skip_serializing_if = "Option::is_none")]
    pub presence_status: Option<PresenceStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Sorted `(x, y)` breakpoints, only present on an `intStepFunction`
    /// declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<(i64, i64)>>,

    /// Index-into-symmetry-class array, only present on a `sequenceVar`
    /// declaration whose members carry types.
    #[serde(rename = "types", skip_serializing_if = "Option::is_none")]
    pub types: Option<RefId>,
}

/// Hand-written: `min`/`max` alias `float_min`/`float_max` on the wire, so a
/// derived impl would route both JSON keys to whichever field appears first
/// in the struct. Dispatch on `function_tag` instead.
impl<'de> Deserialize<'de> for PropertyRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        use serde_json::Value;

        let value = Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("property record must be a JSON object"))?;

        let function_tag = obj
            .get("function_tag")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("property record missing function_tag"))?
            .to_string();

        let args: Vec<Argument> = match obj.get("args") {
            Some(v) => serde_json::from_value(v.clone()).map_err(D::Error::custom)?,
            None => Vec::new(),
        };

        let mut record = PropertyRecord::new(function_tag.clone(), args);
        let i64_field = |key: &str| obj.get(key).and_then(Value::as_i64);
        let f64_field = |key: &str| obj.get(key).and_then(Value::as_f64);

        if function_tag == "floatVar" {
            record.float_min = f64_field("min");
            record.float_max = f64_field("max");
        } else {
            record.min = i64_field("min");
            record.max = i64_field("max");
        }
        record.start_min = i64_field("startMin");
        record.start_max = i64_field("startMax");
        record.end_min = i64_field("endMin");
        record.end_max = i64_field("endMax");
        record.length_min = i64_field("lengthMin");
        record.length_max = i64_field("lengthMax");
        record.presence_status = obj
            .get("presenceStatus")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        record.name = obj.get("name").and_then(Value::as_str).map(String::from);
        record.values = obj.get("values").and_then(|v| serde_json::from_value(v.clone()).ok());
        record.types = obj.get("types").and_then(Value::as_u64).map(|v| v as RefId);

        Ok(record)
    }
}

impl PropertyRecord {
    pub fn new(function_tag: impl Into<String>, args: Vec<Argument>) -> Self {
        PropertyRecord {
            function_tag: function_tag.into(),
            args,
            min: None,
            max: None,
            float_min: None,
            float_max: None,
            start_min: None,
            start_max: None,
            end_min: None,
            end_max: None,
            length_min: None,
            length_max: None,
            presence_status: None,
            name: None,
            values: None,
            types: None,
        }
    }
}
