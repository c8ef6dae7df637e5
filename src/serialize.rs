//! Lossless export/import of a model graph: `to_json`/`from_json` are exact
//! inverses; `to_text`/`to_js` are human-readable renderings of the same
//! data for diagnostics, not meant to round-trip.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::argument::{Argument, Node, RefId};
use crate::error::{OptalcpError, Result};
use crate::model::container::Model;
use crate::model::node::PropertyRecord;
use crate::params::Parameters;
use crate::solution::Solution;
use crate::wire::SolutionData;

/// The on-disk/exported shape: the same fields a solve request carries,
/// minus `msg` and `batchResults` (export is not a protocol request).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredModel {
    model: Vec<Argument>,
    refs: Vec<PropertyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    objective: Option<PropertyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Parameters>,
    #[serde(rename = "warmStart", skip_serializing_if = "Option::is_none")]
    warm_start: Option<SolutionData>,
}

/// Serialize `model` (plus optional parameters and warm-start solution) to
/// a JSON string. If `OPTALCP_MODEL` is set in the environment, the same
/// payload is also written to that path for diagnostics.
pub fn to_json(model: &Rc<Model>, parameters: Option<&Parameters>, warm_start: Option<&Solution>) -> Result<String> {
    let stored = build_stored(model, parameters, warm_start);
    let text = serde_json::to_string(&stored).map_err(|e| OptalcpError::Serialization(e.to_string()))?;
    write_diagnostic_copy(&text);
    Ok(text)
}

/// Inverse of [`to_json`]. Ref ids are preserved exactly: the returned
/// model's reference table is indexed identically to the original's, so any
/// ref id captured before serialization still resolves correctly.
pub fn from_json(text: &str) -> Result<(Rc<Model>, Option<Parameters>, Option<Solution>)> {
    let stored: StoredModel = serde_json::from_str(text).map_err(|e| OptalcpError::Deserialization(e.to_string()))?;
    let model = reconstruct(stored.model, stored.refs, stored.name, stored.objective);
    let warm_start = stored.warm_start.as_ref().map(Solution::from_wire);
    Ok((model, stored.parameters, warm_start))
}

/// A human-readable multi-line rendering: one line per reference-table
/// entry, then the statement list. Not parseable back into a model.
pub fn to_text(model: &Rc<Model>, parameters: Option<&Parameters>, warm_start: Option<&Solution>) -> Result<String> {
    let stored = build_stored(model, parameters, warm_start);
    let mut out = String::new();
    if let Some(name) = &stored.name {
        out.push_str(&format!("model {name}\n"));
    }
    for (id, record) in stored.refs.iter().enumerate() {
        out.push_str(&format!("  #{id}: {}\n", describe_record(record)));
    }
    out.push_str("statements:\n");
    for arg in &stored.model {
        out.push_str(&format!("  {}\n", describe_argument(arg)));
    }
    if let Some(objective) = &stored.objective {
        out.push_str(&format!("objective: {}\n", describe_record(objective)));
    }
    Ok(out)
}

/// A JS-literal rendering of the same data (`{refs: [...], model: [...]}`),
/// for pasting into a JS host environment during debugging.
pub fn to_js(model: &Rc<Model>, parameters: Option<&Parameters>, warm_start: Option<&Solution>) -> Result<String> {
    let stored = build_stored(model, parameters, warm_start);
    let json = serde_json::to_value(&stored).map_err(|e| OptalcpError::Serialization(e.to_string()))?;
    Ok(format!("module.exports = {};\n", to_js_literal(&json)))
}

fn build_stored(model: &Rc<Model>, parameters: Option<&Parameters>, warm_start: Option<&Solution>) -> StoredModel {
    StoredModel {
        model: model.statements.borrow().clone(),
        refs: model.refs.borrow().clone(),
        name: model.name(),
        objective: model.objective.borrow().clone(),
        parameters: parameters.cloned(),
        warm_start: warm_start.map(Solution::to_wire),
    }
}

/// Rebuild a `Model` from a flattened reference table and statement list,
/// re-populating the per-kind variable inventories and the primary
/// objective ref by scanning `function_tag`s, exactly as the original
/// construction would have produced them.
fn reconstruct(
    statements: Vec<Argument>,
    refs: Vec<PropertyRecord>,
    name: Option<String>,
    objective: Option<PropertyRecord>,
) -> Rc<Model> {
    let model = Model::new();
    *model.name.borrow_mut() = name;
    *model.objective.borrow_mut() = objective;

    *model.refs.borrow_mut() = refs.clone();
    for (index, record) in refs.iter().enumerate() {
        let id = index as RefId;
        let node = Node::new_declaration(record.clone(), id);
        match record.function_tag.as_str() {
            "boolVar" => model.bool_vars.borrow_mut().push(node),
            "intVar" => model.int_vars.borrow_mut().push(node),
            "intervalVar" => model.interval_vars.borrow_mut().push(node),
            _ => {}
        }
    }

    let mut primary_objective_ref = None;
    for arg in &statements {
        if let Argument::Reference(id) = arg {
            if let Some(record) = refs.get(*id as usize) {
                if record.function_tag.starts_with("objective.") {
                    primary_objective_ref = Some(*id);
                }
            }
        }
    }
    *model.primary_objective_ref.borrow_mut() = primary_objective_ref;
    *model.statements.borrow_mut() = statements;
    model
}

fn describe_argument(arg: &Argument) -> String {
    match arg {
        Argument::Reference(id) => format!("#{id}"),
        Argument::Primitive(p) => format!("{p:?}"),
        Argument::Inline(record) => describe_record(record),
    }
}

fn describe_record(record: &PropertyRecord) -> String {
    let args: Vec<String> = record.args.iter().map(describe_argument).collect();
    format!("{}({})", record.function_tag, args.join(", "))
}

fn to_js_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) if s == "Infinity" || s == "-Infinity" => s.clone(),
        other => other.to_string(),
    }
}

/// If `OPTALCP_MODEL` names a path, write the serialized payload there.
/// Best-effort: a failure here must never fail the surrounding solve.
fn write_diagnostic_copy(text: &str) {
    let Ok(path) = std::env::var("OPTALCP_MODEL") else {
        return;
    };
    let text = text.to_string();
    let write = async move {
        if let Err(err) = tokio::fs::write(&path, text).await {
            tracing::warn!(%path, error = %err, "failed to write OPTALCP_MODEL diagnostic copy");
        }
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(write);
        }
        Err(_) => {
            // No Tokio runtime available (e.g. called from a sync context
            // or a test); fall back to a throwaway single-threaded one.
            if let Ok(rt) = tokio::runtime::Builder::new_current_thread().enable_all().build() {
                rt.block_on(write);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::container::Model;

    #[test]
    fn round_trips_a_simple_model() {
        let model = Model::new();
        let x = model.new_interval_var(0, 100, 0, 100, 10, 10, Some("x")).unwrap();
        model.minimize(&x.end());

        let json = to_json(&model, None, None).unwrap();
        let (restored, params, warm_start) = from_json(&json).unwrap();

        assert_eq!(restored.refs.borrow().len(), model.refs.borrow().len());
        assert_eq!(restored.statements.borrow().len(), model.statements.borrow().len());
        assert_eq!(restored.name(), model.name());
        assert_eq!(
            *restored.primary_objective_ref.borrow(),
            *model.primary_objective_ref.borrow()
        );
        assert!(params.is_none());
        assert!(warm_start.is_none());
    }

    #[test]
    fn text_export_mentions_statements() {
        let model = Model::new();
        let b = model.new_bool_var(Some("flag"));
        b.enforce();
        let text = to_text(&model, None, None).unwrap();
        assert!(text.contains("statements:"));
        assert!(text.contains("boolVar"));
    }
}
