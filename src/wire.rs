//! The line-delimited JSON wire payloads exchanged with the solver process.
//!
//! Every message is one JSON object with a `msg` discriminator. This module
//! owns the raw `#[derive(Serialize, Deserialize)]` shapes; [`crate::serialize`]
//! builds the request payload from a [`crate::model::Model`] and
//! [`crate::params::Parameters`], and [`crate::solver::session`] dispatches
//! the response payloads.

use serde::{Deserialize, Serialize};

use crate::argument::{Argument, RefId};
use crate::model::node::PropertyRecord;
use crate::params::Parameters;
use crate::solution::{DomainRecord, SolutionValue};

/// `solve`/`propagate`/`toText`/`toJS` all share this request shape; only
/// `msg` and which response events follow differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    pub msg: RequestKind,
    pub model: Vec<Argument>,
    pub refs: Vec<PropertyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<PropertyRecord>,
    pub parameters: Parameters,
    #[serde(rename = "warmStart", skip_serializing_if = "Option::is_none")]
    pub warm_start: Option<SolutionData>,
    #[serde(rename = "batchResults")]
    pub batch_results: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Solve,
    Propagate,
    ToText,
    ToJs,
}

impl RequestPayload {
    /// Build the single request line sent right after the handshake.
    /// `batch_results` is true only when the caller registered neither an
    /// incremental-solution nor an objective-bound callback.
    pub(crate) fn build(
        model: &crate::model::container::Model,
        kind: RequestKind,
        parameters: Parameters,
        warm_start: Option<&crate::solution::Solution>,
        batch_results: bool,
    ) -> RequestPayload {
        RequestPayload {
            msg: kind,
            model: model.statements.borrow().clone(),
            refs: model.refs.borrow().clone(),
            name: model.name(),
            objective: model.objective.borrow().clone(),
            parameters,
            warm_start: warm_start.map(crate::solution::Solution::to_wire),
            batch_results,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub msg: HandshakeTag,
    pub client: String,
    pub version: String,
    pub colors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeTag {
    Handshake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    pub msg: StopTag,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopTag {
    Stop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSolutionRequest {
    pub msg: SolutionTag,
    pub data: SolutionData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionTag {
    Solution,
}

/// `{objective, values: [{id, value}, ...]}`, shared by the `solution` event
/// from the server and the `sendSolution` command to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<SolutionValueEntry>>,
    #[serde(rename = "solveTime", skip_serializing_if = "Option::is_none")]
    pub solve_time: Option<f64>,
    #[serde(rename = "verifiedOK", skip_serializing_if = "Option::is_none")]
    pub verified_ok: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolutionValueEntry {
    pub id: RefId,
    pub value: SolutionValue,
}

/// Every message the solver can send back, keyed on `msg`. Server messages
/// are untagged-by-field rather than untagged-by-variant: `msg` is matched
/// by [`crate::solver::session`] after parsing into a `serde_json::Value`,
/// since an unknown `msg` must be recoverable as an error rather than a hard
/// parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessage {
    pub msg: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    #[serde(default)]
    pub prefix: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogData {
    #[serde(default)]
    pub prefix: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LowerBoundData {
    #[serde(rename = "solveTime")]
    pub solve_time: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainsData {
    #[serde(default)]
    pub domains: Vec<DomainEntry>,
    #[serde(default)]
    pub error: bool,
    #[serde(rename = "limitHit", default)]
    pub limit_hit: bool,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(rename = "memoryUsed", default)]
    pub memory_used: Option<i64>,
    #[serde(rename = "nbIntVars", default)]
    pub nb_int_vars: Option<i64>,
    #[serde(rename = "nbIntervalVars", default)]
    pub nb_interval_vars: Option<i64>,
    #[serde(rename = "nbConstraints", default)]
    pub nb_constraints: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    pub id: RefId,
    pub domain: DomainRecord,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryData {
    #[serde(default)]
    pub objective: Option<f64>,
    #[serde(rename = "objectiveHistory", default)]
    pub objective_history: Option<Vec<HistoryEntry>>,
    #[serde(rename = "objectiveBoundHistory", default)]
    pub objective_bound_history: Option<Vec<HistoryEntry>>,
    #[serde(rename = "solutionValues", default)]
    pub solution_values: Option<Vec<SolutionValueEntry>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "solveTime")]
    pub solve_time: f64,
    pub value: f64,
}
