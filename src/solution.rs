//! Solution and domain snapshots: the sparse, ref-id-keyed results a solve
//! or a propagation produces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::argument::RefId;

/// One variable's value in a [`Solution`]. `IntVar`/`BoolVar` carry a plain
/// integer (booleans as 0/1); `IntervalVar` carries its chosen bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SolutionValue {
    Int(i64),
    Interval { start: i64, end: i64 },
}

/// A sparse map from variable ref id to concrete value, plus an optional
/// objective value. A variable absent from `values` was absent in the
/// solution.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    values: HashMap<RefId, SolutionValue>,
    objective: Option<f64>,
}

impl Solution {
    pub fn new() -> Self {
        Solution::default()
    }

    pub fn get(&self, id: RefId) -> Option<SolutionValue> {
        self.values.get(&id).copied()
    }

    pub fn get_int(&self, id: RefId) -> Option<i64> {
        match self.values.get(&id) {
            Some(SolutionValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_interval(&self, id: RefId) -> Option<(i64, i64)> {
        match self.values.get(&id) {
            Some(SolutionValue::Interval { start, end }) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn is_absent(&self, id: RefId) -> bool {
        !self.values.contains_key(&id)
    }

    pub fn set(&mut self, id: RefId, value: SolutionValue) {
        self.values.insert(id, value);
    }

    pub fn objective(&self) -> Option<f64> {
        self.objective
    }

    pub fn set_objective(&mut self, objective: Option<f64>) {
        self.objective = objective;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse the wire form `{objective, values: [{id, value}, ...]}`.
    pub(crate) fn from_wire(wire: &crate::wire::SolutionData) -> Solution {
        let mut solution = Solution::new();
        if let Some(values) = &wire.values {
            for entry in values {
                solution.set(entry.id, entry.value);
            }
        }
        solution.set_objective(wire.objective);
        solution
    }

    /// `{objective, values: [{id, value}, ...]}`, the shape sent back to the
    /// solver via `sendSolution`.
    pub(crate) fn to_wire(&self) -> crate::wire::SolutionData {
        let values = self
            .values
            .iter()
            .map(|(&id, &value)| crate::wire::SolutionValueEntry { id, value })
            .collect();
        crate::wire::SolutionData {
            objective: self.objective,
            values: Some(values),
            solve_time: None,
            verified_ok: None,
        }
    }
}

/// One variable's domain after propagation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
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
}

/// The output of `propagate`: a sparse ref-id-keyed map of domain records,
/// plus the propagation statistics reported alongside it.
#[derive(Debug, Clone, Default)]
pub struct ModelDomains {
    domains: HashMap<RefId, DomainRecord>,
    pub duration: Option<f64>,
    pub memory_used: Option<i64>,
    pub nb_int_vars: Option<i64>,
    pub nb_interval_vars: Option<i64>,
    pub nb_constraints: Option<i64>,
}

impl ModelDomains {
    pub fn get(&self, id: RefId) -> Option<&DomainRecord> {
        self.domains.get(&id)
    }
    pub fn insert(&mut self, id: RefId, record: DomainRecord) {
        self.domains.insert(id, record);
    }
    pub fn len(&self) -> usize {
        self.domains.len()
    }
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// `propagate()` never throws for infeasibility or a hit resource limit; it
/// reports them as sentinel outcomes alongside the normal domain snapshot.
#[derive(Debug, Clone)]
pub enum PropagationResult {
    Domains(ModelDomains),
    Infeasible,
    LimitHit,
}
