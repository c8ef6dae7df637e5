//! Solve parameters: a flat set of optional fields sent to the solver,
//! plus per-worker overrides.

pub mod cli;

use serde::{Deserialize, Serialize};

/// `+Infinity`/`-Infinity` are JSON-unrepresentable; parameter float fields
/// encode them as strings on the wire and restore them on decode. `NaN` is
/// never produced by this client.
mod float_or_inf {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(v) if v.is_infinite() => {
                if *v > 0.0 {
                    serializer.serialize_str("Infinity")
                } else {
                    serializer.serialize_str("-Infinity")
                }
            }
            Some(v) => v.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Number(v)) => Ok(Some(v)),
            Some(Repr::Text(s)) if s == "Infinity" => Ok(Some(f64::INFINITY)),
            Some(Repr::Text(s)) if s == "-Infinity" => Ok(Some(f64::NEG_INFINITY)),
            Some(Repr::Text(s)) => Err(serde::de::Error::custom(format!("invalid float parameter: {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchType {
    FDS,
    LNS,
    FDSLB,
}

/// Fields valid both globally and per worker. `Parameters` wraps one of
/// these plus the globally-only fields (`log_level`, `solver`, `workers`);
/// `WorkerParameters` is the same shared set alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerParameters {
    #[serde(rename = "timeLimit", default, skip_serializing_if = "Option::is_none", with = "float_or_inf")]
    pub time_limit: Option<f64>,
    #[serde(rename = "randomSeed", skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<i64>,
    #[serde(rename = "searchType", skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,
    #[serde(rename = "noOverlapPropagationLevel", skip_serializing_if = "Option::is_none")]
    pub no_overlap_propagation_level: Option<i64>,
    #[serde(rename = "lnsUseWarmStartOnly", skip_serializing_if = "Option::is_none")]
    pub lns_use_warm_start_only: Option<bool>,
    #[serde(rename = "relativeGapTolerance", default, skip_serializing_if = "Option::is_none", with = "float_or_inf")]
    pub relative_gap_tolerance: Option<f64>,
    #[serde(rename = "absoluteGapTolerance", default, skip_serializing_if = "Option::is_none", with = "float_or_inf")]
    pub absolute_gap_tolerance: Option<f64>,
    #[serde(rename = "verifySolution", skip_serializing_if = "Option::is_none")]
    pub verify_solution: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(flatten)]
    pub shared: WorkerParameters,

    #[serde(rename = "nbWorkers", skip_serializing_if = "Option::is_none")]
    pub nb_workers: Option<i64>,
    /// Global only: per-worker logging would interleave incoherently.
    #[serde(rename = "logLevel", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    /// Explicit solver endpoint override; see solver discovery lookup order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
    /// Non-cloneable by value in the source (a callback/stream handle);
    /// carried here as an opaque tag so `copy_parameters` can skip it.
    #[serde(skip)]
    pub print_log: Option<PrintLogHandle>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<Vec<WorkerParameters>>,
}

/// Stand-in for a non-cloneable log sink reference. `copy_parameters`
/// preserves it by `Rc` instead of deep-cloning.
#[derive(Clone)]
pub struct PrintLogHandle(pub std::rc::Rc<std::cell::RefCell<dyn std::io::Write>>);

impl std::fmt::Debug for PrintLogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrintLogHandle").finish()
    }
}

impl PartialEq for PrintLogHandle {
    fn eq(&self, other: &Self) -> bool {
        std::rc::Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Deep-merge per-worker slots element-wise; a field set in `overrides`
/// wins. `overrides.workers[i]` merges onto `base.workers[i]` if both have
/// an entry at that index, otherwise an override-only slot is appended.
pub fn merge_parameters(base: &Parameters, overrides: &Parameters) -> Parameters {
    let mut merged = base.clone();
    merge_worker(&mut merged.shared, &overrides.shared);
    merged.nb_workers = overrides.nb_workers.or(merged.nb_workers);
    merged.log_level = overrides.log_level.or(merged.log_level);
    merged.solver = overrides.solver.clone().or(merged.solver.clone());
    merged.print_log = overrides.print_log.clone().or(merged.print_log.clone());

    match (&mut merged.workers, &overrides.workers) {
        (Some(base_workers), Some(override_workers)) => {
            for (i, ow) in override_workers.iter().enumerate() {
                match base_workers.get_mut(i) {
                    Some(bw) => merge_worker(bw, ow),
                    None => base_workers.push(ow.clone()),
                }
            }
        }
        (None, Some(override_workers)) => merged.workers = Some(override_workers.clone()),
        _ => {}
    }
    merged
}

fn merge_worker(base: &mut WorkerParameters, overrides: &WorkerParameters) {
    base.time_limit = overrides.time_limit.or(base.time_limit);
    base.random_seed = overrides.random_seed.or(base.random_seed);
    base.search_type = overrides.search_type.or(base.search_type);
    base.no_overlap_propagation_level = overrides.no_overlap_propagation_level.or(base.no_overlap_propagation_level);
    base.lns_use_warm_start_only = overrides.lns_use_warm_start_only.or(base.lns_use_warm_start_only);
    base.relative_gap_tolerance = overrides.relative_gap_tolerance.or(base.relative_gap_tolerance);
    base.absolute_gap_tolerance = overrides.absolute_gap_tolerance.or(base.absolute_gap_tolerance);
    base.verify_solution = overrides.verify_solution.or(base.verify_solution);
}

/// Deep-clone, preserving `print_log` by reference rather than requiring it
/// to implement a real clone of the underlying sink.
pub fn copy_parameters(params: &Parameters) -> Parameters {
    params.clone()
}
