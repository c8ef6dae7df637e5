//! Command-line parsing for the parameter catalog.
//!
//! Not `clap`-derive: the worker-range prefix grammar (`--workerN-M.opt`)
//! isn't expressible as a declarative flag parser, so this mirrors the
//! manual `while i < args.len()` loop the rest of the CLI surface uses.

use std::ops::RangeInclusive;

use crate::error::{OptalcpError, Result};
use crate::params::{LogLevel, Parameters, SearchType, WorkerParameters};

#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub parameters: Parameters,
    pub help_requested: bool,
    pub version_requested: bool,
    /// Tokens not recognized as catalog options. Only populated when
    /// `allow_unknown` is set; otherwise an unrecognized token is an error.
    pub unknown: Vec<String>,
}

enum ParsedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

enum ValueKind {
    Int,
    Float,
    Bool,
    Enum(&'static [&'static str]),
    Str,
}

struct Descriptor {
    name: &'static str,
    kind: ValueKind,
    worker_scopable: bool,
    apply_global: fn(&mut Parameters, ParsedValue),
    apply_worker: fn(&mut WorkerParameters, ParsedValue),
}

fn noop_worker(_: &mut WorkerParameters, _: ParsedValue) {}

const CATALOG: &[Descriptor] = &[
    Descriptor {
        name: "timeLimit",
        kind: ValueKind::Float,
        worker_scopable: true,
        apply_global: |p, v| p.shared.time_limit = as_float(v),
        apply_worker: |w, v| w.time_limit = as_float(v),
    },
    Descriptor {
        name: "randomSeed",
        kind: ValueKind::Int,
        worker_scopable: true,
        apply_global: |p, v| p.shared.random_seed = as_int(v),
        apply_worker: |w, v| w.random_seed = as_int(v),
    },
    Descriptor {
        name: "searchType",
        kind: ValueKind::Enum(&["FDS", "LNS", "FDSLB"]),
        worker_scopable: true,
        apply_global: |p, v| p.shared.search_type = as_search_type(v),
        apply_worker: |w, v| w.search_type = as_search_type(v),
    },
    Descriptor {
        name: "noOverlapPropagationLevel",
        kind: ValueKind::Int,
        worker_scopable: true,
        apply_global: |p, v| p.shared.no_overlap_propagation_level = as_int(v),
        apply_worker: |w, v| w.no_overlap_propagation_level = as_int(v),
    },
    Descriptor {
        name: "lnsUseWarmStartOnly",
        kind: ValueKind::Bool,
        worker_scopable: true,
        apply_global: |p, v| p.shared.lns_use_warm_start_only = as_bool(v),
        apply_worker: |w, v| w.lns_use_warm_start_only = as_bool(v),
    },
    Descriptor {
        name: "relativeGapTolerance",
        kind: ValueKind::Float,
        worker_scopable: true,
        apply_global: |p, v| p.shared.relative_gap_tolerance = as_float(v),
        apply_worker: |w, v| w.relative_gap_tolerance = as_float(v),
    },
    Descriptor {
        name: "absoluteGapTolerance",
        kind: ValueKind::Float,
        worker_scopable: true,
        apply_global: |p, v| p.shared.absolute_gap_tolerance = as_float(v),
        apply_worker: |w, v| w.absolute_gap_tolerance = as_float(v),
    },
    Descriptor {
        name: "verifySolution",
        kind: ValueKind::Bool,
        worker_scopable: true,
        apply_global: |p, v| p.shared.verify_solution = as_bool(v),
        apply_worker: |w, v| w.verify_solution = as_bool(v),
    },
    Descriptor {
        name: "nbWorkers",
        kind: ValueKind::Int,
        worker_scopable: false,
        apply_global: |p, v| p.nb_workers = as_int(v),
        apply_worker: noop_worker,
    },
    Descriptor {
        name: "logLevel",
        kind: ValueKind::Enum(&["quiet", "normal", "verbose", "debug"]),
        worker_scopable: false,
        apply_global: |p, v| {
            p.log_level = match v {
                ParsedValue::Str(s) => match s.to_lowercase().as_str() {
                    "quiet" => Some(LogLevel::Quiet),
                    "normal" => Some(LogLevel::Normal),
                    "verbose" => Some(LogLevel::Verbose),
                    "debug" => Some(LogLevel::Debug),
                    _ => None,
                },
                _ => None,
            };
        },
        apply_worker: noop_worker,
    },
    Descriptor {
        name: "solverPath",
        kind: ValueKind::Str,
        worker_scopable: false,
        apply_global: |p, v| {
            if let ParsedValue::Str(s) = v {
                p.solver = Some(s);
            }
        },
        apply_worker: noop_worker,
    },
];

fn as_int(v: ParsedValue) -> Option<i64> {
    match v {
        ParsedValue::Int(n) => Some(n),
        _ => None,
    }
}
fn as_float(v: ParsedValue) -> Option<f64> {
    match v {
        ParsedValue::Float(n) => Some(n),
        ParsedValue::Int(n) => Some(n as f64),
        _ => None,
    }
}
fn as_bool(v: ParsedValue) -> Option<bool> {
    match v {
        ParsedValue::Bool(b) => Some(b),
        _ => None,
    }
}
fn as_search_type(v: ParsedValue) -> Option<SearchType> {
    match v {
        ParsedValue::Str(s) => match s.as_str() {
            "FDS" => Some(SearchType::FDS),
            "LNS" => Some(SearchType::LNS),
            "FDSLB" => Some(SearchType::FDSLB),
            _ => None,
        },
        _ => None,
    }
}

fn parse_value(kind: &ValueKind, option: &str, raw: &str) -> Result<ParsedValue> {
    match kind {
        ValueKind::Int => raw
            .parse::<i64>()
            .map(ParsedValue::Int)
            .map_err(|_| invalid(option, raw, "expected an integer")),
        ValueKind::Float => {
            if raw.eq_ignore_ascii_case("infinity") {
                Ok(ParsedValue::Float(f64::INFINITY))
            } else if raw.eq_ignore_ascii_case("-infinity") {
                Ok(ParsedValue::Float(f64::NEG_INFINITY))
            } else {
                raw.parse::<f64>()
                    .map(ParsedValue::Float)
                    .map_err(|_| invalid(option, raw, "expected a number or Infinity"))
            }
        }
        ValueKind::Bool => match raw.to_lowercase().as_str() {
            "true" | "1" | "t" | "yes" | "y" => Ok(ParsedValue::Bool(true)),
            "false" | "0" | "f" | "no" | "n" => Ok(ParsedValue::Bool(false)),
            _ => Err(invalid(option, raw, "expected a boolean token")),
        },
        ValueKind::Enum(variants) => {
            if variants.iter().any(|v| v.eq_ignore_ascii_case(raw)) {
                Ok(ParsedValue::Str(raw.to_string()))
            } else {
                Err(invalid(option, raw, &format!("expected one of {variants:?}")))
            }
        }
        ValueKind::Str => Ok(ParsedValue::Str(raw.to_string())),
    }
}

fn invalid(option: &str, value: &str, reason: &str) -> OptalcpError {
    OptalcpError::InvalidOptionValue {
        option: option.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Strip a leading `worker`/`workers` range prefix off a bare option body
/// (the part of the flag after `--`), returning the inclusive worker index
/// range and the remaining option name. `None` when there is no such prefix.
fn parse_worker_scope(body: &str) -> Option<(RangeInclusive<usize>, &str)> {
    let rest = body.strip_prefix("workers").or_else(|| body.strip_prefix("worker"))?;
    let dot = rest.find('.')?;
    let range_str = &rest[..dot];
    let opt_name = &rest[dot + 1..];
    if range_str.is_empty() {
        return None;
    }
    let (lo, hi) = match range_str.split_once('-') {
        Some((a, b)) => (a.parse::<usize>().ok()?, b.parse::<usize>().ok()?),
        None => {
            let n = range_str.parse::<usize>().ok()?;
            (n, n)
        }
    };
    if lo > hi {
        return None;
    }
    Some((lo..=hi, opt_name))
}

fn ensure_worker_slots(parameters: &mut Parameters, up_to: usize) {
    let workers = parameters.workers.get_or_insert_with(Vec::new);
    while workers.len() <= up_to {
        workers.push(WorkerParameters::default());
    }
}

/// Parse a full argument vector (excluding argv[0]) against the catalog.
/// In strict mode (`allow_unknown = false`) an unrecognized token is an
/// error; in allow-unknown mode it is collected into `ParsedArgs::unknown`
/// instead.
pub fn parse_args(args: &[String], allow_unknown: bool) -> Result<ParsedArgs> {
    let mut result = ParsedArgs::default();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];

        if arg == "--help" || arg == "-h" {
            result.help_requested = true;
            i += 1;
            continue;
        }
        if arg == "--optalcpVersion" {
            result.version_requested = true;
            i += 1;
            continue;
        }
        if let Some(rest) = arg.strip_prefix("--") {
            let (flag_body, inline_value) = match rest.split_once('=') {
                Some((f, v)) => (f, Some(v.to_string())),
                None => (rest, None),
            };

            let (scope, opt_name) = match parse_worker_scope(flag_body) {
                Some((range, name)) => (Some(range), name),
                None => (None, flag_body),
            };

            let Some(descriptor) = CATALOG.iter().find(|d| d.name == opt_name) else {
                if allow_unknown {
                    result.unknown.push(arg.clone());
                    i += 1;
                    continue;
                }
                return Err(OptalcpError::UnknownOption(arg.clone()));
            };

            if scope.is_some() && !descriptor.worker_scopable {
                return Err(OptalcpError::NotWorkerScopable(opt_name.to_string()));
            }

            let inline = inline_value.is_some();
            let raw_value = match inline_value {
                Some(v) => v,
                None => {
                    let Some(next) = args.get(i + 1) else {
                        return Err(OptalcpError::MissingValue { option: arg.clone() });
                    };
                    next.clone()
                }
            };
            let consumed = if inline { 1 } else { 2 };

            match scope {
                Some(range) => {
                    for idx in range {
                        ensure_worker_slots(&mut result.parameters, idx);
                        let value = parse_value(&descriptor.kind, opt_name, &raw_value)?;
                        (descriptor.apply_worker)(&mut result.parameters.workers.as_mut().unwrap()[idx], value);
                    }
                }
                None => {
                    let value = parse_value(&descriptor.kind, opt_name, &raw_value)?;
                    (descriptor.apply_global)(&mut result.parameters, value);
                }
            }
            i += consumed;
            continue;
        }

        if allow_unknown {
            result.unknown.push(arg.clone());
            i += 1;
        } else {
            return Err(OptalcpError::UnknownOption(arg.clone()));
        }
    }
    Ok(result)
}

/// The catalog listing printed by `--help`, one line per option.
pub fn usage_lines() -> Vec<String> {
    CATALOG
        .iter()
        .map(|d| {
            let kind = match d.kind {
                ValueKind::Int => "int",
                ValueKind::Float => "float",
                ValueKind::Bool => "bool",
                ValueKind::Enum(variants) => return format!("--{} <{}>", d.name, variants.join("|")),
                ValueKind::Str => "string",
            };
            format!("--{} <{}>", d.name, kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_global_time_limit() {
        let parsed = parse_args(&args(&["--timeLimit", "30"]), false).unwrap();
        assert_eq!(parsed.parameters.shared.time_limit, Some(30.0));
    }

    #[test]
    fn parses_infinity() {
        let parsed = parse_args(&args(&["--timeLimit=Infinity"]), false).unwrap();
        assert_eq!(parsed.parameters.shared.time_limit, Some(f64::INFINITY));
    }

    #[test]
    fn parses_single_worker_scope() {
        let parsed = parse_args(&args(&["--worker2.randomSeed", "7"]), false).unwrap();
        let workers = parsed.parameters.workers.unwrap();
        assert_eq!(workers.len(), 3);
        assert_eq!(workers[2].random_seed, Some(7));
        assert_eq!(workers[0].random_seed, None);
    }

    #[test]
    fn parses_worker_range_scope() {
        let parsed = parse_args(&args(&["--worker0-2.lnsUseWarmStartOnly", "true"]), false).unwrap();
        let workers = parsed.parameters.workers.unwrap();
        assert_eq!(workers.len(), 3);
        assert!(workers.iter().all(|w| w.lns_use_warm_start_only == Some(true)));
    }

    #[test]
    fn rejects_worker_scope_on_global_only_option() {
        let err = parse_args(&args(&["--worker0.nbWorkers", "2"]), false).unwrap_err();
        assert!(matches!(err, OptalcpError::NotWorkerScopable(_)));
    }

    #[test]
    fn unknown_option_errors_in_strict_mode() {
        let err = parse_args(&args(&["--notAnOption", "x"]), false).unwrap_err();
        assert!(matches!(err, OptalcpError::UnknownOption(_)));
    }

    #[test]
    fn unknown_option_collected_in_allow_unknown_mode() {
        let parsed = parse_args(&args(&["--notAnOption", "x"]), true).unwrap();
        assert_eq!(parsed.unknown, vec!["--notAnOption".to_string(), "x".to_string()]);
    }

    #[test]
    fn help_and_version_flags() {
        let parsed = parse_args(&args(&["--help"]), false).unwrap();
        assert!(parsed.help_requested);
        let parsed = parse_args(&args(&["--optalcpVersion"]), false).unwrap();
        assert!(parsed.version_requested);
    }
}
