//! Cumulative function expressions: pulses, steps and their sums.
//!
//! A [`CumulExpr`] describes a resource usage profile over time, built out of
//! atomic contributions (`pulse`, `stepAtStart`, `stepAtEnd`, `stepAt`) and
//! combined with `plus`/`minus`/`sum`. `le`/`ge` turn a cumulative function
//! into a root constraint bounding it everywhere.

use std::rc::Rc;

use crate::argument::{Argument, Node, Primitive};
use crate::error::{OptalcpError, Result};
use crate::model::container::{identity_key, Model};
use crate::model::node::PropertyRecord;
use crate::model::vars::IntervalVar;

#[derive(Debug, Clone)]
pub struct CumulExpr {
    model: Rc<Model>,
    node: Rc<Node>,
}

impl CumulExpr {
    fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        CumulExpr { model, node }
    }

    pub fn argument(&self) -> Argument {
        self.node.encode_as_argument(&mut self.model.refs.borrow_mut())
    }

    fn build(model: &Rc<Model>, tag: &str, args: Vec<Argument>) -> CumulExpr {
        CumulExpr::wrap(model.clone(), Node::new(PropertyRecord::new(tag, args)))
    }

    pub fn neg(&self) -> CumulExpr {
        CumulExpr::build(&self.model, "cumul.neg", vec![self.argument()])
    }
    pub fn plus(&self, other: &CumulExpr) -> CumulExpr {
        CumulExpr::build(&self.model, "cumul.plus", vec![self.argument(), other.argument()])
    }
    pub fn minus(&self, other: &CumulExpr) -> CumulExpr {
        CumulExpr::build(&self.model, "cumul.minus", vec![self.argument(), other.argument()])
    }

    /// Upper-bound the cumulative function everywhere by `bound` (a root
    /// constraint, mirroring `Model::enforce` semantics). `bound` may be a
    /// constant or a variable capacity (an integer expression).
    pub fn le(&self, bound: impl Into<crate::model::expr::IntOperand>) -> crate::model::expr::BoolExpr {
        match bound.into() {
            crate::model::expr::IntOperand::Const(c) => {
                let mut record = PropertyRecord::new("cumul.le", vec![self.argument()]);
                record.max = Some(c);
                self.model.declare_constraint_record(record)
            }
            crate::model::expr::IntOperand::Expr(e) => {
                let record = PropertyRecord::new("cumul.le", vec![self.argument(), e.argument()]);
                self.model.declare_constraint_record(record)
            }
        }
    }

    /// Lower-bound the cumulative function everywhere by `bound`. Requires a
    /// constant capacity, not an expression (reservoir constraints in the
    /// underlying solver only accept literal bounds).
    pub fn ge(&self, bound: impl Into<crate::model::expr::IntOperand>) -> Result<crate::model::expr::BoolExpr> {
        match bound.into() {
            crate::model::expr::IntOperand::Const(c) => {
                let mut record = PropertyRecord::new("cumul.ge", vec![self.argument()]);
                record.min = Some(c);
                Ok(self.model.declare_constraint_record(record))
            }
            crate::model::expr::IntOperand::Expr(_) => Err(OptalcpError::ReservoirRequiresConstant),
        }
    }
}

/// Sum an arbitrary number of cumulative terms. Mixing pulse-based and
/// step-based terms in one sum is rejected: the two lower to incompatible
/// resource profiles in the underlying solver.
pub fn sum(model: &Rc<Model>, terms: &[CumulExpr]) -> Result<CumulExpr> {
    if terms.is_empty() {
        return Err(OptalcpError::EmptyArray { what: "cumul.sum" });
    }
    let kinds: Vec<&str> = terms
        .iter()
        .map(|t| {
            let tag = t.node.record.borrow().function_tag.clone();
            if tag.starts_with("cumul.pulse") { "pulse" } else { "step" }
        })
        .collect();
    if kinds.iter().any(|k| *k == "pulse") && kinds.iter().any(|k| *k == "step") {
        return Err(OptalcpError::MixedCumulativeKinds);
    }
    let args: Vec<Argument> = terms.iter().map(CumulExpr::argument).collect();
    let arr = model.wrap_array(identity_key(terms), args);
    Ok(CumulExpr::build(model, "cumul.sum", vec![arr]))
}

/// A `height`-unit contribution for the duration of `interval`. Rejects a
/// negative height at construction time (the underlying solver instead
/// tolerates it and treats it as `0`, which this client considers a
/// modeling mistake worth catching early).
pub fn pulse(model: &Rc<Model>, interval: &IntervalVar, height: i64) -> Result<CumulExpr> {
    if height < 0 {
        return Err(OptalcpError::NegativePulseHeight(height));
    }
    let mut record = PropertyRecord::new("cumul.pulse", vec![interval.argument()]);
    record.min = Some(height);
    Ok(CumulExpr::wrap(model.clone(), Node::new(record)))
}

pub fn step_at_start(model: &Rc<Model>, interval: &IntervalVar, height: i64) -> CumulExpr {
    let mut record = PropertyRecord::new("cumul.stepAtStart", vec![interval.argument()]);
    record.min = Some(height);
    CumulExpr::wrap(model.clone(), Node::new(record))
}

pub fn step_at_end(model: &Rc<Model>, interval: &IntervalVar, height: i64) -> CumulExpr {
    let mut record = PropertyRecord::new("cumul.stepAtEnd", vec![interval.argument()]);
    record.min = Some(height);
    CumulExpr::wrap(model.clone(), Node::new(record))
}

/// A step of `height` at a fixed time `at`, independent of any interval.
pub fn step_at(model: &Rc<Model>, at: i64, height: i64) -> CumulExpr {
    let args = vec![
        Argument::Primitive(Primitive::Int(at)),
        Argument::Primitive(Primitive::Int(height)),
    ];
    CumulExpr::build(model, "cumul.stepAt", args)
}
