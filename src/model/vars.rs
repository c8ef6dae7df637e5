//! Variable declarations: `BoolVar`, `IntVar`, `IntervalVar`.
//!
//! `BoolVar` and `IntVar` are newtypes over `BoolExpr`/`IntExpr` and deref to
//! them, so they automatically expose the full arithmetic/comparison
//! surface - "Boolean variables inherit all integer-expression arithmetic"
//! falls out of `Deref` instead of needing its own copy of every
//! method.

use std::ops::Deref;
use std::rc::Rc;

use crate::argument::{Argument, Node};
use crate::error::{OptalcpError, Result};
use crate::model::container::Model;
use crate::model::expr::{BoolExpr, IntExpr};
use crate::model::node::{PresenceStatus, PropertyRecord};

/// Tri-state presence, mirrored from [`PresenceStatus`] for the public API.
pub use crate::model::node::PresenceStatus as Presence;

#[derive(Debug, Clone)]
pub struct IntVar(pub(crate) IntExpr);

impl Deref for IntVar {
    type Target = IntExpr;
    fn deref(&self) -> &IntExpr {
        &self.0
    }
}

impl IntVar {
    pub(crate) fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        IntVar(IntExpr::wrap(model, node))
    }

    pub fn as_int_expr(&self) -> IntExpr {
        self.0.clone()
    }

    pub fn name(&self) -> Option<String> {
        self.0.node.record.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.node.record.borrow_mut().name = Some(name.into());
    }

    fn is_absent(&self) -> bool {
        matches!(
            self.0.node.record.borrow().presence_status,
            Some(PresenceStatus::Absent)
        )
    }

    /// `None` when the variable is absent.
    pub fn min(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.0.node.record.borrow().min
        }
    }
    pub fn max(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.0.node.record.borrow().max
        }
    }
    pub fn set_min(&self, v: i64) {
        self.0.node.record.borrow_mut().min = Some(v);
    }
    pub fn set_max(&self, v: i64) {
        self.0.node.record.borrow_mut().max = Some(v);
    }

    pub fn presence(&self) -> Presence {
        self.0
            .node
            .record
            .borrow()
            .presence_status
            .unwrap_or(PresenceStatus::Present)
    }
    pub fn set_presence(&self, status: Presence) {
        self.0.node.record.borrow_mut().presence_status = if status == PresenceStatus::Present {
            None
        } else {
            Some(status)
        };
    }
    pub fn set_optional(&self) {
        self.set_presence(PresenceStatus::Optional);
    }
    /// Marking a variable absent is itself a constraint: the solver must not
    /// assign it in the solution.
    pub fn set_absent(&self) {
        self.set_presence(PresenceStatus::Absent);
    }
}

#[derive(Clone)]
pub struct BoolVar(pub(crate) BoolExpr);

impl Deref for BoolVar {
    type Target = BoolExpr;
    fn deref(&self) -> &BoolExpr {
        &self.0
    }
}

impl BoolVar {
    pub(crate) fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        BoolVar(BoolExpr::wrap(model, node))
    }

    pub fn as_bool_expr(&self) -> BoolExpr {
        self.0.clone()
    }

    pub fn name(&self) -> Option<String> {
        self.0 .0.node.record.borrow().name.clone()
    }
    pub fn set_name(&self, name: impl Into<String>) {
        self.0 .0.node.record.borrow_mut().name = Some(name.into());
    }

    /// `Some(true)`/`Some(false)` when this variable has been fixed to a
    /// constant, `None` when free. `min()`/`max()` below expose the
    /// underlying wire encoding for callers that need it directly.
    pub fn fixed_to(&self) -> Option<bool> {
        let record = self.0 .0.node.record.borrow();
        match (record.min, record.max) {
            (Some(0), Some(0)) => Some(false),
            (Some(1), Some(1)) => Some(true),
            _ => None,
        }
    }

    pub fn fix_to(&self, value: bool) {
        let mut record = self.0 .0.node.record.borrow_mut();
        let v = i64::from(value);
        record.min = Some(v);
        record.max = Some(v);
    }

    pub fn min(&self) -> Option<i64> {
        self.0 .0.node.record.borrow().min
    }
    pub fn max(&self) -> Option<i64> {
        self.0 .0.node.record.borrow().max
    }

    pub fn presence(&self) -> Presence {
        self.0
             .0
            .node
            .record
            .borrow()
            .presence_status
            .unwrap_or(PresenceStatus::Present)
    }
    pub fn set_presence(&self, status: Presence) {
        self.0 .0.node.record.borrow_mut().presence_status = if status == PresenceStatus::Present {
            None
        } else {
            Some(status)
        };
    }
    pub fn set_optional(&self) {
        self.set_presence(PresenceStatus::Optional);
    }
    pub fn set_absent(&self) {
        self.set_presence(PresenceStatus::Absent);
    }
}

/// Which endpoint of an interval a precedence constraint refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

#[derive(Debug, Clone)]
pub struct IntervalVar {
    pub(crate) model: Rc<Model>,
    pub(crate) node: Rc<Node>,
}

impl IntervalVar {
    pub(crate) fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        IntervalVar { model, node }
    }

    pub fn node(&self) -> &Rc<Node> {
        &self.node
    }
    pub fn model(&self) -> &Rc<Model> {
        &self.model
    }

    pub fn argument(&self) -> Argument {
        self.node.encode_as_argument(&mut self.model.refs.borrow_mut())
    }

    pub fn name(&self) -> Option<String> {
        self.node.record.borrow().name.clone()
    }
    pub fn set_name(&self, name: impl Into<String>) {
        self.node.record.borrow_mut().name = Some(name.into());
    }

    fn is_absent(&self) -> bool {
        matches!(
            self.node.record.borrow().presence_status,
            Some(PresenceStatus::Absent)
        )
    }

    pub fn start_min(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.node.record.borrow().start_min
        }
    }
    pub fn set_start_min(&self, v: i64) {
        self.node.record.borrow_mut().start_min = Some(v);
    }
    pub fn start_max(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.node.record.borrow().start_max
        }
    }
    pub fn set_start_max(&self, v: i64) {
        self.node.record.borrow_mut().start_max = Some(v);
    }
    pub fn end_min(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.node.record.borrow().end_min
        }
    }
    pub fn set_end_min(&self, v: i64) {
        self.node.record.borrow_mut().end_min = Some(v);
    }
    pub fn end_max(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.node.record.borrow().end_max
        }
    }
    pub fn set_end_max(&self, v: i64) {
        self.node.record.borrow_mut().end_max = Some(v);
    }
    pub fn length_min(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.node.record.borrow().length_min
        }
    }
    pub fn set_length_min(&self, v: i64) {
        self.node.record.borrow_mut().length_min = Some(v);
    }
    pub fn length_max(&self) -> Option<i64> {
        if self.is_absent() {
            None
        } else {
            self.node.record.borrow().length_max
        }
    }
    pub fn set_length_max(&self, v: i64) {
        self.node.record.borrow_mut().length_max = Some(v);
    }

    pub fn presence(&self) -> BoolExpr {
        BoolExpr::wrap(
            self.model.clone(),
            Node::new(PropertyRecord::new("interval.presence", vec![self.argument()])),
        )
    }
    pub fn presence_status(&self) -> Presence {
        self.node
            .record
            .borrow()
            .presence_status
            .unwrap_or(PresenceStatus::Present)
    }
    pub fn set_presence(&self, status: Presence) {
        self.node.record.borrow_mut().presence_status = if status == PresenceStatus::Present {
            None
        } else {
            Some(status)
        };
    }
    pub fn set_optional(&self) {
        self.set_presence(PresenceStatus::Optional);
    }
    pub fn set_absent(&self) {
        self.set_presence(PresenceStatus::Absent);
    }

    fn endpoint_expr(&self, tag: &str) -> IntExpr {
        IntExpr::wrap(self.model.clone(), Node::new(PropertyRecord::new(tag, vec![self.argument()])))
    }

    pub fn start(&self) -> IntExpr {
        self.endpoint_expr("interval.start")
    }
    pub fn end(&self) -> IntExpr {
        self.endpoint_expr("interval.end")
    }
    pub fn length(&self) -> IntExpr {
        self.endpoint_expr("interval.length")
    }

    fn endpoint_or(&self, tag: &str, default: i64) -> IntExpr {
        let mut record = PropertyRecord::new(tag, vec![self.argument()]);
        record.min = Some(default);
        IntExpr::wrap(self.model.clone(), Node::new(record))
    }
    pub fn start_or(&self, default: i64) -> IntExpr {
        self.endpoint_or("interval.startOr", default)
    }
    pub fn end_or(&self, default: i64) -> IntExpr {
        self.endpoint_or("interval.endOr", default)
    }
    pub fn length_or(&self, default: i64) -> IntExpr {
        self.endpoint_or("interval.lengthOr", default)
    }

    /// One precedence method per pair of endpoints x {<=, =}:
    /// `endBeforeStart`, `startBeforeStart`, `startBeforeEnd`, `endBeforeEnd`
    /// and their `At` (`=`) counterparts, each with an optional `delay`.
    fn precedence(&self, from: Endpoint, to: Endpoint, eq: bool, other: &IntervalVar, delay: i64) -> BoolExpr {
        let tag = match (from, to, eq) {
            (Endpoint::Start, Endpoint::Start, false) => "interval.startBeforeStart",
            (Endpoint::Start, Endpoint::End, false) => "interval.startBeforeEnd",
            (Endpoint::End, Endpoint::Start, false) => "interval.endBeforeStart",
            (Endpoint::End, Endpoint::End, false) => "interval.endBeforeEnd",
            (Endpoint::Start, Endpoint::Start, true) => "interval.startAtStart",
            (Endpoint::Start, Endpoint::End, true) => "interval.startAtEnd",
            (Endpoint::End, Endpoint::Start, true) => "interval.endAtStart",
            (Endpoint::End, Endpoint::End, true) => "interval.endAtEnd",
        };
        let mut record = PropertyRecord::new(tag, vec![self.argument(), other.argument()]);
        if delay != 0 {
            record.min = Some(delay);
        }
        BoolExpr::wrap(self.model.clone(), Node::new(record))
    }

    pub fn start_before_start(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::Start, Endpoint::Start, false, other, delay)
    }
    pub fn start_before_end(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::Start, Endpoint::End, false, other, delay)
    }
    pub fn end_before_start(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::End, Endpoint::Start, false, other, delay)
    }
    pub fn end_before_end(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::End, Endpoint::End, false, other, delay)
    }
    pub fn start_at_start(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::Start, Endpoint::Start, true, other, delay)
    }
    pub fn start_at_end(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::Start, Endpoint::End, true, other, delay)
    }
    pub fn end_at_start(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::End, Endpoint::Start, true, other, delay)
    }
    pub fn end_at_end(&self, other: &IntervalVar, delay: i64) -> BoolExpr {
        self.precedence(Endpoint::End, Endpoint::End, true, other, delay)
    }

    /// Exactly one of `options` is present with the same start/end as
    /// `self`; the rest are absent.
    pub fn alternative(&self, options: &[IntervalVar]) -> Result<BoolExpr> {
        if options.is_empty() {
            return Err(OptalcpError::EmptyArray {
                what: "alternative.options",
            });
        }
        let opt_args: Vec<Argument> = options.iter().map(IntervalVar::argument).collect();
        let arr = self.model.wrap_array(crate::model::container::identity_key(options), opt_args);
        Ok(self
            .model
            .declare_constraint("interval.alternative", vec![self.argument(), arr]))
    }

    /// `self` spans exactly the union of the present intervals in `parts`.
    pub fn span(&self, parts: &[IntervalVar]) -> Result<BoolExpr> {
        if parts.is_empty() {
            return Err(OptalcpError::EmptyArray { what: "span.parts" });
        }
        let part_args: Vec<Argument> = parts.iter().map(IntervalVar::argument).collect();
        let arr = self.model.wrap_array(crate::model::container::identity_key(parts), part_args);
        Ok(self.model.declare_constraint("interval.span", vec![self.argument(), arr]))
    }

    pub fn pulse(&self, height: i64) -> Result<crate::model::cumul::CumulExpr> {
        crate::model::cumul::pulse(&self.model, self, height)
    }
    pub fn step_at_start(&self, height: i64) -> crate::model::cumul::CumulExpr {
        crate::model::cumul::step_at_start(&self.model, self, height)
    }
    pub fn step_at_end(&self, height: i64) -> crate::model::cumul::CumulExpr {
        crate::model::cumul::step_at_end(&self.model, self, height)
    }

    /// 0-based position of `self` within `sequence`. Absent if
    /// `self` is absent; unavailable when the sequence uses transitions or
    /// allows zero-length intervals.
    pub fn position(&self, sequence: &crate::model::sequence::SequenceVar) -> Result<IntExpr> {
        crate::model::sequence::position(sequence, self)
    }

    pub fn forbid_start(&self, step_fn: &crate::model::stepfn::IntStepFunction) -> BoolExpr {
        step_fn.forbid_start(self)
    }
    pub fn forbid_end(&self, step_fn: &crate::model::stepfn::IntStepFunction) -> BoolExpr {
        step_fn.forbid_end(self)
    }
    pub fn forbid_extent(&self, step_fn: &crate::model::stepfn::IntStepFunction) -> BoolExpr {
        step_fn.forbid_extent(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::container::Model;

    #[test]
    fn int_var_getters_return_none_once_absent() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, None).unwrap();
        assert_eq!(x.min(), Some(0));
        assert_eq!(x.max(), Some(10));
        x.set_absent();
        assert_eq!(x.min(), None);
        assert_eq!(x.max(), None);
        assert_eq!(x.presence(), Presence::Absent);
    }

    #[test]
    fn int_var_set_min_max_update_the_record() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, None).unwrap();
        x.set_min(2);
        x.set_max(8);
        assert_eq!(x.min(), Some(2));
        assert_eq!(x.max(), Some(8));
    }

    #[test]
    fn bool_var_fix_to_round_trips_through_min_max() {
        let model = Model::new();
        let b = model.new_bool_var(None);
        assert_eq!(b.fixed_to(), None);
        b.fix_to(true);
        assert_eq!(b.fixed_to(), Some(true));
        assert_eq!(b.min(), Some(1));
        assert_eq!(b.max(), Some(1));
        b.fix_to(false);
        assert_eq!(b.fixed_to(), Some(false));
    }

    #[test]
    fn bool_var_derefs_to_bool_expr_arithmetic() {
        let model = Model::new();
        let b = model.new_bool_var(None);
        let negated = b.not();
        assert_eq!(negated.node().record.borrow().function_tag, "bool.not");
    }

    #[test]
    fn interval_var_endpoint_getters_return_none_once_absent() {
        let model = Model::new();
        let iv = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        assert_eq!(iv.start_min(), Some(0));
        assert_eq!(iv.length_min(), Some(5));
        iv.set_absent();
        assert_eq!(iv.start_min(), None);
        assert_eq!(iv.end_max(), None);
        assert_eq!(iv.length_max(), None);
    }

    #[test]
    fn precedence_methods_tag_their_records_and_carry_the_delay() {
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        let b = model.new_interval_var_fixed_length(5, 20, None).unwrap();

        let cases: Vec<(BoolExpr, &str)> = vec![
            (a.start_before_start(&b, 0), "interval.startBeforeStart"),
            (a.start_before_end(&b, 0), "interval.startBeforeEnd"),
            (a.end_before_start(&b, 0), "interval.endBeforeStart"),
            (a.end_before_end(&b, 0), "interval.endBeforeEnd"),
            (a.start_at_start(&b, 0), "interval.startAtStart"),
            (a.start_at_end(&b, 0), "interval.startAtEnd"),
            (a.end_at_start(&b, 0), "interval.endAtStart"),
            (a.end_at_end(&b, 0), "interval.endAtEnd"),
        ];
        for (expr, tag) in cases {
            assert_eq!(expr.node().record.borrow().function_tag, tag);
        }

        let delayed = a.end_before_start(&b, 3);
        assert_eq!(delayed.node().record.borrow().min, Some(3));
        let undelayed = a.end_before_start(&b, 0);
        assert_eq!(undelayed.node().record.borrow().min, None, "a zero delay is elided, not stored as 0");
    }

    #[test]
    fn alternative_and_span_reject_empty_option_lists() {
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        assert!(matches!(
            a.alternative(&[]).unwrap_err(),
            OptalcpError::EmptyArray { what: "alternative.options" }
        ));
        assert!(matches!(
            a.span(&[]).unwrap_err(),
            OptalcpError::EmptyArray { what: "span.parts" }
        ));
    }

    #[test]
    fn alternative_and_span_declare_root_constraints_immediately() {
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        let opt = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        let before = model.statements.borrow().len();
        a.alternative(&[opt]).unwrap();
        assert_eq!(model.statements.borrow().len(), before + 1);

        let part = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        a.span(&[part]).unwrap();
        assert_eq!(model.statements.borrow().len(), before + 2);
    }

    #[test]
    fn start_end_length_are_tagged_distinctly() {
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        assert_eq!(a.start().node().record.borrow().function_tag, "interval.start");
        assert_eq!(a.end().node().record.borrow().function_tag, "interval.end");
        assert_eq!(a.length().node().record.borrow().function_tag, "interval.length");
    }

    #[test]
    fn start_or_end_or_length_or_carry_their_default() {
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        assert_eq!(a.start_or(-1).node().record.borrow().min, Some(-1));
        assert_eq!(a.end_or(-2).node().record.borrow().min, Some(-2));
        assert_eq!(a.length_or(-3).node().record.borrow().min, Some(-3));
    }
}
