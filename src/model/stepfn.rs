//! Integer step functions: piecewise-constant functions used to forbid
//! intervals from starting, ending, or overlapping certain time ranges, and
//! to accumulate an integral of "height x overlap" against an interval.

use std::rc::Rc;

use crate::argument::Node;
use crate::model::container::Model;
use crate::model::expr::{BoolExpr, IntExpr};
use crate::model::node::PropertyRecord;
use crate::model::vars::IntervalVar;

#[derive(Debug, Clone)]
pub struct IntStepFunction {
    model: Rc<Model>,
    node: Rc<Node>,
}

impl IntStepFunction {
    pub(crate) fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        IntStepFunction { model, node }
    }

    fn argument(&self) -> crate::argument::Argument {
        self.node.encode_as_argument(&mut self.model.refs.borrow_mut())
    }

    /// The function's value at `x`.
    pub fn eval(&self, x: impl Into<crate::model::expr::IntOperand>) -> IntExpr {
        let other: crate::model::expr::IntOperand = x.into();
        let args = vec![self.argument(), other_argument(&self.model, other)];
        IntExpr::wrap(self.model.clone(), Node::new(PropertyRecord::new("stepFunction.eval", args)))
    }

    /// Sum of `height * overlap` between this function's steps and `interval`.
    pub fn integral(&self, interval: &IntervalVar) -> IntExpr {
        let args = vec![self.argument(), interval.argument()];
        IntExpr::wrap(
            self.model.clone(),
            Node::new(PropertyRecord::new("stepFunction.integral", args)),
        )
    }

    /// `interval`'s start must land on a range where this function is
    /// nonzero is forbidden: forces the start away from zero-height ranges.
    pub fn forbid_start(&self, interval: &IntervalVar) -> BoolExpr {
        self.forbid("stepFunction.forbidStart", interval)
    }
    pub fn forbid_end(&self, interval: &IntervalVar) -> BoolExpr {
        self.forbid("stepFunction.forbidEnd", interval)
    }
    /// No part of `interval`'s extent may overlap a zero-height range.
    pub fn forbid_extent(&self, interval: &IntervalVar) -> BoolExpr {
        self.forbid("stepFunction.forbidExtent", interval)
    }

    fn forbid(&self, tag: &str, interval: &IntervalVar) -> BoolExpr {
        let args = vec![interval.argument(), self.argument()];
        self.model.declare_constraint(tag, args)
    }
}

fn other_argument(model: &Rc<Model>, operand: crate::model::expr::IntOperand) -> crate::argument::Argument {
    // IntOperand's own `argument()` is private to expr.rs; route a const
    // through a trivial IntExpr so the conversion stays in one place.
    match operand {
        crate::model::expr::IntOperand::Const(v) => {
            crate::argument::Argument::Primitive(crate::argument::Primitive::Int(v))
        }
        crate::model::expr::IntOperand::Expr(e) => {
            debug_assert!(Rc::ptr_eq(model, e.model()));
            e.argument()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_function(model: &Rc<Model>) -> IntStepFunction {
        model.new_step_function(vec![(0, 0), (5, 1), (10, 0)]).unwrap()
    }

    #[test]
    fn new_step_function_sorts_points_by_x() {
        let model = Model::new();
        let unsorted = model.new_step_function(vec![(5, 1), (0, 0), (10, 0)]).unwrap();
        let record = unsorted.node.record.borrow();
        let values = record.values.clone().unwrap();
        assert_eq!(values, vec![(0, 0), (5, 1), (10, 0)]);
    }

    #[test]
    fn new_step_function_rejects_an_empty_value_list() {
        let model = Model::new();
        let err = model.new_step_function(vec![]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::OptalcpError::EmptyArray {
                what: "IntStepFunction.values"
            }
        ));
    }

    #[test]
    fn eval_tags_the_function_and_its_argument() {
        let model = Model::new();
        let f = step_function(&model);
        let expr = f.eval(5);
        assert_eq!(expr.node().record.borrow().function_tag, "stepFunction.eval");
    }

    #[test]
    fn integral_is_tagged_against_an_interval() {
        let model = Model::new();
        let f = step_function(&model);
        let iv = model.new_interval_var_fixed_length(3, 20, None).unwrap();
        let expr = f.integral(&iv);
        assert_eq!(expr.node().record.borrow().function_tag, "stepFunction.integral");
    }

    #[test]
    fn forbid_methods_declare_root_constraints_with_the_right_tag() {
        let model = Model::new();
        let f = step_function(&model);
        let iv = model.new_interval_var_fixed_length(3, 20, None).unwrap();

        let before = model.statements.borrow().len();
        let start = f.forbid_start(&iv);
        assert_eq!(start.node().record.borrow().function_tag, "stepFunction.forbidStart");
        assert_eq!(model.statements.borrow().len(), before + 1);

        let end = f.forbid_end(&iv);
        assert_eq!(end.node().record.borrow().function_tag, "stepFunction.forbidEnd");
        assert_eq!(model.statements.borrow().len(), before + 2);

        let extent = f.forbid_extent(&iv);
        assert_eq!(extent.node().record.borrow().function_tag, "stepFunction.forbidExtent");
        assert_eq!(model.statements.borrow().len(), before + 3);
    }
}
