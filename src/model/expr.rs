//! Integer, boolean and float expression algebra.
//!
//! `BoolExpr` is implemented as a newtype over `IntExpr` (`false = 0`,
//! `true = 1`) and derefs to it, so every boolean expression automatically
//! gets the full integer-arithmetic surface described above
//! ("Boolean variables inherit all integer-expression arithmetic") without
//! duplicating the method bodies - the Rust analogue of the
//! `FloatExpr ⊃ IntExpr ⊃ BoolExpr` capability hierarchy.

use std::ops::Deref;
use std::rc::Rc;

use crate::argument::{Argument, Node, Primitive};
use crate::model::container::Model;
use crate::model::node::PropertyRecord;

/// An operand accepted by the integer-expression algebra: either another
/// expression or an integer literal.
pub enum IntOperand {
    Expr(IntExpr),
    Const(i64),
}

impl From<i64> for IntOperand {
    fn from(v: i64) -> Self {
        IntOperand::Const(v)
    }
}
impl From<&IntExpr> for IntOperand {
    fn from(e: &IntExpr) -> Self {
        IntOperand::Expr(e.clone())
    }
}
impl From<IntExpr> for IntOperand {
    fn from(e: IntExpr) -> Self {
        IntOperand::Expr(e)
    }
}
impl From<&BoolExpr> for IntOperand {
    fn from(e: &BoolExpr) -> Self {
        IntOperand::Expr(e.0.clone())
    }
}

impl IntOperand {
    fn argument(&self) -> Argument {
        match self {
            IntOperand::Const(v) => Argument::Primitive(Primitive::Int(*v)),
            IntOperand::Expr(e) => e.argument(),
        }
    }

    fn model_of(&self, fallback: &Rc<Model>) -> Rc<Model> {
        match self {
            IntOperand::Const(_) => fallback.clone(),
            IntOperand::Expr(e) => e.model.clone(),
        }
    }
}

/// A node that produces an integer value.
#[derive(Debug, Clone)]
pub struct IntExpr {
    pub(crate) model: Rc<Model>,
    pub(crate) node: Rc<Node>,
}

impl IntExpr {
    pub fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        IntExpr { model, node }
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

    fn build(model: &Rc<Model>, tag: &str, args: Vec<Argument>) -> IntExpr {
        IntExpr::wrap(model.clone(), Node::new(PropertyRecord::new(tag, args)))
    }

    fn unary(&self, tag: &str) -> IntExpr {
        IntExpr::build(&self.model, tag, vec![self.argument()])
    }

    fn binary(&self, tag: &str, other: impl Into<IntOperand>) -> IntExpr {
        let other = other.into();
        let model = other.model_of(&self.model);
        debug_assert!(Rc::ptr_eq(&self.model, &model), "operands from different Model instances");
        IntExpr::build(&self.model, tag, vec![self.argument(), other.argument()])
    }

    fn compare(&self, tag: &str, other: impl Into<IntOperand>) -> BoolExpr {
        BoolExpr(self.binary(tag, other))
    }

    pub fn neg(&self) -> IntExpr {
        self.unary("int.neg")
    }
    pub fn abs(&self) -> IntExpr {
        self.unary("int.abs")
    }
    pub fn plus(&self, other: impl Into<IntOperand>) -> IntExpr {
        self.binary("int.plus", other)
    }
    pub fn minus(&self, other: impl Into<IntOperand>) -> IntExpr {
        self.binary("int.minus", other)
    }
    pub fn times(&self, other: impl Into<IntOperand>) -> IntExpr {
        self.binary("int.times", other)
    }
    /// Integer division, rounding toward zero.
    pub fn div(&self, other: impl Into<IntOperand>) -> IntExpr {
        self.binary("int.div", other)
    }
    /// Binary min; absent infects the result.
    pub fn min2(&self, other: impl Into<IntOperand>) -> IntExpr {
        self.binary("int.min2", other)
    }
    pub fn max2(&self, other: impl Into<IntOperand>) -> IntExpr {
        self.binary("int.max2", other)
    }

    pub fn eq(&self, other: impl Into<IntOperand>) -> BoolExpr {
        self.compare("int.eq", other)
    }
    pub fn ne(&self, other: impl Into<IntOperand>) -> BoolExpr {
        self.compare("int.ne", other)
    }
    pub fn lt(&self, other: impl Into<IntOperand>) -> BoolExpr {
        self.compare("int.lt", other)
    }
    pub fn le(&self, other: impl Into<IntOperand>) -> BoolExpr {
        self.compare("int.le", other)
    }
    pub fn gt(&self, other: impl Into<IntOperand>) -> BoolExpr {
        self.compare("int.gt", other)
    }
    pub fn ge(&self, other: impl Into<IntOperand>) -> BoolExpr {
        self.compare("int.ge", other)
    }

    pub fn in_range(&self, lb: i64, ub: i64) -> BoolExpr {
        let mut record = PropertyRecord::new("int.inRange", vec![self.argument()]);
        record.min = Some(lb);
        record.max = Some(ub);
        BoolExpr(IntExpr::wrap(self.model.clone(), Node::new(record)))
    }

    /// Equality including presence status: true iff both are present with
    /// equal value, or both absent.
    pub fn identity(&self, other: impl Into<IntOperand>) -> BoolExpr {
        self.compare("int.identity", other)
    }

    /// Replace absent by `default`; never itself absent.
    pub fn guard(&self, default: i64) -> IntExpr {
        let mut record = PropertyRecord::new("int.guard", vec![self.argument()]);
        record.min = Some(default);
        IntExpr::wrap(self.model.clone(), Node::new(record))
    }

    pub fn presence(&self) -> BoolExpr {
        BoolExpr(self.unary("int.presence"))
    }

    pub fn as_float(&self) -> FloatExpr {
        FloatExpr::wrap(self.model.clone(), Node::new(PropertyRecord::new("float.fromInt", vec![self.argument()])))
    }
}

/// A boolean expression: `false = 0`, `true = 1`, absent propagates.
#[derive(Debug, Clone)]
pub struct BoolExpr(pub(crate) IntExpr);

impl Deref for BoolExpr {
    type Target = IntExpr;
    fn deref(&self) -> &IntExpr {
        &self.0
    }
}

impl BoolExpr {
    pub fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        BoolExpr(IntExpr::wrap(model, node))
    }

    pub fn as_int_expr(&self) -> IntExpr {
        self.0.clone()
    }

    pub fn not(&self) -> BoolExpr {
        BoolExpr(self.0.unary("bool.not"))
    }
    pub fn and(&self, other: &BoolExpr) -> BoolExpr {
        BoolExpr(self.0.binary("bool.and", other))
    }
    pub fn or(&self, other: &BoolExpr) -> BoolExpr {
        BoolExpr(self.0.binary("bool.or", other))
    }
    pub fn implies(&self, other: &BoolExpr) -> BoolExpr {
        BoolExpr(self.0.binary("bool.implies", other))
    }

    /// Enforce this boolean expression: true or absent, never false.
    pub fn enforce(&self) {
        self.0.model.enforce(self);
    }
}

/// n-ary sum/min/max over booleans, skipping absent elements; absent only
/// when every operand is absent (, distinct from binary min2/max2).
pub fn and_all(model: &Rc<Model>, exprs: &[BoolExpr]) -> BoolExpr {
    n_ary_bool(model, "bool.and", exprs)
}
pub fn or_all(model: &Rc<Model>, exprs: &[BoolExpr]) -> BoolExpr {
    n_ary_bool(model, "bool.or", exprs)
}

fn n_ary_bool(model: &Rc<Model>, tag: &str, exprs: &[BoolExpr]) -> BoolExpr {
    let args: Vec<Argument> = exprs.iter().map(|e| e.argument()).collect();
    let arr = model.wrap_array(crate::model::container::identity_key(exprs), args);
    BoolExpr(IntExpr::build(model, tag, vec![arr]))
}

/// n-ary sum with absent-skip semantics.
pub fn sum(model: &Rc<Model>, exprs: &[IntExpr]) -> IntExpr {
    n_ary_int(model, "int.sum", exprs)
}
/// n-ary min; result absent only if every element is absent.
pub fn min(model: &Rc<Model>, exprs: &[IntExpr]) -> IntExpr {
    n_ary_int(model, "int.min", exprs)
}
pub fn max(model: &Rc<Model>, exprs: &[IntExpr]) -> IntExpr {
    n_ary_int(model, "int.max", exprs)
}

fn n_ary_int(model: &Rc<Model>, tag: &str, exprs: &[IntExpr]) -> IntExpr {
    let args: Vec<Argument> = exprs.iter().map(|e| e.argument()).collect();
    let arr = model.wrap_array(crate::model::container::identity_key(exprs), args);
    IntExpr::build(model, tag, vec![arr])
}

/// A node that produces a float value. Mirrors `IntExpr`'s operation set
/// (: "Integer / float expressions support ..." is one shared list).
#[derive(Clone)]
pub struct FloatExpr {
    pub(crate) model: Rc<Model>,
    pub(crate) node: Rc<Node>,
}

impl FloatExpr {
    pub fn wrap(model: Rc<Model>, node: Rc<Node>) -> Self {
        FloatExpr { model, node }
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

    fn build(model: &Rc<Model>, tag: &str, args: Vec<Argument>) -> FloatExpr {
        FloatExpr::wrap(model.clone(), Node::new(PropertyRecord::new(tag, args)))
    }

    fn unary(&self, tag: &str) -> FloatExpr {
        FloatExpr::build(&self.model, tag, vec![self.argument()])
    }
    fn binary(&self, tag: &str, other: &FloatExpr) -> FloatExpr {
        FloatExpr::build(&self.model, tag, vec![self.argument(), other.argument()])
    }

    pub fn neg(&self) -> FloatExpr {
        self.unary("float.neg")
    }
    pub fn abs(&self) -> FloatExpr {
        self.unary("float.abs")
    }
    pub fn plus(&self, other: &FloatExpr) -> FloatExpr {
        self.binary("float.plus", other)
    }
    pub fn minus(&self, other: &FloatExpr) -> FloatExpr {
        self.binary("float.minus", other)
    }
    pub fn times(&self, other: &FloatExpr) -> FloatExpr {
        self.binary("float.times", other)
    }
    pub fn div(&self, other: &FloatExpr) -> FloatExpr {
        self.binary("float.div", other)
    }
    pub fn min2(&self, other: &FloatExpr) -> FloatExpr {
        self.binary("float.min2", other)
    }
    pub fn max2(&self, other: &FloatExpr) -> FloatExpr {
        self.binary("float.max2", other)
    }

    pub fn eq(&self, other: &FloatExpr) -> BoolExpr {
        BoolExpr(IntExpr::build(&self.model, "float.eq", vec![self.argument(), other.argument()]))
    }
    pub fn lt(&self, other: &FloatExpr) -> BoolExpr {
        BoolExpr(IntExpr::build(&self.model, "float.lt", vec![self.argument(), other.argument()]))
    }
    pub fn le(&self, other: &FloatExpr) -> BoolExpr {
        BoolExpr(IntExpr::build(&self.model, "float.le", vec![self.argument(), other.argument()]))
    }

    pub fn guard(&self, default: f64) -> FloatExpr {
        let mut record = PropertyRecord::new("float.guard", vec![self.argument()]);
        record.float_min = Some(default);
        FloatExpr::wrap(self.model.clone(), Node::new(record))
    }

    pub fn presence(&self) -> BoolExpr {
        BoolExpr(IntExpr::build(&self.model, "float.presence", vec![self.argument()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::container::Model;

    fn tag_of(expr: &IntExpr) -> String {
        expr.node().record.borrow().function_tag.clone()
    }

    #[test]
    fn binary_methods_tag_their_records_correctly() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        assert_eq!(tag_of(&x.plus(1)), "int.plus");
        assert_eq!(tag_of(&x.minus(1)), "int.minus");
        assert_eq!(tag_of(&x.times(2)), "int.times");
        assert_eq!(tag_of(&x.div(2)), "int.div");
        assert_eq!(tag_of(&x.min2(2)), "int.min2");
        assert_eq!(tag_of(&x.max2(2)), "int.max2");
        assert_eq!(tag_of(&x.neg()), "int.neg");
        assert_eq!(tag_of(&x.abs()), "int.abs");
    }

    #[test]
    fn comparisons_produce_bool_exprs_with_the_right_tag() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        assert_eq!(tag_of(&x.eq(1)), "int.eq");
        assert_eq!(tag_of(&x.ne(1)), "int.ne");
        assert_eq!(tag_of(&x.lt(1)), "int.lt");
        assert_eq!(tag_of(&x.le(1)), "int.le");
        assert_eq!(tag_of(&x.gt(1)), "int.gt");
        assert_eq!(tag_of(&x.ge(1)), "int.ge");
        assert_eq!(tag_of(&x.identity(1)), "int.identity");
    }

    #[test]
    fn int_operand_accepts_both_literals_and_expressions() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        let y = model.new_int_var(0, 10, Some("y")).unwrap().as_int_expr();
        let from_const: IntOperand = 3i64.into();
        let from_expr: IntOperand = y.clone().into();
        assert!(matches!(from_const, IntOperand::Const(3)));
        assert!(matches!(from_expr, IntOperand::Expr(_)));
        // both flow through the same binary() path without panicking
        let _ = x.plus(3);
        let _ = x.plus(&y);
    }

    #[test]
    fn in_range_and_guard_carry_their_bounds() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        let ranged = x.in_range(2, 8);
        assert_eq!(ranged.node().record.borrow().min, Some(2));
        assert_eq!(ranged.node().record.borrow().max, Some(8));
        let guarded = x.guard(-1);
        assert_eq!(guarded.node().record.borrow().min, Some(-1));
    }

    #[test]
    fn bool_expr_derefs_to_int_expr_arithmetic() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        let b = x.eq(1);
        // BoolExpr derefs to IntExpr, so .plus is reachable directly on it.
        assert_eq!(tag_of(&b.plus(1)), "int.plus");
        assert_eq!(tag_of(&b.not()), "bool.not");
        let c = x.eq(2);
        assert_eq!(tag_of(&b.and(&c)), "bool.and");
        assert_eq!(tag_of(&b.or(&c)), "bool.or");
        assert_eq!(tag_of(&b.implies(&c)), "bool.implies");
    }

    #[test]
    fn n_ary_helpers_wrap_all_terms_in_a_single_array_argument() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        let y = model.new_int_var(0, 10, Some("y")).unwrap().as_int_expr();
        let z = model.new_int_var(0, 10, Some("z")).unwrap().as_int_expr();

        let total = sum(&model, &[x.clone(), y.clone(), z.clone()]);
        assert_eq!(tag_of(&total), "int.sum");
        assert_eq!(total.node().record.borrow().args.len(), 1);

        let lowest = min(&model, &[x.clone(), y.clone()]);
        assert_eq!(tag_of(&lowest), "int.min");
        let highest = max(&model, &[x, y]);
        assert_eq!(tag_of(&highest), "int.max");
    }

    #[test]
    fn and_all_or_all_wrap_bool_terms() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        let a = x.eq(1);
        let b = x.eq(2);
        assert_eq!(tag_of(&and_all(&model, &[a.clone(), b.clone()])), "bool.and");
        assert_eq!(tag_of(&or_all(&model, &[a, b])), "bool.or");
    }

    #[test]
    fn enforce_pushes_a_root_statement() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap().as_int_expr();
        let b = x.eq(1);
        let before = model.statements.borrow().len();
        b.enforce();
        assert_eq!(model.statements.borrow().len(), before + 1);
    }

    #[test]
    fn enforce_is_a_no_op_on_an_expression_already_declared_as_a_constraint() {
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        let alt = a.alternative(&[model.new_interval_var_fixed_length(5, 20, None).unwrap()]).unwrap();
        let before = model.statements.borrow().len();
        alt.enforce();
        assert_eq!(model.statements.borrow().len(), before, "alternative already declared itself as a root statement");
    }
}
