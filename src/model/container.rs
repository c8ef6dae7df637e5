//! The model container: owns the reference table, root statements, variable inventories and objective.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::argument::{Argument, Node, RefId};
use crate::error::{OptalcpError, Result};
use crate::model::expr::{BoolExpr, FloatExpr, IntExpr};
use crate::model::node::PropertyRecord;
use crate::model::objective::Objective;
use crate::model::sequence::SequenceVar;
use crate::model::stepfn::IntStepFunction;
use crate::model::vars::{BoolVar, IntVar, IntervalVar};
use crate::model::{INTERVAL_MAX, INTERVAL_MIN, INT_VAR_MAX, INT_VAR_MIN, LENGTH_MAX};

/// Owns the ordered root-statement list, the reference table, the variable
/// inventories, an optional objective, the primary-objective-expression
/// handle, the array-identity cache and an optional model name.
///
/// Always used as `Rc<Model>`: every expression/variable handle keeps a
/// clone of that `Rc` so it can grow the reference table and append
/// statements as the graph is built.
#[derive(Debug)]
pub struct Model {
    pub(crate) refs: RefCell<Vec<PropertyRecord>>,
    pub(crate) statements: RefCell<Vec<Argument>>,
    pub(crate) bool_vars: RefCell<Vec<Rc<Node>>>,
    pub(crate) int_vars: RefCell<Vec<Rc<Node>>>,
    pub(crate) interval_vars: RefCell<Vec<Rc<Node>>>,
    pub(crate) objective: RefCell<Option<PropertyRecord>>,
    pub(crate) primary_objective_ref: RefCell<Option<RefId>>,
    /// Memoizes user-supplied arrays by identity (pointer of the backing
    /// allocation), not by structural content.
    pub(crate) array_cache: RefCell<HashMap<usize, Rc<Node>>>,
    pub name: RefCell<Option<String>>,
}

impl Model {
    pub fn new() -> Rc<Model> {
        Rc::new(Model {
            refs: RefCell::new(Vec::new()),
            statements: RefCell::new(Vec::new()),
            bool_vars: RefCell::new(Vec::new()),
            int_vars: RefCell::new(Vec::new()),
            interval_vars: RefCell::new(Vec::new()),
            objective: RefCell::new(None),
            primary_objective_ref: RefCell::new(None),
            array_cache: RefCell::new(HashMap::new()),
            name: RefCell::new(None),
        })
    }

    pub fn with_name(name: impl Into<String>) -> Rc<Model> {
        let model = Model::new();
        *model.name.borrow_mut() = Some(name.into());
        model
    }

    // ---- declarations ----------------------------------------------------

    fn push_declaration(self: &Rc<Self>, record: PropertyRecord) -> Rc<Node> {
        let mut refs = self.refs.borrow_mut();
        let id = refs.len() as RefId;
        refs.push(record.clone());
        Node::new_declaration(record, id)
    }

    pub fn new_bool_var(self: &Rc<Self>, name: Option<&str>) -> BoolVar {
        let mut record = PropertyRecord::new("boolVar", vec![]);
        record.name = name.map(String::from);
        let node = self.push_declaration(record);
        self.bool_vars.borrow_mut().push(node.clone());
        BoolVar::wrap(self.clone(), node)
    }

    pub fn new_int_var(self: &Rc<Self>, min: i64, max: i64, name: Option<&str>) -> Result<IntVar> {
        check_range("IntVar.min", min, INT_VAR_MIN, INT_VAR_MAX)?;
        check_range("IntVar.max", max, INT_VAR_MIN, INT_VAR_MAX)?;
        let mut record = PropertyRecord::new("intVar", vec![]);
        record.min = Some(min);
        record.max = Some(max);
        record.name = name.map(String::from);
        let node = self.push_declaration(record);
        self.int_vars.borrow_mut().push(node.clone());
        Ok(IntVar::wrap(self.clone(), node))
    }

    pub fn new_float_var(self: &Rc<Self>, min: f64, max: f64, name: Option<&str>) -> FloatExpr {
        let mut record = PropertyRecord::new("floatVar", vec![]);
        record.float_min = Some(min);
        record.float_max = Some(max);
        record.name = name.map(String::from);
        let node = self.push_declaration(record);
        FloatExpr::wrap(self.clone(), node)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_interval_var(
        self: &Rc<Self>,
        start_min: i64,
        start_max: i64,
        end_min: i64,
        end_max: i64,
        length_min: i64,
        length_max: i64,
        name: Option<&str>,
    ) -> Result<IntervalVar> {
        for (what, v) in [
            ("IntervalVar.startMin", start_min),
            ("IntervalVar.startMax", start_max),
            ("IntervalVar.endMin", end_min),
            ("IntervalVar.endMax", end_max),
        ] {
            check_range(what, v, INTERVAL_MIN, INTERVAL_MAX)?;
        }
        check_range("IntervalVar.lengthMin", length_min, 0, LENGTH_MAX)?;
        check_range("IntervalVar.lengthMax", length_max, 0, LENGTH_MAX)?;
        let mut record = PropertyRecord::new("intervalVar", vec![]);
        record.start_min = Some(start_min);
        record.start_max = Some(start_max);
        record.end_min = Some(end_min);
        record.end_max = Some(end_max);
        record.length_min = Some(length_min);
        record.length_max = Some(length_max);
        record.name = name.map(String::from);
        let node = self.push_declaration(record);
        self.interval_vars.borrow_mut().push(node.clone());
        Ok(IntervalVar::wrap(self.clone(), node))
    }

    /// Convenience: a fixed-length interval with `[0, horizon]` start/end
    /// range, the common case in scheduling models.
    pub fn new_interval_var_fixed_length(
        self: &Rc<Self>,
        length: i64,
        horizon: i64,
        name: Option<&str>,
    ) -> Result<IntervalVar> {
        self.new_interval_var(0, horizon, 0, horizon, length, length, name)
    }

    pub fn new_step_function(self: &Rc<Self>, values: Vec<(i64, i64)>) -> Result<IntStepFunction> {
        if values.is_empty() {
            return Err(OptalcpError::EmptyArray {
                what: "IntStepFunction.values",
            });
        }
        let mut sorted = values;
        sorted.sort_by_key(|(x, _)| *x);
        let mut record = PropertyRecord::new("intStepFunction", vec![]);
        record.values = Some(sorted);
        let node = self.push_declaration(record);
        Ok(IntStepFunction::wrap(self.clone(), node))
    }

    pub fn new_sequence_var(
        self: &Rc<Self>,
        intervals: &[IntervalVar],
        types: Option<&[i64]>,
        name: Option<&str>,
    ) -> Result<SequenceVar> {
        if intervals.is_empty() {
            return Err(OptalcpError::EmptyArray {
                what: "SequenceVar.intervals",
            });
        }
        let args: Vec<Argument> = intervals.iter().map(|iv| iv.argument()).collect();
        let arr = self.wrap_array(identity_key(intervals), args);
        let mut record = PropertyRecord::new("sequenceVar", vec![arr]);
        record.name = name.map(String::from);
        if let Some(types) = types {
            if types.len() != intervals.len() {
                return Err(OptalcpError::MatrixDimensionMismatch {
                    row: 0,
                    expected: intervals.len(),
                    actual: types.len(),
                });
            }
            let type_args: Vec<Argument> = types
                .iter()
                .map(|t| Argument::Primitive(crate::argument::Primitive::Int(*t)))
                .collect();
            let type_arr = self.wrap_array(identity_key(types), type_args);
            if let Argument::Reference(id) = self.force_reference(type_arr) {
                record.types = Some(id);
            }
        }
        let node = self.push_declaration(record);
        Ok(SequenceVar::wrap(self.clone(), node, intervals.len()))
    }

    /// Memoize a user-supplied array/matrix of arguments by the identity of
    /// its backing slice. Passing the same slice twice
    /// yields one shared ref; structurally identical but distinct slices do
    /// not merge.
    pub(crate) fn wrap_array(self: &Rc<Self>, key: usize, elements: Vec<Argument>) -> Argument {
        if let Some(node) = self.array_cache.borrow().get(&key) {
            return node.encode_as_argument(&mut self.refs.borrow_mut());
        }
        let record = PropertyRecord::new("array", elements);
        let node = Node::new(record);
        self.array_cache.borrow_mut().insert(key, node.clone());
        node.encode_as_argument(&mut self.refs.borrow_mut())
    }

    pub(crate) fn wrap_matrix(self: &Rc<Self>, key: usize, rows: Vec<Argument>) -> Argument {
        if let Some(node) = self.array_cache.borrow().get(&key) {
            return node.encode_as_argument(&mut self.refs.borrow_mut());
        }
        let record = PropertyRecord::new("matrix", rows);
        let node = Node::new(record);
        self.array_cache.borrow_mut().insert(key, node.clone());
        node.encode_as_argument(&mut self.refs.borrow_mut())
    }

    /// Force an already-encoded argument to reference form, promoting it if
    /// it is still inline. Used where the wire format requires a ref id
    /// (e.g. a sequence's `types` array).
    fn force_reference(self: &Rc<Self>, arg: Argument) -> Argument {
        match arg {
            Argument::Reference(id) => Argument::Reference(id),
            Argument::Inline(record) => {
                let mut refs = self.refs.borrow_mut();
                let id = refs.len() as RefId;
                refs.push(*record);
                Argument::Reference(id)
            }
            other => other,
        }
    }

    // ---- statements --------------------------------------------------

    /// Marks a boolean expression as a root constraint. A no-op if `x`'s node is already a root statement.
    pub fn enforce(self: &Rc<Self>, expr: &BoolExpr) {
        let already = {
            let statements = self.statements.borrow();
            expr.node()
                .ref_id()
                .map(|id| {
                    statements
                        .iter()
                        .any(|a| matches!(a, Argument::Reference(r) if *r == id))
                })
                .unwrap_or(false)
        };
        if already {
            return;
        }
        let arg = expr.argument();
        self.statements.borrow_mut().push(arg);
    }

    pub fn enforce_all<'a>(self: &Rc<Self>, exprs: impl IntoIterator<Item = &'a BoolExpr>) {
        for e in exprs {
            self.enforce(e);
        }
    }

    pub(crate) fn push_statement(self: &Rc<Self>, arg: Argument) {
        self.statements.borrow_mut().push(arg);
    }

    /// Build a record that is, already a root statement at
    /// creation (`alternative`, `noOverlap`, `span`, ...): it is pushed to
    /// the reference table and the statement list immediately, so a later
    /// call to [`Model::enforce`] on the returned handle is a no-op.
    pub(crate) fn declare_constraint(self: &Rc<Self>, tag: &str, args: Vec<Argument>) -> BoolExpr {
        self.declare_constraint_record(PropertyRecord::new(tag, args))
    }

    /// Same as [`Model::declare_constraint`] but for a caller-built record
    /// that already carries extra fields (e.g. a cumulative bound's `min`/`max`).
    pub(crate) fn declare_constraint_record(self: &Rc<Self>, record: PropertyRecord) -> BoolExpr {
        let id = {
            let mut refs = self.refs.borrow_mut();
            let id = refs.len() as RefId;
            refs.push(record.clone());
            id
        };
        let node = Node::new_declaration(record, id);
        self.statements.borrow_mut().push(Argument::Reference(id));
        BoolExpr::wrap(self.clone(), node)
    }

    // ---- objective -----------------------------------------------------

    pub fn minimize(self: &Rc<Self>, expr: &IntExpr) -> Objective {
        Objective::set(self, vec![expr.clone()], false)
    }

    pub fn maximize(self: &Rc<Self>, expr: &IntExpr) -> Objective {
        Objective::set(self, vec![expr.clone()], true)
    }

    pub fn minimize_consecutively(self: &Rc<Self>, exprs: &[IntExpr]) -> Objective {
        Objective::set(self, exprs.to_vec(), false)
    }

    pub fn maximize_consecutively(self: &Rc<Self>, exprs: &[IntExpr]) -> Objective {
        Objective::set(self, exprs.to_vec(), true)
    }

    // ---- queries ---------------------------------------------------------

    pub fn get_bool_vars(self: &Rc<Self>) -> Vec<BoolVar> {
        self.bool_vars
            .borrow()
            .iter()
            .map(|n| BoolVar::wrap(self.clone(), n.clone()))
            .collect()
    }

    pub fn get_int_vars(self: &Rc<Self>) -> Vec<IntVar> {
        self.int_vars
            .borrow()
            .iter()
            .map(|n| IntVar::wrap(self.clone(), n.clone()))
            .collect()
    }

    pub fn get_interval_vars(self: &Rc<Self>) -> Vec<IntervalVar> {
        self.interval_vars
            .borrow()
            .iter()
            .map(|n| IntervalVar::wrap(self.clone(), n.clone()))
            .collect()
    }

    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }
}

pub(crate) fn check_range(what: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        Err(OptalcpError::OutOfRange {
            what,
            value,
            min,
            max,
        })
    } else {
        Ok(())
    }
}

/// Treat the address of a slice's first element as its identity key. Two
/// calls passing genuinely the same backing storage compare equal; two
/// structurally-identical-but-distinct `Vec`s never collide in practice
/// because they occupy different allocations.
pub(crate) fn identity_key<T>(slice: &[T]) -> usize {
    if slice.is_empty() {
        0
    } else {
        slice.as_ptr() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_get_sequential_ref_ids() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, None).unwrap();
        let y = model.new_int_var(0, 10, None).unwrap();
        let z = model.new_bool_var(None);
        assert_eq!(x.node().ref_id(), Some(0));
        assert_eq!(y.node().ref_id(), Some(1));
        assert_eq!(z.node().ref_id(), Some(2));
        assert_eq!(model.refs.borrow().len(), 3);
    }

    #[test]
    fn new_int_var_rejects_out_of_range_bounds() {
        let model = Model::new();
        let err = model.new_int_var(INT_VAR_MIN - 1, 0, None).unwrap_err();
        assert!(matches!(err, OptalcpError::OutOfRange { what: "IntVar.min", .. }));
        let err = model.new_int_var(0, INT_VAR_MAX + 1, None).unwrap_err();
        assert!(matches!(err, OptalcpError::OutOfRange { what: "IntVar.max", .. }));
    }

    #[test]
    fn new_interval_var_rejects_out_of_range_length() {
        let model = Model::new();
        let err = model.new_interval_var(0, 10, 0, 10, -1, 10, None).unwrap_err();
        assert!(matches!(err, OptalcpError::OutOfRange { what: "IntervalVar.lengthMin", .. }));
    }

    #[test]
    fn get_vars_reflect_every_declared_variable_in_order() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap();
        let y = model.new_int_var(0, 10, Some("y")).unwrap();
        let vars = model.get_int_vars();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].name(), x.name());
        assert_eq!(vars[1].name(), y.name());

        model.new_bool_var(Some("b"));
        assert_eq!(model.get_bool_vars().len(), 1);

        model.new_interval_var_fixed_length(5, 20, Some("iv")).unwrap();
        assert_eq!(model.get_interval_vars().len(), 1);
    }

    #[test]
    fn with_name_sets_the_model_name() {
        let model = Model::with_name("shift-plan");
        assert_eq!(model.name(), Some("shift-plan".to_string()));
        let unnamed = Model::new();
        assert_eq!(unnamed.name(), None);
    }

    #[test]
    fn wrap_array_memoizes_by_slice_identity_and_promotes_on_reuse() {
        let model = Model::new();
        let iv = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        let ivs = vec![iv];

        let first = model.wrap_array(identity_key(&ivs), vec![Argument::Primitive(crate::argument::Primitive::Int(1))]);
        assert!(matches!(first, Argument::Inline(_)));

        let second = model.wrap_array(identity_key(&ivs), vec![Argument::Primitive(crate::argument::Primitive::Int(1))]);
        assert!(matches!(second, Argument::Reference(_)), "reusing the same backing slice hits the same cached node");
    }

    #[test]
    fn new_sequence_var_rejects_an_empty_interval_list() {
        let model = Model::new();
        let err = model.new_sequence_var(&[], None, None).unwrap_err();
        assert!(matches!(err, OptalcpError::EmptyArray { what: "SequenceVar.intervals" }));
    }

    #[test]
    fn new_sequence_var_stores_a_types_ref_when_given() {
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        let b = model.new_interval_var_fixed_length(5, 20, None).unwrap();
        model.new_sequence_var(&[a, b], Some(&[0, 1]), None).unwrap();
        // push_declaration pushes the sequence's own record last.
        let refs = model.refs.borrow();
        assert!(refs.last().unwrap().types.is_some());
    }

    #[test]
    fn enforce_all_enforces_every_expression() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, None).unwrap();
        let a = x.eq(1);
        let b = x.eq(2);
        let before = model.statements.borrow().len();
        model.enforce_all([&a, &b]);
        assert_eq!(model.statements.borrow().len(), before + 2);
    }
}

