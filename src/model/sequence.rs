//! Sequence variables: an unordered set of intervals with a solver-chosen
//! permutation, used for no-overlap and routing-style constraints.

use std::cell::Cell;
use std::rc::Rc;

use crate::argument::Node;
use crate::error::{OptalcpError, Result};
use crate::model::container::Model;
use crate::model::expr::{BoolExpr, IntExpr};
use crate::model::node::PropertyRecord;
use crate::model::vars::IntervalVar;

#[derive(Debug, Clone)]
pub struct SequenceVar {
    model: Rc<Model>,
    node: Rc<Node>,
    len: usize,
    /// Set once `no_overlap` is called with a transition matrix; `position`
    /// becomes unavailable on a sequence carrying transitions.
    has_transitions: Rc<Cell<bool>>,
}

impl SequenceVar {
    pub(crate) fn wrap(model: Rc<Model>, node: Rc<Node>, len: usize) -> Self {
        SequenceVar {
            model,
            node,
            len,
            has_transitions: Rc::new(Cell::new(false)),
        }
    }

    pub fn argument(&self) -> crate::argument::Argument {
        self.node.encode_as_argument(&mut self.model.refs.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn name(&self) -> Option<String> {
        self.node.record.borrow().name.clone()
    }
    pub fn set_name(&self, name: impl Into<String>) {
        self.node.record.borrow_mut().name = Some(name.into());
    }

    /// No two present members overlap. With a transition-time matrix,
    /// adjacent members in the chosen order must also respect the minimum
    /// gap `transitions[i][j]`.
    pub fn no_overlap(&self, transitions: Option<&[Vec<i64>]>) -> Result<BoolExpr> {
        let mut args = vec![self.argument()];
        if let Some(matrix) = transitions {
            if matrix.len() != self.len {
                return Err(OptalcpError::MatrixDimensionMismatch {
                    row: 0,
                    expected: self.len,
                    actual: matrix.len(),
                });
            }
            for (i, row) in matrix.iter().enumerate() {
                if row.len() != self.len {
                    return Err(OptalcpError::MatrixDimensionMismatch {
                        row: i,
                        expected: self.len,
                        actual: row.len(),
                    });
                }
            }
            let row_args: Vec<crate::argument::Argument> = matrix
                .iter()
                .map(|row| {
                    let elems: Vec<crate::argument::Argument> = row
                        .iter()
                        .map(|v| crate::argument::Argument::Primitive(crate::argument::Primitive::Int(*v)))
                        .collect();
                    self.model.wrap_array(crate::model::container::identity_key(row), elems)
                })
                .collect();
            let matrix_arg = self
                .model
                .wrap_matrix(crate::model::container::identity_key(matrix), row_args);
            args.push(matrix_arg);
            self.has_transitions.set(true);
        }
        Ok(self.model.declare_constraint("sequence.noOverlap", args))
    }
}

/// 0-based position of `interval` within `sequence`, or an error if the
/// sequence's structure makes position undefined (matches
/// `IntervalVar::position`, kept here since it needs both types).
pub fn position(sequence: &SequenceVar, interval: &IntervalVar) -> Result<IntExpr> {
    let has_length_zero = interval.length_min() == Some(0);
    if has_length_zero || sequence.has_transitions.get() {
        return Err(OptalcpError::PositionUnavailable);
    }
    let args = vec![sequence.argument(), interval.argument()];
    Ok(IntExpr::wrap(
        sequence.model.clone(),
        Node::new(PropertyRecord::new("sequence.position", args)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::container::Model;

    fn two_intervals(model: &Rc<Model>) -> [IntervalVar; 2] {
        [
            model.new_interval_var_fixed_length(1, 20, None).unwrap(),
            model.new_interval_var_fixed_length(1, 20, None).unwrap(),
        ]
    }

    #[test]
    fn no_overlap_rejects_a_transition_matrix_of_the_wrong_row_count() {
        let model = Model::new();
        let [a, b] = two_intervals(&model);
        let sequence = model.new_sequence_var(&[a, b], None, None).unwrap();
        let err = sequence.no_overlap(Some(&[vec![0, 1]])).unwrap_err();
        assert!(matches!(
            err,
            OptalcpError::MatrixDimensionMismatch {
                row: 0,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn no_overlap_rejects_a_ragged_row() {
        let model = Model::new();
        let [a, b] = two_intervals(&model);
        let sequence = model.new_sequence_var(&[a, b], None, None).unwrap();
        let err = sequence.no_overlap(Some(&[vec![0, 1], vec![1]])).unwrap_err();
        assert!(matches!(
            err,
            OptalcpError::MatrixDimensionMismatch {
                row: 1,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn no_overlap_without_transitions_declares_a_root_constraint() {
        let model = Model::new();
        let [a, b] = two_intervals(&model);
        let sequence = model.new_sequence_var(&[a, b], None, None).unwrap();
        let before = model.statements.borrow().len();
        sequence.no_overlap(None).unwrap();
        assert_eq!(model.statements.borrow().len(), before + 1);
    }

    #[test]
    fn position_is_unavailable_for_a_zero_length_interval() {
        let model = Model::new();
        let zero_length = model.new_interval_var(0, 10, 0, 10, 0, 0, None).unwrap();
        let other = model.new_interval_var_fixed_length(1, 10, None).unwrap();
        let sequence = model.new_sequence_var(&[zero_length.clone(), other], None, None).unwrap();
        let err = position(&sequence, &zero_length).unwrap_err();
        assert!(matches!(err, OptalcpError::PositionUnavailable));
    }

    #[test]
    fn position_is_unavailable_once_transitions_are_attached() {
        let model = Model::new();
        let [a, b] = two_intervals(&model);
        let sequence = model.new_sequence_var(&[a.clone(), b], None, None).unwrap();
        assert!(position(&sequence, &a).is_ok());

        sequence.no_overlap(Some(&[vec![0, 1], vec![1, 0]])).unwrap();
        let err = position(&sequence, &a).unwrap_err();
        assert!(matches!(err, OptalcpError::PositionUnavailable));
    }

    #[test]
    fn new_sequence_var_rejects_a_mismatched_types_array() {
        let model = Model::new();
        let [a, b] = two_intervals(&model);
        let err = model.new_sequence_var(&[a, b], Some(&[0]), None).unwrap_err();
        assert!(matches!(
            err,
            OptalcpError::MatrixDimensionMismatch {
                row: 0,
                expected: 2,
                actual: 1
            }
        ));
    }
}
