//! The optimization objective: minimize/maximize one or more integer
//! expressions, optimized lexicographically when more than one is given.

use std::rc::Rc;

use crate::argument::{Argument, RefId};
use crate::model::container::{identity_key, Model};
use crate::model::expr::IntExpr;
use crate::model::node::PropertyRecord;

#[derive(Clone)]
pub struct Objective {
    model: Rc<Model>,
    maximize: bool,
    terms: usize,
}

impl Objective {
    pub(crate) fn set(model: &Rc<Model>, exprs: Vec<IntExpr>, maximize: bool) -> Objective {
        let tag = if maximize { "objective.maximize" } else { "objective.minimize" };
        let args: Vec<Argument> = exprs.iter().map(IntExpr::argument).collect();
        let record = if exprs.len() == 1 {
            PropertyRecord::new(tag, args)
        } else {
            let arr = model.wrap_array(identity_key(&exprs), args);
            PropertyRecord::new(tag, vec![arr])
        };
        let id = {
            let mut refs = model.refs.borrow_mut();
            let id = refs.len() as RefId;
            refs.push(record.clone());
            id
        };
        *model.objective.borrow_mut() = Some(record);
        *model.primary_objective_ref.borrow_mut() = Some(id);
        model.push_statement(Argument::Reference(id));
        Objective {
            model: model.clone(),
            maximize,
            terms: exprs.len(),
        }
    }

    pub fn is_maximize(&self) -> bool {
        self.maximize
    }
    pub fn term_count(&self) -> usize {
        self.terms
    }
    pub fn model(&self) -> &Rc<Model> {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::container::Model;

    #[test]
    fn minimize_records_a_single_term_without_wrapping_an_array() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap();
        let objective = model.minimize(&x.as_int_expr());

        assert!(!objective.is_maximize());
        assert_eq!(objective.term_count(), 1);
        let stored = model.objective.borrow().clone().unwrap();
        assert_eq!(stored.function_tag, "objective.minimize");
        assert_eq!(stored.args.len(), 1);
    }

    #[test]
    fn maximize_consecutively_wraps_multiple_terms_in_one_array_argument() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap();
        let y = model.new_int_var(0, 10, Some("y")).unwrap();
        let objective = model.maximize_consecutively(&[x.as_int_expr(), y.as_int_expr()]);

        assert!(objective.is_maximize());
        assert_eq!(objective.term_count(), 2);
        let stored = model.objective.borrow().clone().unwrap();
        assert_eq!(stored.function_tag, "objective.maximize");
        assert_eq!(stored.args.len(), 1, "two terms are wrapped in a single array argument");
    }

    #[test]
    fn setting_the_objective_pushes_a_root_statement_and_records_its_ref() {
        let model = Model::new();
        let x = model.new_int_var(0, 10, Some("x")).unwrap();
        let x_id = x.node().ref_id().unwrap();
        let before = model.statements.borrow().len();

        model.minimize(&x.as_int_expr());

        assert_eq!(model.statements.borrow().len(), before + 1);
        let objective_id = model.primary_objective_ref.borrow().unwrap();
        assert_ne!(objective_id, x_id, "the objective gets its own ref distinct from its term");
    }
}
