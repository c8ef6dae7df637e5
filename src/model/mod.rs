//! The model graph: a shared, deduplicated DAG of modeling nodes.
//!
//! [`Model`] owns the reference table, the ordered root-statement list, the
//! per-kind variable inventories, the objective slot and the array-identity
//! cache described above It is always held as `Rc<Model>` so that
//! every expression/variable handle can carry a cheap clone of it alongside
//! its own `Rc<Node>`.

pub mod container;
pub mod cumul;
pub mod expr;
pub mod node;
pub mod objective;
pub mod sequence;
pub mod stepfn;
pub mod vars;

pub use container::Model;
pub use cumul::CumulExpr;
pub use expr::{BoolExpr, FloatExpr, IntExpr};
pub use node::{PresenceStatus, PropertyRecord};
pub use objective::Objective;
pub use sequence::SequenceVar;
pub use stepfn::IntStepFunction;
pub use vars::{BoolVar, IntVar, IntervalVar};

/// Fixed integer domain bounds.
pub const INT_VAR_MAX: i64 = (1i64 << 30) - 1;
pub const INT_VAR_MIN: i64 = -INT_VAR_MAX;
pub const INTERVAL_MAX: i64 = 715_827_882;
pub const INTERVAL_MIN: i64 = -INTERVAL_MAX;
pub const LENGTH_MAX: i64 = INTERVAL_MAX - INTERVAL_MIN;
