//! # OptalCP client
//!
//! The client-side layer of a constraint-programming scheduling toolkit: an
//! in-memory model graph, lossless serialization, and a [`Solver`] session
//! that speaks line-delimited JSON to an out-of-process solver over a
//! spawned child process or a WebSocket.
//!
//! ## Pipeline
//!
//! ```text
//! Model (decision variables, expressions, constraints, objective)
//!     |
//!     v
//! serialize::to_json / to_text / to_js      <-- wire encoding (argument/wire)
//!     |
//!     v
//! solver::Solver::solve/propagate/export_*  <-- handshake, request, dispatch
//!     |
//!     v
//! solver::transport::Transport              <-- child process | WebSocket | mock
//!     |
//!     v
//! solver::discovery::resolve                <-- parameter | OPTALCP_SOLVER | PATH probe
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use optalcp_client::model::Model;
//! use optalcp_client::params::Parameters;
//! use optalcp_client::solver::Solver;
//!
//! # async fn run() -> optalcp_client::error::Result<()> {
//! let model = Model::new();
//! let x = model.new_interval_var(0, 100, 0, 100, 10, 10, Some("x"))?;
//! model.minimize(&x.end());
//!
//! let solver = Solver::new();
//! let outcome = solver.solve(&model, &Parameters::default(), None).await?;
//! println!("objective = {:?}", outcome.objective);
//! # Ok(())
//! # }
//! ```

pub mod argument;
pub mod config;
pub mod error;
pub mod model;
pub mod params;
pub mod serialize;
pub mod solution;
pub mod solver;
pub mod wire;

pub use argument::{Argument, Node, Primitive, RefId};
pub use config::ClientConfig;
pub use error::{OptalcpError, Result};
pub use model::Model;
pub use params::Parameters;
pub use solution::{DomainRecord, ModelDomains, PropagationResult, Solution, SolutionValue};
pub use solver::{Solver, SolveOutcome};
