//! Talking to a solver process.
//!
//! ```text
//!   Solver::solve/propagate/export_text/export_js
//!           |
//!           v
//!   session::Solver  --- handshake, request, event dispatch ---> ActiveRun
//!           |
//!           v
//!   transport::Transport  (child process | WebSocket | mock)
//!           |
//!           v
//!   discovery::resolve   (parameter | OPTALCP_SOLVER | PATH probe | URL)
//! ```
//!
//! [`session::Solver`] owns the state machine described by the wire events
//! in [`crate::wire`]; [`transport`] abstracts over the three ways those
//! lines actually travel; [`discovery`] decides which one to use before a
//! session ever opens.

pub mod discovery;
pub mod session;
pub mod transport;

pub use discovery::Endpoint;
pub use session::{BoundCallback, ErrorCallback, LogCallback, SolutionCallback, SolveOutcome, Solver, WarningCallback};
pub use transport::{Transport, TransportEvent};
