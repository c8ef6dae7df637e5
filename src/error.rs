//! Error types for the OptalCP client.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, OptalcpError>;

/// Errors raised anywhere in the client: model construction, serialization,
/// parameter/CLI parsing, or the solver session's transport and protocol.
#[derive(Debug, Error)]
pub enum OptalcpError {
    // Construction errors: surfaced immediately to the caller
    #[error("value {value} out of range [{min}, {max}] for {what}")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("array argument for {what} must not be empty")]
    EmptyArray { what: &'static str },

    #[error("matrix row {row} has length {actual}, expected {expected}")]
    MatrixDimensionMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{what} is not valid for an optional/absent node in this position")]
    InvalidArgument { what: &'static str },

    #[error("height must be non-negative for pulse (got {0})")]
    NegativePulseHeight(i64),

    #[error("ge() bound requires a constant capacity, got an expression")]
    ReservoirRequiresConstant,

    #[error("cannot mix pulse-based and step-based cumulative terms in one sum")]
    MixedCumulativeKinds,

    #[error("position() is unavailable on a sequence using transition times or zero-length intervals")]
    PositionUnavailable,

    // Parameter / CLI errors
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("option {option} requires a value")]
    MissingValue { option: String },

    #[error("invalid value {value:?} for option {option}: {reason}")]
    InvalidOptionValue {
        option: String,
        value: String,
        reason: String,
    },

    #[error("option {0} cannot be worker-scoped")]
    NotWorkerScopable(String),

    // Serialization / reconstruction errors
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("malformed model encoding: {0}")]
    Deserialization(String),

    // Transport errors
    #[error("failed to spawn solver process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("solver process exited with status {0}")]
    ProcessExitedWithError(std::process::ExitStatus),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("WebSocket closed with code {0}: {1}")]
    WebSocketClosed(u16, String),

    // Protocol errors
    #[error("malformed JSON line from solver: {0}")]
    MalformedLine(#[from] serde_json::Error),

    #[error("message is missing the 'msg' discriminator")]
    MissingMsgField,

    #[error("first message from solver was not a handshake: {0}")]
    ProtocolViolation(String),

    #[error("unknown message kind from solver: {0}")]
    UnknownMessageKind(String),

    // Solver-reported and accumulated errors
    #[error("{0}")]
    SolverReported(String),

    #[error("solve failed: {0}")]
    Accumulated(String),

    // Concurrency discipline
    #[error("a solve is already in progress on this Solver instance")]
    SolveAlreadyInProgress,

    #[error("cannot modify callbacks while a solve is in progress")]
    CallbacksLockedDuringSolve,

    #[error("solver executable could not be located (checked parameter, OPTALCP_SOLVER, PATH)")]
    SolverNotFound,

    #[error("cannot query solver version over a WebSocket endpoint; a local binary is required")]
    VersionQueryUnsupported,

    #[error("{0}")]
    Other(String),
}

impl OptalcpError {
    pub(crate) fn accumulate(errors: &[String]) -> Self {
        OptalcpError::Accumulated(errors.join("; "))
    }
}
