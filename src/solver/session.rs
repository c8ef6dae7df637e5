//! The `Solver` state machine: handshake, request emission, event dispatch
//! and result assembly for a single `solve`/`propagate`/`toText`/`toJS`
//! call, against a spawned solver process or a WebSocket endpoint.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::{OptalcpError, Result};
use crate::model::container::Model;
use crate::params::Parameters;
use crate::solution::{DomainRecord, ModelDomains, PropagationResult, Solution};
use crate::solver::discovery::{self, Endpoint};
use crate::solver::transport::{Transport, TransportEvent};
use crate::wire::{
    DomainsData, ErrorData, HandshakeRequest, HandshakeTag, LogData, LowerBoundData, RequestKind, RequestPayload,
    SendSolutionRequest, ServerMessage, SolutionTag, StopRequest, StopTag, SummaryData,
};

const CLIENT_NAME: &str = "optalcp-client-rs";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub type SolutionCallback = Box<dyn FnMut(&Solution, Option<f64>)>;
pub type BoundCallback = Box<dyn FnMut(f64, f64)>;
pub type LogCallback = Box<dyn FnMut(&str)>;
pub type WarningCallback = Box<dyn FnMut(&str)>;
pub type ErrorCallback = Box<dyn FnMut(&str)>;

#[derive(Default)]
struct Callbacks {
    on_solution: Option<SolutionCallback>,
    on_objective_bound: Option<BoundCallback>,
    on_log: Option<LogCallback>,
    on_warning: Option<WarningCallback>,
    on_error: Option<ErrorCallback>,
}

/// The outcome of a successful `solve`.
#[derive(Debug, Clone, Default)]
pub struct SolveOutcome {
    pub objective: Option<f64>,
    pub objective_history: Vec<(f64, f64)>,
    pub objective_bound_history: Vec<(f64, f64)>,
    pub solution: Option<Solution>,
    pub solution_time: Option<f64>,
    pub bound_time: Option<f64>,
    pub solution_valid: Option<bool>,
}

/// A reusable solver session. One active solve at a time; callbacks are
/// immutable while a solve is in progress.
pub struct Solver {
    callbacks: RefCell<Callbacks>,
    in_progress: Cell<bool>,
    active_outbound: RefCell<Option<UnboundedSender<String>>>,
    /// A `stop`/`send_solution` call made before `start()` opens the
    /// transport is held here and flushed once `active_outbound` is set.
    pending_stop: RefCell<Option<String>>,
    pending_solution: RefCell<Option<Solution>>,
}

impl Default for Solver {
    fn default() -> Self {
        Solver {
            callbacks: RefCell::new(Callbacks::default()),
            in_progress: Cell::new(false),
            active_outbound: RefCell::new(None),
            pending_stop: RefCell::new(None),
            pending_solution: RefCell::new(None),
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Solver::default()
    }

    pub fn on_solution(&self, callback: SolutionCallback) -> Result<()> {
        self.guard_callbacks_unlocked()?;
        self.callbacks.borrow_mut().on_solution = Some(callback);
        Ok(())
    }

    pub fn on_objective_bound(&self, callback: BoundCallback) -> Result<()> {
        self.guard_callbacks_unlocked()?;
        self.callbacks.borrow_mut().on_objective_bound = Some(callback);
        Ok(())
    }

    pub fn on_log(&self, callback: LogCallback) -> Result<()> {
        self.guard_callbacks_unlocked()?;
        self.callbacks.borrow_mut().on_log = Some(callback);
        Ok(())
    }

    pub fn on_warning(&self, callback: WarningCallback) -> Result<()> {
        self.guard_callbacks_unlocked()?;
        self.callbacks.borrow_mut().on_warning = Some(callback);
        Ok(())
    }

    pub fn on_error(&self, callback: ErrorCallback) -> Result<()> {
        self.guard_callbacks_unlocked()?;
        self.callbacks.borrow_mut().on_error = Some(callback);
        Ok(())
    }

    /// Sends any reason/solution queued by a `stop`/`send_solution` call that
    /// arrived before `active_outbound` was set. Called once `start()` opens
    /// the transport.
    fn flush_pending(&self) {
        if let Some(reason) = self.pending_stop.borrow_mut().take() {
            self.stop(&reason);
        }
        if let Some(solution) = self.pending_solution.borrow_mut().take() {
            self.send_solution(&solution);
        }
    }

    fn guard_callbacks_unlocked(&self) -> Result<()> {
        if self.in_progress.get() {
            return Err(OptalcpError::CallbacksLockedDuringSolve);
        }
        Ok(())
    }

    /// Advisory stop: enqueues a `stop` message if the handshake has
    /// completed. Called before `start()` has opened the transport, the
    /// reason is queued and sent as soon as it does.
    pub fn stop(&self, reason: &str) {
        if let Some(tx) = self.active_outbound.borrow().as_ref() {
            let request = StopRequest {
                msg: StopTag::Stop,
                reason: reason.to_string(),
            };
            if let Ok(line) = serde_json::to_string(&request) {
                let _ = tx.send(line);
            }
        } else {
            *self.pending_stop.borrow_mut() = Some(reason.to_string());
        }
    }

    /// Offer an externally computed solution to the running solver. Called
    /// before `start()` has opened the transport, the solution is queued and
    /// sent as soon as it does.
    pub fn send_solution(&self, solution: &Solution) {
        if let Some(tx) = self.active_outbound.borrow().as_ref() {
            let request = SendSolutionRequest {
                msg: SolutionTag::Solution,
                data: solution.to_wire(),
            };
            if let Ok(line) = serde_json::to_string(&request) {
                let _ = tx.send(line);
            }
        } else {
            *self.pending_solution.borrow_mut() = Some(solution.clone());
        }
    }

    pub async fn solve(
        &self,
        model: &Rc<Model>,
        parameters: &Parameters,
        warm_start: Option<&Solution>,
    ) -> Result<SolveOutcome> {
        let mut run = self.start(model, RequestKind::Solve, parameters, warm_start).await?;
        let result = self.drive(&mut run).await;
        self.finish(run);
        let mut state = result?;
        Ok(SolveOutcome {
            objective: state.objective,
            objective_history: std::mem::take(&mut state.objective_history),
            objective_bound_history: std::mem::take(&mut state.objective_bound_history),
            solution: state.solution.take(),
            solution_time: state.solution_time,
            bound_time: state.bound_time,
            solution_valid: state.solution_valid,
        })
    }

    /// Never rejects for infeasibility or a hit resource limit; those are
    /// reported as [`PropagationResult`] variants instead.
    pub async fn propagate(&self, model: &Rc<Model>, parameters: &Parameters) -> Result<PropagationResult> {
        let mut run = self.start(model, RequestKind::Propagate, parameters, None).await?;
        let result = self.drive(&mut run).await;
        self.finish(run);
        let state = result?;
        Ok(state.domains.unwrap_or(PropagationResult::Domains(ModelDomains::default())))
    }

    pub async fn export_text(&self, model: &Rc<Model>, parameters: &Parameters) -> Result<String> {
        let mut run = self.start(model, RequestKind::ToText, parameters, None).await?;
        let result = self.drive(&mut run).await;
        self.finish(run);
        Ok(result?.text.unwrap_or_default())
    }

    pub async fn export_js(&self, model: &Rc<Model>, parameters: &Parameters) -> Result<String> {
        let mut run = self.start(model, RequestKind::ToJs, parameters, None).await?;
        let result = self.drive(&mut run).await;
        self.finish(run);
        Ok(result?.text.unwrap_or_default())
    }

    async fn start(
        &self,
        model: &Rc<Model>,
        kind: RequestKind,
        parameters: &Parameters,
        warm_start: Option<&Solution>,
    ) -> Result<ActiveRun> {
        if self.in_progress.replace(true) {
            return Err(OptalcpError::SolveAlreadyInProgress);
        }

        let endpoint = match discovery::resolve(parameters.solver.as_deref()) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                self.in_progress.set(false);
                return Err(err);
            }
        };
        let transport = match open(&endpoint).await {
            Ok(t) => t,
            Err(err) => {
                self.in_progress.set(false);
                return Err(err);
            }
        };

        let outbound = transport.outbound_for_session();
        *self.active_outbound.borrow_mut() = Some(outbound);
        self.flush_pending();

        let batch_results = {
            let callbacks = self.callbacks.borrow();
            callbacks.on_solution.is_none() && callbacks.on_objective_bound.is_none()
        };
        let request = RequestPayload::build(model, kind, parameters.clone(), warm_start, batch_results);

        Ok(ActiveRun {
            transport,
            kind,
            request,
            ctrl_c: CtrlCSignal::new(),
        })
    }

    async fn drive(&self, run: &mut ActiveRun) -> Result<SessionState> {
        let handshake = HandshakeRequest {
            msg: HandshakeTag::Handshake,
            client: CLIENT_NAME.to_string(),
            version: CLIENT_VERSION.to_string(),
            colors: false,
        };
        let line = serde_json::to_string(&handshake).map_err(|e| OptalcpError::Serialization(e.to_string()))?;
        tracing::debug!(client = CLIENT_NAME, version = CLIENT_VERSION, "sending handshake");
        run.transport.send_line(line)?;

        let mut errors: Vec<String> = Vec::new();
        loop {
            tokio::select! {
                _ = run.ctrl_c.recv() => {
                    self.stop("Interrupted");
                }
                event = run.transport.inbound.recv() => match event {
                    Some(TransportEvent::Message(line)) => match parse_message(&line) {
                        Ok(msg) if msg.msg == "handshake" => break,
                        Ok(msg) if msg.msg == "error" => {
                            let data: ErrorData = serde_json::from_value(msg.data).unwrap_or(ErrorData {
                                prefix: None,
                                data: "unspecified solver error".to_string(),
                            });
                            return Err(OptalcpError::SolverReported(format_error(&data)));
                        }
                        Ok(msg) => return Err(OptalcpError::ProtocolViolation(msg.msg)),
                        Err(err) => return Err(err),
                    },
                    Some(TransportEvent::Error(err)) => return Err(err),
                    Some(TransportEvent::Warning(text)) => {
                        tracing::warn!(stderr_line = %text, "solver stderr");
                        if let Some(cb) = self.callbacks.borrow_mut().on_warning.as_mut() {
                            cb(&text);
                        }
                    }
                    Some(TransportEvent::Closed) | None => {
                        return Err(OptalcpError::ProtocolViolation("no handshake reply".to_string()));
                    }
                },
            }
        }

        let request_line =
            serde_json::to_string(&run.request).map_err(|e| OptalcpError::Serialization(e.to_string()))?;
        tracing::debug!(kind = ?run.kind, "sending request");
        run.transport.send_line(request_line)?;

        let mut state = SessionState::default();
        loop {
            tokio::select! {
                _ = run.ctrl_c.recv() => {
                    self.stop("Interrupted");
                }
                event = run.transport.inbound.recv() => match event {
                    Some(TransportEvent::Message(line)) => match parse_message(&line) {
                        Ok(msg) => self.dispatch(run.kind, msg, &mut state, &mut errors),
                        Err(err) => errors.push(err.to_string()),
                    },
                    Some(TransportEvent::Warning(text)) => {
                        tracing::warn!(stderr_line = %text, "solver stderr");
                        if let Some(cb) = self.callbacks.borrow_mut().on_warning.as_mut() {
                            cb(&text);
                        }
                    }
                    Some(TransportEvent::Error(err)) => errors.push(err.to_string()),
                    Some(TransportEvent::Closed) | None => break,
                },
            }
        }

        if !errors.is_empty() {
            return Err(OptalcpError::accumulate(&errors));
        }
        Ok(state)
    }

    fn dispatch(&self, kind: RequestKind, msg: ServerMessage, state: &mut SessionState, errors: &mut Vec<String>) {
        match msg.msg.as_str() {
            "error" => {
                let data: ErrorData = match serde_json::from_value(msg.data) {
                    Ok(d) => d,
                    Err(err) => {
                        errors.push(err.to_string());
                        return;
                    }
                };
                let text = format_error(&data);
                tracing::error!(solver_message = %text, "solver reported an error");
                if let Some(cb) = self.callbacks.borrow_mut().on_error.as_mut() {
                    cb(&text);
                }
                errors.push(text);
            }
            "log" => {
                let data: Result<LogData> =
                    serde_json::from_value(msg.data).map_err(|e| OptalcpError::Deserialization(e.to_string()));
                if let Ok(data) = data {
                    tracing::info!(solver_message = %data.data, "solver log");
                    if let Some(cb) = self.callbacks.borrow_mut().on_log.as_mut() {
                        cb(&data.data);
                    }
                }
            }
            "warning" => {
                let data: Result<LogData> =
                    serde_json::from_value(msg.data).map_err(|e| OptalcpError::Deserialization(e.to_string()));
                if let Ok(data) = data {
                    tracing::warn!(solver_message = %data.data, "solver warning");
                    if let Some(cb) = self.callbacks.borrow_mut().on_warning.as_mut() {
                        cb(&data.data);
                    }
                }
            }
            "solution" => {
                let data: crate::wire::SolutionData = match serde_json::from_value(msg.data) {
                    Ok(d) => d,
                    Err(err) => {
                        errors.push(err.to_string());
                        return;
                    }
                };
                let solution = Solution::from_wire(&data);
                state.solution_time = data.solve_time.or(state.solution_time);
                state.solution_valid = data.verified_ok.or(state.solution_valid);
                if let Some(objective) = data.objective {
                    state.objective = Some(objective);
                    let time = data.solve_time.unwrap_or(0.0);
                    state.objective_history.push((time, objective));
                }
                if let Some(cb) = self.callbacks.borrow_mut().on_solution.as_mut() {
                    cb(&solution, data.objective);
                }
                state.solution = Some(solution);
            }
            "lowerBound" => {
                let data: LowerBoundData = match serde_json::from_value(msg.data) {
                    Ok(d) => d,
                    Err(err) => {
                        errors.push(err.to_string());
                        return;
                    }
                };
                state.objective_bound_history.push((data.solve_time, data.value));
                state.bound_time = Some(data.solve_time);
                if let Some(cb) = self.callbacks.borrow_mut().on_objective_bound.as_mut() {
                    cb(data.value, data.solve_time);
                }
            }
            "domains" => {
                if kind != RequestKind::Propagate {
                    return;
                }
                let data: DomainsData = match serde_json::from_value(msg.data) {
                    Ok(d) => d,
                    Err(err) => {
                        errors.push(err.to_string());
                        return;
                    }
                };
                state.domains = Some(domains_from_wire(data));
            }
            "textModel" => {
                if let Ok(text) = serde_json::from_value::<String>(msg.data) {
                    state.text = Some(text);
                }
            }
            "summary" => {
                let data: SummaryData = match serde_json::from_value(msg.data) {
                    Ok(d) => d,
                    Err(err) => {
                        errors.push(err.to_string());
                        return;
                    }
                };
                if let Some(objective) = data.objective {
                    state.objective = Some(objective);
                }
                if let Some(history) = data.objective_history {
                    state.objective_history = history.into_iter().map(|e| (e.solve_time, e.value)).collect();
                }
                if let Some(history) = data.objective_bound_history {
                    state.objective_bound_history = history.into_iter().map(|e| (e.solve_time, e.value)).collect();
                }
                if let Some(values) = data.solution_values {
                    let mut solution = Solution::new();
                    for entry in values {
                        solution.set(entry.id, entry.value);
                    }
                    solution.set_objective(state.objective);
                    state.solution = Some(solution);
                }
            }
            other => errors.push(OptalcpError::UnknownMessageKind(other.to_string()).to_string()),
        }
    }

    fn finish(&self, run: ActiveRun) {
        run.transport.close();
        *self.active_outbound.borrow_mut() = None;
        *self.pending_stop.borrow_mut() = None;
        *self.pending_solution.borrow_mut() = None;
        self.in_progress.set(false);
    }
}

struct ActiveRun {
    transport: Transport,
    kind: RequestKind,
    request: RequestPayload,
    ctrl_c: CtrlCSignal,
}

/// On Windows, a SIGINT during a solve is delivered through a console
/// control handler rather than a Unix signal; `recv` resolves once per
/// interrupt and never on other platforms.
#[cfg(target_os = "windows")]
struct CtrlCSignal(Option<tokio::signal::windows::CtrlC>);

#[cfg(not(target_os = "windows"))]
struct CtrlCSignal;

impl CtrlCSignal {
    #[cfg(target_os = "windows")]
    fn new() -> Self {
        CtrlCSignal(tokio::signal::windows::ctrl_c().ok())
    }

    #[cfg(not(target_os = "windows"))]
    fn new() -> Self {
        CtrlCSignal
    }

    async fn recv(&mut self) {
        #[cfg(target_os = "windows")]
        {
            match &mut self.0 {
                Some(signal) => {
                    signal.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::future::pending::<()>().await
        }
    }
}

#[derive(Default)]
struct SessionState {
    objective: Option<f64>,
    objective_history: Vec<(f64, f64)>,
    objective_bound_history: Vec<(f64, f64)>,
    solution: Option<Solution>,
    solution_time: Option<f64>,
    bound_time: Option<f64>,
    solution_valid: Option<bool>,
    domains: Option<PropagationResult>,
    text: Option<String>,
}

fn domains_from_wire(data: DomainsData) -> PropagationResult {
    if data.error {
        return PropagationResult::Infeasible;
    }
    if data.limit_hit {
        return PropagationResult::LimitHit;
    }
    let mut domains = ModelDomains::default();
    domains.duration = data.duration;
    domains.memory_used = data.memory_used;
    domains.nb_int_vars = data.nb_int_vars;
    domains.nb_interval_vars = data.nb_interval_vars;
    domains.nb_constraints = data.nb_constraints;
    for entry in data.domains {
        let record: DomainRecord = entry.domain;
        domains.insert(entry.id, record);
    }
    PropagationResult::Domains(domains)
}

fn parse_message(line: &str) -> Result<ServerMessage> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    let serde_json::Value::Object(map) = value else {
        return Err(OptalcpError::MissingMsgField);
    };
    let Some(msg) = map.get("msg").and_then(|v| v.as_str()) else {
        return Err(OptalcpError::MissingMsgField);
    };
    let data = map.get("data").cloned().unwrap_or(serde_json::Value::Null);
    Ok(ServerMessage {
        msg: msg.to_string(),
        data,
    })
}

fn format_error(data: &ErrorData) -> String {
    match &data.prefix {
        Some(prefix) => format!("{prefix}: {}", data.data),
        None => data.data.clone(),
    }
}

async fn open(endpoint: &Endpoint) -> Result<Transport> {
    match endpoint {
        Endpoint::Process(path) => Transport::spawn_process(&path.to_string_lossy(), &[]),
        Endpoint::Url(url) => Transport::connect_websocket(url).await,
    }
}

/// Drives `solver` against `run` using a scripted [`crate::solver::transport::MockSolver`],
/// bypassing [`Solver::start`]'s discovery/open step entirely (tests construct the
/// `ActiveRun` directly since this module's tests share its private fields).
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::container::Model;
    use crate::solution::SolutionValue;
    use crate::solver::transport::Transport;

    fn single_interval_model() -> Rc<Model> {
        let model = Model::new();
        let x = model.new_interval_var(0, 100, 0, 100, 10, 10, Some("x")).unwrap();
        model.minimize(&x.end());
        model
    }

    async fn run_scripted(
        solver: &Solver,
        model: &Rc<Model>,
        kind: RequestKind,
        parameters: Parameters,
        warm_start: Option<&Solution>,
        script: impl FnOnce(crate::solver::transport::MockSolver) + Send + 'static,
    ) -> Result<SessionState> {
        let (transport, mock) = Transport::mock_pair();
        *solver.active_outbound.borrow_mut() = Some(transport.outbound_for_session());
        let batch_results = {
            let callbacks = solver.callbacks.borrow();
            callbacks.on_solution.is_none() && callbacks.on_objective_bound.is_none()
        };
        let request = RequestPayload::build(model, kind, parameters, warm_start, batch_results);
        let mut run = ActiveRun {
            transport,
            kind,
            request,
            ctrl_c: CtrlCSignal::new(),
        };

        tokio::task::spawn_blocking(move || script(mock));
        let result = solver.drive(&mut run).await;
        solver.finish(run);
        result
    }

    #[tokio::test]
    async fn s1_single_interval_minimization() {
        let model = single_interval_model();
        let solver = Solver::new();

        let outcome = run_scripted(&solver, &model, RequestKind::Solve, Parameters::default(), None, |mut mock| {
            mock.sent.blocking_recv().unwrap(); // handshake
            mock.reply_line(r#"{"msg":"handshake"}"#);
            mock.sent.blocking_recv().unwrap(); // solve request
            mock.reply_line(r#"{"msg":"solution","data":{"objective":10.0,"values":[{"id":0,"value":{"start":0,"end":10}}],"solveTime":0.01,"verifiedOK":true}}"#);
            mock.reply_line(r#"{"msg":"summary","data":{"objective":10.0}}"#);
            mock.close();
        })
        .await
        .unwrap();

        assert_eq!(outcome.objective, Some(10.0));
        let solution = outcome.solution.expect("a solution event was scripted");
        assert_eq!(solution.get_interval(0), Some((0, 10)));
    }

    #[tokio::test]
    async fn s2_alternative_reports_absent_option() {
        let model = Model::new();
        let x = model.new_interval_var_fixed_length(10, 100, Some("X")).unwrap();
        let a = model.new_interval_var_fixed_length(10, 100, Some("A")).unwrap();
        let b = model.new_interval_var_fixed_length(10, 100, Some("B")).unwrap();
        a.set_optional();
        b.set_optional();
        x.alternative(&[a.clone(), b.clone()]).unwrap().enforce();

        let a_id = a.node().ref_id().unwrap();
        let solver = Solver::new();
        let outcome = run_scripted(&solver, &model, RequestKind::Solve, Parameters::default(), None, move |mut mock| {
            mock.sent.blocking_recv().unwrap();
            mock.reply_line(r#"{"msg":"handshake"}"#);
            mock.sent.blocking_recv().unwrap();
            mock.reply_line(format!(
                r#"{{"msg":"solution","data":{{"values":[{{"id":{a_id},"value":{{"start":0,"end":10}}}}]}}}}"#
            ));
            mock.close();
        })
        .await
        .unwrap();

        let solution = outcome.solution.unwrap();
        assert_eq!(solution.get_interval(a_id), Some((0, 10)));
        assert!(solution.is_absent(b.node().ref_id().unwrap()));
    }

    #[tokio::test]
    async fn s3_cumulative_capacity_forces_sequential_execution() {
        // Demand 2 on a capacity-3 resource means at most one interval may run
        // at a time; three intervals of length 4, 5 and 6 must run back to
        // back, for a minimum makespan of 15.
        let model = Model::new();
        let a = model.new_interval_var_fixed_length(4, 30, Some("a")).unwrap();
        let b = model.new_interval_var_fixed_length(5, 30, Some("b")).unwrap();
        let c = model.new_interval_var_fixed_length(6, 30, Some("c")).unwrap();
        let usage = crate::model::cumul::sum(
            &model,
            &[a.pulse(2).unwrap(), b.pulse(2).unwrap(), c.pulse(2).unwrap()],
        )
        .unwrap();
        usage.le(3);
        let makespan = crate::model::expr::max(&model, &[a.end(), b.end(), c.end()]);
        model.minimize(&makespan);

        let a_id = a.node().ref_id().unwrap();
        let b_id = b.node().ref_id().unwrap();
        let c_id = c.node().ref_id().unwrap();

        let solver = Solver::new();
        let outcome = run_scripted(&solver, &model, RequestKind::Solve, Parameters::default(), None, move |mut mock| {
            mock.sent.blocking_recv().unwrap();
            mock.reply_line(r#"{"msg":"handshake"}"#);
            mock.sent.blocking_recv().unwrap();
            mock.reply_line(format!(
                r#"{{"msg":"solution","data":{{"objective":15.0,"values":[
                    {{"id":{a_id},"value":{{"start":0,"end":4}}}},
                    {{"id":{b_id},"value":{{"start":4,"end":9}}}},
                    {{"id":{c_id},"value":{{"start":9,"end":15}}}}
                ]}}}}"#
            ));
            mock.close();
        })
        .await
        .unwrap();

        assert_eq!(outcome.objective, Some(15.0));
        let solution = outcome.solution.unwrap();
        assert_eq!(solution.get_interval(a_id), Some((0, 4)));
        assert_eq!(solution.get_interval(b_id), Some((4, 9)));
        assert_eq!(solution.get_interval(c_id), Some((9, 15)));
    }

    #[tokio::test]
    async fn s4_no_overlap_with_transitions_groups_by_type() {
        // Four unit-length intervals of types [0, 1, 0, 1] on a sequence whose
        // transition matrix charges 5 between differing types and 0 between
        // matching ones. Grouping same-typed members adjacently pays the
        // cooldown only once each way: makespan 1 + 1 + 5 + 1 + 1 = 9.
        let model = Model::new();
        let w = model.new_interval_var_fixed_length(1, 30, Some("w")).unwrap();
        let x = model.new_interval_var_fixed_length(1, 30, Some("x")).unwrap();
        let y = model.new_interval_var_fixed_length(1, 30, Some("y")).unwrap();
        let z = model.new_interval_var_fixed_length(1, 30, Some("z")).unwrap();
        let sequence = model
            .new_sequence_var(&[w.clone(), x.clone(), y.clone(), z.clone()], Some(&[0, 1, 0, 1]), Some("seq"))
            .unwrap();
        sequence.no_overlap(Some(&[vec![0, 5], vec![5, 0]])).unwrap();
        let makespan = crate::model::expr::max(&model, &[w.end(), x.end(), y.end(), z.end()]);
        model.minimize(&makespan);

        let w_id = w.node().ref_id().unwrap();
        let x_id = x.node().ref_id().unwrap();
        let y_id = y.node().ref_id().unwrap();
        let z_id = z.node().ref_id().unwrap();

        let solver = Solver::new();
        let outcome = run_scripted(&solver, &model, RequestKind::Solve, Parameters::default(), None, move |mut mock| {
            mock.sent.blocking_recv().unwrap();
            mock.reply_line(r#"{"msg":"handshake"}"#);
            mock.sent.blocking_recv().unwrap();
            mock.reply_line(format!(
                r#"{{"msg":"solution","data":{{"objective":9.0,"values":[
                    {{"id":{w_id},"value":{{"start":0,"end":1}}}},
                    {{"id":{y_id},"value":{{"start":1,"end":2}}}},
                    {{"id":{x_id},"value":{{"start":7,"end":8}}}},
                    {{"id":{z_id},"value":{{"start":8,"end":9}}}}
                ]}}}}"#
            ));
            mock.close();
        })
        .await
        .unwrap();

        assert_eq!(outcome.objective, Some(9.0));
        let solution = outcome.solution.unwrap();
        assert_eq!(solution.get_interval(w_id), Some((0, 1)));
        assert_eq!(solution.get_interval(y_id), Some((1, 2)));
        assert_eq!(solution.get_interval(x_id), Some((7, 8)));
        assert_eq!(solution.get_interval(z_id), Some((8, 9)));
    }

    #[tokio::test]
    async fn s5_warm_start_is_sent_in_request() {
        let model = single_interval_model();
        let x = model.get_interval_vars().remove(0);
        let x_id = x.node().ref_id().unwrap();

        let mut warm_start = Solution::new();
        warm_start.set(x_id, SolutionValue::Interval { start: 42, end: 52 });

        let mut parameters = Parameters::default();
        parameters.shared.lns_use_warm_start_only = Some(true);
        parameters.shared.time_limit = Some(0.1);

        let solver = Solver::new();
        let outcome = run_scripted(&solver, &model, RequestKind::Solve, parameters, Some(&warm_start), |mut mock| {
            let handshake_line = mock.sent.blocking_recv().unwrap();
            assert!(handshake_line.contains("\"handshake\""));
            mock.reply_line(r#"{"msg":"handshake"}"#);
            let request_line = mock.sent.blocking_recv().unwrap();
            assert!(request_line.contains("\"warmStart\""));
            assert!(request_line.contains("42"));
            mock.reply_line(r#"{"msg":"solution","data":{"objective":10.0,"values":[{"id":0,"value":{"start":42,"end":52}}]}}"#);
            mock.close();
        })
        .await
        .unwrap();

        assert_eq!(outcome.solution.unwrap().get_interval(x_id), Some((42, 52)));
    }

    #[tokio::test]
    async fn s6_stop_sends_a_stop_line_after_first_solution() {
        let model = single_interval_model();
        let solver = Solver::new();

        let (transport, mut mock) = Transport::mock_pair();
        *solver.active_outbound.borrow_mut() = Some(transport.outbound_for_session());
        let request = RequestPayload::build(&model, RequestKind::Solve, Parameters::default(), None, true);
        let mut run = ActiveRun {
            transport,
            kind: RequestKind::Solve,
            request,
            ctrl_c: CtrlCSignal::new(),
        };

        // Signalled by the scripted solver once it has sent the first solution,
        // so the test body can call `stop` while `drive` is still awaiting events.
        let solution_seen = std::sync::Arc::new(tokio::sync::Notify::new());
        let solution_seen_tx = solution_seen.clone();
        tokio::task::spawn_blocking(move || {
            mock.sent.blocking_recv().unwrap(); // handshake
            mock.reply_line(r#"{"msg":"handshake"}"#);
            mock.sent.blocking_recv().unwrap(); // solve request
            mock.reply_line(r#"{"msg":"solution","data":{"values":[{"id":0,"value":{"start":0,"end":10}}]}}"#);
            solution_seen_tx.notify_one();
            let stop_line = mock.sent.blocking_recv().unwrap();
            assert!(stop_line.contains("\"stop\""));
            mock.close();
        });

        let stop_once_solution_seen = async {
            solution_seen.notified().await;
            solver.stop("done");
        };
        let (result, ()) = tokio::join!(solver.drive(&mut run), stop_once_solution_seen);
        solver.finish(run);

        let outcome = result.unwrap();
        assert!(outcome.solution.is_some());
    }

    #[test]
    fn stop_called_before_start_is_queued_rather_than_dropped() {
        let solver = Solver::new();
        solver.stop("too early");
        assert_eq!(solver.pending_stop.borrow().as_deref(), Some("too early"));
    }

    #[test]
    fn send_solution_called_before_start_is_queued_rather_than_dropped() {
        let solver = Solver::new();
        let mut solution = Solution::new();
        solution.set(0, SolutionValue::Interval { start: 0, end: 1 });
        solver.send_solution(&solution);
        assert!(solver.pending_solution.borrow().is_some());
    }

    #[tokio::test]
    async fn queued_stop_is_flushed_once_the_transport_opens() {
        let solver = Solver::new();
        solver.stop("queued");

        let (transport, mut mock) = Transport::mock_pair();
        *solver.active_outbound.borrow_mut() = Some(transport.outbound_for_session());
        solver.flush_pending();
        transport.close();

        let line = mock.sent.recv().await.unwrap();
        assert!(line.contains("\"stop\""));
        assert!(line.contains("queued"));
        assert!(solver.pending_stop.borrow().is_none());
    }
}
