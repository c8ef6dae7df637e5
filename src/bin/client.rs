//! `optalcp-client`: a small worked example that builds a scheduling model
//! in memory, solves it against a discovered solver, and prints incremental
//! solutions as they stream in.
//!
//! ```bash
//! cargo run --bin optalcp-client -- --solver /path/to/optalcp --time-limit 10
//! ```
//!
//! Builds a single fixed-length interval `x` with `start` free in `[0, 100]`
//! and minimizes `x.end()` — the S1 scenario also exercised in the library's
//! integration tests.

use clap::Parser;

use optalcp_client::model::Model;
use optalcp_client::params::Parameters;
use optalcp_client::solver::Solver;
use optalcp_client::ClientConfig;

#[derive(Debug, Parser)]
#[command(name = "optalcp-client", version)]
struct Cli {
    /// Solver executable or `ws(s)://` endpoint; falls back to discovery.
    #[arg(long)]
    solver: Option<String>,

    #[arg(long)]
    time_limit: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::load().unwrap_or_default();
    config.init_tracing();

    let model = Model::new();
    let x = model.new_interval_var(0, 100, 0, 100, 10, 10, Some("x"))?;
    model.minimize(&x.end());

    let mut parameters = Parameters::default();
    parameters.solver = cli.solver.or(config.solver.path);
    parameters.shared.time_limit = cli.time_limit.or(parameters.shared.time_limit);

    let solver = Solver::new();
    solver.on_solution(Box::new(|solution, objective| {
        println!("solution found, objective = {objective:?}, values = {}", solution.len());
    }))?;
    solver.on_objective_bound(Box::new(|bound, time| {
        println!("bound {bound} proven at t={time:.3}s");
    }))?;
    solver.on_log(Box::new(|line| tracing::info!(target: "optalcp-client", "{line}")))?;

    let outcome = solver.solve(&model, &parameters, None).await?;
    println!(
        "final objective = {:?} (solve time {:?}, valid = {:?})",
        outcome.objective, outcome.solution_time, outcome.solution_valid
    );
    if let Some(solution) = &outcome.solution {
        let id = x.node().ref_id().expect("declared interval vars are assigned a ref id at construction");
        if let Some((start, end)) = solution.get_interval(id) {
            println!("x = [{start}, {end})");
        }
    }
    Ok(())
}
