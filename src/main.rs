//! `optalcp`: send a serialized model to an external solver and print its
//! result. Catalog options (`--timeLimit`, `--worker0.randomSeed`, ...) are
//! parsed by [`optalcp_client::params::cli`]; `--model`/`--solver` are this
//! binary's own top-level flags.

use std::path::PathBuf;

use clap::Parser;

use optalcp_client::params::cli::parse_args;
use optalcp_client::solver::Solver;
use optalcp_client::ClientConfig;

/// Run a serialized model against the OptalCP solver.
#[derive(Debug, Parser)]
#[command(name = "optalcp", version)]
struct Cli {
    /// Path to a model serialized with `optalcp_client::serialize::to_json`.
    #[arg(long)]
    model: PathBuf,

    /// Solver executable or `ws(s)://` endpoint; overrides discovery and
    /// any `--solverPath` catalog flag.
    #[arg(long)]
    solver: Option<String>,

    /// Remaining catalog options, e.g. `--timeLimit 30 --worker0.randomSeed 7`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    catalog_args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::load().unwrap_or_default();
    config.init_tracing();

    let text = tokio::fs::read_to_string(&cli.model).await?;
    let (model, stored_parameters, warm_start) = optalcp_client::serialize::from_json(&text)?;

    let parsed = parse_args(&cli.catalog_args, false)?;
    if parsed.help_requested {
        for line in optalcp_client::params::cli::usage_lines() {
            println!("{line}");
        }
        return Ok(());
    }

    let stored_parameters = stored_parameters.unwrap_or_default();
    let mut parameters = optalcp_client::params::merge_parameters(&config.parameters, &stored_parameters);
    parameters = optalcp_client::params::merge_parameters(&parameters, &parsed.parameters);
    if let Some(solver) = &cli.solver {
        parameters.solver = Some(solver.clone());
    }

    if parsed.version_requested {
        let endpoint = optalcp_client::solver::discovery::resolve(parameters.solver.as_deref())?;
        let version = optalcp_client::solver::discovery::query_version(&endpoint).await?;
        println!("{version}");
        return Ok(());
    }

    let solver = Solver::new();
    solver.on_log(Box::new(|line| tracing::info!(target: "optalcp", "{line}")))?;
    solver.on_warning(Box::new(|line| tracing::warn!(target: "optalcp", "{line}")))?;
    solver.on_error(Box::new(|line| tracing::error!(target: "optalcp", "{line}")))?;

    let outcome = solver.solve(&model, &parameters, warm_start.as_ref()).await?;
    match outcome.objective {
        Some(objective) => println!("objective = {objective}"),
        None => println!("no objective recorded"),
    }
    if let Some(solution) = &outcome.solution {
        println!("solution covers {} variables", solution.len());
    }
    Ok(())
}
