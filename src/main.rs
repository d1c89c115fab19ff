//! Thorium Simulator - command line entry point
//!
//! Runs the reactor digital twin and the policy projection from the shell and
//! prints the resulting series as a table or JSON.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use thorium_sim_lib::commands::{SimulationRequest, SimulationResponse};
use thorium_sim_lib::config::{ConfigError, ModelConfig};
use thorium_sim_lib::series::round_to;
use thorium_sim_lib::{RawValue, RawValues, ResultSeries, SimError, Simulators};

#[derive(Parser, Debug)]
#[command(name = "thorium-sim")]
#[command(about = "Thorium reactor digital twin and energy policy simulator")]
struct Cli {
    /// Model coefficients (TOML); reference values when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table, global = true)]
    format: Format,

    /// Decimal places shown (results are computed unrounded)
    #[arg(long, default_value_t = 3, global = true)]
    decimals: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Steady-state reactor performance sweep
    Reactor(SetArgs),
    /// Reactor response to a step in power demand
    Transient(SetArgs),
    /// Year-by-year thorium adoption and EV projection
    Policy(SetArgs),
    /// Difference between a scenario and a baseline policy
    Compare {
        /// Values shared by both scenarios
        #[command(flatten)]
        shared: SetArgs,
        /// Baseline-only value, `name=value`
        #[arg(long = "baseline", value_parser = parse_assignment)]
        baseline: Vec<(String, String)>,
        /// Scenario-only value, `name=value`
        #[arg(long = "scenario", value_parser = parse_assignment)]
        scenario: Vec<(String, String)>,
    },
    /// Run a JSON simulation request (`-` reads stdin)
    Request { path: PathBuf },
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Parameter value, `name=value` (repeatable)
    #[arg(long = "set", short = 's', value_parser = parse_assignment)]
    set: Vec<(String, String)>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Table,
    Json,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Simulation(#[from] SimError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{arg}`"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn raw_values<'a>(assignments: impl IntoIterator<Item = &'a (String, String)>) -> RawValues {
    assignments
        .into_iter()
        .map(|(name, value)| (name.clone(), RawValue::Text(value.clone())))
        .collect()
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Simulation(err)) if err.is_user_correctable() => {
            eprintln!("invalid input: {err}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => ModelConfig::load(path)?,
        None => ModelConfig::default(),
    };
    let simulators = Simulators::from_config(&config);

    match &cli.command {
        Command::Reactor(args) => {
            let series = simulators.simulate_reactor(&raw_values(&args.set))?;
            emit_series(cli, &series)
        }
        Command::Transient(args) => {
            let series = simulators.simulate_reactor_transient(&raw_values(&args.set))?;
            emit_series(cli, &series)
        }
        Command::Policy(args) => {
            let series = simulators.simulate_policy(&raw_values(&args.set))?;
            emit_series(cli, &series)
        }
        Command::Compare {
            shared,
            baseline,
            scenario,
        } => {
            let baseline = raw_values(shared.set.iter().chain(baseline));
            let scenario = raw_values(shared.set.iter().chain(scenario));
            let comparison = simulators.compare_policies(&baseline, &scenario)?;
            let delta = comparison.delta()?;
            emit_series(cli, &delta)?;
            if cli.format == Format::Table {
                println!();
                for (metric, value) in comparison.final_deltas() {
                    println!("final {metric}: {}", round_to(value, cli.decimals));
                }
            }
            Ok(())
        }
        Command::Request { path } => {
            let contents = if path.as_os_str() == "-" {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                fs::read_to_string(path)?
            };
            let request: SimulationRequest = serde_json::from_str(&contents)?;
            let response = simulators.handle_request(&request)?;
            emit_response(cli, &response)
        }
    }
}

fn emit_series(cli: &Cli, series: &ResultSeries) -> Result<(), CliError> {
    let series = series.rounded(cli.decimals);
    match cli.format {
        Format::Json => print_json(&series),
        Format::Table => {
            print!("{}", render_table(&series));
            Ok(())
        }
    }
}

fn emit_response(cli: &Cli, response: &SimulationResponse) -> Result<(), CliError> {
    match cli.format {
        Format::Json => {
            let rounded = SimulationResponse {
                series: response.series.rounded(cli.decimals),
                ..response.clone()
            };
            print_json(&rounded)
        }
        Format::Table => {
            let kind = response.parameters.kind();
            println!("{kind} {}", response.mode);
            for spec in kind.schema() {
                if let Some(value) = response.parameters.get(spec.name) {
                    println!("  {} = {} {}", spec.name, value, spec.unit);
                }
            }
            println!();
            emit_series(cli, &response.series)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Plain fixed-width table, one row per label
fn render_table(series: &ResultSeries) -> String {
    let mut header = vec![series.label_name().to_string()];
    header.extend(series.metric_names().map(str::to_string));

    let rows: Vec<Vec<String>> = (0..series.len())
        .map(|i| {
            let mut row = vec![series.labels()[i].to_string()];
            row.extend(series.metrics().iter().map(|metric| metric.values[i].to_string()));
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].len())
                .chain(std::iter::once(header[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:>width$}"))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use thorium_sim_lib::ParameterKind;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("power_setting = 0.5").unwrap(),
            ("power_setting".to_string(), "0.5".to_string())
        );
        assert!(parse_assignment("power_setting").is_err());
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let series = ResultSeries::builder("year", vec![0.0, 10.0])
            .metric("co2_saved_Mt", vec![0.0, 12.5])
            .build()
            .unwrap();
        let table = render_table(&series);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "year  co2_saved_Mt");
        assert_eq!(lines[2], "  10          12.5");
    }

    #[test]
    fn test_cli_parses_repeated_sets() {
        let cli = Cli::parse_from([
            "thorium-sim",
            "policy",
            "--set",
            "adoption_rate=0.05",
            "-s",
            "horizon_years=10",
            "--format",
            "json",
        ]);
        assert_eq!(cli.format, Format::Json);
        match cli.command {
            Command::Policy(args) => {
                let values = raw_values(&args.set);
                assert_eq!(values.get("adoption_rate"), Some(&RawValue::Text("0.05".into())));
                assert_eq!(values.len(), 2);
                assert_eq!(ParameterKind::Policy.spec("horizon_years").map(|s| s.integer), Some(true));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
