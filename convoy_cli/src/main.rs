use std::{
    fs::File,
    io::{self, BufReader, Write},
    path::PathBuf,
};

use clap::Parser;
use tracing::info;

use convoy_scheduler::{
    io::{input, report},
    problem::{instance::Instance, vehicle::DrivingRules},
    schedule::construct::{ConstructionParams, construct},
};

mod parsers;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Instance document to schedule; read from stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Seed for the vehicle-slot shuffle of large instances
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    #[arg(short, long)]
    debug: bool,

    /// Continuous driving allowed without a break (e.g. "4h30m")
    #[arg(long, value_parser = parsers::parse_duration, default_value = "4h30m")]
    continuous_drive: jiff::SignedDuration,

    /// Daily driving ceiling per vehicle shift
    #[arg(long, value_parser = parsers::parse_duration, default_value = "9h")]
    daily_drive: jiff::SignedDuration,

    /// Total route duration ceiling per vehicle shift
    #[arg(long, value_parser = parsers::parse_duration, default_value = "13h")]
    max_duration: jiff::SignedDuration,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    let rules = DrivingRules::new(cli.continuous_drive, cli.daily_drive, cli.max_duration);
    let instance = read_instance(cli.input.as_deref(), rules)?;
    info!(
        "loaded instance {}: {} sites, {} vehicles, {} orders",
        instance.name(),
        instance.sites().len(),
        instance.vehicles().len(),
        instance.customers().len(),
    );

    let solution = construct(&instance, &ConstructionParams { seed: cli.seed });

    let rendered = report::render_report(&instance, &solution);
    io::stdout().write_all(rendered.as_bytes())?;

    info!(
        "finished: routes = {}, unassigned = {}, cost = {:.2}h",
        solution.non_empty_routes().count(),
        solution.unassigned().len(),
        solution.cost(),
    );

    Ok(())
}

fn read_instance(
    path: Option<&std::path::Path>,
    rules: DrivingRules,
) -> Result<Instance, anyhow::Error> {
    let instance = match path {
        Some(path) => input::read_instance(BufReader::new(File::open(path)?), rules)?,
        None => input::read_instance(io::stdin().lock(), rules)?,
    };

    Ok(instance)
}
