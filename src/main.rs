//! Low-power-idle energy analysis CLI.
//!
//! Compares simulated link off-times and energy ratios against the
//! Poisson/incomplete-gamma model, per device and port.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};
use env_logger::Env;
use log::info;

use lpi_energy::analysis::{print_summary, read_results};
use lpi_energy::config::{Config, ConfigOverrides};
use lpi_energy::config_loader::resolve_config;
use lpi_energy::model::{
    energy_ratio, ExternalSolver, SeriesEstimator, SeriesSum, SumEstimator, SumSource,
    TrafficParameters,
};
use lpi_energy::orchestrator::{run_analysis, write_reports};

#[derive(Parser, Debug)]
#[command(name = "lpi-energy")]
#[command(about = "Energy analysis for low-power-idle network links")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the analysis configuration YAML file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse measurement files, estimate every record, and write the reports
    Analyze {
        /// Measurement file prefix, files are `<prefix><index>.txt`
        #[arg(long)]
        input_base: Option<PathBuf>,

        /// Text report path
        #[arg(long)]
        results: Option<PathBuf>,

        /// Also write a JSON report to this path
        #[arg(long)]
        json: Option<PathBuf>,

        /// Source of the interval sum used by the theoretical energy ratio
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
    },

    /// Evaluate the model for a single operating point
    Estimate {
        /// Packet arrival rate λ (packets/s)
        #[arg(long)]
        rate: f64,

        /// Mean packet size Ex (bytes)
        #[arg(long)]
        packet_size: f64,

        /// Link speed (bits/s), selects the capacity and off-time limit
        #[arg(long)]
        link_speed: f64,

        /// Utilization ρ; derived from rate, size and speed when omitted
        #[arg(long)]
        utilization: Option<f64>,
    },

    /// Print a previously written text report
    Summarize {
        /// Text report to read
        results: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Series,
    External,
}

impl From<SourceArg> for SumSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Series => SumSource::Series,
            SourceArg::External => SumSource::External,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .wrap_err("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Analyze {
            input_base,
            results,
            json,
            source,
        } => {
            let overrides = ConfigOverrides {
                input_base,
                results,
                json,
                source: source.map(SumSource::from),
            };
            let config = resolve_config(cli.config.as_deref(), &overrides)?;

            info!("Starting analysis of {}*.txt", config.input.base_path);
            let report = run_analysis(&config)?;
            write_reports(&report, &config)?;
            print_summary(&report);
        }
        Commands::Estimate {
            rate,
            packet_size,
            link_speed,
            utilization,
        } => {
            let config = resolve_config(cli.config.as_deref(), &ConfigOverrides::default())?;
            run_estimate(&config, rate, packet_size, link_speed, utilization)?;
        }
        Commands::Summarize { results } => {
            let lines = read_results(&results)?;
            println!("\n=== RESULTS: {} ===\n", results.display());
            println!(
                "{:>6} {:>5}  {:^24} {:^24} {:^24} {:^24}",
                "device",
                "port",
                "sim off-time",
                "theoretical off-time",
                "sim energy",
                "theoretical energy"
            );
            for line in &lines {
                let cells: Vec<String> = line
                    .stats
                    .iter()
                    .map(|stat| match stat {
                        Some((mean, margin)) => format!("{:>11.4e} ± {:<10.3e}", mean, margin),
                        None => format!("{:>11} {:<12}", "-", ""),
                    })
                    .collect();
                println!("{:>6} {:>5}  {}", line.node_id, line.port_id, cells.join(" "));
            }
            println!("\n{} ports\n", lines.len());
        }
    }

    Ok(())
}

fn run_estimate(
    config: &Config,
    rate: f64,
    packet_size: f64,
    link_speed: f64,
    utilization: Option<f64>,
) -> Result<()> {
    let link = config
        .link_for(link_speed)
        .ok_or_else(|| eyre!("No link profile configured for {} bps", link_speed))?;

    let params = TrafficParameters::new(rate, packet_size, link.capacity, link.off_time_limit)?;
    let ro = utilization.unwrap_or_else(|| rate / (link_speed / 8.0 / packet_size));

    let series = SeriesEstimator::new(config.series);
    let result = series.estimate(&params)?;

    println!("\n=== OPERATING POINT ===\n");
    println!(
        "λ = {} pkt/s, Ex = {} B, C = {}, Tto = {} s",
        rate, packet_size, link.capacity, link.off_time_limit
    );
    println!("ρ = {}", ro);
    println!();
    println!("Expected off-time:      {:e} s", result.expected_off_time);
    println!("Exceedance probability: {}", result.exceedance_probability);
    println!("rez1 (capped wake):     {:e}", result.rez1);
    println!("rez2 (gamma excess):    {:e}", result.rez2);

    let mut sources: Vec<Box<dyn SumEstimator>> = vec![Box::new(SeriesSum::new(series))];
    if config.solver.source == SumSource::External {
        sources.push(Box::new(ExternalSolver::new(config.solver.clone())));
    }

    println!();
    for source in &sources {
        let rez = source
            .interval_sum(&params)
            .wrap_err_with(|| format!("Interval sum from '{}' failed", source.name()))?;
        let ratio = energy_ratio(rez, ro, &config.energy)?;
        println!("Energy ratio ({:>8}): {} (rez = {:e})", source.name(), ratio, rez);
    }
    println!();

    Ok(())
}
