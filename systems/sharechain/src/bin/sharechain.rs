use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use sharechain::{RunReport, RunStats, SimulationConfig, simulate};
use sharesim::{Distributions, Jiffies, SimulationBuilder};

#[derive(Parser)]
#[command(name = "sharechain", about = "Share-chain propagation simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one topology and write its log file
    Run {
        #[arg(short = 'n', long = "num_nodes")]
        num_nodes: usize,

        #[arg(short = 'd', long = "num_neighbours")]
        num_neighbours: usize,

        #[command(flatten)]
        sim: SimArgs,
    },
    /// Run every (nodes, neighbours) combination in parallel
    Sweep {
        #[arg(long, value_delimiter = ',', required = true)]
        nodes: Vec<usize>,

        #[arg(long, value_delimiter = ',', required = true)]
        neighbours: Vec<usize>,

        #[command(flatten)]
        sim: SimArgs,
    },
}

#[derive(Args, Clone)]
struct SimArgs {
    /// Simulated duration in jiffies
    #[arg(long, env = "SHARECHAIN_RUN_TIME", default_value_t = 1_000)]
    run_time: usize,

    #[arg(long, env = "SHARECHAIN_RANDOM_SEED", default_value_t = 42)]
    seed: u64,

    /// Write one Graphviz file per node
    #[arg(long, env = "SHARECHAIN_SAVE_DOT")]
    save_dot: bool,

    /// Mean time between shares of a node with hash rate 1
    #[arg(long, env = "SHARECHAIN_SHARE_INTERVAL", default_value_t = 10)]
    share_interval: usize,

    #[arg(long, env = "SHARECHAIN_MIN_DELAY", default_value_t = 1)]
    min_delay: usize,

    #[arg(long, env = "SHARECHAIN_MAX_DELAY", default_value_t = 5)]
    max_delay: usize,

    #[arg(long, env = "SHARECHAIN_REWARD_INTERVAL", default_value_t = 10)]
    reward_interval: usize,

    /// Give up on shares whose parent has not arrived after this long
    #[arg(long, env = "SHARECHAIN_ORPHAN_TIMEOUT")]
    orphan_timeout: Option<usize>,

    /// Relative hash rates of nodes 1, 2, ...
    #[arg(long, env = "SHARECHAIN_HASH_RATES", value_delimiter = ',')]
    hash_rates: Vec<f64>,

    #[arg(long, env = "SHARECHAIN_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, env = "SHARECHAIN_DOT_DIR", default_value = "/tmp")]
    dot_dir: PathBuf,
}

impl SimArgs {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            run_time: Jiffies(self.run_time),
            random_seed: self.seed,
            save_dot: self.save_dot,
            share_interval: Distributions::Exponential(Jiffies(self.share_interval)),
            propagation_delay: Distributions::Uniform(Jiffies(self.min_delay), Jiffies(self.max_delay)),
            reward_interval: self.reward_interval,
            orphan_timeout: self.orphan_timeout.map(Jiffies),
            hash_rates: self.hash_rates.clone(),
        }
    }

    fn log_path(&self, num_nodes: usize, num_neighbours: usize) -> PathBuf {
        self.log_dir
            .join(format!("{num_nodes}_{num_neighbours}_{}.log", self.run_time))
    }
}

fn write_dot_files(report: &RunReport, dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    for (id, dag) in &report.dags {
        let path = dir.join(format!("node_{id}.dot"));
        fs::write(&path, dag.to_dot(&format!("node_{id}")))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn run_one(num_nodes: usize, num_neighbours: usize, sim: &SimArgs) -> anyhow::Result<()> {
    fs::create_dir_all(&sim.log_dir)?;
    let log_path = sim.log_path(num_nodes, num_neighbours);
    let log = File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?;

    let config = sim.config();
    let builder = SimulationBuilder::default()
        .random_regular(num_nodes, num_neighbours)
        .log_file(log);
    let report = simulate(builder, &config)?;

    if config.save_dot {
        write_dot_files(&report, &sim.dot_dir)?;
    }
    println!("num_neighbours,{}", RunStats::csv_header());
    println!("{},{}", num_neighbours, report.stats.csv_row());
    Ok(())
}

fn sweep(nodes: &[usize], neighbours: &[usize], sim: &SimArgs) -> anyhow::Result<()> {
    fs::create_dir_all(&sim.log_dir)?;
    let config = sim.config();
    let combinations: Vec<(usize, usize)> = nodes
        .iter()
        .flat_map(|n| neighbours.iter().map(move |d| (*n, *d)))
        .collect();

    // Simulations are single-threaded and thread-local, one per rayon worker at a time
    let rows: Vec<anyhow::Result<String>> = combinations
        .par_iter()
        .map(|(n, d)| {
            let report = sharechain::run(*n, *d, &config)
                .with_context(|| format!("{n} nodes, {d} neighbours"))?;
            let mut log = File::create(sim.log_path(*n, *d))?;
            for line in report.stats.summary_lines() {
                writeln!(log, "{line}")?;
            }
            if config.save_dot {
                write_dot_files(&report, &sim.dot_dir.join(format!("{n}_{d}")))?;
            }
            Ok(format!("{},{}", d, report.stats.csv_row()))
        })
        .collect();

    println!("num_neighbours,{}", RunStats::csv_header());
    for row in rows {
        println!("{}", row?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Command::Run {
            num_nodes,
            num_neighbours,
            sim,
        } => run_one(num_nodes, num_neighbours, &sim),
        Command::Sweep {
            nodes,
            neighbours,
            sim,
        } => sweep(&nodes, &neighbours, &sim),
    }
}
