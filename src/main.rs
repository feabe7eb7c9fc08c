/*
 * Copyright 2019 Zejun Li
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use kaosu_treepack::common::{Objective, OptimizationMode, Seed};
use kaosu_treepack::format::Parameters;
use kaosu_treepack::timer::Timer;
use kaosu_treepack::{cuboid, onedimensional, rectangle};

#[derive(Parser)]
#[command(name = "kaosu-treepack", about = "Anytime tree search packing solver", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One-dimensional bin packing.
    Onedimensional(CommonArgs),
    /// Rectangle packing without guillotine cuts.
    Rectangle(CommonArgs),
    /// Three-dimensional box packing.
    Cuboid(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Items file (CSV).
    #[arg(short, long)]
    items: PathBuf,

    /// Bins file (CSV).
    #[arg(short, long)]
    bins: PathBuf,

    /// Defects file (CSV, rectangle only).
    #[arg(long)]
    defects: Option<PathBuf>,

    /// Parameters file (CSV).
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Objective override.
    #[arg(short = 'f', long)]
    objective: Option<Objective>,

    /// JSON output path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Certificate path.
    #[arg(short, long)]
    certificate: Option<PathBuf>,

    /// Time limit in seconds.
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Verbosity level.
    #[arg(short, long, default_value_t = 1)]
    verbosity_level: u32,

    /// Seed (not used).
    #[arg(short, long, default_value_t = 0)]
    seed: Seed,

    #[arg(long)]
    bin_infinite_x: bool,

    #[arg(long)]
    bin_infinite_y: bool,

    #[arg(long)]
    bin_infinite_copies: bool,

    #[arg(long)]
    bin_unweighted: bool,

    #[arg(long)]
    item_infinite_copies: bool,

    #[arg(long)]
    item_profits_auto: bool,

    #[arg(long)]
    unweighted: bool,

    #[arg(long)]
    no_item_rotation: bool,

    /// Only write output and certificate files at the end.
    #[arg(short = 'e', long)]
    only_write_at_the_end: bool,

    #[arg(long, default_value = "anytime")]
    optimization_mode: OptimizationMode,

    /// Cap on the tree search queue size.
    #[arg(long)]
    queue_size: Option<usize>,
}

impl CommonArgs {
    fn solver_parameters<S>(&self) -> Parameters<S> {
        let mut timer = Timer::new();
        if let Some(time_limit) = self.time_limit {
            timer = timer.with_time_limit(time_limit);
        }
        let end = timer.end_flag();
        let _ = ctrlc::set_handler(move || {
            end.store(true, std::sync::atomic::Ordering::Relaxed);
        });
        tracing::debug!(seed = self.seed, "seed accepted, not used");
        Parameters {
            timer,
            verbosity_level: self.verbosity_level,
            maximum_size_of_the_solution_pool: 1,
            optimization_mode: self.optimization_mode,
            new_solution_callback: None,
        }
    }

    fn init_tracing(&self) {
        let level = match self.verbosity_level {
            0 => tracing::Level::ERROR,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        };
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .try_init();
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Bad arguments exit with 1, matching the solver's contract.
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    let result = match cli.command {
        Command::Onedimensional(args) => run_onedimensional(args),
        Command::Rectangle(args) => run_rectangle(args),
        Command::Cuboid(args) => run_cuboid(args),
    };
    if let Err(err) = result {
        eprintln!("kaosu-treepack: {}", err);
        process::exit(1);
    }
}

fn write_json(path: &PathBuf, json: &serde_json::Value) -> kaosu_treepack::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, json)
        .map_err(|err| kaosu_treepack::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
    Ok(())
}

fn run_onedimensional(args: CommonArgs) -> kaosu_treepack::Result<()> {
    args.init_tracing();

    let mut builder = onedimensional::InstanceBuilder::new();
    builder.read_item_types(&args.items)?;
    builder.read_bin_types(&args.bins)?;
    if args.bin_infinite_copies {
        builder.set_bin_types_infinite_copies();
    }
    if args.item_infinite_copies {
        builder.set_item_types_infinite_copies();
    }
    if args.unweighted {
        builder.set_item_types_unweighted();
    }
    if args.bin_unweighted {
        builder.set_bin_types_unweighted();
    }
    if let Some(parameters_path) = &args.parameters {
        builder.read_parameters(parameters_path)?;
    }
    if let Some(objective) = args.objective {
        builder.set_objective(objective);
    }
    let instance = Arc::new(builder.build()?);

    let mut parameters = onedimensional::OptimizeParameters {
        parameters: args.solver_parameters(),
        guides: Vec::new(),
        maximum_size_of_the_queue: args.queue_size,
    };
    if !args.only_write_at_the_end {
        let certificate = args.certificate.clone();
        parameters.parameters.new_solution_callback = Some(Box::new(move |solution, _| {
            if let Some(path) = &certificate {
                let _ = solution.write(path);
            }
        }));
    }

    let output = onedimensional::optimize(&instance, parameters)?;
    if let Some(path) = &args.certificate {
        output.solution_pool.best().write(path)?;
    }
    if let Some(path) = &args.output {
        write_json(path, &output.json)?;
    }
    Ok(())
}

fn run_rectangle(args: CommonArgs) -> kaosu_treepack::Result<()> {
    args.init_tracing();

    let mut builder = rectangle::InstanceBuilder::new();
    builder.read_item_types(&args.items)?;
    builder.read_bin_types(&args.bins)?;
    if let Some(defects_path) = &args.defects {
        builder.read_defects(defects_path)?;
    }
    if args.bin_infinite_x {
        builder.set_bin_types_infinite_x();
    }
    if args.bin_infinite_y {
        builder.set_bin_types_infinite_y();
    }
    if args.bin_infinite_copies {
        builder.set_bin_types_infinite_copies();
    }
    if args.item_infinite_copies {
        builder.set_item_types_infinite_copies();
    }
    if args.no_item_rotation {
        builder.set_item_types_oriented();
    }
    if args.unweighted {
        builder.set_item_types_unweighted();
    }
    if args.bin_unweighted {
        builder.set_bin_types_unweighted();
    }
    if args.item_profits_auto {
        builder.set_item_types_profits_auto();
    }
    if let Some(parameters_path) = &args.parameters {
        builder.read_parameters(parameters_path)?;
    }
    if let Some(objective) = args.objective {
        builder.set_objective(objective);
    }
    let instance = Arc::new(builder.build()?);

    let mut parameters = rectangle::OptimizeParameters {
        parameters: args.solver_parameters(),
        guides: Vec::new(),
        maximum_size_of_the_queue: args.queue_size,
    };
    if !args.only_write_at_the_end {
        let certificate = args.certificate.clone();
        parameters.parameters.new_solution_callback = Some(Box::new(move |solution, _| {
            if let Some(path) = &certificate {
                let _ = solution.write(path);
            }
        }));
    }

    let output = rectangle::optimize(&instance, parameters)?;
    if let Some(path) = &args.certificate {
        output.solution_pool.best().write(path)?;
    }
    if let Some(path) = &args.output {
        write_json(path, &output.json)?;
    }
    Ok(())
}

fn run_cuboid(args: CommonArgs) -> kaosu_treepack::Result<()> {
    args.init_tracing();

    let mut builder = cuboid::InstanceBuilder::new();
    builder.read_item_types(&args.items)?;
    builder.read_bin_types(&args.bins)?;
    if args.bin_infinite_x {
        builder.set_bin_types_infinite_x();
    }
    if args.bin_infinite_y {
        builder.set_bin_types_infinite_y();
    }
    if args.bin_infinite_copies {
        builder.set_bin_types_infinite_copies();
    }
    if args.item_infinite_copies {
        builder.set_item_types_infinite_copies();
    }
    if args.no_item_rotation {
        builder.set_item_types_oriented();
    }
    if args.unweighted {
        builder.set_item_types_unweighted();
    }
    if args.bin_unweighted {
        builder.set_bin_types_unweighted();
    }
    if args.item_profits_auto {
        builder.set_item_types_profits_auto();
    }
    if let Some(parameters_path) = &args.parameters {
        builder.read_parameters(parameters_path)?;
    }
    if let Some(objective) = args.objective {
        builder.set_objective(objective);
    }
    let instance = Arc::new(builder.build()?);

    let mut parameters = cuboid::OptimizeParameters {
        parameters: args.solver_parameters(),
        guides: Vec::new(),
        maximum_size_of_the_queue: args.queue_size,
    };
    if !args.only_write_at_the_end {
        let certificate = args.certificate.clone();
        parameters.parameters.new_solution_callback = Some(Box::new(move |solution, _| {
            if let Some(path) = &certificate {
                let _ = solution.write(path);
            }
        }));
    }

    let output = cuboid::optimize(&instance, parameters)?;
    if let Some(path) = &args.certificate {
        output.solution_pool.best().write(path)?;
    }
    if let Some(path) = &args.output {
        write_json(path, &output.json)?;
    }
    Ok(())
}
