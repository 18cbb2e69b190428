//! Intcode CLI: run Intcode programs, pipelines and packet networks.

use clap::{Parser as ClapParser, Subcommand};
use intcode_cli::colors::{bold, gray, magenta, red, status_label, yellow};
use intcode_cli::config::IntcodeConfig;
use intcode_vm::io::AsciiOutput;
use intcode_vm::scheduler::{run_to_halt, FirstPacket, Nat, Network, Pipeline};
use intcode_vm::{Program, Status, Word, VM};
use num_bigint::BigInt;
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "intcode", version, about = "Intcode virtual machine")]
struct Cli {
    /// Use this config file instead of searching for intcode.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program to completion and print its outputs
    Run {
        /// Path to the comma-separated program file
        #[arg()]
        file: PathBuf,

        /// Values queued as input, e.g. `--input 1,2,-3`
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        input: Vec<BigInt>,

        /// Text queued as input, one character code per value
        #[arg(long)]
        ascii: Option<String>,

        /// Print outputs as ASCII text
        #[arg(long, conflicts_with = "json")]
        text: bool,

        /// Print a JSON report instead of one value per line
        #[arg(long)]
        json: bool,

        /// Abort after this many instructions
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Chain one engine per phase setting and pass a signal through them
    Pipeline {
        /// Path to the comma-separated program file
        #[arg()]
        file: PathBuf,

        /// Phase settings, one stage each, e.g. `--phases 4,3,2,1,0`
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        phases: Vec<BigInt>,

        /// Feed the last stage back into the first until a stage halts
        #[arg(long)]
        feedback: bool,

        /// Initial signal for the first stage
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        signal: BigInt,

        /// Abort a stage after this many instructions per turn
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Boot a packet network and print the first result leaving it
    Network {
        /// Path to the comma-separated program file
        #[arg()]
        file: PathBuf,

        /// Number of nodes (default from intcode.toml, else 50)
        #[arg(long)]
        size: Option<usize>,

        /// Re-inject the last outbound packet to node 0 when the network idles
        #[arg(long)]
        nat: bool,

        /// Give up after this many polling rounds
        #[arg(long)]
        max_rounds: Option<u64>,
    },
    /// Create an intcode.toml config file in the current directory
    Init,
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_logging(&config);
    debug!(vm = ?config.vm, network_size = config.network.size, "configuration loaded");

    match cli.command {
        Commands::Run {
            file,
            input,
            ascii,
            text,
            json,
            limit,
        } => cmd_run(&config, &file, input, ascii.as_deref(), output_format(text, json), limit),
        Commands::Pipeline {
            file,
            phases,
            feedback,
            signal,
            limit,
        } => cmd_pipeline(&file, &phases, feedback, signal, limit),
        Commands::Network {
            file,
            size,
            nat,
            max_rounds,
        } => cmd_network(&config, &file, size, nat, max_rounds),
        Commands::Init => cmd_init(),
    }
}

fn fail(message: impl Display) -> ! {
    eprintln!("{} {}", red("error:"), message);
    std::process::exit(1);
}

fn load_config(path: Option<&Path>) -> IntcodeConfig {
    let loaded = match path {
        Some(path) => IntcodeConfig::load_from(path),
        None => IntcodeConfig::load(),
    };
    loaded.unwrap_or_else(|e| fail(e))
}

fn init_logging(config: &IntcodeConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_program(path: &Path) -> Program {
    Program::from_file(path).unwrap_or_else(|e| fail(e))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum OutputFormat {
    Lines,
    Text,
    Json,
}

fn output_format(text: bool, json: bool) -> OutputFormat {
    match (text, json) {
        (_, true) => OutputFormat::Json,
        (true, false) => OutputFormat::Text,
        (false, false) => OutputFormat::Lines,
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    status: &'a Status,
    /// Decimal strings; outputs may exceed any JSON number type.
    outputs: Vec<String>,
    instructions: u64,
    image: &'a str,
}

fn cmd_run(
    config: &IntcodeConfig,
    file: &Path,
    input: Vec<BigInt>,
    ascii: Option<&str>,
    format: OutputFormat,
    limit: Option<u64>,
) {
    let program = read_program(file);
    let mut vm_config = config.vm.clone();
    if limit.is_some() {
        vm_config.instruction_limit = limit;
    }

    eprintln!("{} {}", status_label("Running"), file.display());
    let mut vm = VM::from_program(&program, vm_config);
    vm.io_mut().extend_input(input);
    if let Some(text) = ascii {
        vm.push_ascii(text);
    }
    let outputs = run_to_halt(&mut vm).unwrap_or_else(|e| fail(e));

    match format {
        OutputFormat::Lines => {
            for value in &outputs {
                println!("{}", value);
            }
        }
        OutputFormat::Text => {
            let ascii = AsciiOutput::from_words(&outputs);
            print!("{}", ascii.text);
            for value in &ascii.values {
                println!("{}", bold(&value.to_string()));
            }
        }
        OutputFormat::Json => {
            let report = RunReport {
                status: vm.status(),
                outputs: outputs.iter().map(Word::to_string).collect(),
                instructions: vm.instructions_executed(),
                image: program.fingerprint(),
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => fail(e),
            }
        }
    }
    eprintln!(
        "{} {} instructions",
        gray("executed"),
        vm.instructions_executed()
    );
}

// ---------------------------------------------------------------------------
// pipeline
// ---------------------------------------------------------------------------

fn cmd_pipeline(file: &Path, phases: &[BigInt], feedback: bool, signal: BigInt, limit: Option<u64>) {
    let program = read_program(file);
    let mut pipeline = Pipeline::new(&program, phases).with_feedback(feedback);
    if let Some(limit) = limit {
        pipeline.set_instruction_limit(limit);
    }

    let mode = if feedback { "feedback" } else { "open" };
    eprintln!(
        "{} {} stages ({})",
        status_label("Pipeline"),
        pipeline.len(),
        mode
    );
    let result = pipeline.run(signal).unwrap_or_else(|e| fail(e));
    println!("{}", result);
}

// ---------------------------------------------------------------------------
// network
// ---------------------------------------------------------------------------

fn cmd_network(
    config: &IntcodeConfig,
    file: &Path,
    size: Option<usize>,
    nat: bool,
    max_rounds: Option<u64>,
) {
    let program = read_program(file);
    let size = size.unwrap_or(config.network.size);
    let max_rounds = max_rounds.or(config.network.max_rounds);
    let mut network = Network::new(&program, size);

    eprintln!("{} {} nodes", status_label("Booting"), size);
    let result = if nat {
        let mut monitor = Nat::default();
        let result = network
            .run_for(&mut monitor, max_rounds)
            .unwrap_or_else(|e| fail(e));
        eprintln!("{} {} injections", gray("nat:"), monitor.injections);
        result
    } else {
        let mut monitor = FirstPacket::default();
        let result = network
            .run_for(&mut monitor, max_rounds)
            .unwrap_or_else(|e| fail(e));
        if let Some(packet) = &monitor.packet {
            eprintln!(
                "{} {} {} {}",
                gray("packet:"),
                magenta(&format!("dest={}", packet.dest)),
                magenta(&format!("x={}", packet.x)),
                magenta(&format!("y={}", packet.y))
            );
        }
        result
    };
    eprintln!("{} {} rounds", gray("network:"), network.round());

    match result {
        Some(y) => println!("{}", y),
        None => {
            eprintln!(
                "{} network stopped without producing a result",
                yellow("warning:")
            );
            std::process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn cmd_init() {
    let path = PathBuf::from("intcode.toml");
    if path.exists() {
        fail("intcode.toml already exists, not overwriting");
    }
    std::fs::write(&path, IntcodeConfig::default_template())
        .unwrap_or_else(|e| fail(format!("writing intcode.toml: {}", e)));
    println!("{} intcode.toml", status_label("Created"));
}
