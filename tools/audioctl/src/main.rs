// Copyright 2024, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! audioctl - drives the audio resource manager over a loopback chip
//!
//! - `audioctl check` - Validates a configuration file against the chip
//! - `audioctl run <requests>...` - Runs requests one after the other, and
//!   prints the operations and resource owners after each of them

use bluetooth_offload_audio as vac;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use vac::{
    init_logging, ChipLayer, ChipTable, Completion, DigitalConfig, Event, Operation,
    OperationCallbacks, Resource, VacConfig,
};

mod loopback;

use loopback::LoopbackChip;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "audioctl")]
#[command(about = "Drives the audio resource manager over a loopback chip")]
#[command(version)]
struct Cli {
    /// Configuration file, the built-in configuration is used when not given
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration against the chip capabilities
    Check,

    /// Run requests: start:OP, stop:OP, route:OP=RES[+RES], reconfigure:OP=RATE
    Run {
        /// Resources whose chip steps complete asynchronously
        #[arg(long, value_delimiter = ',')]
        slow: Vec<Resource>,

        /// Latency of asynchronous chip steps, in milliseconds
        #[arg(long, default_value = "50")]
        latency: u64,

        requests: Vec<Request>,
    },
}

#[derive(Debug, Clone)]
enum Request {
    Start(Operation),
    Stop(Operation),
    Route(Operation, Vec<Resource>),
    Reconfigure(Operation, u32),
}

impl FromStr for Request {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((verb, args)) = s.split_once(':') else {
            bail!("expected VERB:ARGS, got \"{}\"", s);
        };

        Ok(match verb {
            "start" => Request::Start(args.parse()?),
            "stop" => Request::Stop(args.parse()?),
            "route" => {
                let (operation, resources) =
                    args.split_once('=').context("expected route:OP=RES[+RES]")?;
                let resources = resources
                    .split('+')
                    .filter(|s| !s.is_empty())
                    .map(Resource::from_str)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Request::Route(operation.parse()?, resources)
            }
            "reconfigure" => {
                let (operation, rate) =
                    args.split_once('=').context("expected reconfigure:OP=RATE")?;
                Request::Reconfigure(operation.parse()?, rate.parse()?)
            }
            _ => bail!("unknown request \"{}\"", verb),
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Start(op) => write!(f, "start {}", op),
            Request::Stop(op) => write!(f, "stop {}", op),
            Request::Route(op, resources) => write!(f, "route {} to {:?}", op, resources),
            Request::Reconfigure(op, rate) => write!(f, "reconfigure {} at {} Hz", op, rate),
        }
    }
}

/// Digital parameters used when starting `operation`
fn digital_config(operation: Operation) -> DigitalConfig {
    let (sample_rate, channels, fm_frequency_khz) = match operation {
        Operation::BtVoice => (8000, 1, None),
        Operation::Wbs | Operation::Awbs => (16000, 1, None),
        Operation::A3dp => (44100, 2, None),
        _ => (48000, 2, Some(98100)),
    };
    DigitalConfig { sample_rate, channels, fm_frequency_khz }
}

fn load_config(path: Option<&PathBuf>) -> Result<VacConfig> {
    match path {
        Some(path) => VacConfig::load(path).context("Loading configuration"),
        None => Ok(VacConfig::builtin()),
    }
}

fn run(table: &ChipTable, requests: Vec<Request>) -> Result<()> {
    let engine = table.chip(0)?;

    let (tx, rx) = mpsc::channel();
    for operation in Operation::all().filter(|&op| engine.is_supported(op)) {
        let tx = Mutex::new(tx.clone());
        let callback = move |operation: Operation, event: Event, result: vac::Result<()>| {
            let _ = tx.lock().unwrap().send((operation, event, result));
        };
        let callback: Arc<dyn OperationCallbacks> = Arc::new(callback);
        engine.register_callback(operation, callback)?;
    }

    for request in requests {
        let result = match &request {
            Request::Start(op) => engine.start_operation(*op, digital_config(*op)),
            Request::Stop(op) => engine.stop_operation(*op),
            Request::Route(op, resources) => {
                engine.change_resource(*op, resources, digital_config(*op))
            }
            Request::Reconfigure(op, rate) => {
                let config = DigitalConfig { sample_rate: *rate, ..digital_config(*op) };
                engine.change_configuration(*op, config)
            }
        };

        match result {
            Ok(Completion::Done) => println!("{}: done", request),
            Ok(Completion::Pending) => {
                println!("{}: pending", request);
                let (operation, event, result) = rx
                    .recv_timeout(COMPLETION_TIMEOUT)
                    .with_context(|| format!("No completion of {}", request))?;
                match result {
                    Ok(()) => println!("{}: {:?}", operation, event),
                    Err(e) => println!("{}: {:?} failed, {}", operation, event, e),
                }
            }
            Err(e) => println!("{}: {}", request, e),
        }
        print!("{}", engine.snapshot());
    }

    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Check => {
            let chip: Arc<dyn ChipLayer> = Arc::new(LoopbackChip::new([], Duration::ZERO));
            let table = ChipTable::new(vec![chip]);
            table.configure(0, &config)?;
            print!("{}", table.chip(0)?.snapshot());
        }
        Commands::Run { slow, latency, requests } => {
            let chip: Arc<dyn ChipLayer> =
                Arc::new(LoopbackChip::new(slow, Duration::from_millis(latency)));
            let table = ChipTable::new(vec![chip]);
            table.configure(0, &config)?;
            run(&table, requests)?;
        }
    }

    Ok(())
}
