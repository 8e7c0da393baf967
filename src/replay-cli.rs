//! A simple CLI tool for replaying a script of registry calls.
//! Each call in the script is applied in order to the configured registry,
//! exactly as if it had arrived from an external caller.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};

use election_registry::{logging, Config, Operation, Outcome, SharedRegistry};

const PROGRAM_NAME: &str = "election-replay";

const ABOUT_TEXT: &str = "Replay a script of calls against an election registry.

EXIT CODES:
     0: Every call succeeded.
   255: Ran to completion, but the registry rejected at least one call.
 Other: Error.";

const SCRIPT_PATH: &str = "SCRIPT_PATH";

const SCRIPT_PATH_HELP: &str = "The path to a JSON array of operations, each tagged\n\
with `op`: register_voter, register_candidate, vote, remove_candidate, or winner";

const CONFIG: &str = "config";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(SCRIPT_PATH)
                .help(SCRIPT_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(CONFIG)
                .long(CONFIG)
                .help("Configuration file to use instead of Election.toml")
                .action(ArgAction::Set),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the script.
    Format(String),
    /// Failed to load the configuration or open the registry.
    Setup(String),
}

/// One replayed call and what became of it.
#[derive(Debug, Eq, PartialEq)]
struct Step {
    pub index: usize,
    pub operation: String,
    /// The outcome, or the reason the registry rejected the call.
    pub result: Result<Outcome, String>,
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(outcome) => write!(f, "#{} {}: {}", self.index, self.operation, outcome),
            Err(reason) => write!(f, "#{} {}: rejected: {}", self.index, self.operation, reason),
        }
    }
}

/// Load a script of operations.
fn load_script(path: &str) -> Result<Vec<Operation>, Error> {
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))
}

/// Apply every operation in order. Rejections are recorded; any other
/// failure stops the replay.
fn replay(registry: &SharedRegistry, operations: Vec<Operation>) -> Result<Vec<Step>, Error> {
    let mut steps = Vec::with_capacity(operations.len());
    for (index, operation) in operations.into_iter().enumerate() {
        let description = operation.to_string();
        let result = match registry.apply(operation) {
            Ok(outcome) => Ok(outcome),
            Err(err) => match err.rejection() {
                Some(reason) => Err(reason.to_string()),
                None => return Err(Error::IO(err.to_string())),
            },
        };
        steps.push(Step {
            index,
            operation: description,
            result,
        });
    }
    Ok(steps)
}

/// Load the configuration, start logging, and open the registry.
fn setup(args: &ArgMatches) -> Result<SharedRegistry, Error> {
    let config = match args.get_one::<String>(CONFIG) {
        Some(file) => Config::load_file(file),
        None => Config::load(),
    }
    .map_err(|e| Error::Setup(e.to_string()))?;

    // Logging is optional for a one-shot tool.
    if config.log_config().exists() {
        if let Err(e) = logging::init(config.log_config()) {
            eprintln!("Continuing without logging: {e}");
        }
    }

    SharedRegistry::open(&config).map_err(|e| Error::Setup(e.to_string()))
}

/// Run the replay, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(SCRIPT_PATH).unwrap(); // Required argument is guaranteed to be present.
    let outcome = setup(args).and_then(|registry| {
        let steps = replay(&registry, load_script(path)?)?;
        Ok((registry, steps))
    });
    match outcome {
        Ok((registry, steps)) => {
            for step in &steps {
                println!("{}", step);
            }
            println!("Standings:");
            registry.read(|r| {
                for candidate in r.standings() {
                    println!(
                        "  {}: {} ({}) - {} vote{}",
                        candidate.id,
                        candidate.name,
                        candidate.address,
                        candidate.vote_count,
                        if candidate.vote_count != 1 { "s" } else { "" }
                    );
                }
            });
            if steps.iter().all(|s| s.result.is_ok()) {
                0
            } else {
                255
            }
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {}", msg);
            1
        }
        Err(Error::Setup(msg)) => {
            println!("Setup failed: {}", msg);
            1
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
