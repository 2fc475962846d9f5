//! A simple CLI tool for inspecting serialized vote schemas and results.
//! Dumps are loaded through the same lenient loader the library uses, so the
//! report shows exactly what a service would see after loading them.

use std::fs;
use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use serde_json::Value;

use vote_graph::{
    config::Config,
    logging,
    model::{
        data::{AnswerResultData, SchemaData, VoteResultData},
        Changes, ResultKey, SchemaKey, VoteGraph,
    },
};

const PROGRAM_NAME: &str = "vote-inspect";

const ABOUT_TEXT: &str = "Inspect a serialized vote schema and, optionally, a vote result.

Prints a JSON report of what was loaded.

EXIT CODES:
     0: Inspection succeeded.
 Other: Error.";

const SCHEMA_PATH: &str = "SCHEMA_PATH";
const RESULT_PATH: &str = "RESULT_PATH";
const CONFIG_PATH: &str = "CONFIG_PATH";

const SCHEMA_PATH_HELP: &str = "The path to a JSON dump of a vote schema";
const RESULT_PATH_HELP: &str = "The path to a JSON dump of a vote result for that schema";
const CONFIG_PATH_HELP: &str = "Config file to use instead of VoteInspect.toml";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(SCHEMA_PATH)
                .help(SCHEMA_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(RESULT_PATH)
                .help(RESULT_PATH_HELP)
                .long("result")
                .short('r')
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(CONFIG_PATH)
                .help(CONFIG_PATH_HELP)
                .long("config")
                .short('c')
                .action(ArgAction::Set),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode a JSON dump.
    Format(String),
    /// Failed to load the config or set up logging.
    Setup(String),
}

/// Pending work a persistence layer would see.
#[derive(Debug, Default, Eq, PartialEq, Serialize)]
struct Pending {
    inserted: usize,
    moved: usize,
    deleted: usize,
}

impl<K> From<&Changes<K>> for Pending {
    fn from(changes: &Changes<K>) -> Self {
        Self {
            inserted: changes.new.len(),
            moved: changes.moved.len(),
            deleted: changes.removed.len(),
        }
    }
}

impl Pending {
    fn add(&mut self, other: Pending) {
        self.inserted += other.inserted;
        self.moved += other.moved;
        self.deleted += other.deleted;
    }
}

#[derive(Debug, PartialEq, Serialize)]
struct ResultReport {
    answers: Vec<AnswerResultData>,
    /// Answer entries that were kept.
    loaded: usize,
    /// Answer entries the loader could not resolve or decode.
    dropped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending: Option<Pending>,
}

#[derive(Debug, PartialEq, Serialize)]
struct Report {
    vote: SchemaData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending: Option<Pending>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ResultReport>,
}

/// Read and parse a JSON file.
fn read_json(path: &str) -> Result<Value, Error> {
    let text = fs::read_to_string(path).map_err(|e| Error::IO(format!("{path}: {e}")))?;
    serde_json::from_str(&text).map_err(|e| Error::Format(format!("{path}: {e}")))
}

fn vote_pending(graph: &VoteGraph, schema: SchemaKey) -> Pending {
    let changes = graph.vote_changes(schema);
    let mut pending = Pending::from(&changes.questions);
    for (_, variants) in &changes.answer_variants {
        pending.add(Pending::from(variants));
    }
    pending
}

fn load_result(
    graph: &mut VoteGraph,
    schema: SchemaKey,
    path: &str,
) -> Result<(ResultKey, usize), Error> {
    let value = read_json(path)?;
    let entries = value
        .get("answer")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let data: VoteResultData =
        serde_json::from_value(value).map_err(|e| Error::Format(format!("{path}: {e}")))?;
    Ok((graph.load_result(schema, data), entries))
}

/// Load the dumps and build the report.
fn inspect(schema_path: &str, result_path: Option<&str>, show_pending: bool) -> Result<Report, Error> {
    let mut graph = VoteGraph::new();

    let data: SchemaData = serde_json::from_value(read_json(schema_path)?)
        .map_err(|e| Error::Format(format!("{schema_path}: {e}")))?;
    let schema = graph.load_vote(data);

    let result = match result_path {
        Some(path) => {
            let (result, entries) = load_result(&mut graph, schema, path)?;
            let loaded = graph.answer_results_count(result);
            Some(ResultReport {
                answers: graph.result_to_data(result).answer,
                loaded,
                dropped: entries.saturating_sub(loaded),
                pending: show_pending.then(|| Pending::from(&graph.result_changes(result))),
            })
        }
        None => None,
    };

    Ok(Report {
        vote: graph.vote_to_data(schema),
        pending: show_pending.then(|| vote_pending(&graph, schema)),
        result,
    })
}

/// Set up, inspect, print the report, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let schema_path: &String = args.get_one(SCHEMA_PATH).unwrap(); // Required argument is guaranteed to be present.
    let result_path = args.get_one::<String>(RESULT_PATH).map(String::as_str);
    let config_path = args.get_one::<String>(CONFIG_PATH).map(Path::new);

    let config = match Config::load(config_path)
        .and_then(|config| logging::init(&config).map(|_| config))
        .map_err(|e| Error::Setup(e.to_string()))
    {
        Ok(config) => config,
        Err(err) => return report_error(err),
    };

    let report = match inspect(schema_path, result_path, config.show_pending()) {
        Ok(report) => report,
        Err(err) => return report_error(err),
    };
    let output = if config.pretty() {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match output {
        Ok(output) => {
            println!("{output}");
            0
        }
        Err(e) => report_error(Error::Format(e.to_string())),
    }
}

/// Print an error and return the matching exit code.
fn report_error(err: Error) -> u8 {
    match err {
        Error::IO(msg) => println!("IO error: {}", msg),
        Error::Format(msg) => println!("Invalid JSON: {}", msg),
        Error::Setup(msg) => println!("Setup failed: {}", msg),
    }
    1
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
