use std::path::{Path, PathBuf};

use argspec_core::{CommandSpec, GroupMatch, GroupMatchContainer, ParseResult, Parser as ArgParser};
use argspec_def::CommandDef;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

/// Output format for match reports.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "argspec")]
#[command(about = "Inspect and exercise declarative command definitions")]
struct Cli {
    /// Log resolution and group routing decisions to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the usage synopsis of a command and its subcommands.
    Synopsis(SynopsisArgs),
    /// Resolve a possibly abbreviated option or subcommand name.
    Resolve(ResolveArgs),
    /// Parse arguments against a definition and print the match tree.
    Check(CheckArgs),
    /// Check one or more definition files for structural errors.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct SynopsisArgs {
    /// Definition file (.yaml, .yml or .json).
    #[arg(long = "def")]
    definition: PathBuf,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Definition file (.yaml, .yml or .json).
    #[arg(long = "def")]
    definition: PathBuf,
    /// Resolve against subcommand names instead of options.
    #[arg(long)]
    subcommand: bool,
    /// Token as typed by the user.
    #[arg(allow_hyphen_values = true)]
    token: String,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Definition file (.yaml, .yml or .json).
    #[arg(long = "def")]
    definition: PathBuf,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Arguments to parse, given after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Definition files.
    #[arg(long = "def", required = true, num_args = 1..)]
    definitions: Vec<PathBuf>,
}

/// One matched argument and its values.
#[derive(Debug, Serialize)]
struct ArgReport {
    name: String,
    values: Vec<String>,
}

/// All occurrences of one group.
#[derive(Debug, Serialize)]
struct GroupReport {
    group: String,
    occurrences: Vec<OccurrenceReport>,
}

#[derive(Debug, Serialize)]
struct OccurrenceReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    args: Vec<ArgReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<GroupReport>,
}

/// Everything a successful parse matched, per command level.
#[derive(Debug, Serialize)]
struct MatchReport {
    command: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    args: Vec<ArgReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<GroupReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subcommand: Option<Box<MatchReport>>,
}

impl MatchReport {
    fn from_result(result: &ParseResult<'_>) -> Self {
        let cmd = result.command();
        let args = result
            .free_values()
            .map(|(id, values)| ArgReport {
                name: cmd.arg(id).display_name(),
                values: values.to_vec(),
            })
            .collect();
        let groups = result
            .groups()
            .containers()
            .filter(|container| !container.is_empty())
            .map(|container| GroupReport::from_container(cmd, container))
            .collect();
        Self {
            command: cmd.name().to_string(),
            args,
            groups,
            subcommand: result.subcommand().map(|sub| Box::new(Self::from_result(sub))),
        }
    }
}

impl GroupReport {
    fn from_container(cmd: &CommandSpec, container: &GroupMatchContainer) -> Self {
        Self {
            group: cmd.group_synopsis(container.group()),
            occurrences: container
                .matches()
                .iter()
                .map(|occurrence| OccurrenceReport::from_match(cmd, occurrence))
                .collect(),
        }
    }
}

impl OccurrenceReport {
    fn from_match(cmd: &CommandSpec, occurrence: &GroupMatch) -> Self {
        Self {
            args: occurrence
                .matched_args()
                .map(|(id, values)| ArgReport {
                    name: cmd.arg(id).display_name(),
                    values: values.to_vec(),
                })
                .collect(),
            groups: occurrence
                .matched_subgroups()
                .map(|sub| GroupReport::from_container(cmd, sub))
                .collect(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Synopsis(args) => run_synopsis(args),
        Command::Resolve(args) => run_resolve(args),
        Command::Check(args) => run_check(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_command(path: &Path) -> Result<CommandSpec, String> {
    let def = CommandDef::load(path)
        .map_err(|err| format!("Failed to load '{}': {err}", path.display()))?;
    def.build()
        .map_err(|err| format!("Invalid definition '{}': {err}", path.display()))
}

fn run_synopsis(args: SynopsisArgs) -> Result<(), String> {
    let cmd = load_command(&args.definition)?;
    print_synopses(&cmd, "");
    Ok(())
}

fn print_synopses(cmd: &CommandSpec, prefix: &str) {
    println!("{prefix}{}", cmd.synopsis());
    let prefix = format!("{prefix}{} ", cmd.name());
    for sub in cmd.subcommands() {
        print_synopses(sub, &prefix);
    }
}

fn run_resolve(args: ResolveArgs) -> Result<(), String> {
    let cmd = load_command(&args.definition)?;
    let name = if args.subcommand {
        cmd.resolve_subcommand(&args.token)
            .map_err(|err| err.to_string())?
            .name()
            .to_string()
    } else {
        let id = cmd.resolve_option(&args.token).map_err(|err| err.to_string())?;
        cmd.arg(id).display_name()
    };
    println!("{name}");
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let cmd = load_command(&args.definition)?;
    let result = ArgParser::new(&cmd)
        .parse(&args.args)
        .map_err(|err| err.to_string())?;
    let report = MatchReport::from_result(&result);

    let raw = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|err| format!("Failed to serialize match report: {err}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&report)
            .map_err(|err| format!("Failed to serialize match report: {err}"))?,
    };
    println!("{}", raw.trim_end());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut commands = 0;
    for path in &args.definitions {
        let cmd = load_command(path)?;
        commands += count_commands(&cmd);
    }
    println!(
        "Validated {} definition file(s) for {} command(s).",
        args.definitions.len(),
        commands
    );
    Ok(())
}

fn count_commands(cmd: &CommandSpec) -> usize {
    1 + cmd.subcommands().iter().map(count_commands).sum::<usize>()
}
