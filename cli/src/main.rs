use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use cdo_schema_core::{CallSpec, OperatorSummary};
use cdo_schema_discovery::binding::{Binding, CallArgs, VERBOSE_OVERRIDE};
use cdo_schema_discovery::cache::{self, CachingInvoker};
use cdo_schema_discovery::config::CdoConfig;
use cdo_schema_discovery::discover::Cdo;
use cdo_schema_discovery::invoker::Runner;
use cdo_schema_discovery::listing::OperatorTable;
use cdo_schema_discovery::parser::parse_help_page;
use cdo_schema_discovery::registry::{BindingRegistry, synthesize_page};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Parser)]
#[command(name = "cdo-bind", version, about = "Inspect and call CDO operators bound from their help text")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// CDO executable (overrides the config file and the CDO variable).
    #[arg(long, global = true)]
    cdo: Option<String>,
    /// Per-process timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Number of parallel help fetches (default: adaptive).
    #[arg(long, global = true)]
    jobs: Option<usize>,
    /// Directory for caching help output.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Use the default cache directory.
    #[arg(long, global = true, conflicts_with = "cache_dir")]
    cache: bool,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the operators the tool provides.
    List(ListArgs),
    /// Show the signature and documentation of one operator.
    Describe(DescribeArgs),
    /// Parse a saved help page without running the tool.
    ParseFile(ParseFileArgs),
    /// Call an operator through its binding.
    Call(CallArgsCli),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Print the full operator table as JSON.
    #[arg(long)]
    json: bool,
    /// Only list aliases and their targets.
    #[arg(long, conflicts_with = "bound")]
    aliases: bool,
    /// Fetch every help page and list the operators that bind.
    #[arg(long)]
    bound: bool,
}

#[derive(Debug, Args)]
struct DescribeArgs {
    operator: String,
}

#[derive(Debug, Args)]
struct ParseFileArgs {
    /// Help page captured from `cdo -h <operator>`.
    input: PathBuf,
    /// Print call specs and bindings as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct CallArgsCli {
    operator: String,
    /// Operator parameter as NAME=VALUE (repeatable).
    #[arg(long = "arg", value_name = "NAME=VALUE")]
    args: Vec<String>,
    /// Optional flag parameter to switch on (repeatable).
    #[arg(long = "flag", value_name = "NAME")]
    flags: Vec<String>,
    /// Input file (repeatable).
    #[arg(short = 'i', long = "infile")]
    infiles: Vec<String>,
    /// Output file.
    #[arg(short = 'o', long = "outfile")]
    outfile: Option<String>,
    /// Extra tool options inserted before the operator, e.g. "-f nc4".
    #[arg(long, allow_hyphen_values = true)]
    options: Option<String>,
    /// Echo the command line before running it.
    #[arg(long)]
    echo: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_config(&cli).and_then(|config| match cli.command {
        Command::List(args) => run_list(config, args),
        Command::Describe(args) => run_describe(config, args),
        Command::ParseFile(args) => run_parse_file(args),
        Command::Call(args) => run_call(config, args),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<CdoConfig, String> {
    let config = match &cli.config {
        Some(path) => CdoConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => CdoConfig::default(),
    };
    let mut config = config.with_env_overrides();

    if let Some(executable) = &cli.cdo {
        config.executable = executable.clone();
    }
    if cli.timeout_ms.is_some() {
        config.timeout_ms = cli.timeout_ms;
    }
    if cli.jobs.is_some() {
        config.jobs = cli.jobs;
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    } else if cli.cache {
        config.cache_dir = Some(cache::default_dir());
    }

    debug!(executable = %config.executable, "Resolved configuration");
    Ok(config)
}

/// Runner for listing and help fetches, plus the help cache behind it.
struct DiscoveryRunner {
    runner: Runner,
    cache: Option<Arc<CachingInvoker>>,
}

impl DiscoveryRunner {
    fn open(config: &CdoConfig) -> Self {
        let runner = Runner::new(config.clone());
        let cache = cache::open_for_config(config, runner.invoker());
        let runner = match &cache {
            Some(cache) => Runner::with_invoker(config.clone(), cache.clone()),
            None => runner,
        };
        Self { runner, cache }
    }

    fn finish(self) {
        if let Some(cache) = self.cache
            && let Err(err) = cache.flush()
        {
            warn!(error = %err, "Failed to write help cache");
        }
    }
}

fn run_list(config: CdoConfig, args: ListArgs) -> Result<(), String> {
    if args.bound {
        return run_list_bound(config, args.json);
    }

    let discovery = DiscoveryRunner::open(&config);
    let listing = discovery.runner.operators_listing();
    discovery.finish();
    let table = OperatorTable::parse(&listing.map_err(|err| err.to_string())?);

    let rows: Vec<&OperatorSummary> = if args.aliases {
        table.aliases().collect()
    } else {
        table.iter().collect()
    };

    if args.json {
        let json = serde_json::to_string_pretty(&rows)
            .map_err(|err| format!("Failed to serialize operator table: {err}"))?;
        println!("{json}");
        return Ok(());
    }

    for op in rows {
        match (&op.alias_target, args.aliases) {
            (Some(target), true) => println!("{} -> {target}", op.name),
            _ => println!("{}", op.name),
        }
    }
    Ok(())
}

/// Full discovery: every help page is fetched with `config.jobs` workers.
fn run_list_bound(config: CdoConfig, json: bool) -> Result<(), String> {
    let cdo = Cdo::new(config).map_err(|err| err.to_string())?;
    let report = cdo.report();

    if json {
        let json = serde_json::to_string_pretty(report)
            .map_err(|err| format!("Failed to serialize attach report: {err}"))?;
        println!("{json}");
        return Ok(());
    }

    for name in cdo.bindings().names() {
        println!("{name}");
    }
    debug!(summary = %report.summary(), "Discovery finished");
    Ok(())
}

fn run_describe(config: CdoConfig, args: DescribeArgs) -> Result<(), String> {
    let binding = fetch_binding(&config, &args.operator)?;
    println!("{}", binding.signature_line());
    println!();
    println!("{}", binding.doc());
    Ok(())
}

#[derive(Serialize)]
struct ParseFileOutput<'a> {
    call_specs: &'a [CallSpec],
    bindings: Vec<Binding>,
    warnings: Vec<String>,
}

fn run_parse_file(args: ParseFileArgs) -> Result<(), String> {
    let help_text = fs::read_to_string(&args.input)
        .map_err(|err| format!("Failed to read '{}': {err}", args.input.display()))?;

    let page = parse_help_page(&help_text);
    let synthesized = synthesize_page(&help_text);
    let mut registry = BindingRegistry::new();
    let bindings: Vec<Binding> = synthesized
        .bindings
        .into_iter()
        .filter(|binding| registry.register_if_absent(binding.clone()))
        .collect();

    if args.json {
        let output = ParseFileOutput {
            call_specs: &page.call_specs,
            bindings,
            warnings: synthesized.warnings,
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|err| format!("Failed to serialize bindings: {err}"))?;
        println!("{json}");
        return Ok(());
    }

    for warning in &synthesized.warnings {
        eprintln!("warning: {warning}");
    }
    if bindings.is_empty() {
        return Err(format!("No operators found in '{}'", args.input.display()));
    }
    for (idx, binding) in bindings.iter().enumerate() {
        if idx > 0 {
            println!();
        }
        println!("{}", binding.signature_line());
        println!();
        println!("{}", binding.doc());
    }
    Ok(())
}

fn run_call(config: CdoConfig, args: CallArgsCli) -> Result<(), String> {
    let binding = fetch_binding(&config, &args.operator)?;
    let runner = Runner::new(config);

    let mut call_args = CallArgs::new();
    for pair in &args.args {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Invalid --arg '{pair}', expected NAME=VALUE"))?;
        call_args = match value {
            "true" => call_args.arg(name.trim(), true),
            "false" => call_args.arg(name.trim(), false),
            _ => call_args.arg(name.trim(), value),
        };
    }
    for flag in &args.flags {
        call_args = call_args.flag(flag);
    }
    if !args.infiles.is_empty() {
        call_args = call_args.infiles(&args.infiles);
    }
    if let Some(outfile) = &args.outfile {
        call_args = call_args.outfile(outfile);
    }
    if let Some(options) = &args.options {
        call_args = call_args.option(options);
    }
    if args.echo {
        call_args = call_args.override_value(VERBOSE_OVERRIDE, true);
    }

    let output = binding
        .call(&runner, &call_args)
        .map_err(|err| err.to_string())?;
    print!("{output}");
    Ok(())
}

/// Fetches the operator's help page and returns its binding.
fn fetch_binding(config: &CdoConfig, operator: &str) -> Result<Binding, String> {
    let discovery = DiscoveryRunner::open(config);
    let help_text = discovery.runner.operator_help(operator);
    discovery.finish();
    let help_text =
        help_text.map_err(|err| format!("Failed to fetch help for '{operator}': {err}"))?;
    let page = synthesize_page(&help_text);
    for warning in &page.warnings {
        warn!("{warning}");
    }
    page.bindings
        .into_iter()
        .find(|binding| binding.operator() == operator)
        .ok_or_else(|| format!("Unknown operator: {operator}"))
}
