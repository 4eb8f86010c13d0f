//! Docking submission CLI
//!
//! Entry point for the `docking-submit` command-line tool.

use clap::{Parser, Subcommand, ValueEnum};
use docking_submit::config::{deep_merge, override_from_pair, DEFAULT_CONFIG_FILE};
use docking_submit::gateway::{SignalAction, EXIT_CODE_CANCELLED};
use docking_submit::input::read_parameters;
use docking_submit::pipeline::{EXIT_CODE_INVALID, EXIT_CODE_USAGE};
use docking_submit::validate::ValidationWarning;
use docking_submit::{CancellationToken, Engine, EngineConfig, RawParameters, SchemaModel};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "docking-submit")]
#[command(about = "Validate and submit molecular docking jobs", version)]
struct Cli {
    /// Config file (default: ./docking-submit.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Override a config value, e.g. --set backend.kind=command
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the schema and list its parameters
    Schema {
        /// Include internal parameters (ids starting with '_')
        #[arg(long)]
        all: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate a parameter file and print the normalized values
    Validate {
        /// JSON or YAML parameter file ('-' for stdin)
        params: PathBuf,

        /// Treat unknown parameters as errors
        #[arg(long)]
        strict: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate and print the job descriptor without submitting
    Build {
        /// JSON or YAML parameter file ('-' for stdin)
        params: PathBuf,

        #[arg(long)]
        strict: bool,

        /// Descriptor format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Write the descriptor here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Validate, build and submit to the configured backend
    Submit {
        /// JSON or YAML parameter file ('-' for stdin)
        params: PathBuf,

        #[arg(long)]
        strict: bool,

        /// Submission timeout in seconds (overrides submission.timeout_seconds)
        #[arg(long)]
        timeout: Option<u64>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match &cli.command {
        Commands::Schema { all, json } => run_schema(&cli, *all, *json),
        Commands::Validate {
            params,
            strict,
            json,
        } => run_validate(&cli, params, *strict, *json),
        Commands::Build {
            params,
            strict,
            format,
            output,
        } => run_build(&cli, params, *strict, *format, output.as_deref()),
        Commands::Submit {
            params,
            strict,
            timeout,
            json,
        } => run_submit(&cli, params, *strict, *timeout, *json),
    };
    process::exit(code);
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Build the engine from config file + CLI overrides, or exit with a usage error
fn load_engine(cli: &Cli, strict: bool, timeout: Option<u64>) -> Engine {
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let mut overrides = Value::Null;
    for pair in &cli.overrides {
        match override_from_pair(pair) {
            Some(value) => overrides = deep_merge(overrides, value),
            None => {
                eprintln!("Invalid --set value '{}': expected KEY=VALUE", pair);
                process::exit(EXIT_CODE_USAGE);
            }
        }
    }
    if strict {
        overrides = deep_merge(overrides, json!({"validation": {"unknown_keys": "reject"}}));
    }
    if let Some(seconds) = timeout {
        overrides = deep_merge(overrides, json!({"submission": {"timeout_seconds": seconds}}));
    }
    let overrides = Some(overrides).filter(|v| !v.is_null());

    let config = match EngineConfig::build(config_path.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(EXIT_CODE_USAGE);
        }
    };

    match Engine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_CODE_USAGE);
        }
    }
}

fn load_params(path: &Path) -> RawParameters {
    match read_parameters(path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_CODE_USAGE);
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            EXIT_CODE_USAGE
        }
    }
}

fn print_warnings(warnings: &[ValidationWarning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

fn run_schema(cli: &Cli, all: bool, as_json: bool) -> i32 {
    let engine = load_engine(cli, false, None);
    let schema = engine.schema();

    if as_json {
        let fields: Vec<_> = schema.fields().iter().filter(|f| all || !f.is_internal()).collect();
        return print_json(&json!({
            "id": schema.id(),
            "label": schema.label(),
            "default_memory": schema.default_memory(),
            "parameters": fields,
            "conditional_requirements": schema.rules(),
        }));
    }

    print_schema(&schema, all);
    0
}

fn print_schema(schema: &SchemaModel, all: bool) {
    println!("Schema: {}", schema.id());
    if let Some(label) = schema.label() {
        println!("  {}", label);
    }
    if let Some(memory) = schema.default_memory() {
        println!("  Default memory: {}", memory);
    }
    println!();

    for field in schema.fields().iter().filter(|f| all || !f.is_internal()) {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required".to_string());
        }
        if field.is_multiple() {
            flags.push("multiple".to_string());
        }
        if let Some(default) = &field.default {
            flags.push(format!("default={}", default.to_json()));
        }
        if let Some(allowed) = &field.allowed {
            flags.push(format!("one of {}", allowed.join("|")));
        }
        println!("  {:<24} {:<7} {}", field.id, field.field_type.as_str(), flags.join(", "));
    }

    for rule in schema.rules() {
        println!();
        println!("Rule {} on {}:", rule.id, rule.discriminator);
        for (case, target) in &rule.cases {
            println!("  {} -> {}", case, target);
        }
    }
}

fn run_validate(cli: &Cli, params: &Path, strict: bool, as_json: bool) -> i32 {
    let engine = load_engine(cli, strict, None);
    let raw = load_params(params);
    let report = engine.validate(&raw);

    if as_json {
        let code = print_json(&json!({
            "valid": report.is_valid(),
            "parameters": report.normalized.to_plain(),
            "errors": report.errors,
            "warnings": report.warnings,
        }));
        return if report.is_valid() { code } else { EXIT_CODE_INVALID };
    }

    print_warnings(&report.warnings);
    if !report.is_valid() {
        for error in &report.errors {
            eprintln!("error: {}", error);
        }
        return EXIT_CODE_INVALID;
    }
    print_json(&report.normalized.to_plain())
}

fn run_build(
    cli: &Cli,
    params: &Path,
    strict: bool,
    format: OutputFormat,
    output: Option<&Path>,
) -> i32 {
    let engine = load_engine(cli, strict, None);
    let raw = load_params(params);

    let prepared = match engine.prepare(&raw) {
        Ok(prepared) => prepared,
        Err(errors) => {
            for error in errors.iter() {
                eprintln!("error: {}", error);
            }
            return EXIT_CODE_INVALID;
        }
    };
    print_warnings(&prepared.warnings);

    if let Some(path) = output {
        return match prepared.descriptor.write_to_file(path) {
            Ok(()) => {
                eprintln!("Descriptor {} written to {}", prepared.descriptor.job_id(), path.display());
                0
            }
            Err(e) => {
                eprintln!("Error writing descriptor: {}", e);
                EXIT_CODE_USAGE
            }
        };
    }

    let text = match format {
        OutputFormat::Json => prepared.descriptor.to_json().map_err(|e| e.to_string()),
        OutputFormat::Yaml => prepared.descriptor.to_yaml().map_err(|e| e.to_string()),
    };
    match text {
        Ok(text) => {
            println!("{}", text.trim_end());
            0
        }
        Err(e) => {
            eprintln!("Error serializing descriptor: {}", e);
            EXIT_CODE_USAGE
        }
    }
}

fn run_submit(cli: &Cli, params: &Path, strict: bool, timeout: Option<u64>, as_json: bool) -> i32 {
    let engine = load_engine(cli, strict, timeout);
    let raw = load_params(params);

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || match handler_token.handle_signal() {
        SignalAction::Cancel => eprintln!("Cancelling submission (press Ctrl-C again to exit now)"),
        SignalAction::ImmediateExit => process::exit(EXIT_CODE_CANCELLED),
        SignalAction::Ignore => {}
    }) {
        log::warn!("cannot install Ctrl-C handler: {}", e);
    }

    match engine.run(&raw, &token) {
        Ok(submitted) => {
            print_warnings(&submitted.warnings);
            if as_json {
                return print_json(&json!({
                    "job": submitted.handle,
                    "job_key": submitted.descriptor.job_key().ok(),
                }));
            }
            println!(
                "Job {} accepted as {} ({}){}",
                submitted.handle.job_id,
                submitted.handle.backend_job_id,
                submitted.handle.state,
                if submitted.handle.existing { " [already submitted]" } else { "" }
            );
            0
        }
        Err(e) => {
            if as_json {
                print_json(&json!({"error": e.to_string(), "exit_code": e.exit_code()}));
            } else {
                eprintln!("Error: {}", e);
            }
            e.exit_code()
        }
    }
}
