/// Version injected at compile time via STACKBIND_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("STACKBIND_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use stackbind::cloud::auth::Credentials;
use stackbind::cloud::client::ProvisioningClient;
use stackbind::config::Config;
use stackbind::engine::{Executor, Outputs, ReadClient, StaticReadClient};
use stackbind::stack::{self, Stack, StackConfig};
use stackbind::{ErrorKind, ResourceId, Step};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Declarative resource graph with deploy-time attribute resolution
#[derive(Parser, Debug)]
#[command(name = "stackbind", version, about, long_about = None)]
struct Args {
    /// Stack parameters file (YAML)
    #[arg(short, long, global = true)]
    stack: Option<PathBuf>,

    /// Region to deploy into
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the synthesised template
    Synth {
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
    },
    /// Print deploy steps in dependency order
    Plan,
    /// Run the read queries against provisioned outputs
    Resolve {
        /// Outputs of provisioned resources, `{resource: {attribute: value}}`
        #[arg(long)]
        outputs: PathBuf,

        /// Canned responses keyed by `Service.action`, instead of a live endpoint
        #[arg(long, conflicts_with_all = ["endpoint", "token"])]
        responses: Option<PathBuf>,

        /// Provisioning API endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Provisioning API token
        #[arg(long)]
        token: Option<String>,

        /// Also print the materialised properties of these resources
        #[arg(long = "show")]
        show: Vec<String>,
    },
    /// Save defaults to the config file
    Config {
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        stack_file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("stackbind {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("stackbind").join("stackbind.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".stackbind").join("stackbind.log");
    }
    PathBuf::from("stackbind.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    if let Err(err) = run(args).await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    match &args.command {
        Command::Synth { format } => {
            let stack = load_stack(&args, &config)?;
            let template = stack.graph.to_template();
            let text = match format {
                Format::Json => serde_json::to_string_pretty(&template)?,
                Format::Yaml => serde_yaml::to_string(&template)?,
            };
            println!("{}", text);
        }
        Command::Plan => {
            let stack = load_stack(&args, &config)?;
            print_plan(&stack)?;
        }
        Command::Resolve {
            outputs,
            responses,
            endpoint,
            token,
            show,
        } => {
            let stack = load_stack(&args, &config)?;
            let outputs = read_outputs(outputs)?;

            let result = match responses {
                Some(path) => {
                    let content = std::fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let value: Value = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse {}", path.display()))?;
                    let client = StaticReadClient::from_json(value)?;
                    resolve(&stack, &outputs, client, show).await?
                }
                None => {
                    let endpoint = config.effective_endpoint(endpoint.as_deref()).context(
                        "No provisioning endpoint configured. Use --endpoint, \
                         `stackbind config --endpoint` or STACKBIND_ENDPOINT",
                    )?;
                    let credentials = Credentials::discover(token.as_deref())?;
                    let region = stack.config.region();
                    tracing::info!("Using endpoint: {}, region: {}", endpoint, region);
                    let client = ProvisioningClient::new(&endpoint, region, credentials)?;
                    resolve(&stack, &outputs, client, show).await?
                }
            };

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Config {
            endpoint,
            stack_file,
        } => {
            if let Some(endpoint) = endpoint {
                url::Url::parse(endpoint)
                    .with_context(|| format!("Invalid endpoint '{}'", endpoint))?;
                config.set_endpoint(endpoint)?;
            }
            if let Some(region) = &args.region {
                config.set_region(region)?;
            }
            if let Some(stack_file) = stack_file {
                config.stack_file = Some(stack_file.clone());
                config.save()?;
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Stack parameters from `--stack`, the configured stack file, or defaults
fn load_stack(args: &Args, config: &Config) -> Result<Stack> {
    let path = args.stack.clone().or_else(|| config.stack_file.clone());
    let stack_config = match &path {
        Some(path) => StackConfig::load(path)?,
        None => StackConfig::default(),
    }
    .with_region(args.region.as_deref(), config);

    Ok(stack::build(&stack_config)?)
}

fn read_outputs(path: &Path) -> Result<Outputs> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read outputs {}", path.display()))?;
    let outputs = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse outputs {}", path.display()))?;
    Ok(outputs)
}

fn print_plan(stack: &Stack) -> Result<()> {
    for (i, step) in stack.graph.plan()?.iter().enumerate() {
        match step {
            Step::Provision(id) => {
                let kind = stack
                    .graph
                    .get(id)
                    .map(|r| r.kind.type_name())
                    .unwrap_or("?");
                println!("{:>3}. provision {} ({})", i + 1, id, kind);
            }
            Step::Resolve(id) => {
                if let Some(query) = stack.graph.query(id) {
                    println!(
                        "{:>3}. resolve   {} ({}.{}, {} values)",
                        i + 1,
                        id,
                        query.service(),
                        query.action(),
                        query.paths().len()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn resolve<C: ReadClient>(
    stack: &Stack,
    outputs: &Outputs,
    client: C,
    show: &[String],
) -> Result<Value> {
    let executor = Executor::new(client);
    let resolved = executor.resolve_all(&stack.graph, outputs).await?;

    let mut resources = Map::new();
    for id in show {
        let id = ResourceId::new(id.as_str());
        let resource = stack
            .graph
            .get(&id)
            .with_context(|| format!("Unknown resource '{}'", id))?;
        let properties = resolved.materialize_resource(resource, outputs)?;
        resources.insert(id.to_string(), properties);
    }

    let mut result = json!({ "resolved": resolved.to_json() });
    if !resources.is_empty() {
        result["resources"] = Value::Object(resources);
    }
    Ok(result)
}

fn report(err: &anyhow::Error) {
    let Some(error) = err.downcast_ref::<stackbind::Error>() else {
        eprintln!("Error: {err:#}");
        return;
    };

    let kind = match error.kind() {
        ErrorKind::Construction => "construction",
        ErrorKind::Resolution => "resolution",
        ErrorKind::Permission => "permission",
    };
    tracing::error!("{} error: {}", kind, error);
    match error.query() {
        Some(query) => eprintln!("Error ({kind}, query {query}): {error}"),
        None => eprintln!("Error ({kind}): {error}"),
    }
}
