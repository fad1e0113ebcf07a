//! Command-line front end.
//!
//! - `run <TASK>`: runs one task and prints the result JSON
//! - `session`: reads tasks line by line from stdin against one memory
//! - `tools`: prints the tool catalog

use acton_tools_agent::agent::{ExecutionLoop, RunResult};
use acton_tools_agent::config::{self, AppConfig};
use acton_tools_agent::error::AgentError;
use acton_tools_agent::llm::OpenAIReasoner;
use acton_tools_agent::logging;
use acton_tools_agent::tools::ToolRegistry;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Session command that clears conversation memory.
const RESET_COMMAND: &str = "/reset";

/// acton-tools-agent - a tool-augmented LLM execution loop
#[derive(Parser, Debug)]
#[command(name = "acton-tools-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ACTON_TOOLS_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the iteration budget
    #[arg(short, long, global = true)]
    max_iterations: Option<usize>,

    /// Record rationale and raw decision history in results
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single task and print the result
    Run {
        /// The task text
        task: String,
    },

    /// Read tasks from stdin, one per line, sharing conversation memory
    Session,

    /// Print the tool catalog shown to the reasoning service
    Tools,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = logging::init_and_store_logging(&config.logging) {
        eprintln!("warning: {error}");
    }

    let registry = Arc::new(ToolRegistry::from_config(config.tools.as_ref()));

    match cli.command {
        Commands::Tools => print_catalog(&registry),
        Commands::Run { task } => match build_loop(&config, registry) {
            Ok(mut agent) => {
                let result = agent.run(&task, cli.debug).await;
                print_result(&result)
            }
            Err(error) => print_result(&RunResult::from(error)),
        },
        Commands::Session => match build_loop(&config, registry) {
            Ok(agent) => session(agent, cli.debug).await,
            Err(error) => print_result(&RunResult::from(error)),
        },
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig, AgentError> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(max_iterations) = cli.max_iterations {
        config.agent.max_iterations = max_iterations;
    }
    config.provider.temperature = config.agent.temperature;
    config.validate()?;
    Ok(config)
}

fn build_loop(config: &AppConfig, registry: Arc<ToolRegistry>) -> Result<ExecutionLoop, AgentError> {
    let reasoner = Arc::new(OpenAIReasoner::new(&config.provider)?);
    ExecutionLoop::new(config.agent.clone(), reasoner, registry)
}

async fn session(mut agent: ExecutionLoop, debug: bool) -> ExitCode {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failed = false;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::error!(error = %error, "failed to read stdin");
                return ExitCode::FAILURE;
            }
        };

        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if task == RESET_COMMAND {
            agent.reset();
            println!("{}", serde_json::json!({ "reset": true }));
            continue;
        }

        let result = agent.run(task, debug).await;
        failed |= result.is_error();
        println!("{}", result.to_value());
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_result(result: &RunResult) -> ExitCode {
    match serde_json::to_string_pretty(&result.to_value()) {
        Ok(json) => println!("{json}"),
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    }

    if result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_catalog(registry: &ToolRegistry) -> ExitCode {
    match serde_json::to_string_pretty(registry.catalog()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
