//! `scene-workflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`  check a workflow file and print its execution order.
//! - `simulate`  run a workflow against an in-memory scene.
//! - `list`      list workflow files in the workflows directory.
//! - `describe`  show a workflow's name, description and config.
//! - `types`     list registered task types.
//! - `presets`   list named config presets.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::{ExecutionStrategy, WorkflowExecutor, WorkflowLoader};
use tasks::{MemoryScene, Preset, SceneHost, TaskStatus, WorkflowConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "scene-workflow",
    about = "Dependency-ordered scene construction workflows",
    version
)]
struct Cli {
    /// Directory searched for bare workflow file names.
    #[arg(long, env = "WORKFLOWS_DIR", default_value = "workflows", global = true)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow file without running it.
    Validate {
        /// File name or path; `.json` may be omitted.
        file: String,
    },
    /// Run a workflow against an in-memory scene.
    Simulate {
        file: String,
        /// Replace the document's config with a named preset.
        #[arg(long)]
        preset: Option<String>,
        /// Await independent tasks of a batch together.
        #[arg(long)]
        batched: bool,
        /// Run the workflow this many times against the same scene.
        #[arg(long, default_value_t = 1)]
        runs: u32,
        /// Print the final report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List workflow files.
    List,
    /// Show a workflow's summary.
    Describe { file: String },
    /// List registered task types.
    Types,
    /// List config presets.
    Presets,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let loader = WorkflowLoader::with_builtins().with_dir(&cli.dir);

    match cli.command {
        Command::Validate { file } => {
            let workflow = loader
                .load_file(&file)
                .with_context(|| format!("cannot load workflow '{file}'"))?;
            for undeclared in workflow.graph.undeclared_references() {
                warn!(
                    "task '{}' reads '{}' without depending on it",
                    undeclared.task, undeclared.reference
                );
            }
            match workflow.graph.render() {
                Ok(view) => {
                    println!("workflow '{}' is valid ({})", workflow.name, workflow.config);
                    println!("{view}");
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Simulate {
            file,
            preset,
            batched,
            runs,
            json,
        } => {
            let mut workflow = loader
                .load_file(&file)
                .with_context(|| format!("cannot load workflow '{file}'"))?;
            if let Some(name) = preset {
                workflow.config = WorkflowConfig::preset(&name)?;
            }

            let scene = Arc::new(MemoryScene::new());
            let strategy = if batched {
                ExecutionStrategy::Batched
            } else {
                ExecutionStrategy::Sequential
            };
            let executor = WorkflowExecutor::new(scene.clone()).with_strategy(strategy);

            let mut last = None;
            for run in 1..=runs.max(1) {
                info!("run {run} of '{}'", workflow.name);
                let report = executor.run(&workflow).await?;
                println!("{report}");
                last = Some(report);
            }

            println!("scene holds {} actors", scene.actor_count()?);
            if let Some(report) = last {
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                if report.status == TaskStatus::Failure {
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::List => {
            let files = loader.list();
            if files.is_empty() {
                println!("no workflows in {}", cli.dir.display());
            }
            for file in files {
                println!("{file}");
            }
        }
        Command::Describe { file } => {
            let info = loader
                .describe(&file)
                .with_context(|| format!("cannot read workflow '{file}'"))?;
            println!("{} ({})", info.name, info.file);
            if !info.description.is_empty() {
                println!("  {}", info.description);
            }
            println!("  tasks: {}", info.task_count);
            println!("  config: {}", info.config);
        }
        Command::Types => {
            for key in loader.types().known_types() {
                println!("{key}");
            }
        }
        Command::Presets => {
            for preset in Preset::ALL {
                println!("{:<20} {}", preset.name(), preset.config());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
