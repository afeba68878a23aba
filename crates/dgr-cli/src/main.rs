//! DGR - Dependency Graph Releaser CLI
//!
//! The `dgr` command plans and simulates the release of a project together
//! with all of its (transitive) dependents.
//!
//! ## Commands
//!
//! - `plan`: Build a release plan from an analysed project universe
//! - `show`: Print a release plan level by level
//! - `simulate`: Run a release plan against a scripted job executor
//! - `recover`: Prepare an interrupted release plan for a resume
//! - `versions`: Print the release and next development version

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

use dgr_core::fakes::{JobOutcome, ScriptedJobExecutor, StaticJobDataFactory};
use dgr_core::obs::ReleaseSpan;
use dgr_core::{
    BuildOptions, Config, ConfigKey, InMemoryAnalyser, JsonFilePublisher, PollOptions, ProjectId,
    ProjectUniverse, ReleasePlan, ReleasePlanBuilder, Releaser, TypeOfRun, VersionDeterminer,
};

#[derive(Parser)]
#[command(name = "dgr")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency Graph Releaser (DGR)", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a release plan for a root project
    Plan {
        /// Project universe (JSON) produced by the analysis
        universe: PathBuf,

        /// Identifier of the project to release
        root: String,

        /// Release id (default: a random UUID)
        #[arg(long, env = "DGR_RELEASE_ID")]
        release_id: Option<String>,

        /// Regex matched against whole identifiers whose release is disabled
        #[arg(long)]
        disable_release_for: Option<String>,

        /// Config entry as key=value, may be repeated
        #[arg(short, long = "config")]
        config: Vec<String>,

        /// Kind of run the plan is meant for
        #[arg(long, value_enum, default_value_t = RunType::Release)]
        type_of_run: RunType,

        /// Output path for the plan (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a release plan level by level
    Show {
        /// Release plan (JSON)
        plan: PathBuf,
    },

    /// Release a plan against a scripted job executor
    Simulate {
        /// Release plan (JSON)
        plan: PathBuf,

        /// Identifier whose release job fails, may be repeated
        #[arg(long)]
        fail: Vec<String>,

        /// Identifier whose release job times out, may be repeated
        #[arg(long)]
        timeout: Vec<String>,

        /// Polling interval of the simulated jobs in milliseconds
        #[arg(long, default_value = "10")]
        poll_interval_ms: u64,

        /// Output path for the resulting plan (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Prepare commands of an interrupted release for re-polling
    Recover {
        /// Release plan (JSON), rewritten in place
        plan: PathBuf,
    },

    /// Print release and next development version of a version
    Versions {
        /// Current version, e.g. 1.2.0-SNAPSHOT
        version: String,
    },
}

/// Kind of run, see [`TypeOfRun`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum RunType {
    Explore,
    DryRun,
    Release,
}

impl From<RunType> for TypeOfRun {
    fn from(run: RunType) -> Self {
        match run {
            RunType::Explore => TypeOfRun::Explore,
            RunType::DryRun => TypeOfRun::DryRun,
            RunType::Release => TypeOfRun::Release,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    dgr_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Plan {
            universe,
            root,
            release_id,
            disable_release_for,
            config,
            type_of_run,
            output,
        } => cmd_plan(
            &universe,
            &root,
            release_id,
            disable_release_for.as_deref(),
            &config,
            type_of_run.into(),
            output.as_deref(),
        ),
        Commands::Show { plan } => cmd_show(&plan),
        Commands::Simulate {
            plan,
            fail,
            timeout,
            poll_interval_ms,
            output,
        } => {
            let success = cmd_simulate(
                &plan,
                &fail,
                &timeout,
                Duration::from_millis(poll_interval_ms),
                output.as_deref(),
            )
            .await?;
            if !success {
                anyhow::bail!("Release did not succeed");
            }
            Ok(())
        }
        Commands::Recover { plan } => cmd_recover(&plan),
        Commands::Versions { version } => {
            println!("{}", cmd_versions(&version));
            Ok(())
        }
    }
}

fn read_plan(path: &Path) -> Result<ReleasePlan> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read release plan: {:?}", path))?;
    ReleasePlan::from_json(&json)
        .with_context(|| format!("Invalid release plan: {:?}", path))
}

fn write_plan(plan: &ReleasePlan, path: &Path) -> Result<()> {
    std::fs::write(path, plan.to_json()?)
        .with_context(|| format!("Failed to write release plan to {:?}", path))
}

fn parse_config(entries: &[String]) -> Result<Config> {
    let mut config = Config::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("Config entry `{entry}` is not of the form key=value"))?;
        let key: ConfigKey = key.trim().parse()?;
        config.insert(key, value.to_string());
    }
    Ok(config)
}

/// Build a release plan and print or write it
fn cmd_plan(
    universe_path: &Path,
    root: &str,
    release_id: Option<String>,
    disable_release_for: Option<&str>,
    config: &[String],
    type_of_run: TypeOfRun,
    output: Option<&Path>,
) -> Result<()> {
    let json = std::fs::read_to_string(universe_path)
        .with_context(|| format!("Failed to read project universe: {:?}", universe_path))?;
    let universe = ProjectUniverse::from_json(&json)
        .with_context(|| format!("Invalid project universe: {:?}", universe_path))?;
    let analyser = InMemoryAnalyser::new(universe)?;

    let release_id = release_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let _span = ReleaseSpan::enter(&release_id);
    let mut options = BuildOptions::new(release_id)
        .with_config(parse_config(config)?)
        .with_type_of_run(type_of_run);
    if let Some(pattern) = disable_release_for {
        options = options
            .disable_release_for(pattern)
            .with_context(|| format!("Invalid --disable-release-for pattern `{pattern}`"))?;
    }

    let plan = ReleasePlanBuilder::new(options).build(&ProjectId::new(root), &analyser)?;
    for warning in plan.warnings() {
        tracing::warn!("{warning}");
    }

    match output {
        Some(path) => {
            write_plan(&plan, path)?;
            info!(
                release_id = %plan.release_id(),
                projects = plan.number_of_projects(),
                "Release plan written to {:?}",
                path
            );
        }
        None => println!("{}", plan.to_json()?),
    }
    Ok(())
}

/// Print a release plan level by level
fn cmd_show(plan_path: &Path) -> Result<()> {
    let plan = read_plan(plan_path)?;
    print!("{}", render_plan(&plan));
    Ok(())
}

fn render_plan(plan: &ReleasePlan) -> String {
    let mut out = format!(
        "Release {} of {} ({}, {} projects)\n",
        plan.release_id(),
        plan.root_project_id(),
        plan.state(),
        plan.number_of_projects()
    );
    let mut level = None;
    for project in plan.iter() {
        if level != Some(project.level) {
            level = Some(project.level);
            out.push_str(&format!("Level {}\n", project.level));
        }
        let kind = if project.is_submodule { " (submodule)" } else { "" };
        out.push_str(&format!(
            "  {}{} {} -> {}\n",
            project.id, kind, project.current_version, project.release_version
        ));
        for command in &project.commands {
            out.push_str(&format!("    - {}: {}\n", command.title(), command.state));
        }
    }
    for warning in plan.warnings() {
        out.push_str(&format!("Warning: {warning}\n"));
    }
    for info in plan.infos() {
        out.push_str(&format!("Info: {info}\n"));
    }
    out
}

/// Release a plan against scripted jobs and persist the resulting plan
async fn cmd_simulate(
    plan_path: &Path,
    fail: &[String],
    timeout: &[String],
    poll_interval: Duration,
    output: Option<&Path>,
) -> Result<bool> {
    let plan = read_plan(plan_path)?;
    let release_id = plan.release_id().to_string();

    let mut executor = ScriptedJobExecutor::new();
    for id in fail {
        executor = executor.with_outcome(format!("release {id}"), JobOutcome::Fail);
    }
    for id in timeout {
        executor = executor.with_outcome(format!("release {id}"), JobOutcome::Timeout);
    }
    let output = output.unwrap_or(plan_path);
    let releaser = Releaser::new(
        plan,
        Arc::new(executor),
        Arc::new(StaticJobDataFactory::new("https://ci.invalid/")),
    )
    .with_publisher(Arc::new(JsonFilePublisher::new(output)))
    .with_poll_options(PollOptions {
        interval: poll_interval,
        max_wait: poll_interval * 20,
    });

    let success = releaser.release().await?;
    write_plan(&releaser.plan().await, output)?;
    println!(
        "Release {} {}",
        release_id,
        if success { "succeeded" } else { "failed" }
    );
    Ok(success)
}

/// Recover an interrupted release plan in place
fn cmd_recover(plan_path: &Path) -> Result<()> {
    let mut plan = read_plan(plan_path)?;
    let _span = ReleaseSpan::enter(plan.release_id());
    let recovered = plan.recover_interrupted()?;
    write_plan(&plan, plan_path)?;
    println!("Recovered {} command(s)", recovered);
    Ok(())
}

fn cmd_versions(version: &str) -> String {
    let versions = VersionDeterminer;
    format!(
        "release: {}\nnext development: {}",
        versions.release_version(version),
        versions.next_dev_version(version)
    )
}
