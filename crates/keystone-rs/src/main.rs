//! Command line entry point for compiling and inspecting a project.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use keystone_rs::Project;
use keystone_rs::config::ConfigFileSet;
use keystone_rs::container::{
    ContainerDumper, DumpOptions, GraphvizDumper, GraphvizOptions, ServiceContainerConfigHandler,
};
use log::info;
use std::path::PathBuf;

/// Command-line options shared by every subcommand.
#[derive(Parser)]
#[command(name = "keystone", version)]
struct Cli {
    /// Project root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Environment name
    #[arg(long = "env", default_value = "prod")]
    environment: String,
    /// Application name
    #[arg(long)]
    app: Option<String>,
    /// Cache directory (defaults to <root>/cache)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Framework defaults directory
    #[arg(long)]
    framework_dir: Option<PathBuf>,
    /// Plugin directories, in precedence order
    #[arg(long = "plugin")]
    plugins: Vec<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile one config path and print the artifact location
    CheckConfig {
        /// Config path such as config/filters.yml
        path: String,
        /// Recompile even when the artifact is fresh
        #[arg(long)]
        force: bool,
        /// Do not fail when the config does not exist
        #[arg(long)]
        optional: bool,
    },
    /// Dump the container described by a services file
    DumpContainer {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = DumpFormat::Php)]
        format: DumpFormat,
        /// Generated class name (container node class for dot)
        #[arg(long)]
        class: Option<String>,
        /// Class the generated container extends
        #[arg(long)]
        base_class: Option<String>,
    },
    /// Remove compiled config artifacts of the application and environment
    ClearCache,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    Php,
    Dot,
}

fn project(cli: &Cli) -> Project {
    let mut project = Project::new(&cli.root, &cli.environment);
    if let Some(app) = &cli.app {
        project = project.with_app(app);
    }
    if let Some(dir) = &cli.cache_dir {
        project = project.with_cache_dir(dir);
    }
    if let Some(dir) = &cli.framework_dir {
        project = project.with_framework_dir(dir);
    }
    for plugin in &cli.plugins {
        project = project.with_plugin(plugin);
    }
    project
}

fn main() -> anyhow::Result<()> {
    keystone_rs::init_logging();

    let cli = Cli::parse();
    let project = project(&cli);
    info!(
        "starting keystone (root={}, env={}, app={})",
        cli.root.display(),
        cli.environment,
        cli.app.as_deref().unwrap_or("-")
    );

    match &cli.command {
        Command::CheckConfig {
            path,
            force,
            optional,
        } => {
            let cache = project
                .with_force_reload(*force)
                .config_cache()
                .context("failed to set up the config cache")?;
            match cache
                .check_config(path, *optional)
                .with_context(|| format!("failed to compile {path}"))?
            {
                Some(artifact) => println!("{}", artifact.display()),
                None => println!("{path} does not exist, skipped"),
            }
        }
        Command::DumpContainer {
            file,
            format,
            class,
            base_class,
        } => {
            if !file.is_file() {
                bail!("services file {} does not exist", file.display());
            }
            let builder = ServiceContainerConfigHandler::new()
                .load(&ConfigFileSet::new(vec![file.clone()]), &project.settings())
                .with_context(|| format!("failed to load {}", file.display()))?;
            let output = match format {
                DumpFormat::Php => {
                    let mut options = DumpOptions::default();
                    if let Some(class) = class {
                        options = options.with_class(class);
                    }
                    if let Some(base_class) = base_class {
                        options = options.with_base_class(base_class);
                    }
                    ContainerDumper::new(&builder)
                        .dump(&options)
                        .context("failed to dump the container")?
                }
                DumpFormat::Dot => {
                    let mut options = GraphvizOptions::default();
                    if let Some(class) = class {
                        options = options.with_container_class(class);
                    }
                    GraphvizDumper::new(&builder).dump(&options)
                }
            };
            print!("{output}");
        }
        Command::ClearCache => {
            let removed = project
                .config_cache()
                .context("failed to set up the config cache")?
                .clear()
                .context("failed to clear the config cache")?;
            println!("removed {removed} compiled artifacts");
        }
    }
    Ok(())
}
