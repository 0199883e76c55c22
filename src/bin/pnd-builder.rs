//! PND package builder CLI
//!
//! # Usage
//!
//! ```bash
//! # Build using ./pnd.toml
//! pnd-builder build
//!
//! # Force an ISO image with a hand-written PXML
//! pnd-builder build --format isofs --pxml PXML.xml --clean
//!
//! # Show the PXML appended to a package
//! pnd-builder inspect dist/hello.pnd
//!
//! # Which image tools are available?
//! pnd-builder preflight
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pnd_builder::artifact::trailer;
use pnd_builder::preflight::{auto_strategy, check_image_tools};
use pnd_builder::{
    build_package, installer_for, DistFiles, ImageFormat, ImageOutcome, Manifest,
    MetadataGenerator, Overrides, ProjectConfig,
};

#[derive(Parser)]
#[command(name = "pnd-builder")]
#[command(author, version, about = "PND application package builder", long_about = None)]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage, image and package the project
    Build {
        /// Config file (default: ./pnd.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Image format: squashfs, isofs, none or auto
        #[arg(long, value_parser = parse_format)]
        format: Option<ImageFormat>,

        /// Use this PXML instead of generating one
        #[arg(long)]
        pxml: Option<PathBuf>,

        /// Package file name, used verbatim
        #[arg(long)]
        pndname: Option<String>,

        /// Staging directory
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        dist_dir: Option<PathBuf>,

        /// Remove the staging directory first
        #[arg(long)]
        clean: bool,

        /// Warn instead of failing when an image tool exits non-zero
        #[arg(long)]
        lenient_tools: bool,
    },

    /// Print the PXML appended to a package
    Inspect {
        package: PathBuf,
    },

    /// Check which image tools are installed
    Preflight {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_format(value: &str) -> Result<ImageFormat, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Build {
            config,
            format,
            pxml,
            pndname,
            build_dir,
            dist_dir,
            clean,
            lenient_tools,
        } => cmd_build(
            config.as_deref(),
            Overrides {
                format,
                pxml,
                pndname,
                build_dir,
                dist_dir,
                clean,
                lenient_tools,
            },
        ),
        Commands::Inspect { package } => cmd_inspect(&package),
        Commands::Preflight { config } => cmd_preflight(config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn cmd_build(config: Option<&Path>, overrides: Overrides) -> Result<()> {
    let project = ProjectConfig::load(config, overrides).context("loading configuration")?;
    let installer = installer_for(&project.install);
    let generator = MetadataGenerator::new(project.metadata.clone());
    let dist_dir = &project.build.dist_dir;
    let mut registry = DistFiles::load(dist_dir)?;

    let report = build_package(
        &project.build,
        &project.metadata,
        installer.as_ref(),
        &generator,
        &mut registry,
    )?;
    registry.save(dist_dir)?;

    println!();
    match &report.outcome {
        ImageOutcome::Image { strategy, .. } => {
            println!("Built {} ({})", report.output.display(), strategy)
        }
        ImageOutcome::Directory { .. } => {
            println!("Copied staging tree to {}", report.output.display())
        }
    }
    if let Some(id) = &report.app_id {
        println!("  id:     {}", id);
    }
    println!(
        "  icon:   {}",
        report.icon.as_deref().unwrap_or("(none)")
    );
    if let Some(digest) = &report.sha256 {
        println!("  sha256: {}", digest);
    }
    Ok(())
}

fn cmd_inspect(package: &Path) -> Result<()> {
    let text = trailer::read_manifest(package)?;
    let manifest = Manifest::parse(&text, package)?;

    println!("{}", text);
    println!();
    println!("id:   {}", manifest.app_id.as_deref().unwrap_or("(none)"));
    println!("icon: {}", manifest.icon.as_deref().unwrap_or("(none)"));
    println!("info: {}", manifest.info.as_deref().unwrap_or("(none)"));
    Ok(())
}

fn cmd_preflight(config: Option<&Path>) -> Result<()> {
    let project =
        ProjectConfig::load(config, Overrides::default()).context("loading configuration")?;
    let checks = check_image_tools(&project.build.tools);

    println!("Image tools:");
    for check in &checks {
        println!("{}", check);
    }
    println!();
    println!("--format auto would use: {}", auto_strategy(&checks));
    Ok(())
}
