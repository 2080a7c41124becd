//! fnpack CLI
//!
//! Entry point for the `fnpack` command-line tool.

use clap::{Parser, Subcommand};
use fnpack::manifest::sha256_hex;
use fnpack::{Artifact, CommandPublisher, PackConfig, Pipeline};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "fnpack")]
#[command(about = "Deployment artifact packager for serverless functions", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the deployment artifact
    Build {
        /// Path to config file (default: fnpack.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Override the destination path from the config
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Hand the built artifact to the configured publish command
        #[arg(long)]
        publish: bool,

        /// Print progress to stderr
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Verify the pack configuration
    Verify {
        /// Path to config file (default: fnpack.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// List the entries of a built artifact
    Inspect {
        /// Path to the artifact file
        artifact: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            output,
            publish,
            verbose,
        } => {
            run_build(config, output, publish, verbose);
        }
        Commands::Verify { config } => {
            run_verify(config);
        }
        Commands::Inspect { artifact, json } => {
            run_inspect(&artifact, json);
        }
    }
}

fn load_config(config_path: Option<PathBuf>) -> PackConfig {
    let path = config_path.unwrap_or_else(|| PathBuf::from("fnpack.toml"));

    match PackConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(2);
        }
    }
}

fn run_build(
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    publish: bool,
    verbose: bool,
) {
    let mut config = load_config(config_path);

    if let Some(output) = output {
        config.destination = output;
    }

    let publish_settings = config.publish.clone();
    if publish && publish_settings.is_none() {
        eprintln!("Configuration error: --publish given but no [publish] section configured");
        process::exit(2);
    }

    let pipeline = Pipeline::new(config).with_verbose(verbose);

    let outcome = match pipeline.build() {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Build failed: {}", e);
            process::exit(e.exit_code());
        }
    };

    println!(
        "Artifact built: {} ({} entries, {} bytes)",
        outcome.artifact_path.display(),
        outcome.entries,
        outcome.artifact_bytes
    );
    println!("  Dependencies: {} file(s)", outcome.dependency_files);
    println!(
        "  Sources: {} file(s), {} replaced dependency entries",
        outcome.source_files, outcome.replaced
    );
    println!("  SHA-256: {}", outcome.artifact_sha256);
    println!("  Manifest: {}", outcome.manifest_path.display());

    if publish {
        if let Some(settings) = publish_settings {
            let publisher = CommandPublisher::new(settings.command.clone());
            match pipeline.publish(&outcome, &publisher) {
                Ok(()) => {
                    println!("Published as '{}'", settings.function);
                }
                Err(e) => {
                    // The artifact is valid; only the handoff failed
                    eprintln!("Publish failed: {}", e);
                    eprintln!(
                        "Artifact remains valid at: {}",
                        outcome.artifact_path.display()
                    );
                    process::exit(e.exit_code());
                }
            }
        }
    }
}

fn run_verify(config_path: Option<PathBuf>) {
    let path = config_path.unwrap_or_else(|| PathBuf::from("fnpack.toml"));

    match PackConfig::from_file(&path) {
        Ok(config) => {
            println!("Configuration valid: {}", path.display());
            println!();
            println!("  Dependency root: {}", config.dependency_root.display());
            println!("  Sources: {}", config.sources.len());
            for source in &config.sources {
                println!("    {}", source.display());
            }
            println!("  Destination: {}", config.destination.display());
            if !config.bundle.exclude.is_empty() {
                println!("  Extra excludes: {}", config.bundle.exclude.join(", "));
            }
            if config.bundle.max_bytes > 0 {
                println!("  Size limit: {} bytes", config.bundle.max_bytes);
            }
            match config.publish {
                Some(ref publish) => println!("  Publish: enabled ({})", publish.function),
                None => println!("  Publish: disabled"),
            }
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(2);
        }
    }
}

fn run_inspect(artifact_path: &Path, json_output: bool) {
    let artifact = match Artifact::read_tar(artifact_path) {
        Ok(artifact) => artifact,
        Err(e) => {
            eprintln!("Error reading artifact: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        let entries: Vec<serde_json::Value> = artifact
            .entries()
            .map(|(path, entry)| {
                serde_json::json!({
                    "path": path,
                    "size": entry.contents.len(),
                    "mode": format!("{:o}", entry.mode),
                    "sha256": sha256_hex(&entry.contents),
                })
            })
            .collect();

        match serde_json::to_string_pretty(&entries) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!(
            "{} ({} entries, {} bytes)\n",
            artifact_path.display(),
            artifact.len(),
            artifact.total_bytes()
        );

        for (path, entry) in artifact.entries() {
            println!("  {:>9}  {}", entry.contents.len(), path);
        }
    }
}
