// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use rotation_core::domain::node_config::NodeConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file + environment overrides)
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./rotation-config.yaml)
        #[arg(short, long, default_value = "./rotation-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, force } => generate(output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. ROTATION_CONFIG_PATH: {}",
            std::env::var("ROTATION_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./rotation-config.yaml");
        println!("  4. ~/.rotation/config.yaml");
        println!("  5. /etc/rotation/config.yaml");
        match NodeConfigManifest::discover_config() {
            Some(path) => println!("  Discovered: {}", path.display()),
            None => println!("  Discovered: {}", "(none, using defaults)".dimmed()),
        }
        println!();
    }

    let config = NodeConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;

    println!("{}", "Current configuration:".bold());
    println!();
    print!(
        "{}",
        serde_yaml::to_string(&config).context("Failed to render configuration")?
    );

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = NodeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            output.display()
        );
    }

    write_sample(&output)?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn write_sample(output: &std::path::Path) -> Result<()> {
    NodeConfigManifest::default()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sample_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rotation-config.yaml");

        generate(path.clone(), false).unwrap();
        validate(Some(path.clone())).unwrap();

        // Refuses to clobber without --force
        assert!(generate(path.clone(), false).is_err());
        generate(path, true).unwrap();
    }

    #[test]
    fn test_validate_rejects_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(
            &path,
            "apiVersion: rotation/v1\nkind: NodeConfig\nmetadata:\n  name: x\n",
        )
        .unwrap();

        assert!(validate(Some(path)).is_err());
    }
}
