//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::loader::LoadOptions;

/// OCM - configuration tooling for the Open Component Model
#[derive(Parser, Debug)]
#[command(name = "ocm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Additional configuration file, applied after the defaults (repeatable)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Vec<Utf8PathBuf>,

    /// Attribute setting NAME=VALUE, applied after all files (repeatable)
    #[arg(
        short = 'X',
        long = "attribute",
        value_name = "NAME=VALUE",
        value_parser = parse_attribute,
        global = true
    )]
    pub attributes: Vec<(String, String)>,

    /// Keep configuration documents of unknown types without reporting them
    #[arg(long, global = true)]
    pub skip_unknown: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Sources to load into the CLI context, from the global flags
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_files: self.config.clone(),
            attributes: self.attributes.clone(),
            skip_unknown: self.skip_unknown,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// List attribute types and the values set on the CLI context
    Attributes(AttributesArgs),
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Apply configuration files and report every failure
    Validate(ConfigValidateArgs),

    /// Show the resulting configuration log
    Show(ConfigShowArgs),

    /// List the registered configuration types
    Types(ConfigTypesArgs),
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Configuration files to apply after the layered defaults
    #[arg(value_name = "FILE")]
    pub files: Vec<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Configuration files to apply after the layered defaults
    #[arg(value_name = "FILE")]
    pub files: Vec<Utf8PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigTypesArgs {
    /// Print the usage text of every type
    #[arg(long)]
    pub usage: bool,
}

#[derive(Args, Debug)]
pub struct AttributesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_attribute(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}
