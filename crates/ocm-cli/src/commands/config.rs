//! Config command

use anyhow::{bail, Result};
use ocm_context::config::{default_scheme, AppliedConfig};
use ocm_context::context::ConfigProvider;
use serde::Serialize;

use crate::cli::{ConfigCommands, ConfigShowArgs, ConfigTypesArgs, ConfigValidateArgs};
use crate::loader::{self, LoadOptions, Loaded};
use crate::output;

pub fn run(cmd: ConfigCommands, options: &LoadOptions) -> Result<()> {
    match cmd {
        ConfigCommands::Validate(args) => validate(args, options),
        ConfigCommands::Show(args) => show(args, options),
        ConfigCommands::Types(args) => types(args),
    }
}

fn validate(args: ConfigValidateArgs, options: &LoadOptions) -> Result<()> {
    let spinner = output::spinner("Validating configuration...");
    let loaded = loader::load(options, &args.files);
    let unresolved = loaded.cli.config_context().validate();
    spinner.finish_and_clear();
    output::set_color(loaded.cli.color());

    if loaded.sources.is_empty() {
        output::warning("No configuration files found");
    }
    for failure in &loaded.failures {
        output::error(&failure.describe());
    }
    // with --skip-unknown these were accepted, so they only warrant a warning
    if options.skip_unknown {
        if let Err(err) = unresolved {
            output::warning(&err.to_string());
        }
    }

    if !loaded.is_ok() {
        bail!(
            "Configuration is invalid: {} problem(s) found",
            loaded.failures.len()
        );
    }

    let config = loaded.cli.config_context();
    output::success(&format!(
        "Configuration is valid: {} entries, generation {}",
        config.entries().len(),
        config.generation()
    ));
    for source in &loaded.sources {
        output::kv("Source", source.as_str());
    }
    Ok(())
}

/// One log entry as printed by `config show`
#[derive(Debug, Serialize)]
struct EntryView {
    generation: u64,
    #[serde(rename = "type")]
    config_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    description: String,
    known: bool,
    config: serde_json::Value,
}

impl EntryView {
    fn new(entry: &AppliedConfig) -> Result<Self> {
        let config = entry.config();
        Ok(Self {
            generation: entry.generation(),
            config_type: config.config_type().to_string(),
            name: config.name().map(str::to_string),
            description: entry.description().to_string(),
            known: config.is_known(),
            config: config.to_value()?,
        })
    }
}

fn show(args: ConfigShowArgs, options: &LoadOptions) -> Result<()> {
    let loaded = loader::load(options, &args.files);
    output::set_color(loaded.cli.color());
    warn_failures(&loaded);

    let config = loaded.cli.config_context();
    let entries = config
        .entries()
        .iter()
        .map(|entry| EntryView::new(entry))
        .collect::<Result<Vec<_>>>()?;

    if args.json || loaded.cli.json_output() {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    output::header(&format!("Configuration log (generation {})", config.generation()));
    if entries.is_empty() {
        output::info("No configuration applied");
    }
    for entry in &entries {
        println!();
        output::kv("Generation", &entry.generation.to_string());
        output::kv("Type", &entry.config_type);
        if let Some(name) = &entry.name {
            output::kv("Name", name);
        }
        output::kv("Description", &entry.description);
        output::kv("Known", if entry.known { "yes" } else { "no" });
    }
    Ok(())
}

fn types(args: ConfigTypesArgs) -> Result<()> {
    let scheme = default_scheme();
    if args.usage {
        print!("{}", scheme.usage());
        return Ok(());
    }

    output::header("Configuration types");
    for name in scheme.known_types() {
        println!("  {}", name);
    }
    Ok(())
}

pub(crate) fn warn_failures(loaded: &Loaded) {
    for failure in &loaded.failures {
        output::warning(&failure.describe());
    }
}
