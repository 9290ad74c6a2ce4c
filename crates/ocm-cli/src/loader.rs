//! Layered loading of configuration into a fresh CLI context
//!
//! Sources are applied lowest precedence first:
//! 1. `~/.ocmconfig`, if present
//! 2. the file named by `OCM_CONFIG`
//! 3. `--config` files, then files given to the command
//! 4. `--attribute` settings

use anyhow::{Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use ocm_context::config::{AttributesConfig, BuilderMode, ConfigBuilder, ConfigObject};
use ocm_context::context::ConfigProvider;
use ocm_context::{AttributesContext, Error};

use crate::context::{CliContext, CliCore};

/// Environment variable naming an additional configuration file
pub const CONFIG_ENV: &str = "OCM_CONFIG";

/// Name of the user configuration file in the home directory
pub const DEFAULT_CONFIG_FILE: &str = ".ocmconfig";

/// Description of the entry carrying `--attribute` settings
pub const ATTRIBUTES_SOURCE: &str = "command line attributes";

/// Sources selected by the global flags
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_files: Vec<Utf8PathBuf>,
    pub attributes: Vec<(String, String)>,
    pub skip_unknown: bool,
}

/// A source that could not be loaded or applied
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: anyhow::Error,
}

impl SourceFailure {
    /// Error message naming the failed source
    pub fn describe(&self) -> String {
        let message = format!("{:#}", self.error);
        if message.contains(&self.source) {
            message
        } else {
            format!("{}: {}", self.source, message)
        }
    }
}

/// Result of loading all sources
pub struct Loaded {
    pub cli: CliContext,
    pub sources: Vec<Utf8PathBuf>,
    pub failures: Vec<SourceFailure>,
}

impl Loaded {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// `~/.ocmconfig`, if the home directory is known
pub fn default_config_file() -> Option<Utf8PathBuf> {
    dirs::home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .map(|home| home.join(DEFAULT_CONFIG_FILE))
}

/// Configuration files in the order they are applied
pub fn config_sources(options: &LoadOptions, files: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
    let mut sources = Vec::new();
    if let Some(default) = default_config_file().filter(|path| path.is_file()) {
        sources.push(default);
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            sources.push(Utf8PathBuf::from(path));
        }
    }
    sources.extend(options.config_files.iter().cloned());
    sources.extend(files.iter().cloned());
    sources
}

/// Load every source into a new CLI context.
///
/// A failing source does not stop the remaining ones from being applied.
pub fn load(options: &LoadOptions, files: &[Utf8PathBuf]) -> Loaded {
    let config = ConfigBuilder::new().build(BuilderMode::Defaulted);
    config.skip_unknown_config(options.skip_unknown);
    let cli = CliCore::create(config);

    let sources = config_sources(options, files);
    let mut failures = Vec::new();
    for path in &sources {
        if let Err(error) = apply_file(&cli, path) {
            failures.push(SourceFailure {
                source: path.to_string(),
                error,
            });
        }
    }

    if !options.attributes.is_empty() {
        if let Err(error) = apply_attributes(&cli, &options.attributes) {
            failures.push(SourceFailure {
                source: ATTRIBUTES_SOURCE.to_string(),
                error,
            });
        }
    }

    failures.extend(dry_run(&cli));

    Loaded {
        cli,
        sources,
        failures,
    }
}

/// Replay the whole log into a scratch attributes context.
///
/// Attribute settings reach the shared attributes only when they are read,
/// so invalid ones would otherwise go unnoticed. Unknown types were already
/// reported when their documents were applied.
pub fn dry_run(cli: &CliContext) -> Vec<SourceFailure> {
    let scratch = AttributesContext::new(None);
    let report = cli.config_context().apply_to(0, &scratch);
    report
        .errors
        .into_iter()
        .filter(|err| !err.is_unknown_config_kind())
        .map(|err| SourceFailure {
            source: match &err {
                Error::Apply { description, .. } => description.clone(),
                _ => "configuration log".to_string(),
            },
            error: err.into(),
        })
        .collect()
}

/// Apply one configuration file, described by its path
pub fn apply_file(cli: &CliContext, path: &Utf8Path) -> Result<()> {
    tracing::debug!(path = %path, "loading config file");
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path))?;
    let config = cli.config_context();
    let object = config
        .decode(&data)
        .with_context(|| format!("Failed to decode {}", path))?;
    config.apply_config(object, path.as_str())?;
    Ok(())
}

/// Apply `--attribute` settings as one attributes configuration.
///
/// Values are parsed as YAML scalars or documents; anything that does not
/// parse is taken as a plain string.
pub fn apply_attributes(cli: &CliContext, attributes: &[(String, String)]) -> Result<()> {
    let mut config = AttributesConfig::new();
    for (name, value) in attributes {
        let value = serde_yaml_ng::from_str::<serde_json::Value>(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
        config
            .add_attribute(name, value)
            .with_context(|| format!("Invalid attribute {}", name))?;
    }
    cli.config_context()
        .apply_config(ConfigObject::new(config), ATTRIBUTES_SOURCE)?;
    Ok(())
}
