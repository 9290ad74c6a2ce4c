//! Attributes command

use anyhow::Result;
use ocm_context::attributes::default_scheme;
use ocm_context::Context;
use serde::Serialize;

use crate::cli::AttributesArgs;
use crate::commands::config::warn_failures;
use crate::loader::{self, LoadOptions};
use crate::output;

#[derive(Debug, Serialize)]
struct AttributeView {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    description: String,
    value: Option<serde_json::Value>,
}

pub fn run(args: AttributesArgs, options: &LoadOptions) -> Result<()> {
    let loaded = loader::load(options, &[]);
    output::set_color(loaded.cli.color());
    warn_failures(&loaded);

    let attributes = loaded.cli.attributes();
    let views: Vec<AttributeView> = default_scheme()
        .types()
        .into_iter()
        .map(|typ| {
            let value = match attributes.encode(typ.name()) {
                Ok(Some(data)) => serde_json::from_slice(&data).ok(),
                Ok(None) => None,
                Err(err) => {
                    tracing::debug!(attribute = typ.name(), error = %err, "attribute not encodable");
                    None
                }
            };
            AttributeView {
                name: typ.name().to_string(),
                alias: typ.short_name().map(str::to_string),
                description: typ.description().to_string(),
                value,
            }
        })
        .collect();

    if args.json || loaded.cli.json_output() {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    output::header("Attributes");
    for view in &views {
        println!();
        output::kv("Name", &view.name);
        if let Some(alias) = &view.alias {
            output::kv("Alias", alias);
        }
        output::kv("Description", &view.description);
        if let Some(value) = &view.value {
            output::kv("Value", &value.to_string());
        }
    }
    Ok(())
}
