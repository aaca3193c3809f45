/* Inspect command - show schema identities, fields and enum constants */

use clap::ValueEnum;
use params_gen::params::value::FieldValue;
use std::path::PathBuf;

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Text,
    Json,
}

/* Execute the inspect command */
pub fn run(files: Vec<PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let schemas = super::codegen::load_definitions(&files, false)?;

    match format {
        OutputFormat::Text => {
            for (def_name, params) in &schemas {
                println!("{def_name}:");
                println!("  struct: {}", params.name());
                println!("  fields:");
                for (field, field_type) in params.fields().iter().zip(params.types()) {
                    println!("    {field}: {field_type}");
                }
                let constants = params.constant_names();
                if !constants.is_empty() {
                    println!("  constants:");
                    for name in constants {
                        println!("    {name} = {}", params.get_enum(name)?);
                    }
                }
                let aliases = params.alias_names();
                if !aliases.is_empty() {
                    println!("  aliases:");
                    for alias in aliases {
                        println!("    {alias} -> {}", params.enum_from_alias(alias)?);
                    }
                }
            }
        }
        OutputFormat::Json => {
            let mut entries = Vec::with_capacity(schemas.len());
            for (def_name, params) in &schemas {
                let fields: Vec<serde_json::Value> = params
                    .fields()
                    .iter()
                    .zip(params.types())
                    .map(|(field, field_type)| {
                        serde_json::json!({ "name": field, "type": field_type.to_string() })
                    })
                    .collect();
                let mut constants = serde_json::Map::new();
                for name in params.constant_names() {
                    constants.insert(name.to_string(), value_to_json(&params.get_enum(name)?));
                }
                entries.push(serde_json::json!({
                    "name": def_name,
                    "struct": params.name(),
                    "fields": fields,
                    "constants": constants,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}

fn value_to_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Bool(b) => serde_json::Value::from(*b),
        FieldValue::Int(v) => serde_json::Value::from(*v),
        FieldValue::Float(f) => serde_json::Value::from(*f),
        other => serde_json::Value::from(other.to_string()),
    }
}
