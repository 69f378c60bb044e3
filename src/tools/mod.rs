pub mod amap;
pub mod recipes;

pub use amap::{AmapClient, PoiSearch, SearchNearbyArgs, SearchReply};
pub use recipes::{RecipeLookup, RecipeStore};

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

/// Validate tool-call arguments against the schema advertised to the
/// model. Returns the joined violation messages on mismatch.
pub fn validate_args(schema: &Value, arguments: &Value) -> Result<(), String> {
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|e| format!("Invalid tool schema: {}", e))?;

    if let Err(errors) = compiled.validate(arguments) {
        let messages: Vec<String> = errors
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        return Err(messages.join("; "));
    }

    Ok(())
}

/// Pull the parameter schema for `name` out of a tools definition list.
pub fn parameters_schema<'a>(tools: &'a [Value], name: &str) -> Option<&'a Value> {
    tools.iter().find_map(|tool| {
        let function = tool.get("function")?;
        if function.get("name")?.as_str()? == name {
            function.get("parameters")
        } else {
            None
        }
    })
}
