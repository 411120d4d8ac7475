//! # Output Schemas
//!
//! The required shape of a flow's reply: a flat JSON object of named,
//! required text fields. A schema renders two ways:
//! - as JSON Schema, for providers with a structured-output mode
//! - as plain prompt instructions, for every provider

use serde::Serialize;
use serde_json::{json, Map, Value};

/// One required string field of the output object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextField {
    pub name: &'static str,
    pub description: &'static str,
}

impl TextField {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSchema {
    /// Identifier sent to providers that want a schema name
    pub name: &'static str,
    pub fields: Vec<TextField>,
}

impl OutputSchema {
    pub fn new(name: &'static str, fields: Vec<TextField>) -> Self {
        Self { name, fields }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(
                field.name.to_string(),
                json!({
                    "type": "string",
                    "description": field.description,
                }),
            );
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.field_names().collect::<Vec<_>>(),
            "additionalProperties": false,
        })
    }

    /// Render as instructions appended to the system prompt
    pub fn to_instructions(&self) -> String {
        let mut out = String::new();
        out.push_str("Respond with a single JSON object and nothing else. ");
        out.push_str("It must contain exactly these string fields:\n");
        for field in &self.fields {
            out.push_str(&format!("- \"{}\": {}\n", field.name, field.description));
        }
        out.push_str("Do not wrap the object in Markdown and do not add commentary.");
        out
    }
}
