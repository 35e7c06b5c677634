use serde_json::Value;

use crate::models::Record;

/// Builds the text that gets embedded for a record.
///
/// Reads a fixed list of fields in a fixed order, drops null or empty values
/// and joins the rest with the separator. Strings contribute their value,
/// numbers their decimal form; booleans and nested values contribute nothing.
/// An empty result means the record cannot be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextProjector {
    fields: Vec<String>,
    separator: String,
}

impl TextProjector {
    pub const DEFAULT_SEPARATOR: &'static str = ". ";

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            separator: Self::DEFAULT_SEPARATOR.to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn project(&self, record: &Record) -> String {
        self.fields
            .iter()
            .filter_map(|field| record.get(field).and_then(render))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

impl Default for TextProjector {
    /// Display name then e-mail, the shape of a directory user
    fn default() -> Self {
        Self::new(["name", "email"])
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
