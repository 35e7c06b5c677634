use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lookup::lookup_path;

/// Stored as the labels existing collections already hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "Ativo")]
    Active,
    #[serde(rename = "Bloqueado")]
    Suspended,
}

/// A directory user in the shape that gets embedded and stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub name: Option<String>,
    /// Lowercased and trimmed; `None` when the directory has no primary address
    pub email: Option<String>,
    pub status: UserStatus,
    pub is_admin: Option<bool>,
    pub last_login_time: Option<String>,
    /// Custom-schema values, keyed by field name
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl DirectoryUser {
    /// Flat field map, ready to be used as a sync record
    pub fn into_fields(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPage {
    pub users: Vec<DirectoryUser>,
    pub next_page_token: Option<String>,
}

/// A custom-schema field copied onto every user (`customSchemas.<schema>.<field>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomField {
    pub schema: String,
    pub field: String,
}

/// User resource as returned by the Admin Directory API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleUser {
    pub name: Option<GoogleUserName>,
    pub primary_email: Option<String>,
    #[serde(default)]
    pub suspended: bool,
    pub is_admin: Option<bool>,
    pub last_login_time: Option<String>,
    pub custom_schemas: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleUserName {
    pub full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleUserList {
    #[serde(default)]
    pub users: Vec<GoogleUser>,
    pub next_page_token: Option<String>,
}

impl GoogleUser {
    pub(crate) fn into_directory_user(self, custom_field: Option<&CustomField>) -> DirectoryUser {
        let mut custom = Map::new();
        if let Some(custom_field) = custom_field {
            let value = self
                .custom_schemas
                .as_ref()
                .and_then(|schemas| {
                    lookup_path(
                        schemas,
                        &[custom_field.schema.as_str(), custom_field.field.as_str()],
                    )
                })
                .cloned()
                .unwrap_or(Value::Null);
            custom.insert(custom_field.field.clone(), value);
        }

        DirectoryUser {
            name: self.name.and_then(|name| name.full_name),
            email: self
                .primary_email
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty()),
            status: if self.suspended {
                UserStatus::Suspended
            } else {
                UserStatus::Active
            },
            is_admin: self.is_admin,
            last_login_time: self.last_login_time,
            custom,
        }
    }
}
