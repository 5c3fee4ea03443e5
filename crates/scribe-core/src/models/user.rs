//! User record and display derivation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Authenticated user as returned by the backend.
///
/// Name fields are optional; display helpers fall back in the order
/// first+last -> first only -> email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub preferences: BTreeMap<String, serde_json::Value>,
}

impl User {
    /// Human-readable name for greeting/profile display.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (trimmed(self.first_name.as_deref()), trimmed(self.last_name.as_deref())) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            _ => self.email.clone(),
        }
    }

    /// Up to two uppercase initials, falling back to the email's first letter.
    #[must_use]
    pub fn initials(&self) -> String {
        let first = trimmed(self.first_name.as_deref()).and_then(|name| name.chars().next());
        let last = trimmed(self.last_name.as_deref()).and_then(|name| name.chars().next());
        match (first, last) {
            (Some(first), Some(last)) => format!("{first}{last}").to_uppercase(),
            (Some(first), None) => first.to_uppercase().to_string(),
            _ => self
                .email
                .chars()
                .next()
                .map(|letter| letter.to_uppercase().to_string())
                .unwrap_or_default(),
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
