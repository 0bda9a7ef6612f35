use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// A submitted registration form, as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("Please enter a name")]
    Missing,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("Please enter an email address")]
    Missing,
    #[error("Please enter a valid email address")]
    Malformed,
}

/// Per-field validation failures. Every field is checked, so several may be
/// set at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub name: Option<NameError>,
    pub email: Option<EmailError>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Messages {
            #[serde(skip_serializing_if = "Option::is_none")]
            name: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            email: Option<String>,
        }

        Messages {
            name: self.name.map(|e| e.to_string()),
            email: self.email.map(|e| e.to_string()),
        }
        .serialize(serializer)
    }
}

impl UserForm {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let errors = FieldErrors {
            name: validate_name(&self.name).err(),
            email: validate_email(&self.email).err(),
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.trim().is_empty() {
        return Err(NameError::Missing);
    }
    Ok(())
}

/// The shape check runs on the untrimmed value, so surrounding whitespace
/// makes an address malformed.
pub fn validate_email(email: &str) -> Result<(), EmailError> {
    if email.trim().is_empty() {
        return Err(EmailError::Missing);
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(EmailError::Malformed);
    }
    Ok(())
}
