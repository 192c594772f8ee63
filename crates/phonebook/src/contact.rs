//! Contact records and the create payload

use serde::{Deserialize, Serialize};

use crate::directory::DirectoryError;

/// A single phonebook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub number: String,
}

impl Contact {
    pub fn new(id: u64, name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            number: number.into(),
        }
    }

    /// Case-insensitive name comparison used for uniqueness checks
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Body of `POST /api/persons`. The id is always assigned by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}

impl NewContact {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            number: Some(number.into()),
        }
    }

    /// Check that both fields are present and non-blank.
    ///
    /// Returns the trimmed `(name, number)` pair that will be stored.
    pub fn validate(&self) -> Result<(String, String), DirectoryError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let number = self.number.as_deref().map(str::trim).unwrap_or_default();

        if name.is_empty() || number.is_empty() {
            return Err(DirectoryError::Validation);
        }

        Ok((name.to_string(), number.to_string()))
    }
}

/// Contacts the directory starts with when seeding is enabled.
pub fn seed_contacts() -> Vec<Contact> {
    vec![
        Contact::new(1, "Arto Hellas", "040-123456"),
        Contact::new(2, "Ada Lovelace", "39-44-5323523"),
        Contact::new(3, "Dan Abramov", "12-43-234345"),
        Contact::new(4, "Mary Poppendieck", "39-23-6423122"),
    ]
}
