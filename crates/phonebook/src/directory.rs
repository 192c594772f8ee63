//! In-memory contact directory
//!
//! The directory is the single shared resource of the service. Every
//! read-modify-write sequence (duplicate check followed by append, lookup
//! followed by removal) runs under one write guard so the id and name
//! uniqueness invariants hold with parallel request handling.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use thiserror::Error;

use crate::contact::{seed_contacts, Contact, NewContact};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Name and number are required")]
    Validation,
    #[error("Person \"{name}\" already exists")]
    Conflict { name: String },
    #[error("person not found")]
    NotFound { id: u64 },
    #[error("no contact id left to assign")]
    IdsExhausted,
}

/// Snapshot returned by [`Directory::info`]
#[derive(Debug, Clone)]
pub struct DirectoryInfo {
    pub count: usize,
    pub generated_at: DateTime<Local>,
}

/// Ordered, process-lifetime collection of live contacts
#[derive(Debug, Default)]
pub struct Directory {
    contacts: RwLock<Vec<Contact>>,
}

impl Directory {
    /// Empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the fixed startup set
    pub fn seeded() -> Self {
        Self::from_contacts(seed_contacts())
    }

    pub fn from_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: RwLock::new(contacts),
        }
    }

    /// All contacts in insertion order
    pub fn list(&self) -> Vec<Contact> {
        self.contacts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.contacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.read().is_empty()
    }

    /// Current size together with the local time of the call
    pub fn info(&self) -> DirectoryInfo {
        DirectoryInfo {
            count: self.len(),
            generated_at: Local::now(),
        }
    }

    pub fn get(&self, id: u64) -> Result<Contact, DirectoryError> {
        self.contacts
            .read()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(DirectoryError::NotFound { id })
    }

    /// Remove the contact carrying `id`. Removal is permanent.
    pub fn remove(&self, id: u64) -> Result<Contact, DirectoryError> {
        self.remove_with_len(id).map(|(contact, _)| contact)
    }

    /// Like [`Directory::remove`], also returning the size left behind as seen
    /// under the same write guard.
    pub fn remove_with_len(&self, id: u64) -> Result<(Contact, usize), DirectoryError> {
        let mut contacts = self.contacts.write();
        let index = contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(DirectoryError::NotFound { id })?;
        let removed = contacts.remove(index);
        Ok((removed, contacts.len()))
    }

    /// Validate, check for a duplicate name, assign an id and append.
    ///
    /// The id is the current maximum plus one (1 when empty), so the id of a
    /// deleted maximum can be handed out again.
    pub fn create(&self, payload: NewContact) -> Result<Contact, DirectoryError> {
        self.create_with_len(payload).map(|(contact, _)| contact)
    }

    /// Like [`Directory::create`], also returning the size after the append.
    pub fn create_with_len(&self, payload: NewContact) -> Result<(Contact, usize), DirectoryError> {
        let (name, number) = payload.validate()?;

        let mut contacts = self.contacts.write();

        if contacts.iter().any(|c| c.has_name(&name)) {
            return Err(DirectoryError::Conflict { name });
        }

        let id = next_id(&contacts)?;
        let contact = Contact { id, name, number };
        contacts.push(contact.clone());

        Ok((contact, contacts.len()))
    }
}

fn next_id(contacts: &[Contact]) -> Result<u64, DirectoryError> {
    match contacts.iter().map(|c| c.id).max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or(DirectoryError::IdsExhausted),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A fresh name always lands at max id + 1 and grows the directory by one.
        #[test]
        fn prop_create_assigns_next_id(
            ids in prop::collection::hash_set(1u64..1000, 0..20),
        ) {
            let contacts: Vec<Contact> = ids
                .iter()
                .map(|id| Contact::new(*id, format!("seed-{}", id), "0"))
                .collect();
            let expected = ids.iter().max().map_or(1, |m| m + 1);
            let dir = Directory::from_contacts(contacts);
            let before = dir.len();

            let created = dir.create(NewContact::new("fresh name", "1")).unwrap();
            prop_assert_eq!(created.id, expected);
            prop_assert_eq!(dir.len(), before + 1);
        }

        /// Any casing of an existing name is rejected and leaves the size unchanged.
        #[test]
        fn prop_duplicate_any_case_conflicts(
            name in "[a-zA-Z]{1,12}( [a-zA-Z]{1,12})?",
            flips in prop::collection::vec(any::<bool>(), 25),
        ) {
            let dir = Directory::new();
            dir.create(NewContact::new(name.clone(), "1")).unwrap();

            let recased: String = name
                .chars()
                .zip(flips.iter().cycle())
                .map(|(ch, flip)| if *flip { ch.to_ascii_uppercase() } else { ch.to_ascii_lowercase() })
                .collect();

            let result = dir.create(NewContact::new(recased, "2"));
            let is_conflict = matches!(result, Err(DirectoryError::Conflict { .. }));
            prop_assert!(is_conflict);
            prop_assert_eq!(dir.len(), 1);
        }

        /// Missing or blank fields never change the directory.
        #[test]
        fn prop_incomplete_payload_rejected(
            name in prop::option::of("[ \t]{0,3}"),
            number in prop::option::of("[0-9-]{1,10}"),
        ) {
            let dir = Directory::seeded();
            let result = dir.create(NewContact { name, number });
            prop_assert_eq!(result, Err(DirectoryError::Validation));
            prop_assert_eq!(dir.len(), 4);
        }

        /// Unknown ids are reported missing by both lookup and removal.
        #[test]
        fn prop_unknown_id_not_found(id in 5u64..u64::MAX) {
            let dir = Directory::seeded();
            prop_assert_eq!(dir.get(id), Err(DirectoryError::NotFound { id }));
            prop_assert_eq!(dir.remove(id), Err(DirectoryError::NotFound { id }));
            prop_assert_eq!(dir.len(), 4);
        }
    }
}
