//! phonebook: in-memory contact directory served over HTTP
//!
//! Contacts are held for the lifetime of the process. The service lists,
//! fetches, creates and deletes them; there is no update operation.

pub mod access_log;
pub mod api;
pub mod config;
pub mod contact;
pub mod directory;
pub mod metrics;
pub mod server;

pub use config::ServerConfig;
pub use contact::{Contact, NewContact};
pub use directory::{Directory, DirectoryError};
pub use server::PhonebookServer;
