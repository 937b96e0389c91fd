//! Wire protocol for the abr browser-automation service.
//!
//! This crate owns everything a command goes through before it reaches a
//! session: the action catalog, the two-phase validator, the typed
//! [`Command`] it produces, and the [`Response`] envelope written back.
//!
//! It has no async runtime and no knowledge of providers, so clients can
//! depend on it to pre-validate commands locally.

pub mod command;
pub mod cookie;
pub mod error;
pub mod parse;
pub mod response;
pub mod schema;

pub use command::{Action, Command, DEFAULT_SESSION};
pub use cookie::{Cookie, SameSite};
pub use error::{Exclusivity, Reason, ValidationError};
pub use parse::{parse_command, parse_value};
pub use response::{ErrorBody, ErrorCode, Response};
pub use schema::{ActionKind, ActionSchema, Family, FieldType, schema_for, schemas};
