//! Cascade-of-Care Schema
//!
//! Loads the engine's campaign schema and builds records against it.
//! Every field written through a [`Record`] is checked for existence,
//! type and range, so a campaign that builds is a campaign the engine
//! can parse.

mod error;
pub mod record;
pub mod schema;

pub use error::{SchemaError, SchemaResult};
pub use record::Record;
pub use schema::{ClassDef, FieldDef, FieldType, Schema};
