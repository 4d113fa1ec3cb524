//! Built-in wire strategies for restmap.
//!
//! Two implementations of the `restmap_core::Serializer` contract:
//! - `JsonSerializer`: structured text (`application/json`)
//! - `FormSerializer`: flat key-value pairs (`application/x-www-form-urlencoded`)
//!
//! Plus the serde_json bridging functions used to move between `Value` and
//! `serde_json::Value`.

mod convert;
mod form;
mod json;

pub use convert::{json_to_value, value_to_json};
pub use form::FormSerializer;
pub use json::JsonSerializer;
