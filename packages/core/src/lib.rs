//! Core restmap: value model and wire contracts.
//!
//! This layer holds the types everything else converts through:
//! - `Value`: tree-shaped wire value (the generic key-value structure)
//! - `Map`: string-keyed, deterministically ordered mapping of `Value`s
//! - `WireFormat`: MIME-type hint for wire text
//! - `Serializer`: strategy contract between wire text and `Map`
//! - `Error`: every error kind the mapping layer surfaces
//!
//! # Example
//!
//! ```rust
//! use restmap_core::{Map, Value};
//!
//! let mut map = Map::new();
//! map.insert("name".to_string(), Value::from("Some API"));
//! assert!(map["name"].is_truthy());
//! ```

mod error;
mod value;
mod wire;

pub use error::{Error, Result};
pub use value::{Map, Value};
pub use wire::{Serializer, WireFormat};
