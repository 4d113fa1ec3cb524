//! # restmap-client
//!
//! Declarative mapping from a described HTTP API to typed client objects.
//!
//! A `Schema` declares a resource type once - its fields, nested
//! relations, actions, and behavioral options. Instances are created from
//! a URL and populate themselves lazily: the first access of an unresolved
//! attribute performs exactly one fetch, converts the response through the
//! field descriptors, and the instance stays populated from then on.
//!
//! ```ignore
//! use restmap_client::{Field, GetOptions, Resource, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new("SomeClient")
//!     .field(Field::text("version"))
//!     .field(Field::text("name"))
//!     .field(Field::text("description").optional())
//!     .build()?;
//!
//! let client = Resource::get(schema, "http://example.com/some-resource")?;
//! assert_eq!(client.attr("name")?.as_str(), Some("Some API"));
//! ```
//!
//! Actions are declared remote operations bound to the instance:
//!
//! ```ignore
//! use restmap_client::{Action, ResponseKind};
//!
//! let action = Action::new("reorder", "reorder")
//!     .with_required_params(["order"])
//!     .with_response(ResponseKind::Mapping);
//! // attach via SchemaBuilder::action, invoke via resource.invoke("reorder", params)
//! ```
//!
//! The HTTP seam is the `Transport` trait; the built-in `HttpTransport`
//! wraps a blocking `reqwest` client and is shared across every load and
//! action call an instance (and its nested resources) issues.

mod action;
mod field;
mod object;
mod resource;
mod schema;
mod transport;
mod urls;

pub use action::{Action, ActionOutcome, ResponseKind};
pub use field::{Field, FieldValue};
pub use object::{invert_aliases, AliasTable, ObjectValue};
pub use resource::{GetOptions, Resource};
pub use schema::{Schema, SchemaBuilder};
pub use transport::{HttpTransport, Method, Transport, WireRequest, WireResponse};

// Re-export core types for convenience
pub use restmap_core::{Error, Map, Result, Serializer, Value, WireFormat};
