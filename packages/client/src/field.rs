//! Field descriptors: typed conversion units attached to a schema.
//!
//! A `Field` declares one named attribute of a resource type and knows how
//! to convert its value between wire form and host form. The nested-resource
//! kinds additionally resolve related resources - inline, from a partial
//! mapping, or from a bare identifier.

use std::rc::Rc;
use std::sync::Arc;

use url::Url;

use restmap_core::{Error, Map, Result, Value};

use crate::object::{invert_aliases, AliasTable, ObjectValue};
use crate::resource::Resource;
use crate::schema::Schema;
use crate::urls::join_relative;

/// What an attribute slot holds after conversion.
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// A plain wire-shaped value.
    Value(Value),
    /// An anonymous structured object.
    Object(ObjectValue),
    /// A related resource.
    Resource(Rc<Resource>),
    /// A sequence of related resources.
    ResourceList(Vec<Rc<Resource>>),
}

impl FieldValue {
    /// The inner value, if this slot holds a plain value.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// String view of a plain value slot.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// Integer view of a plain value slot.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    /// Float view of a plain value slot.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    /// Boolean view of a plain value slot.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    /// The anonymous object, if this slot holds one.
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            FieldValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The related resource, if this slot holds one.
    pub fn as_resource(&self) -> Option<&Rc<Resource>> {
        match self {
            FieldValue::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// The related resources, if this slot holds a sequence of them.
    pub fn as_resource_list(&self) -> Option<&[Rc<Resource>]> {
        match self {
            FieldValue::ResourceList(list) => Some(list),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

/// A nested-resource declaration: the related type's schema plus the
/// templated relative path its instances live under.
#[derive(Clone)]
struct Related {
    schema: Arc<Schema>,
    relative_path: String,
    /// Identifier field named by the path's `{placeholder}` token.
    placeholder: String,
}

impl Related {
    fn new(attr_name: &str, schema: Arc<Schema>, relative_path: &str) -> Result<Self> {
        let start = relative_path.find('{');
        let end = relative_path.find('}');
        let placeholder = match (start, end) {
            (Some(s), Some(e)) if s < e => relative_path[s + 1..e].to_string(),
            _ => {
                return Err(Error::invalid_argument(format!(
                    "nested field '{}': relative path '{}' has no identifier placeholder",
                    attr_name, relative_path
                )))
            }
        };

        Ok(Self {
            schema,
            relative_path: relative_path.to_string(),
            placeholder,
        })
    }

    /// Wire name of the identifier field, when the related schema declares
    /// it; otherwise the placeholder itself.
    fn id_wire_name(&self) -> String {
        self.schema
            .find_field(&self.placeholder)
            .map(|f| f.wire_name().to_string())
            .unwrap_or_else(|| self.placeholder.clone())
    }

    /// Substitute the identifier into the template and join it onto the
    /// owner's base URL.
    fn resolve_url(&self, field_name: &str, id: &Value, owner: &Resource) -> Result<Url> {
        let base = owner.url().ok_or_else(|| {
            Error::invalid_argument(format!(
                "nested field '{}': owning resource has no base URL",
                field_name
            ))
        })?;
        let id_text = id.coerce_string().ok_or_else(|| Error::Conversion {
            field: field_name.to_string(),
            message: "related identifier is not a scalar".to_string(),
        })?;

        let token = format!("{{{}}}", self.placeholder);
        let path = self.relative_path.replace(&token, &id_text);
        Ok(Url::parse(&join_relative(base.as_str(), &path))?)
    }

    /// Resolve one related resource from its wire value.
    ///
    /// - a mapping carrying every required field of the related schema is
    ///   the full representation: populated in place, no fetch;
    /// - a mapping carrying at least the identifier is partial: a lazy
    ///   instance at the templated URL, seeded with what it did bring;
    /// - a bare scalar is id-only: a lazy instance at the templated URL.
    fn resolve_one(&self, field_name: &str, value: Value, owner: &Resource) -> Result<Rc<Resource>> {
        match value {
            Value::Map(map) => {
                let normalized = self.schema.normalize_keys(&map);
                let id_key = self.schema.normalize_wire_name(&self.id_wire_name());

                let is_full = self
                    .schema
                    .fields()
                    .iter()
                    .filter(|f| f.required() && f.default().is_none())
                    .all(|f| {
                        normalized.contains_key(&self.schema.normalize_wire_name(f.wire_name()))
                    });

                if is_full {
                    let url = normalized
                        .get(&id_key)
                        .and_then(|id| self.resolve_url(field_name, id, owner).ok());
                    let resource = Resource::nested(
                        self.schema.clone(),
                        url,
                        owner.transport().clone(),
                        owner.strict(),
                    );
                    resource.populate_from_wire(&map)?;
                    Ok(Rc::new(resource))
                } else {
                    let id = normalized.get(&id_key).ok_or_else(|| Error::Conversion {
                        field: field_name.to_string(),
                        message: format!(
                            "partial related value is missing identifier '{}'",
                            self.placeholder
                        ),
                    })?;
                    let url = self.resolve_url(field_name, id, owner)?;
                    let resource = Resource::nested(
                        self.schema.clone(),
                        Some(url),
                        owner.transport().clone(),
                        owner.strict(),
                    );
                    resource.seed_from_wire(&map)?;
                    Ok(Rc::new(resource))
                }
            }
            scalar => {
                let url = self.resolve_url(field_name, &scalar, owner)?;
                Ok(Rc::new(Resource::nested(
                    self.schema.clone(),
                    Some(url),
                    owner.transport().clone(),
                    owner.strict(),
                )))
            }
        }
    }
}

/// Per-kind conversion semantics.
#[derive(Clone)]
enum FieldKind {
    /// Identity conversion.
    Raw,
    /// Coerce scalars to string, with optional normalization.
    Text { trim: bool, lowercase: bool },
    /// Truthiness coercion (not parsing).
    Boolean,
    /// Generic numeric coercion.
    Number,
    /// Numeric coercion, flooring non-integral input.
    Integer,
    /// Numeric coercion to float.
    Float,
    /// Requires sequence input; items pass through.
    List,
    /// Anonymous structured object with a key-alias table.
    Object { aliases: AliasTable },
    /// To-one related resource.
    ToOne(Related),
    /// To-many related resources.
    ToMany(Related),
}

/// Declares one named attribute of a resource type.
#[derive(Clone)]
pub struct Field {
    attr_name: String,
    wire_name: String,
    required: bool,
    default: Option<Value>,
    kind: FieldKind,
}

impl Field {
    fn with_kind(attr_name: impl Into<String>, kind: FieldKind) -> Self {
        let attr_name = attr_name.into();
        Self {
            wire_name: attr_name.clone(),
            attr_name,
            required: true,
            default: None,
            kind,
        }
    }

    /// An identity-conversion field.
    pub fn raw(attr_name: impl Into<String>) -> Self {
        Self::with_kind(attr_name, FieldKind::Raw)
    }

    /// A text field.
    pub fn text(attr_name: impl Into<String>) -> Self {
        Self::with_kind(
            attr_name,
            FieldKind::Text {
                trim: false,
                lowercase: false,
            },
        )
    }

    /// A truthiness-coercing boolean field.
    pub fn boolean(attr_name: impl Into<String>) -> Self {
        Self::with_kind(attr_name, FieldKind::Boolean)
    }

    /// A generic numeric field.
    pub fn number(attr_name: impl Into<String>) -> Self {
        Self::with_kind(attr_name, FieldKind::Number)
    }

    /// An integer field. Non-integral input is floored.
    pub fn integer(attr_name: impl Into<String>) -> Self {
        Self::with_kind(attr_name, FieldKind::Integer)
    }

    /// A float field.
    pub fn float(attr_name: impl Into<String>) -> Self {
        Self::with_kind(attr_name, FieldKind::Float)
    }

    /// A sequence field. Input must be a sequence.
    pub fn list(attr_name: impl Into<String>) -> Self {
        Self::with_kind(attr_name, FieldKind::List)
    }

    /// An anonymous-object field with a key-alias table (wire key to host
    /// name, applied at every nesting depth).
    pub fn object(attr_name: impl Into<String>, aliases: AliasTable) -> Self {
        Self::with_kind(attr_name, FieldKind::Object { aliases })
    }

    /// A to-one nested resource.
    ///
    /// The relative path must carry a single `{placeholder}` token naming
    /// the related schema's identifier field.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the template has no placeholder.
    pub fn to_one(
        attr_name: impl Into<String>,
        schema: Arc<Schema>,
        relative_path: &str,
    ) -> Result<Self> {
        let attr_name = attr_name.into();
        let related = Related::new(&attr_name, schema, relative_path)?;
        Ok(Self::with_kind(attr_name, FieldKind::ToOne(related)))
    }

    /// A to-many nested resource. Same template rules as `to_one`.
    pub fn to_many(
        attr_name: impl Into<String>,
        schema: Arc<Schema>,
        relative_path: &str,
    ) -> Result<Self> {
        let attr_name = attr_name.into();
        let related = Related::new(&attr_name, schema, relative_path)?;
        Ok(Self::with_kind(attr_name, FieldKind::ToMany(related)))
    }

    /// Override the wire name (defaults to the attribute name).
    pub fn with_wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = name.into();
        self
    }

    /// Mark the field optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Declare a default, used when the wire value is absent. Any declared
    /// default counts, including falsy ones (`""`, `0`, `false`).
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Trim whitespace on text conversion. Only affects text fields.
    pub fn trimmed(mut self) -> Self {
        if let FieldKind::Text { trim, .. } = &mut self.kind {
            *trim = true;
        }
        self
    }

    /// Lower-case on text conversion. Only affects text fields.
    pub fn lowercased(mut self) -> Self {
        if let FieldKind::Text { lowercase, .. } = &mut self.kind {
            *lowercase = true;
        }
        self
    }

    /// Host attribute name.
    pub fn attr_name(&self) -> &str {
        &self.attr_name
    }

    /// Wire key this field reads from.
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Whether the field must appear in a response.
    pub fn required(&self) -> bool {
        self.required
    }

    /// The declared default, if any.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn conversion_error(&self, message: impl Into<String>) -> Error {
        Error::Conversion {
            field: self.attr_name.clone(),
            message: message.into(),
        }
    }

    /// Convert a wire value into host form.
    ///
    /// The owning instance supplies the base URL, transport session, and
    /// strictness that nested-resource resolution needs.
    pub fn from_wire(&self, value: Value, owner: &Resource) -> Result<FieldValue> {
        match &self.kind {
            FieldKind::Raw => Ok(FieldValue::Value(value)),
            FieldKind::Text { trim, lowercase } => {
                if value.is_null() {
                    return Ok(FieldValue::Value(Value::Null));
                }
                let mut text = value
                    .coerce_string()
                    .ok_or_else(|| self.conversion_error("cannot coerce value to text"))?;
                if *trim {
                    text = text.trim().to_string();
                }
                if *lowercase {
                    text = text.to_lowercase();
                }
                Ok(FieldValue::Value(Value::String(text)))
            }
            FieldKind::Boolean => Ok(FieldValue::Value(Value::Bool(value.is_truthy()))),
            FieldKind::Number | FieldKind::Float => {
                if value.is_null() {
                    return Ok(FieldValue::Value(Value::Null));
                }
                let n = value
                    .coerce_f64()
                    .ok_or_else(|| self.conversion_error("cannot coerce value to a number"))?;
                Ok(FieldValue::Value(Value::Float(n)))
            }
            FieldKind::Integer => {
                if value.is_null() {
                    return Ok(FieldValue::Value(Value::Null));
                }
                let n = value
                    .coerce_f64()
                    .ok_or_else(|| self.conversion_error("cannot coerce value to an integer"))?;
                Ok(FieldValue::Value(Value::Integer(n.floor() as i64)))
            }
            FieldKind::List => match value {
                Value::Array(_) => Ok(FieldValue::Value(value)),
                _ => Err(self.conversion_error("expected a sequence")),
            },
            FieldKind::Object { aliases } => Ok(FieldValue::Object(ObjectValue::from_value(
                value, aliases,
            ))),
            FieldKind::ToOne(related) => {
                if value.is_null() {
                    return Ok(FieldValue::Value(Value::Null));
                }
                Ok(FieldValue::Resource(related.resolve_one(
                    &self.attr_name,
                    value,
                    owner,
                )?))
            }
            FieldKind::ToMany(related) => match value {
                Value::Null => Ok(FieldValue::ResourceList(Vec::new())),
                Value::Array(items) => {
                    let resources = items
                        .into_iter()
                        .map(|item| related.resolve_one(&self.attr_name, item, owner))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(FieldValue::ResourceList(resources))
                }
                _ => Err(self.conversion_error("expected a sequence of related resources")),
            },
        }
    }

    /// Convert a host value back into wire form.
    ///
    /// Related resources serialize as their identifier (the reverse of
    /// id-only resolution); an instance whose identifier slot is unset
    /// cannot be serialized.
    pub fn to_wire(&self, value: &FieldValue) -> Result<Value> {
        match &self.kind {
            FieldKind::Object { aliases } => match value {
                FieldValue::Object(object) => object.to_value(&invert_aliases(aliases)),
                FieldValue::Value(v) => Ok(v.clone()),
                _ => Err(self.conversion_error("expected an object value")),
            },
            FieldKind::ToOne(related) => match value {
                FieldValue::Resource(resource) => self.related_id(related, resource),
                FieldValue::Value(v) if v.is_null() => Ok(Value::Null),
                _ => Err(self.conversion_error("expected a related resource")),
            },
            FieldKind::ToMany(related) => match value {
                FieldValue::ResourceList(resources) => {
                    let ids = resources
                        .iter()
                        .map(|r| self.related_id(related, r))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Value::Array(ids))
                }
                _ => Err(self.conversion_error("expected a sequence of related resources")),
            },
            _ => match value {
                FieldValue::Value(v) => Ok(v.clone()),
                _ => Err(self.conversion_error("expected a plain value")),
            },
        }
    }

    fn related_id(&self, related: &Related, resource: &Resource) -> Result<Value> {
        match resource.attr_if_set(&related.placeholder) {
            Some(FieldValue::Value(v)) => Ok(v),
            _ => Err(self.conversion_error(format!(
                "related resource has no '{}' identifier set",
                related.placeholder
            ))),
        }
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            FieldKind::Raw => "raw",
            FieldKind::Text { .. } => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::List => "list",
            FieldKind::Object { .. } => "object",
            FieldKind::ToOne(_) => "to_one",
            FieldKind::ToMany(_) => "to_many",
        };
        f.debug_struct("Field")
            .field("attr_name", &self.attr_name)
            .field("wire_name", &self.wire_name)
            .field("required", &self.required)
            .field("kind", &kind)
            .finish()
    }
}

/// Convert a wire map into wire values for the fields it covers, ignoring
/// absent ones. Used to seed partial nested resources.
pub(crate) fn convert_present(
    schema: &Schema,
    data: &Map,
    owner: &Resource,
) -> Result<Vec<(String, FieldValue)>> {
    let normalized = schema.normalize_keys(data);
    let mut converted = Vec::new();
    for field in schema.fields() {
        let key = schema.normalize_wire_name(field.wire_name());
        if let Some(raw) = normalized.get(&key) {
            converted.push((
                field.attr_name().to_string(),
                field.from_wire(raw.clone(), owner)?,
            ));
        }
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::transport::mock::MockTransport;

    fn detached_owner() -> Resource {
        let schema = SchemaBuilder::new("Owner").build().unwrap();
        Resource::nested(schema, None, Arc::new(MockTransport::new()), true)
    }

    #[test]
    fn wire_name_defaults_to_attr_name() {
        let field = Field::text("name");
        assert_eq!(field.wire_name(), "name");

        let field = Field::text("name").with_wire_name("displayName");
        assert_eq!(field.wire_name(), "displayName");
        assert_eq!(field.attr_name(), "name");
    }

    #[test]
    fn text_coerces_scalars() {
        let owner = detached_owner();
        let field = Field::text("t");

        let v = field.from_wire(Value::Integer(12), &owner).unwrap();
        assert_eq!(v.as_str(), Some("12"));

        let v = field.from_wire(Value::from("already"), &owner).unwrap();
        assert_eq!(v.as_str(), Some("already"));

        assert!(field.from_wire(Value::map(), &owner).is_err());
    }

    #[test]
    fn text_normalization() {
        let owner = detached_owner();
        let field = Field::text("t").trimmed().lowercased();

        let v = field.from_wire(Value::from("  Mixed Case  "), &owner).unwrap();
        assert_eq!(v.as_str(), Some("mixed case"));
    }

    #[test]
    fn boolean_is_truthiness_not_parsing() {
        let owner = detached_owner();
        let field = Field::boolean("b");

        // The string "false" is truthy
        let v = field.from_wire(Value::from("false"), &owner).unwrap();
        assert_eq!(v.as_bool(), Some(true));

        let v = field.from_wire(Value::from(""), &owner).unwrap();
        assert_eq!(v.as_bool(), Some(false));

        let v = field.from_wire(Value::Integer(0), &owner).unwrap();
        assert_eq!(v.as_bool(), Some(false));

        let v = field.from_wire(Value::Null, &owner).unwrap();
        assert_eq!(v.as_bool(), Some(false));
    }

    #[test]
    fn integer_floors() {
        let owner = detached_owner();
        let field = Field::integer("i");

        let v = field.from_wire(Value::Float(3.9), &owner).unwrap();
        assert_eq!(v.as_i64(), Some(3));

        let v = field.from_wire(Value::from("7.5"), &owner).unwrap();
        assert_eq!(v.as_i64(), Some(7));
    }

    #[test]
    fn number_coerces_strings() {
        let owner = detached_owner();
        let field = Field::number("n");

        let v = field.from_wire(Value::from("2.5"), &owner).unwrap();
        assert_eq!(v.as_f64(), Some(2.5));

        assert!(field.from_wire(Value::from("nope"), &owner).is_err());
    }

    #[test]
    fn list_requires_sequence() {
        let owner = detached_owner();
        let field = Field::list("items");

        let v = field
            .from_wire(Value::from(vec![1i64, 2, 3]), &owner)
            .unwrap();
        assert!(v.as_value().unwrap().is_array());

        assert!(field.from_wire(Value::from("scalar"), &owner).is_err());
    }

    #[test]
    fn scalar_conversions_are_idempotent() {
        let owner = detached_owner();

        let text = Field::text("t");
        let once = text.from_wire(Value::from("x"), &owner).unwrap();
        let twice = text
            .from_wire(once.as_value().unwrap().clone(), &owner)
            .unwrap();
        assert_eq!(once.as_str(), twice.as_str());

        let boolean = Field::boolean("b");
        let once = boolean.from_wire(Value::from("false"), &owner).unwrap();
        let twice = boolean
            .from_wire(once.as_value().unwrap().clone(), &owner)
            .unwrap();
        assert_eq!(once.as_bool(), twice.as_bool());

        let integer = Field::integer("i");
        let once = integer.from_wire(Value::Float(3.7), &owner).unwrap();
        let twice = integer
            .from_wire(once.as_value().unwrap().clone(), &owner)
            .unwrap();
        assert_eq!(once.as_i64(), twice.as_i64());

        let float = Field::float("f");
        let once = float.from_wire(Value::from("1.25"), &owner).unwrap();
        let twice = float
            .from_wire(once.as_value().unwrap().clone(), &owner)
            .unwrap();
        assert_eq!(once.as_f64(), twice.as_f64());
    }

    #[test]
    fn object_field_applies_aliases() {
        let owner = detached_owner();
        let mut aliases = AliasTable::new();
        aliases.insert("one".to_string(), "neo".to_string());
        let field = Field::object("extent", aliases);

        let mut map = Map::new();
        map.insert("one".to_string(), Value::Integer(1));

        let v = field.from_wire(Value::Map(map), &owner).unwrap();
        let object = v.as_object().unwrap();
        assert_eq!(object.attr("neo").unwrap().scalar(), Some(&Value::Integer(1)));

        // Reverse goes back through the inverse table
        let wire = field.to_wire(&v).unwrap();
        assert_eq!(wire.get("one"), Some(&Value::Integer(1)));
    }

    #[test]
    fn object_field_reverse_detects_cycles() {
        let field = Field::object("extent", AliasTable::new());

        let object = ObjectValue::object();
        object.set_attr("me", object.clone());

        let result = field.to_wire(&FieldValue::Object(object));
        assert!(matches!(result, Err(Error::SerializationCycle)));
    }

    #[test]
    fn nested_template_requires_placeholder() {
        let schema = SchemaBuilder::new("User").field(Field::integer("id")).build().unwrap();

        assert!(Field::to_one("user", schema.clone(), "users/").is_err());
        assert!(Field::to_one("user", schema, "{id}/").is_ok());
    }

    #[test]
    fn raw_passes_through() {
        let owner = detached_owner();
        let field = Field::raw("anything");

        let v = field.from_wire(Value::map(), &owner).unwrap();
        assert!(v.as_value().unwrap().is_map());

        let back = field.to_wire(&v).unwrap();
        assert!(back.is_map());
    }
}
