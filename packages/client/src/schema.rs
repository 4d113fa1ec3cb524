//! Per-resource-type configuration: the schema and its builder.
//!
//! A `Schema` is assembled once per resource type and shared read-only by
//! every instance of that type. The builder is the explicit registry:
//! fields and actions are declared in order, supertype schemas compose in,
//! and the result is immutable.

use std::collections::BTreeMap;
use std::sync::Arc;

use restmap_core::{Error, Map, Result, Serializer};
use restmap_codec::JsonSerializer;

use crate::action::Action;
use crate::field::Field;
use crate::transport::Method;

/// Strip non-alphanumeric characters and lower-case, for fuzzy key
/// comparison.
pub(crate) fn fuzzy_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Immutable per-type configuration, shared by all instances of a type.
pub struct Schema {
    name: String,
    case_sensitive_fields: bool,
    match_fuzzy_keys: bool,
    force_https: bool,
    get_method: Method,
    get_parameters: BTreeMap<String, String>,
    serializer: Arc<dyn Serializer>,
    deserializer: Arc<dyn Serializer>,
    fields: Vec<Field>,
    actions: Vec<Action>,
}

impl Schema {
    /// Resource type name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether wire keys match field names case-sensitively.
    pub fn case_sensitive_fields(&self) -> bool {
        self.case_sensitive_fields
    }

    /// Whether fuzzy key matching is enabled.
    pub fn match_fuzzy_keys(&self) -> bool {
        self.match_fuzzy_keys
    }

    /// Whether loads rewrite the URL scheme to https.
    pub fn force_https(&self) -> bool {
        self.force_https
    }

    /// HTTP method used for loads.
    pub fn get_method(&self) -> &Method {
        &self.get_method
    }

    /// Default query parameters for loads.
    pub fn get_parameters(&self) -> &BTreeMap<String, String> {
        &self.get_parameters
    }

    /// Serializer for outgoing action parameters.
    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
    }

    /// Deserializer for incoming bodies.
    pub fn deserializer(&self) -> &Arc<dyn Serializer> {
        &self.deserializer
    }

    /// Declared fields, supertype fields first.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Declared actions.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Look up a field by host attribute name.
    pub fn find_field(&self, attr_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.attr_name() == attr_name)
    }

    /// Look up an action by host attribute name.
    pub fn find_action(&self, attr_name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.attr_name() == attr_name)
    }

    /// Normalize a wire key or field wire name for matching: fuzzy when
    /// enabled, else lower-cased when case-insensitive, else unchanged.
    pub(crate) fn normalize_wire_name(&self, name: &str) -> String {
        if self.match_fuzzy_keys {
            fuzzy_key(name)
        } else if !self.case_sensitive_fields {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Rebuild a wire map with normalized keys.
    pub(crate) fn normalize_keys(&self, data: &Map) -> Map {
        data.iter()
            .map(|(k, v)| (self.normalize_wire_name(k), v.clone()))
            .collect()
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Builds an immutable `Schema`.
///
/// Declaration order is preserved. `extends` composes a supertype in:
/// inherited fields come first, and a later declaration with the same
/// attribute name overrides the inherited one in its inherited position.
///
/// # Example
///
/// ```rust
/// use restmap_client::{Field, SchemaBuilder};
///
/// let schema = SchemaBuilder::new("Message")
///     .field(Field::integer("id"))
///     .field(Field::text("sender"))
///     .field(Field::text("message"))
///     .field(Field::boolean("read"))
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.fields().len(), 4);
/// ```
pub struct SchemaBuilder {
    name: String,
    case_sensitive_fields: bool,
    match_fuzzy_keys: bool,
    force_https: bool,
    get_method: Method,
    get_parameters: BTreeMap<String, String>,
    serializer: Arc<dyn Serializer>,
    deserializer: Arc<dyn Serializer>,
    fields: Vec<Field>,
    actions: Vec<Action>,
}

impl SchemaBuilder {
    /// Start a schema for the named resource type. Defaults: case
    /// sensitive, no fuzzy matching, no https enforcement, GET loads, JSON
    /// both ways.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            case_sensitive_fields: true,
            match_fuzzy_keys: false,
            force_https: false,
            get_method: Method::GET,
            get_parameters: BTreeMap::new(),
            serializer: Arc::new(JsonSerializer),
            deserializer: Arc::new(JsonSerializer),
            fields: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Compose a supertype schema in. May be called repeatedly; parents
    /// are walked in call order, most-derived declarations overriding
    /// same-named inherited ones in place.
    pub fn extends(mut self, parent: &Schema) -> Self {
        for field in &parent.fields {
            merge_field(&mut self.fields, field.clone());
        }
        for action in &parent.actions {
            merge_action(&mut self.actions, action.clone());
        }
        self
    }

    /// Declare a field. A same-named earlier declaration (inherited or
    /// not) is overridden in place.
    pub fn field(mut self, field: Field) -> Self {
        merge_field(&mut self.fields, field);
        self
    }

    /// Declare an action. Same override rule as fields.
    pub fn action(mut self, action: Action) -> Self {
        merge_action(&mut self.actions, action);
        self
    }

    /// Match wire keys to field names without regard to case.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_fields = case_sensitive;
        self
    }

    /// Compare wire keys and field names after stripping non-alphanumeric
    /// characters and lower-casing both sides.
    pub fn with_fuzzy_keys(mut self, fuzzy: bool) -> Self {
        self.match_fuzzy_keys = fuzzy;
        self
    }

    /// Rewrite load URLs to https.
    pub fn with_force_https(mut self, force: bool) -> Self {
        self.force_https = force;
        self
    }

    /// HTTP method for loads.
    pub fn with_get_method(mut self, method: Method) -> Self {
        self.get_method = method;
        self
    }

    /// Add a default query parameter for loads.
    pub fn with_get_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.get_parameters.insert(name.into(), value.into());
        self
    }

    /// Serializer for outgoing action parameters.
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Deserializer for incoming bodies.
    pub fn with_deserializer(mut self, deserializer: Arc<dyn Serializer>) -> Self {
        self.deserializer = deserializer;
        self
    }

    /// Validate and freeze the schema.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` naming the offenders when a field and an action
    /// share an attribute name, or an action declares a parameter as both
    /// required and optional.
    pub fn build(self) -> Result<Arc<Schema>> {
        let field_names: Vec<&str> = self.fields.iter().map(|f| f.attr_name()).collect();
        let clashes: Vec<&str> = self
            .actions
            .iter()
            .map(|a| a.attr_name())
            .filter(|name| field_names.contains(name))
            .collect();
        if !clashes.is_empty() {
            return Err(Error::invalid_argument(format!(
                "'{}': attribute name(s) declared as both field and action: {}",
                self.name,
                clashes.join(", ")
            )));
        }

        for action in &self.actions {
            let overlap = action.overlapping_params();
            if !overlap.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "'{}': action '{}' declares parameter(s) as both required and optional: {}",
                    self.name,
                    action.attr_name(),
                    overlap.join(", ")
                )));
            }
        }

        Ok(Arc::new(Schema {
            name: self.name,
            case_sensitive_fields: self.case_sensitive_fields,
            match_fuzzy_keys: self.match_fuzzy_keys,
            force_https: self.force_https,
            get_method: self.get_method,
            get_parameters: self.get_parameters,
            serializer: self.serializer,
            deserializer: self.deserializer,
            fields: self.fields,
            actions: self.actions,
        }))
    }
}

fn merge_field(fields: &mut Vec<Field>, field: Field) {
    if let Some(existing) = fields
        .iter_mut()
        .find(|f| f.attr_name() == field.attr_name())
    {
        *existing = field;
    } else {
        fields.push(field);
    }
}

fn merge_action(actions: &mut Vec<Action>, action: Action) {
    if let Some(existing) = actions
        .iter_mut()
        .find(|a| a.attr_name() == action.attr_name())
    {
        *existing = action;
    } else {
        actions.push(action);
    }
}
