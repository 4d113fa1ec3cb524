//! Declarative actions: parameterized remote operations bound to a
//! resource instance.
//!
//! Invocation runs a fixed pipeline: keyword validation, default merging,
//! alias remapping, serialization, the HTTP call, status validation,
//! response aliasing, and optional materialization.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::Arc;

use url::Url;

use restmap_codec::FormSerializer;
use restmap_core::{Error, Map, Result, Serializer, Value};

use crate::object::{AliasTable, ObjectValue};
use crate::resource::Resource;
use crate::schema::Schema;
use crate::transport::{Method, WireRequest};
use crate::urls::join_relative;

/// How an action's response body is handled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResponseKind {
    /// The body is discarded.
    #[default]
    None,
    /// The aliased generic mapping is returned unchanged.
    Mapping,
    /// The aliased mapping is materialized into an object: a typed
    /// resource when a response schema is declared, an anonymous object
    /// otherwise.
    Object,
}

/// What an invocation returns.
#[derive(Debug)]
pub enum ActionOutcome {
    /// The action declared no response handling.
    None,
    /// Raw-mapping mode: the aliased key-value structure.
    Mapping(Map),
    /// Materialized anonymous object.
    Object(ObjectValue),
    /// Materialized typed resource.
    Resource(Rc<Resource>),
}

impl ActionOutcome {
    /// Whether this is the no-response outcome.
    pub fn is_none(&self) -> bool {
        matches!(self, ActionOutcome::None)
    }

    /// The mapping, in raw-mapping mode.
    pub fn as_mapping(&self) -> Option<&Map> {
        match self {
            ActionOutcome::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// The anonymous object, in materialized-object mode.
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            ActionOutcome::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The typed resource, when a response schema was declared.
    pub fn as_resource(&self) -> Option<&Rc<Resource>> {
        match self {
            ActionOutcome::Resource(resource) => Some(resource),
            _ => None,
        }
    }
}

/// A declared remote operation.
///
/// Construct with `Action::new` and the `with_*` setters, then attach to a
/// schema. The union of required and optional parameter names is the only
/// accepted call-time keyword set.
#[derive(Clone)]
pub struct Action {
    attr_name: String,
    relative_path: String,
    method: Method,
    expected_codes: Vec<u16>,
    required_params: BTreeSet<String>,
    optional_params: BTreeSet<String>,
    param_defaults: Map,
    param_aliases: BTreeMap<String, String>,
    params_via_body: bool,
    response_kind: ResponseKind,
    response_schema: Option<Arc<Schema>>,
    response_aliases: AliasTable,
    serializer: Option<Arc<dyn Serializer>>,
    deserializer: Option<Arc<dyn Serializer>>,
}

impl Action {
    /// Declare an action reachable at `relative_path` under the owning
    /// resource's URL. Defaults: POST, any 2xx accepted, no parameters,
    /// parameters as query string, no response handling.
    pub fn new(attr_name: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            attr_name: attr_name.into(),
            relative_path: relative_path.into(),
            method: Method::POST,
            expected_codes: (200..300).collect(),
            required_params: BTreeSet::new(),
            optional_params: BTreeSet::new(),
            param_defaults: Map::new(),
            param_aliases: BTreeMap::new(),
            params_via_body: false,
            response_kind: ResponseKind::None,
            response_schema: None,
            response_aliases: AliasTable::new(),
            serializer: None,
            deserializer: None,
        }
    }

    /// HTTP method for the call.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Replace the expected success status codes.
    pub fn with_expected_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_codes = codes.into_iter().collect();
        self
    }

    /// Declare required parameter names.
    pub fn with_required_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_params
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare optional parameter names.
    pub fn with_optional_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_params
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare a parameter default, merged under supplied values.
    pub fn with_param_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.param_defaults.insert(name.into(), value.into());
        self
    }

    /// Alias a parameter: host name in calls, wire name on the wire.
    pub fn with_param_alias(
        mut self,
        host_name: impl Into<String>,
        wire_name: impl Into<String>,
    ) -> Self {
        self.param_aliases.insert(host_name.into(), wire_name.into());
        self
    }

    /// Send parameters as the request body instead of the query string.
    pub fn via_body(mut self) -> Self {
        self.params_via_body = true;
        self
    }

    /// Set the response handling mode.
    pub fn with_response(mut self, kind: ResponseKind) -> Self {
        self.response_kind = kind;
        self
    }

    /// Materialize responses into the given schema. Implies
    /// `ResponseKind::Object`.
    pub fn with_response_schema(mut self, schema: Arc<Schema>) -> Self {
        self.response_schema = Some(schema);
        self.response_kind = ResponseKind::Object;
        self
    }

    /// Alias a response key: wire name in the body, host name after.
    /// Applied recursively at every nesting depth.
    pub fn with_response_alias(
        mut self,
        wire_name: impl Into<String>,
        host_name: impl Into<String>,
    ) -> Self {
        self.response_aliases
            .insert(wire_name.into(), host_name.into());
        self
    }

    /// Override the parameter serializer for this action.
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Override the response deserializer for this action.
    pub fn with_deserializer(mut self, deserializer: Arc<dyn Serializer>) -> Self {
        self.deserializer = Some(deserializer);
        self
    }

    /// Host attribute name this action is bound under.
    pub fn attr_name(&self) -> &str {
        &self.attr_name
    }

    /// Parameters declared as both required and optional; must be empty
    /// for the schema to build.
    pub(crate) fn overlapping_params(&self) -> Vec<String> {
        self.required_params
            .intersection(&self.optional_params)
            .cloned()
            .collect()
    }

    /// Run the invocation pipeline against the owning resource.
    pub(crate) fn invoke(&self, owner: &Resource, params: Map) -> Result<ActionOutcome> {
        // Keyword validation
        let invalid: Vec<&str> = params
            .keys()
            .map(String::as_str)
            .filter(|name| {
                !self.required_params.contains(*name) && !self.optional_params.contains(*name)
            })
            .collect();
        if !invalid.is_empty() {
            return Err(Error::invalid_argument(format!(
                "action '{}' got unexpected keyword argument(s): {}",
                self.attr_name,
                invalid.join(", ")
            )));
        }

        // Supplied values merge over declared defaults
        let mut merged = self.param_defaults.clone();
        merged.extend(params);

        let missing: Vec<&str> = self
            .required_params
            .iter()
            .map(String::as_str)
            .filter(|name| !merged.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::invalid_argument(format!(
                "action '{}' is missing required parameter(s): {}",
                self.attr_name,
                missing.join(", ")
            )));
        }

        // Host names remap to wire names before serialization
        let aliased: Map = merged
            .into_iter()
            .map(|(name, value)| {
                let name = self.param_aliases.get(&name).cloned().unwrap_or(name);
                (name, value)
            })
            .collect();

        let (text, content_type) = self.prepare_params(owner, &aliased)?;
        let url = self.request_url(owner)?;
        let response = self.do_request(owner, url, text, content_type)?;

        if !self.expected_codes.contains(&response.status) {
            return Err(Error::Http {
                status: response.status,
                reason: response.reason,
                body: response.body,
            });
        }

        if self.response_kind == ResponseKind::None {
            return Ok(ActionOutcome::None);
        }

        let deserializer = self
            .deserializer
            .as_ref()
            .unwrap_or_else(|| owner.schema().deserializer());
        let data = deserializer.from_wire(&response.body)?;
        let data = alias_map(data, &self.response_aliases);

        match self.response_kind {
            ResponseKind::Mapping => Ok(ActionOutcome::Mapping(data)),
            ResponseKind::Object => {
                if let Some(schema) = &self.response_schema {
                    let resource = Resource::nested(
                        schema.clone(),
                        None,
                        owner.transport().clone(),
                        owner.strict(),
                    );
                    resource.populate_from_wire(&data)?;
                    Ok(ActionOutcome::Resource(Rc::new(resource)))
                } else {
                    // Aliases were already applied above
                    Ok(ActionOutcome::Object(ObjectValue::from_value(
                        Value::Map(data),
                        &AliasTable::new(),
                    )))
                }
            }
            ResponseKind::None => unreachable!("handled above"),
        }
    }

    /// Choose a serializer and render the parameter mapping: the explicit
    /// override wins, else the owner's serializer when parameters travel
    /// in the body of a body-capable method, else the flat key-value
    /// strategy.
    fn prepare_params(
        &self,
        owner: &Resource,
        params: &Map,
    ) -> Result<(String, restmap_core::WireFormat)> {
        if let Some(serializer) = &self.serializer {
            Ok((serializer.to_wire(params)?, serializer.content_type()))
        } else if self.params_via_body && self.method.supports_body() {
            let serializer = owner.schema().serializer();
            Ok((serializer.to_wire(params)?, serializer.content_type()))
        } else {
            Ok((
                FormSerializer.to_wire(params)?,
                FormSerializer.content_type(),
            ))
        }
    }

    fn request_url(&self, owner: &Resource) -> Result<Url> {
        let base = owner.url().ok_or_else(|| {
            Error::invalid_argument(format!(
                "action '{}': owning resource has no URL",
                self.attr_name
            ))
        })?;
        Ok(Url::parse(&join_relative(
            base.as_str(),
            &self.relative_path,
        ))?)
    }

    fn do_request(
        &self,
        owner: &Resource,
        mut url: Url,
        params_text: String,
        content_type: restmap_core::WireFormat,
    ) -> Result<crate::transport::WireResponse> {
        let (body, content_type) = if self.params_via_body {
            (Some(params_text), Some(content_type))
        } else {
            if !params_text.is_empty() {
                url.set_query(Some(&params_text));
            }
            (None, None)
        };

        let request = WireRequest {
            method: self.method.clone(),
            url,
            body,
            content_type,
        };
        owner.transport().send(&request)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("attr_name", &self.attr_name)
            .field("relative_path", &self.relative_path)
            .field("method", &self.method)
            .field("response_kind", &self.response_kind)
            .finish()
    }
}

/// Rename every mapping key through the alias table, at every nesting
/// depth; lists recurse element-wise, scalars pass through.
fn alias_value(value: Value, aliases: &AliasTable) -> Value {
    match value {
        Value::Map(map) => Value::Map(alias_map(map, aliases)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| alias_value(item, aliases))
                .collect(),
        ),
        scalar => scalar,
    }
}

fn alias_map(map: Map, aliases: &AliasTable) -> Map {
    map.into_iter()
        .map(|(key, value)| {
            let key = aliases.get(&key).cloned().unwrap_or(key);
            (key, alias_value(value, aliases))
        })
        .collect()
}
