//! Resource instances and the lazy population protocol.
//!
//! An instance starts unloaded and becomes populated exactly once: either
//! eagerly at creation, or on the first access of an attribute that is not
//! already present. The transition never reverses. The schema is shared
//! read-only by every instance of a type; each instance exclusively owns
//! its attribute slots.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;

use url::Url;

use restmap_core::{Error, Map, Result};

use crate::action::ActionOutcome;
use crate::field::{convert_present, FieldValue};
use crate::schema::Schema;
use crate::transport::{HttpTransport, Transport, WireRequest};

/// Options for the `get` factory.
pub struct GetOptions {
    /// Whether a missing required field aborts population. Default true.
    pub strict: bool,
    /// Whether to defer the load until first access. Default true.
    pub lazy: bool,
    /// Transport session to share. A fresh `HttpTransport` when absent.
    pub session: Option<Arc<dyn Transport>>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            strict: true,
            lazy: true,
            session: None,
        }
    }
}

/// One remote entity, mapped through its type's schema.
pub struct Resource {
    schema: Arc<Schema>,
    url: Option<Url>,
    params: BTreeMap<String, String>,
    transport: Arc<dyn Transport>,
    strict: bool,
    populated: Cell<bool>,
    slots: RefCell<BTreeMap<String, FieldValue>>,
}

impl Resource {
    /// Fetch-oriented factory: parse the URL, apply the schema's https
    /// override, and seed query parameters from the schema defaults merged
    /// with the URL's own query string (URL pairs win).
    ///
    /// The returned instance is unloaded; the first `attr` access (or an
    /// explicit `ensure_loaded`) performs the one-time fetch.
    pub fn get(schema: Arc<Schema>, url: &str) -> Result<Self> {
        Self::get_with(schema, url, GetOptions::default())
    }

    /// `get` with explicit strictness, laziness, and a shared session.
    pub fn get_with(schema: Arc<Schema>, url: &str, options: GetOptions) -> Result<Self> {
        let mut parsed = Url::parse(url)?;
        if schema.force_https() && parsed.scheme() == "http" {
            let _ = parsed.set_scheme("https");
        }

        let mut params = schema.get_parameters().clone();
        for (name, value) in parsed.query_pairs() {
            params.insert(name.into_owned(), value.into_owned());
        }
        parsed.set_query(None);

        let transport = options
            .session
            .unwrap_or_else(|| Arc::new(HttpTransport::new()));

        let resource = Self {
            schema,
            url: Some(parsed),
            params,
            transport,
            strict: options.strict,
            populated: Cell::new(false),
            slots: RefCell::new(BTreeMap::new()),
        };

        if !options.lazy {
            resource.ensure_loaded()?;
        }
        Ok(resource)
    }

    /// Direct constructor from host-attribute values.
    ///
    /// Supplying zero values marks the instance unloaded; supplying any
    /// marks it populated with no load.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` naming every value whose name is not a declared
    /// field.
    pub fn with_values(
        schema: Arc<Schema>,
        values: Vec<(String, FieldValue)>,
    ) -> Result<Self> {
        let unknown: Vec<&str> = values
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| schema.find_field(name).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(Error::invalid_argument(format!(
                "'{}' received invalid keyword argument(s): {}",
                schema.name(),
                unknown.join(", ")
            )));
        }

        let populated = !values.is_empty();
        let resource = Self {
            schema,
            url: None,
            params: BTreeMap::new(),
            transport: Arc::new(HttpTransport::new()),
            strict: true,
            populated: Cell::new(populated),
            slots: RefCell::new(values.into_iter().collect()),
        };
        Ok(resource)
    }

    /// Internal constructor for nested resources and materialized action
    /// responses: shares the spawning resource's transport and strictness.
    pub(crate) fn nested(
        schema: Arc<Schema>,
        url: Option<Url>,
        transport: Arc<dyn Transport>,
        strict: bool,
    ) -> Self {
        Self {
            schema,
            url,
            params: BTreeMap::new(),
            transport,
            strict,
            populated: Cell::new(false),
            slots: RefCell::new(BTreeMap::new()),
        }
    }

    /// The resolved base URL, if this instance has one.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// The resolved query parameters loads will carry.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// This instance's schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Whether the one-time load (or eager population) has happened.
    pub fn is_populated(&self) -> bool {
        self.populated.get()
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn strict(&self) -> bool {
        self.strict
    }

    /// Read an attribute.
    ///
    /// Answers from the slots when the name is already present. On an
    /// unloaded instance a miss triggers the one-time load first. A miss
    /// after population is `AttributeNotFound` - the load is never
    /// re-triggered.
    pub fn attr(&self, name: &str) -> Result<FieldValue> {
        {
            let slots = self.slots.borrow();
            if let Some(value) = slots.get(name) {
                return Ok(value.clone());
            }
        }

        if !self.populated.get() {
            self.ensure_loaded()?;
            let slots = self.slots.borrow();
            if let Some(value) = slots.get(name) {
                return Ok(value.clone());
            }
        }

        Err(Error::AttributeNotFound {
            resource: self.schema.name().to_string(),
            attribute: name.to_string(),
        })
    }

    /// Read an attribute without ever triggering a load.
    pub fn attr_if_set(&self, name: &str) -> Option<FieldValue> {
        self.slots.borrow().get(name).cloned()
    }

    /// Perform the one-time load unless already populated.
    ///
    /// Builds the request URL from the resolved components plus query
    /// parameters, performs exactly one fetch through the shared
    /// transport, decodes the body with the schema's deserializer, and
    /// populates the field slots.
    pub fn ensure_loaded(&self) -> Result<()> {
        if self.populated.get() {
            return Ok(());
        }

        let url = self.url.clone().ok_or_else(|| {
            Error::invalid_argument(format!(
                "'{}' has no URL to load from",
                self.schema.name()
            ))
        })?;

        let mut request_url = url.clone();
        if !self.params.is_empty() {
            let mut pairs = request_url.query_pairs_mut();
            for (name, value) in &self.params {
                pairs.append_pair(name, value);
            }
            drop(pairs);
        }

        tracing::debug!(resource = self.schema.name(), url = %request_url, "loading");

        let request = WireRequest {
            method: self.schema.get_method().clone(),
            url: request_url,
            body: None,
            content_type: None,
        };
        let response = self.transport.send(&request)?;

        if response.status == 404 {
            return Err(Error::NotFound {
                url: url.to_string(),
            });
        }
        if !response.is_success() {
            return Err(Error::Http {
                status: response.status,
                reason: response.reason,
                body: response.body,
            });
        }

        let data = self.schema.deserializer().from_wire(&response.body)?;
        self.populate_from_wire(&data)
    }

    /// Route a decoded wire map into the field slots.
    ///
    /// All-or-nothing: every field converts into a staging area first, and
    /// the slots are committed (and the instance marked populated) only
    /// after the walk completes.
    pub(crate) fn populate_from_wire(&self, data: &Map) -> Result<()> {
        let normalized = self.schema.normalize_keys(data);
        let url_text = self
            .url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| self.schema.name().to_string());

        let mut staged: Vec<(String, FieldValue)> = Vec::new();
        for field in self.schema.fields() {
            let key = self.schema.normalize_wire_name(field.wire_name());
            match normalized.get(&key) {
                Some(raw) => {
                    staged.push((
                        field.attr_name().to_string(),
                        field.from_wire(raw.clone(), self)?,
                    ));
                }
                None if field.required() && field.default().is_none() => {
                    if self.strict {
                        return Err(Error::MissingField {
                            field: field.wire_name().to_string(),
                            url: url_text.clone(),
                        });
                    }
                    tracing::warn!(
                        "response from {} is missing required field '{}'",
                        url_text,
                        field.wire_name()
                    );
                }
                None => {
                    // Any declared default counts, falsy ones included.
                    let value = field.default().cloned().unwrap_or_default();
                    staged.push((field.attr_name().to_string(), FieldValue::Value(value)));
                }
            }
        }

        let mut slots = self.slots.borrow_mut();
        for (name, value) in staged {
            slots.insert(name, value);
        }
        drop(slots);
        self.populated.set(true);
        Ok(())
    }

    /// Seed slots from a partial wire mapping without marking the instance
    /// populated, so the first unresolved access still loads.
    pub(crate) fn seed_from_wire(&self, data: &Map) -> Result<()> {
        let converted = convert_present(&self.schema, data, self)?;
        let mut slots = self.slots.borrow_mut();
        for (name, value) in converted {
            slots.insert(name, value);
        }
        Ok(())
    }

    /// Invoke a declared action by name with keyword parameters.
    pub fn invoke(&self, name: &str, params: Map) -> Result<ActionOutcome> {
        let action = self.schema.find_action(name).ok_or_else(|| {
            Error::AttributeNotFound {
                resource: self.schema.name().to_string(),
                attribute: name.to_string(),
            }
        })?;
        action.invoke(self, params)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("type", &self.schema.name())
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("populated", &self.populated.get())
            .finish()
    }
}
