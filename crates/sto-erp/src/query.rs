//! # OData Query Builder
//!
//! Builds `$filter` / `$top` / `$orderby` / `$select` requests against a 1C
//! collection.
//!
//! ```text
//! ODataQuery::new("Catalog_Номенклатура")
//!     .filter("IsFolder eq false")
//!     .filter_any([substringof("фильтр", "Description"), substringof("фильтр", "Артикул")])
//!     .order_by("Description")
//!     .top(100)
//!
//! ──► Catalog_Номенклатура?$filter=IsFolder eq false and (substringof('фильтр', Description)
//!         or substringof('фильтр', Артикул))&$top=100&$orderby=Description&$format=json
//! ```
//!
//! User text only ever enters a filter through [`quote`], which doubles single
//! quotes the way OData string literals require.
//!
//! Single records and their tabular parts are addressed with [`ODataQuery::key`]
//! and [`ODataQuery::navigate`]:
//!
//! ```text
//! ODataQuery::new("Document_ЗаказНаряд").key("…").navigate("Товары")
//!
//! ──► Document_ЗаказНаряд(guid'…')/Товары?$format=json
//! ```

use url::form_urlencoded;
use url::Url;

use crate::error::{ErpError, ErpResult};

/// Wraps `value` as an OData string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `guid'…'` literal for a 1C reference.
pub fn guid(value: &str) -> String {
    format!("guid'{}'", value)
}

/// `substringof('<needle>', <field>)`.
pub fn substringof(needle: &str, field: &str) -> String {
    format!("substringof({}, {})", quote(needle), field)
}

/// `<field> eq guid'<value>'`.
pub fn eq_guid(field: &str, value: &str) -> String {
    format!("{} eq {}", field, guid(value))
}

/// A GET request against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ODataQuery {
    collection: String,
    key: Option<String>,
    navigation: Vec<String>,
    filters: Vec<String>,
    top: Option<usize>,
    order_by: Option<String>,
    select: Option<String>,
    expand: Option<String>,
}

impl ODataQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        ODataQuery {
            collection: collection.into(),
            key: None,
            navigation: Vec::new(),
            filters: Vec::new(),
            top: None,
            order_by: None,
            select: None,
            expand: None,
        }
    }

    /// Addresses one record by its `Ref_Key`.
    pub fn key(mut self, reference: impl Into<String>) -> Self {
        self.key = Some(reference.into());
        self
    }

    /// Appends a path segment after the collection (or keyed record), such as
    /// a tabular part or `$count`.
    pub fn navigate(mut self, segment: impl Into<String>) -> Self {
        self.navigation.push(segment.into());
        self
    }

    /// Adds a clause; clauses are joined with `and`.
    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        self.filters.push(clause.into());
        self
    }

    /// Adds a parenthesised `or` group. An empty group is ignored.
    pub fn filter_any<I>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let clauses: Vec<String> = clauses.into_iter().collect();
        match clauses.len() {
            0 => {}
            1 => self.filters.extend(clauses),
            _ => self.filters.push(format!("({})", clauses.join(" or "))),
        }
        self
    }

    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.select = Some(fields.into());
        self
    }

    /// Inlines a navigation property, e.g. the counterparty of an order.
    pub fn expand(mut self, field: impl Into<String>) -> Self {
        self.expand = Some(field.into());
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Query parameters in request order. `$format=json` is always last.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.filters.is_empty() {
            params.push(("$filter", self.filters.join(" and ")));
        }
        if let Some(top) = self.top {
            params.push(("$top", top.to_string()));
        }
        if let Some(order_by) = &self.order_by {
            params.push(("$orderby", order_by.clone()));
        }
        if let Some(select) = &self.select {
            params.push(("$select", select.clone()));
        }
        if let Some(expand) = &self.expand {
            params.push(("$expand", expand.clone()));
        }
        params.push(("$format", "json".to_string()));
        params
    }

    /// Resource path below the service root: collection, optional key, then
    /// navigation segments.
    pub fn path(&self) -> Vec<String> {
        let mut head = self.collection.clone();
        if let Some(key) = &self.key {
            head.push('(');
            head.push_str(&guid(key));
            head.push(')');
        }
        let mut segments = vec![head];
        segments.extend(self.navigation.iter().cloned());
        segments
    }

    /// The unencoded query string, as it appears in logs.
    pub fn query_string(&self) -> String {
        self.params()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Full request URL under `base`.
    pub fn to_url(&self, base: &Url) -> ErpResult<Url> {
        let mut url = resource_url(base, &self.path())?;

        let encoded = self
            .params()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, encode_value(&v)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&encoded));
        Ok(url)
    }
}

/// `<base>/<collection>`, percent-encoding the collection name.
pub fn collection_url(base: &Url, collection: &str) -> ErpResult<Url> {
    resource_url(base, &[collection.to_string()])
}

fn resource_url(base: &Url, segments: &[String]) -> ErpResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ErpError::InvalidUrl(format!("cannot be a base URL: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Percent-encodes a parameter value. Form encoding writes a space as `+`,
/// which OData reads literally, so spaces go out as `%20`.
fn encode_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
