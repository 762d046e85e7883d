//! Elements: the read-only records exposed through endpoints
//!
//! An [`Element`] is what a query returns. It carries its identity, its
//! timestamps, a bag of custom field values and the related elements that a
//! transformer may expose as includes.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Stable identity of an element: its type plus its ID
///
/// Used for include cycle detection, cache tags and linked-resource
/// de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementIdentity {
    /// The type of element (e.g., "entry", "user", "asset")
    pub element_type: String,

    /// The unique ID of the element
    pub id: Uuid,
}

impl ElementIdentity {
    /// Create a new element identity
    pub fn new(element_type: impl Into<String>, id: Uuid) -> Self {
        Self {
            element_type: element_type.into(),
            id,
        }
    }
}

impl fmt::Display for ElementIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.element_type, self.id)
    }
}

/// A polymorphic field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    List(Vec<FieldValue>),
    Map(IndexMap<String, FieldValue>),
    Null,
}

impl FieldValue {
    /// Convert to JSON
    ///
    /// Dates use a fixed ISO-8601 form with an explicit offset
    /// (`2024-05-01T10:00:00+00:00`).
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::DateTime(d) => Value::String(format_date(d)),
            FieldValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            FieldValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            FieldValue::Null => Value::Null,
        }
    }

    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Format a timestamp the way every transformer does
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Elements related to another element under a relation name
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// At most one related element (e.g., an entry's author)
    One(Option<Box<Element>>),
    /// An ordered list of related elements (e.g., an entry's assets)
    Many(Vec<Element>),
}

/// A read-only domain record
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Unique identifier
    pub id: Uuid,

    /// Element type name (e.g., "entry")
    pub element_type: String,

    /// Creation timestamp
    pub date_created: DateTime<Utc>,

    /// Last modification timestamp
    pub date_updated: DateTime<Utc>,

    /// Custom field values, in declaration order
    ///
    /// Names starting with `_` are internal bookkeeping and never flattened.
    pub fields: IndexMap<String, FieldValue>,

    /// Related elements, keyed by relation name
    pub relations: IndexMap<String, Relation>,
}

impl Element {
    /// Create a new element with the current time as its timestamps
    pub fn new(element_type: impl Into<String>, id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            element_type: element_type.into(),
            date_created: now,
            date_updated: now,
            fields: IndexMap::new(),
            relations: IndexMap::new(),
        }
    }

    /// Set both timestamps
    pub fn with_dates(mut self, created: DateTime<Utc>, updated: DateTime<Utc>) -> Self {
        self.date_created = created;
        self.date_updated = updated;
        self
    }

    /// Add a custom field value
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Relate at most one element
    pub fn with_one(mut self, name: impl Into<String>, element: Option<Element>) -> Self {
        self.relations
            .insert(name.into(), Relation::One(element.map(Box::new)));
        self
    }

    /// Relate a list of elements
    pub fn with_many(mut self, name: impl Into<String>, elements: Vec<Element>) -> Self {
        self.relations.insert(name.into(), Relation::Many(elements));
        self
    }

    /// Get the identity of this element
    pub fn identity(&self) -> ElementIdentity {
        ElementIdentity::new(self.element_type.clone(), self.id)
    }

    /// Get a custom field value by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a relation by name
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }
}
