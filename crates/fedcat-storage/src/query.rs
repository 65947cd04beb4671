//! # Query Model and Cursor Pagination
//!
//! A query selects entities matching an optional [`EntityCondition`], orders
//! them (by the given sort properties, then by primary key) and returns one
//! page. The cursor is an opaque token naming the last entity returned;
//! callers pass back the cursor of the previous page to resume right after
//! it. A page without a cursor is the last one.

use std::cmp::Ordering;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::{compare_values, lookup, EntityCondition};
use crate::error::StorageError;

/// Page size used when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Direction of a sort property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortProperty {
    /// Property path.
    pub property: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortProperty {
    /// Ascending by `property`.
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending by `property`.
    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// A condition query with sort and pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Filter; `None` matches every entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<EntityCondition>,
    /// Sort keys, most significant first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortProperty>,
    /// Cursor returned by the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Maximum entities per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

impl QueryRequest {
    /// A request matching every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter.
    pub fn with_condition(mut self, condition: Option<EntityCondition>) -> Self {
        self.condition = condition;
        self
    }

    /// Append a sort key.
    pub fn sorted_by(mut self, sort: SortProperty) -> Self {
        self.sort.push(sort);
        self
    }

    /// Resume from a cursor.
    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Bound the page size.
    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    /// Entities on this page.
    pub entities: Vec<T>,
    /// Cursor for the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Page size that was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Number of entities matching the condition across all pages.
    pub total_entities: usize,
}

impl<T> QueryResult<T> {
    /// Transform every entity, keeping pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResult<U> {
        QueryResult {
            entities: self.entities.into_iter().map(f).collect(),
            cursor: self.cursor,
            page_size: self.page_size,
            total_entities: self.total_entities,
        }
    }

    /// Fallible [`map`](Self::map).
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<QueryResult<U>, E> {
        Ok(QueryResult {
            entities: self.entities.into_iter().map(f).collect::<Result<_, _>>()?,
            cursor: self.cursor,
            page_size: self.page_size,
            total_entities: self.total_entities,
        })
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Position of the last entity on a page: its sort-key values and primary
/// key. Encoded as base64url JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Position {
    #[serde(rename = "k")]
    key: String,
    #[serde(rename = "s", default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<Option<Value>>,
}

impl Position {
    fn encode(&self) -> Result<String, StorageError> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    /// A cursor only resumes a request with the same number of sort keys.
    fn decode(cursor: &str, sort: &[SortProperty]) -> Result<Self, StorageError> {
        let invalid = || StorageError::InvalidCursor(cursor.to_string());
        let raw = URL_SAFE_NO_PAD.decode(cursor.trim()).map_err(|_| invalid())?;
        let position: Self = serde_json::from_slice(&raw).map_err(|_| invalid())?;
        if position.values.len() != sort.len() {
            return Err(invalid());
        }
        Ok(position)
    }

    fn sort_key(&self) -> (&[Option<Value>], &str) {
        (self.values.as_slice(), self.key.as_str())
    }
}

/// A matched entity with the values it is ordered by.
struct Candidate<T> {
    key: String,
    entity: T,
    values: Vec<Option<Value>>,
}

impl<T> Candidate<T> {
    fn sort_key(&self) -> (&[Option<Value>], &str) {
        (self.values.as_slice(), self.key.as_str())
    }
}

/// Filter, sort and paginate entities.
///
/// `items` are `(primary key, entity, JSON form)` triples; conditions and
/// sort keys are evaluated against the JSON form. Entities are ordered by
/// the sort keys, then by primary key. A cursor resumes strictly after the
/// entity it was taken from, so inserts and removals between pages neither
/// repeat nor skip the entities that were already ahead of it.
pub fn execute<T>(
    items: Vec<(String, T, Value)>,
    request: &QueryRequest,
) -> Result<QueryResult<T>, StorageError> {
    let page_size = request.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err(StorageError::InvalidPageSize);
    }
    let resume = request
        .cursor
        .as_deref()
        .map(|c| Position::decode(c, &request.sort))
        .transpose()?;

    let mut matched: Vec<Candidate<T>> = items
        .into_iter()
        .filter(|(_, _, json)| request.condition.as_ref().map_or(true, |c| c.matches(json)))
        .map(|(key, entity, json)| Candidate {
            values: sort_values(&request.sort, &json),
            key,
            entity,
        })
        .collect();
    matched.sort_by(|a, b| order(&request.sort, a.sort_key(), b.sort_key()));

    let total_entities = matched.len();
    let start = match &resume {
        Some(position) => matched
            .iter()
            .position(|c| {
                order(&request.sort, c.sort_key(), position.sort_key()) == Ordering::Greater
            })
            .unwrap_or(total_entities),
        None => 0,
    };
    let end = start.saturating_add(page_size).min(total_entities);

    let page: Vec<Candidate<T>> = matched.into_iter().skip(start).take(end - start).collect();
    let cursor = match page.last() {
        Some(last) if end < total_entities => Some(
            Position {
                key: last.key.clone(),
                values: last.values.clone(),
            }
            .encode()?,
        ),
        _ => None,
    };

    Ok(QueryResult {
        entities: page.into_iter().map(|c| c.entity).collect(),
        cursor,
        page_size: Some(page_size),
        total_entities,
    })
}

/// Values of each sort property; `null` counts as missing.
fn sort_values(sort: &[SortProperty], json: &Value) -> Vec<Option<Value>> {
    sort.iter()
        .map(|key| lookup(json, &key.property).filter(|v| !v.is_null()).cloned())
        .collect()
}

/// Missing values sort last in either direction and mixed kinds compare
/// equal; the primary key breaks ties.
fn order(
    sort: &[SortProperty],
    (a_values, a_key): (&[Option<Value>], &str),
    (b_values, b_key): (&[Option<Value>], &str),
) -> Ordering {
    for (key, (x, y)) in sort.iter().zip(a_values.iter().zip(b_values)) {
        let ordering = match (x, y) {
            (Some(x), Some(y)) => {
                let ordering = compare_values(x, y).unwrap_or(Ordering::Equal);
                match key.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a_key.cmp(b_key)
}

/// Keep only `properties` of a JSON object.
pub fn project(value: Value, properties: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| properties.contains(&k.as_str()))
                .collect(),
        ),
        other => other,
    }
}
