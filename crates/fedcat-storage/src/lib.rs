//! # fedcat-storage — Entity Storage Port
//!
//! Key-addressed entity storage with condition queries and cursor
//! pagination. The catalogue keeps one [`EntityStorage`] per entry kind; the
//! audit sink keeps one for log records.
//!
//! [`MemoryStorage`] is the in-process implementation. Persistent engines
//! implement the same trait.

pub mod condition;
pub mod error;
pub mod memory;
pub mod query;

use serde::Serialize;

pub use condition::{ComparisonOperator, EntityCondition};
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use query::{QueryRequest, QueryResult, SortDirection, SortProperty, DEFAULT_PAGE_SIZE};

/// A storable entity with a string primary key.
///
/// The serialized form is what conditions, sorting and projections see.
pub trait Entity: Clone + Serialize + Send + Sync + 'static {
    /// The primary key.
    fn primary_key(&self) -> &str;
}

/// Key-addressed storage for one entity kind.
pub trait EntityStorage<T: Entity>: Send + Sync {
    /// Insert or fully replace the entity with the same primary key.
    fn set(&self, entity: T) -> Result<(), StorageError>;

    /// Fetch an entity by primary key.
    fn get(&self, key: &str) -> Result<Option<T>, StorageError>;

    /// Delete an entity. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Run a condition query and return one page.
    fn query(&self, request: &QueryRequest) -> Result<QueryResult<T>, StorageError>;

    /// Run a query returning only `properties` of each entity.
    fn query_projected(
        &self,
        request: &QueryRequest,
        properties: &[&str],
    ) -> Result<QueryResult<serde_json::Value>, StorageError> {
        self.query(request)?.try_map(|entity| {
            serde_json::to_value(&entity)
                .map(|v| query::project(v, properties))
                .map_err(StorageError::from)
        })
    }
}
