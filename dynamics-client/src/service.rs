//! The service seam between the sync loop and the remote organisation.

use crate::entity::{Entity, EntityType, OptionSetMap};
use crate::error::ClientError;
use crate::query::Query;

/// Lazily paged query results.
pub type Rows<'a> = Box<dyn Iterator<Item = Result<Entity, ClientError>> + 'a>;

/// A remote organisation exposing entity sets.
///
/// [`crate::WebApiService`] talks to a live Web API; tests provide
/// in-memory implementations.
pub trait Service {
    /// Every readable entity set, in a stable order.
    fn entity_types(&self) -> Result<Vec<EntityType>, ClientError>;

    /// The descriptor for one entity set.
    fn entity_type(&self, entity_set: &str) -> Result<EntityType, ClientError> {
        self.entity_types()?
            .into_iter()
            .find(|e| e.entity_set == entity_set)
            .ok_or_else(|| ClientError::EntityNotFound(entity_set.to_string()))
    }

    /// Option labels for every coded field on `entity`.
    fn optionset_map(&self, entity: &EntityType) -> Result<OptionSetMap, ClientError>;

    /// Run `query`. Rows are fetched one page at a time as the iterator is
    /// advanced; an error ends the iteration.
    fn query<'a>(&'a self, query: Query) -> Result<Rows<'a>, ClientError>;
}
