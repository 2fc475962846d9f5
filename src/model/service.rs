//! Contracts for the persistence layer that owns transactional boundaries.
//!
//! A service reads the pending changes of an aggregate, writes them, and then
//! marks the aggregate committed. Loading always yields committed aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    graph::{ResultKey, SchemaKey, VoteGraph},
    props::{KeyedValues, PropValue},
};
use crate::error::Result;

/// Property name holding the persisted numeric id of a schema or result.
pub const ID_PROP: &str = "id";
/// Property name on a vote result holding the persisted id of its schema.
pub const VOTE_ID_PROP: &str = "vote_id";
/// Property name on a vote result holding the answering user.
pub const USER_ID_PROP: &str = "user_id";

/// Exact-match filter over known keys and properties.
pub type Criteria = BTreeMap<String, PropValue>;

/// Does `entity` carry every value in `criteria`?
pub fn matches_criteria<T: KeyedValues>(entity: &T, criteria: &Criteria) -> bool {
    criteria
        .iter()
        .all(|(key, value)| entity.assert_value_by_key(key, value))
}

/// Filter and window for a result listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultListParams {
    pub criteria: Criteria,
    /// Maximum number of results, or all of them.
    pub limit: Option<usize>,
    pub offset: usize,
}

/// What a save wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Persisted id of the saved aggregate root.
    pub id: u64,
    pub inserted: usize,
    pub moved: usize,
    pub deleted: usize,
    pub saved_at: DateTime<Utc>,
}

pub trait VoteService {
    /// Load the schema stored under `id` into `graph`.
    fn vote_schema_by_id(&self, graph: &mut VoteGraph, id: u64) -> Result<Option<SchemaKey>>;

    /// Load every stored schema matching `criteria`, in id order.
    fn vote_schemas_by_criteria(
        &self,
        graph: &mut VoteGraph,
        criteria: &Criteria,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<SchemaKey>>;

    /// Write `schema` and mark it committed. A schema without an id is
    /// assigned one.
    fn save_vote(&mut self, graph: &mut VoteGraph, schema: SchemaKey) -> Result<SaveReport>;

    fn vote_schema_count(&self, criteria: &Criteria) -> Result<usize>;
}

pub trait VoteResultService {
    /// Write `result` and mark it committed. Its schema must have been saved.
    fn save_vote_result(&mut self, graph: &mut VoteGraph, result: ResultKey) -> Result<SaveReport>;

    /// Load the stored results of `schema` matching `params`.
    fn vote_result_list(
        &self,
        graph: &mut VoteGraph,
        schema: SchemaKey,
        params: &ResultListParams,
    ) -> Result<Vec<ResultKey>>;

    /// Load the result `user_id` gave for `schema`, if any.
    fn vote_result_by_user(
        &self,
        graph: &mut VoteGraph,
        schema: SchemaKey,
        user_id: i64,
    ) -> Result<Option<ResultKey>>;
}
