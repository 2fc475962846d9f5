use std::collections::BTreeMap;

use chrono::Utc;

use super::{
    data::{SchemaData, VoteResultData},
    graph::{ResultKey, SchemaKey, VoteGraph},
    props::{KeyedValues, PropValue},
    service::{
        matches_criteria, Criteria, ResultListParams, SaveReport, VoteResultService, VoteService,
        ID_PROP, USER_ID_PROP, VOTE_ID_PROP,
    },
};
use crate::error::{Error, Result};

/// An auto-increment id source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    next: u64,
}

impl Counter {
    /// Create a counter whose first value is `start`.
    pub fn new(start: u64) -> Self {
        Self { next: start }
    }

    /// Take the next value.
    pub fn next(&mut self) -> u64 {
        let value = self.next;
        self.next += 1;
        value
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Persisted id of an entity, read from its `id` property.
fn stored_id<T: KeyedValues>(entity: &T) -> Option<u64> {
    entity
        .value_by_key(ID_PROP)
        .and_then(|value| value.as_u64())
}

fn id_value(id: u64) -> PropValue {
    id.into()
}

/// Both persistence services backed by in-memory snapshots.
///
/// Snapshots are the serialized live view at save time, so a loaded
/// aggregate never carries pending removals.
#[derive(Debug, Default)]
pub struct MemoryStore {
    schema_ids: Counter,
    result_ids: Counter,
    schemas: BTreeMap<u64, SchemaData>,
    results: BTreeMap<u64, VoteResultData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_schema(&self, graph: &mut VoteGraph, data: &SchemaData) -> SchemaKey {
        let schema = graph.load_vote(data.clone());
        graph.mark_vote_committed(schema);
        schema
    }

    fn load_result(&self, graph: &mut VoteGraph, schema: SchemaKey, data: &VoteResultData) -> ResultKey {
        let result = graph.load_result(schema, data.clone());
        graph.mark_result_committed(result);
        result
    }

    /// Stored results belonging to the saved `schema`.
    fn results_of(
        &self,
        graph: &VoteGraph,
        schema: SchemaKey,
    ) -> Result<impl Iterator<Item = &VoteResultData> + '_> {
        let vote_id = stored_id(graph.schema(schema))
            .map(id_value)
            .ok_or_else(|| Error::NotFound(format!("{schema} has not been saved")))?;
        Ok(self
            .results
            .values()
            .filter(move |data| data.props.get(VOTE_ID_PROP) == Some(&vote_id)))
    }
}

impl VoteService for MemoryStore {
    fn vote_schema_by_id(&self, graph: &mut VoteGraph, id: u64) -> Result<Option<SchemaKey>> {
        Ok(self
            .schemas
            .get(&id)
            .map(|data| self.load_schema(graph, data)))
    }

    fn vote_schemas_by_criteria(
        &self,
        graph: &mut VoteGraph,
        criteria: &Criteria,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<SchemaKey>> {
        Ok(self
            .schemas
            .values()
            .filter(|data| matches_criteria(*data, criteria))
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|data| self.load_schema(graph, data))
            .collect())
    }

    fn save_vote(&mut self, graph: &mut VoteGraph, schema: SchemaKey) -> Result<SaveReport> {
        let id = match stored_id(graph.schema(schema)) {
            Some(id) => id,
            None => {
                let id = self.schema_ids.next();
                graph.schema_mut(schema).set_prop(ID_PROP, id_value(id));
                id
            }
        };

        let changes = graph.vote_changes(schema);
        let (mut inserted, mut moved, mut deleted) = (
            changes.questions.new.len(),
            changes.questions.moved.len(),
            changes.questions.removed.len(),
        );
        for (_, variants) in &changes.answer_variants {
            inserted += variants.new.len();
            moved += variants.moved.len();
            deleted += variants.removed.len();
        }

        self.schemas.insert(id, graph.vote_to_data(schema));
        graph.mark_vote_committed(schema);
        info!("Saved vote {id}: {inserted} inserted, {moved} moved, {deleted} deleted");

        Ok(SaveReport {
            id,
            inserted,
            moved,
            deleted,
            saved_at: Utc::now(),
        })
    }

    fn vote_schema_count(&self, criteria: &Criteria) -> Result<usize> {
        Ok(self
            .schemas
            .values()
            .filter(|data| matches_criteria(*data, criteria))
            .count())
    }
}

impl VoteResultService for MemoryStore {
    fn save_vote_result(&mut self, graph: &mut VoteGraph, result: ResultKey) -> Result<SaveReport> {
        let schema = graph.vote_result(result).vote_schema();
        let vote_id = stored_id(graph.schema(schema)).ok_or_else(|| {
            Error::NotFound(format!("{schema} of {result} has not been saved"))
        })?;

        let id = match stored_id(graph.vote_result(result)) {
            Some(id) => id,
            None => self.result_ids.next(),
        };
        let entity = graph.vote_result_mut(result);
        entity.set_prop(ID_PROP, id_value(id));
        entity.set_prop(VOTE_ID_PROP, id_value(vote_id));

        let changes = graph.result_changes(result);
        self.results.insert(id, graph.result_to_data(result));
        graph.mark_result_committed(result);
        info!(
            "Saved vote result {id} for vote {vote_id}: {} inserted, {} moved, {} deleted",
            changes.new.len(),
            changes.moved.len(),
            changes.removed.len()
        );

        Ok(SaveReport {
            id,
            inserted: changes.new.len(),
            moved: changes.moved.len(),
            deleted: changes.removed.len(),
            saved_at: Utc::now(),
        })
    }

    fn vote_result_list(
        &self,
        graph: &mut VoteGraph,
        schema: SchemaKey,
        params: &ResultListParams,
    ) -> Result<Vec<ResultKey>> {
        let found: Vec<&VoteResultData> = self
            .results_of(graph, schema)?
            .filter(|data| matches_criteria(*data, &params.criteria))
            .skip(params.offset)
            .take(params.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(found
            .into_iter()
            .map(|data| self.load_result(graph, schema, data))
            .collect())
    }

    fn vote_result_by_user(
        &self,
        graph: &mut VoteGraph,
        schema: SchemaKey,
        user_id: i64,
    ) -> Result<Option<ResultKey>> {
        let user = PropValue::Int(user_id);
        let found = self
            .results_of(graph, schema)?
            .find(|data| data.props.get(USER_ID_PROP) == Some(&user));
        Ok(found.map(|data| self.load_result(graph, schema, data)))
    }
}
