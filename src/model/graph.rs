use std::fmt::{Display, Formatter};

use super::{
    answer::AnswerResult, question::Question, result::VoteResult, schema::VoteSchema,
    variant::AnswerVariant,
};

macro_rules! graph_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(pub(super) usize);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

graph_key!(
    /// Identity of a vote schema within a [`VoteGraph`].
    SchemaKey,
    "schema"
);
graph_key!(
    /// Identity of a question within a [`VoteGraph`].
    QuestionKey,
    "question"
);
graph_key!(
    /// Identity of an answer variant within a [`VoteGraph`].
    VariantKey,
    "variant"
);
graph_key!(
    /// Identity of a vote result within a [`VoteGraph`].
    ResultKey,
    "result"
);
graph_key!(
    /// Identity of an answer result within a [`VoteGraph`].
    AnswerKey,
    "answer"
);

/// Arena owning every entity of both aggregates.
///
/// Entities are never freed: a key stays valid for the lifetime of the graph,
/// even once its entity has been removed from every container. Keys are only
/// meaningful for the graph that issued them; indexing with a foreign key
/// panics or silently addresses another entity.
#[derive(Debug, Default)]
pub struct VoteGraph {
    pub(super) schemas: Vec<VoteSchema>,
    pub(super) questions: Vec<Question>,
    pub(super) variants: Vec<AnswerVariant>,
    pub(super) results: Vec<VoteResult>,
    pub(super) answers: Vec<AnswerResult>,
}

impl VoteGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self, key: SchemaKey) -> &VoteSchema {
        &self.schemas[key.0]
    }

    pub fn schema_mut(&mut self, key: SchemaKey) -> &mut VoteSchema {
        &mut self.schemas[key.0]
    }

    pub fn question(&self, key: QuestionKey) -> &Question {
        &self.questions[key.0]
    }

    pub fn question_mut(&mut self, key: QuestionKey) -> &mut Question {
        &mut self.questions[key.0]
    }

    pub fn answer_variant(&self, key: VariantKey) -> &AnswerVariant {
        &self.variants[key.0]
    }

    pub fn answer_variant_mut(&mut self, key: VariantKey) -> &mut AnswerVariant {
        &mut self.variants[key.0]
    }

    pub fn vote_result(&self, key: ResultKey) -> &VoteResult {
        &self.results[key.0]
    }

    pub fn vote_result_mut(&mut self, key: ResultKey) -> &mut VoteResult {
        &mut self.results[key.0]
    }

    pub fn answer_result(&self, key: AnswerKey) -> &AnswerResult {
        &self.answers[key.0]
    }

    pub fn answer_result_mut(&mut self, key: AnswerKey) -> &mut AnswerResult {
        &mut self.answers[key.0]
    }

    pub(super) fn insert_schema(&mut self, schema: VoteSchema) -> SchemaKey {
        self.schemas.push(schema);
        SchemaKey(self.schemas.len() - 1)
    }

    pub(super) fn insert_question(&mut self, question: Question) -> QuestionKey {
        self.questions.push(question);
        QuestionKey(self.questions.len() - 1)
    }

    pub(super) fn insert_variant(&mut self, variant: AnswerVariant) -> VariantKey {
        self.variants.push(variant);
        VariantKey(self.variants.len() - 1)
    }

    pub(super) fn insert_result(&mut self, result: VoteResult) -> ResultKey {
        self.results.push(result);
        ResultKey(self.results.len() - 1)
    }

    pub(super) fn insert_answer(&mut self, answer: AnswerResult) -> AnswerKey {
        self.answers.push(answer);
        AnswerKey(self.answers.len() - 1)
    }
}
