//! The vote schema and vote result aggregates, held in a single [`VoteGraph`].

pub mod answer;
pub mod data;
pub mod graph;
pub mod props;
pub mod question;
pub mod result;
pub mod schema;
pub mod service;
pub mod staged;
pub mod store;
pub mod types;
pub mod variant;

pub use graph::{AnswerKey, QuestionKey, ResultKey, SchemaKey, VariantKey, VoteGraph};
pub use staged::{Action, Changes, Removal};
