//! Serialized shapes of both aggregates.
//!
//! The same types are read when loading a graph and written when dumping
//! one. Every field may be absent on input, and malformed elements of a
//! nested list are skipped rather than failing the whole record.

use serde::{Deserialize, Serialize};

use super::props::{KeyedValues, PropValue, PropertyBag};
use super::types::{AnswerVariantType, QuestionType};

/// A vote schema with its questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaData {
    pub title: String,
    pub description: String,
    pub props: PropertyBag,
    #[serde(deserialize_with = "lenient_seq::deserialize")]
    pub questions: Vec<QuestionData>,
}

/// A question with its answer variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionData {
    pub title: String,
    pub is_required: bool,
    pub is_multiple: bool,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub props: PropertyBag,
    #[serde(deserialize_with = "lenient_seq::deserialize")]
    pub answers: Vec<AnswerVariantData>,
}

/// A single answer variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerVariantData {
    pub title: String,
    #[serde(rename = "type")]
    pub variant_type: AnswerVariantType,
    pub props: PropertyBag,
}

/// A vote result with its answers. Answers refer to the schema by title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteResultData {
    pub props: PropertyBag,
    #[serde(deserialize_with = "lenient_seq::deserialize")]
    pub answer: Vec<AnswerResultData>,
}

/// A single recorded answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerResultData {
    pub question_title: String,
    pub answer_variant_title: String,
    pub message: String,
    pub props: PropertyBag,
}

impl KeyedValues for SchemaData {
    const KNOWN_KEYS: &'static [&'static str] = &["title", "description"];

    fn props(&self) -> &PropertyBag {
        &self.props
    }

    fn known_value(&self, key: &str) -> Option<PropValue> {
        match key {
            "title" => Some(self.title.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            _ => None,
        }
    }
}

impl KeyedValues for VoteResultData {
    const KNOWN_KEYS: &'static [&'static str] = &[];

    fn props(&self) -> &PropertyBag {
        &self.props
    }

    fn known_value(&self, _key: &str) -> Option<PropValue> {
        None
    }
}

/// Deserialize a list, dropping elements that do not decode as `T`.
/// A missing or non-list value yields an empty list.
mod lenient_seq {
    use serde::{de::DeserializeOwned, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let items = match Value::deserialize(deserializer)? {
            Value::Array(items) => items,
            _ => return Ok(Vec::new()),
        };
        let total = items.len();
        let kept: Vec<T> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if kept.len() < total {
            debug!("Skipped {} malformed nested record(s)", total - kept.len());
        }
        Ok(kept)
    }
}
