use super::{
    data::{QuestionData, SchemaData},
    graph::{QuestionKey, SchemaKey, VariantKey, VoteGraph},
    props::{FileRef, KeyedValues, PropValue, PropertyBag},
    staged::{forget_removed, Action, Changes, Members, Removal, StagedMembers},
    types::QuestionType,
};
use crate::error::Result;

/// Property holding the schema's image.
pub const IMAGE_PROP: &str = "image_file";

/// A survey definition: the root of the schema aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteSchema {
    pub(super) title: String,
    pub(super) description: String,
    pub(super) props: PropertyBag,
    pub(super) questions: StagedMembers<QuestionKey>,
}

impl VoteSchema {
    /// Survey name.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// The survey image, if one has been stored.
    pub fn image(&self) -> Option<&FileRef> {
        self.props.get(IMAGE_PROP).and_then(PropValue::as_file)
    }

    pub fn set_image(&mut self, image: FileRef) {
        self.props.set(IMAGE_PROP, image);
    }

    /// Questions with their pending actions.
    pub fn members(&self) -> &StagedMembers<QuestionKey> {
        &self.questions
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.props.set(key, value);
    }
}

impl KeyedValues for VoteSchema {
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

/// Everything a persistence layer has to write for one vote schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteChanges {
    pub questions: Changes<QuestionKey>,
    /// Variant changes of each live question that has any.
    pub answer_variants: Vec<(QuestionKey, Changes<VariantKey>)>,
}

impl VoteChanges {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.answer_variants.is_empty()
    }
}

impl VoteGraph {
    /// Create an empty vote schema.
    pub fn create_vote(&mut self, title: impl Into<String>, description: Option<&str>) -> SchemaKey {
        self.insert_schema(VoteSchema {
            title: title.into(),
            description: description.unwrap_or_default().to_string(),
            props: PropertyBag::new(),
            questions: StagedMembers::new(),
        })
    }

    /// Build a vote schema from its serialized form. Every question and
    /// variant starts out as [`Action::New`].
    pub fn load_vote(&mut self, data: SchemaData) -> SchemaKey {
        let schema = self.insert_schema(VoteSchema {
            title: data.title,
            description: data.description,
            props: data.props,
            questions: StagedMembers::new(),
        });
        for question_data in data.questions {
            let question = self.load_question(question_data);
            self.add_question(schema, question);
        }
        debug!(
            "Loaded {schema} with {} question(s)",
            self.question_count(schema)
        );
        schema
    }

    /// Parse and load a vote schema from JSON.
    pub fn load_vote_json(&mut self, json: &str) -> Result<SchemaKey> {
        let data: SchemaData = serde_json::from_str(json)?;
        Ok(self.load_vote(data))
    }

    /// Attach `question` to `schema`, moving it out of any other schema.
    /// A question without an owner is forgotten by any other schema still
    /// holding it as removed.
    pub fn add_question(&mut self, schema: SchemaKey, question: QuestionKey) {
        let owner = self.question(question).vote;
        let action = match owner {
            Some(current) if current != schema => {
                self.remove_question(current, question, Removal::Move);
                debug!("Moving {question} from {current} to {schema}");
                Action::Moved
            }
            None => {
                let others = self
                    .schemas
                    .iter_mut()
                    .enumerate()
                    .filter(|&(index, _)| index != schema.0)
                    .map(|(_, other)| &mut other.questions);
                if forget_removed(others, question) > 0 {
                    debug!("Dropped stale removal of {question} before adding it to {schema}");
                }
                match self.schema(schema).questions.action(question) {
                    Some(action) if action.is_live() => action,
                    _ => Action::New,
                }
            }
            _ => match self.schema(schema).questions.action(question) {
                Some(action) if action.is_live() => action,
                _ => Action::New,
            },
        };

        self.question_mut(question).vote = Some(schema);
        self.schema_mut(schema).questions.attach(question, action);
    }

    /// Build a new question and attach it to `schema`. Defaults to radio.
    pub fn create_question(
        &mut self,
        schema: SchemaKey,
        title: impl Into<String>,
        question_type: Option<QuestionType>,
    ) -> QuestionKey {
        let question = self.load_question(QuestionData {
            title: title.into(),
            question_type: question_type.unwrap_or_default(),
            ..Default::default()
        });
        self.add_question(schema, question);
        question
    }

    /// Take `question` out of `schema`. Does nothing if it is not tracked there.
    pub fn remove_question(&mut self, schema: SchemaKey, question: QuestionKey, removal: Removal) {
        let questions = &mut self.schemas[schema.0].questions;
        if !questions.contains(question) {
            return;
        }
        match removal {
            Removal::Delete => {
                questions.set_action(question, Action::Removed);
                let owner = &mut self.questions[question.0].vote;
                if *owner == Some(schema) {
                    *owner = None;
                }
                trace!("Marked {question} of {schema} for removal");
            }
            Removal::Move => {
                questions.detach(question);
                trace!("Detached {question} from {schema}");
            }
        }
    }

    /// First live question of `schema` with exactly this title.
    pub fn question_by_title(&self, schema: SchemaKey, title: &str) -> Option<QuestionKey> {
        self.questions(schema, None)
            .find(|&question| self.question(question).title == title)
    }

    /// Questions of `schema` with the given action, or every live question.
    pub fn questions(&self, schema: SchemaKey, action: Option<Action>) -> Members<'_, QuestionKey> {
        self.schema(schema).questions.view(action)
    }

    pub fn question_count(&self, schema: SchemaKey) -> usize {
        self.schema(schema).questions.count()
    }

    /// Pending changes of `schema` and its live questions.
    pub fn vote_changes(&self, schema: SchemaKey) -> VoteChanges {
        VoteChanges {
            questions: self.schema(schema).questions.changes(),
            answer_variants: self
                .questions(schema, None)
                .map(|question| (question, self.answer_variant_changes(question)))
                .filter(|(_, changes)| !changes.is_empty())
                .collect(),
        }
    }

    /// Record that `schema` has been persisted: removed questions and
    /// variants are forgotten, everything else becomes [`Action::Clean`].
    pub fn mark_vote_committed(&mut self, schema: SchemaKey) {
        let dropped = self.schemas[schema.0].questions.commit();
        let live: Vec<QuestionKey> = self.questions(schema, None).collect();
        let mut dropped_variants = 0;
        for question in live {
            dropped_variants += self.questions[question.0].answers.commit().len();
        }
        info!(
            "Committed {schema}: dropped {} question(s) and {dropped_variants} variant(s)",
            dropped.len()
        );
    }

    /// Serialize `schema` with its live questions and variants.
    pub fn vote_to_data(&self, schema: SchemaKey) -> SchemaData {
        let entity = self.schema(schema);
        SchemaData {
            title: entity.title.clone(),
            description: entity.description.clone(),
            props: entity.props.clone(),
            questions: self
                .questions(schema, None)
                .map(|question| self.question_to_data(question))
                .collect(),
        }
    }

    /// Serialize `schema` to JSON.
    pub fn vote_to_json(&self, schema: SchemaKey) -> Result<String> {
        Ok(serde_json::to_string(&self.vote_to_data(schema))?)
    }
}
