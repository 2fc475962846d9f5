use super::{
    data::AnswerResultData,
    graph::{AnswerKey, QuestionKey, ResultKey, VariantKey, VoteGraph},
    props::{KeyedValues, PropValue, PropertyBag},
};

/// One recorded answer: the chosen variant plus an optional free-text message.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    /// The variant being answered. Fixed at construction.
    pub(super) variant: VariantKey,
    pub(super) message: String,
    pub(super) props: PropertyBag,
    /// Owning vote result, if attached.
    pub(super) vote_result: Option<ResultKey>,
}

impl AnswerResult {
    pub fn answer_variant(&self) -> VariantKey {
        self.variant
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn vote_result(&self) -> Option<ResultKey> {
        self.vote_result
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.props.set(key, value);
    }
}

impl KeyedValues for AnswerResult {
    const KNOWN_KEYS: &'static [&'static str] = &["message"];

    fn props(&self) -> &PropertyBag {
        &self.props
    }

    fn known_value(&self, key: &str) -> Option<PropValue> {
        match key {
            "message" => Some(self.message.as_str().into()),
            _ => None,
        }
    }
}

impl VoteGraph {
    /// Create a detached answer result for `variant`.
    pub fn new_answer_result(&mut self, variant: VariantKey, message: Option<&str>) -> AnswerKey {
        self.insert_answer(AnswerResult {
            variant,
            message: message.unwrap_or_default().to_string(),
            props: PropertyBag::new(),
            vote_result: None,
        })
    }

    /// The question an answer result currently refers to, through its variant.
    pub fn answer_result_question(&self, answer: AnswerKey) -> Option<QuestionKey> {
        self.answer_variant(self.answer_result(answer).variant).question
    }

    /// Serialize `answer`, naming its question and variant by title. A
    /// detached variant serializes with an empty question title.
    pub fn answer_result_to_data(&self, answer: AnswerKey) -> AnswerResultData {
        let entity = self.answer_result(answer);
        let question_title = self
            .answer_result_question(answer)
            .map(|question| self.question(question).title().to_string())
            .unwrap_or_default();
        AnswerResultData {
            question_title,
            answer_variant_title: self.answer_variant(entity.variant).title().to_string(),
            message: entity.message.clone(),
            props: entity.props.clone(),
        }
    }
}
