use super::{
    data::QuestionData,
    graph::{QuestionKey, SchemaKey, VariantKey, VoteGraph},
    props::{KeyedValues, PropValue, PropertyBag},
    staged::{forget_removed, Action, Changes, Members, Removal, StagedMembers},
    types::{AnswerVariantType, QuestionType},
    variant::AnswerVariant,
};

/// A question: a container of answer variants, owned by at most one vote schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub(super) title: String,
    pub(super) is_required: bool,
    pub(super) is_multiple: bool,
    pub(super) question_type: QuestionType,
    pub(super) props: PropertyBag,
    /// Owning vote schema, if attached.
    pub(super) vote: Option<SchemaKey>,
    pub(super) answers: StagedMembers<VariantKey>,
}

impl Question {
    fn new(title: String, question_type: QuestionType) -> Self {
        Self {
            title,
            is_required: false,
            is_multiple: false,
            question_type,
            props: PropertyBag::new(),
            vote: None,
            answers: StagedMembers::new(),
        }
    }

    /// Question text.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Must this question be answered?
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn set_required(&mut self, state: bool) {
        self.is_required = state;
    }

    /// May a single vote result hold several answers to this question?
    pub fn is_multiple(&self) -> bool {
        self.is_multiple
    }

    pub fn set_multiple(&mut self, state: bool) {
        self.is_multiple = state;
    }

    /// Field type (radio, checkbox, dropdown, multiselect, or mixed).
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn set_question_type(&mut self, question_type: QuestionType) {
        self.question_type = question_type;
    }

    pub fn vote(&self) -> Option<SchemaKey> {
        self.vote
    }

    /// Answer variants with their pending actions.
    pub fn members(&self) -> &StagedMembers<VariantKey> {
        &self.answers
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.props.set(key, value);
    }
}

impl KeyedValues for Question {
    const KNOWN_KEYS: &'static [&'static str] = &["title", "type", "is_required", "is_multiple"];

    fn props(&self) -> &PropertyBag {
        &self.props
    }

    fn known_value(&self, key: &str) -> Option<PropValue> {
        match key {
            "title" => Some(self.title.as_str().into()),
            "type" => Some(self.question_type.code().into()),
            "is_required" => Some(self.is_required.into()),
            "is_multiple" => Some(self.is_multiple.into()),
            _ => None,
        }
    }
}

impl VoteGraph {
    /// Create a detached question, attaching its nested answer variants.
    pub fn load_question(&mut self, data: QuestionData) -> QuestionKey {
        let mut question = Question::new(data.title, data.question_type);
        question.is_required = data.is_required;
        question.is_multiple = data.is_multiple;
        question.props = data.props;
        let key = self.insert_question(question);

        for answer in data.answers {
            let variant = self.insert_variant(AnswerVariant::from_data(answer));
            self.add_answer_variant(key, variant);
        }
        key
    }

    /// Copy a question's own attributes into a new, detached question.
    /// Neither the property bag nor the answer variants are copied.
    pub fn clone_question(&mut self, question: QuestionKey) -> QuestionKey {
        let source = self.question(question);
        let mut copy = Question::new(source.title.clone(), source.question_type);
        copy.is_required = source.is_required;
        copy.is_multiple = source.is_multiple;
        self.insert_question(copy)
    }

    /// Attach `variant` to `question`.
    ///
    /// A variant owned by another question is detached there first and
    /// recorded here as [`Action::Moved`]; anything else is [`Action::New`].
    /// Re-adding a live member keeps its current action. A variant without
    /// an owner is forgotten by any other question still holding it as removed.
    pub fn add_answer_variant(&mut self, question: QuestionKey, variant: VariantKey) {
        let owner = self.answer_variant(variant).question;
        let action = match owner {
            Some(current) if current != question => {
                self.remove_answer_variant(current, variant, Removal::Move);
                debug!("Moving {variant} from {current} to {question}");
                Action::Moved
            }
            None => {
                let others = self
                    .questions
                    .iter_mut()
                    .enumerate()
                    .filter(|&(index, _)| index != question.0)
                    .map(|(_, other)| &mut other.answers);
                if forget_removed(others, variant) > 0 {
                    debug!("Dropped stale removal of {variant} before adding it to {question}");
                }
                match self.question(question).answers.action(variant) {
                    Some(action) if action.is_live() => action,
                    _ => Action::New,
                }
            }
            _ => match self.question(question).answers.action(variant) {
                Some(action) if action.is_live() => action,
                _ => Action::New,
            },
        };

        self.question_mut(question).answers.attach(variant, action);
        self.answer_variant_mut(variant).question = Some(question);
        self.normalize_question_type(question, variant);
    }

    /// Build a new variant and attach it to `question`. Without an explicit
    /// type the variant takes the question's type, or radio for a mixed question.
    pub fn create_answer_variant(
        &mut self,
        question: QuestionKey,
        title: impl Into<String>,
        variant_type: Option<AnswerVariantType>,
    ) -> VariantKey {
        let variant_type = variant_type
            .or_else(|| self.question(question).question_type.variant_type())
            .unwrap_or_default();
        let variant = self.insert_variant(AnswerVariant {
            title: title.into(),
            variant_type,
            props: PropertyBag::new(),
            question: None,
        });
        self.add_answer_variant(question, variant);
        variant
    }

    /// Take `variant` out of `question`. Does nothing if it is not tracked there.
    pub fn remove_answer_variant(
        &mut self,
        question: QuestionKey,
        variant: VariantKey,
        removal: Removal,
    ) {
        let answers = &mut self.questions[question.0].answers;
        if !answers.contains(variant) {
            return;
        }
        match removal {
            Removal::Delete => {
                answers.set_action(variant, Action::Removed);
                let owner = &mut self.variants[variant.0].question;
                if *owner == Some(question) {
                    *owner = None;
                }
                trace!("Marked {variant} of {question} for removal");
            }
            Removal::Move => {
                answers.detach(variant);
                trace!("Detached {variant} from {question}");
            }
        }
    }

    /// First live variant of `question` with exactly this title.
    pub fn answer_variant_by_title(&self, question: QuestionKey, title: &str) -> Option<VariantKey> {
        self.answer_variants(question, None)
            .find(|&variant| self.answer_variant(variant).title == title)
    }

    /// Variants of `question` with the given action, or every live variant.
    pub fn answer_variants(&self, question: QuestionKey, action: Option<Action>) -> Members<'_, VariantKey> {
        self.question(question).answers.view(action)
    }

    pub fn answer_variant_count(&self, question: QuestionKey) -> usize {
        self.question(question).answers.count()
    }

    /// Pending variant changes of `question`.
    pub fn answer_variant_changes(&self, question: QuestionKey) -> Changes<VariantKey> {
        self.question(question).answers.changes()
    }

    /// Serialize `question` and its live variants.
    pub fn question_to_data(&self, question: QuestionKey) -> QuestionData {
        let entity = self.question(question);
        QuestionData {
            title: entity.title.clone(),
            is_required: entity.is_required,
            is_multiple: entity.is_multiple,
            question_type: entity.question_type,
            props: entity.props.clone(),
            answers: self
                .answer_variants(question, None)
                .map(|variant| self.answer_variant(variant).to_data())
                .collect(),
        }
    }

    /// A question becomes mixed as soon as a variant disagrees with its type.
    /// It never reverts on its own.
    fn normalize_question_type(&mut self, question: QuestionKey, variant: VariantKey) {
        let variant_type = self.answer_variant(variant).variant_type;
        let entity = self.question_mut(question);
        if entity.question_type != QuestionType::MixedType && !variant_type.matches(entity.question_type) {
            debug!(
                "{question} switches from {:?} to mixed type because of {variant}",
                entity.question_type
            );
            entity.question_type = QuestionType::MixedType;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data::AnswerVariantData;

    fn question(graph: &mut VoteGraph, title: &str) -> QuestionKey {
        graph.load_question(QuestionData {
            title: title.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn added_variant_is_new() {
        let mut graph = VoteGraph::new();
        let q = question(&mut graph, "Q");
        let v = graph.create_answer_variant(q, "Yes", None);

        assert_eq!(graph.answer_variants(q, None).collect::<Vec<_>>(), vec![v]);
        assert_eq!(graph.answer_variants(q, Some(Action::New)).collect::<Vec<_>>(), vec![v]);
        assert_eq!(graph.answer_variants(q, Some(Action::Moved)).count(), 0);
        assert_eq!(graph.answer_variants(q, Some(Action::Removed)).count(), 0);
        assert_eq!(graph.answer_variant(v).question(), Some(q));
    }

    #[test]
    fn removed_variant_stays_enumerable_as_removed() {
        let mut graph = VoteGraph::new();
        let q = question(&mut graph, "Q");
        let yes = graph.create_answer_variant(q, "Yes", None);
        let no = graph.create_answer_variant(q, "No", None);

        graph.remove_answer_variant(q, yes, Removal::Delete);

        assert_eq!(graph.answer_variants(q, None).collect::<Vec<_>>(), vec![no]);
        assert_eq!(graph.answer_variants(q, Some(Action::Removed)).collect::<Vec<_>>(), vec![yes]);
        assert_eq!(graph.answer_variant_count(q), 1);
        assert_eq!(graph.answer_variant(yes).question(), None);
        assert_eq!(graph.answer_variant_by_title(q, "Yes"), None);
    }

    #[test]
    fn moved_removal_forgets_the_variant() {
        let mut graph = VoteGraph::new();
        let q = question(&mut graph, "Q");
        let v = graph.create_answer_variant(q, "Yes", None);

        graph.remove_answer_variant(q, v, Removal::Move);

        for action in [None, Some(Action::New), Some(Action::Moved), Some(Action::Removed)] {
            assert_eq!(graph.answer_variants(q, action).count(), 0);
        }
    }

    #[test]
    fn reparenting_moves_without_deleting() {
        let mut graph = VoteGraph::new();
        let a = question(&mut graph, "A");
        let b = question(&mut graph, "B");
        let v = graph.create_answer_variant(a, "Shared", None);

        graph.add_answer_variant(b, v);

        for action in [None, Some(Action::New), Some(Action::Moved), Some(Action::Removed)] {
            assert_eq!(graph.answer_variants(a, action).count(), 0);
        }
        assert_eq!(graph.answer_variants(b, Some(Action::Moved)).collect::<Vec<_>>(), vec![v]);
        assert_eq!(graph.answer_variants(b, None).collect::<Vec<_>>(), vec![v]);
        assert_eq!(graph.answer_variant(v).question(), Some(b));
    }

    #[test]
    fn readding_keeps_a_live_action() {
        let mut graph = VoteGraph::new();
        let a = question(&mut graph, "A");
        let b = question(&mut graph, "B");
        let v = graph.create_answer_variant(a, "Shared", None);
        graph.add_answer_variant(b, v);

        graph.add_answer_variant(b, v);
        assert_eq!(graph.question(b).members().action(v), Some(Action::Moved));

        graph.remove_answer_variant(b, v, Removal::Delete);
        graph.add_answer_variant(b, v);
        assert_eq!(graph.question(b).members().action(v), Some(Action::New));
    }

    #[test]
    fn adding_a_deleted_variant_elsewhere_drops_the_stale_removal() {
        let mut graph = VoteGraph::new();
        let a = question(&mut graph, "A");
        let b = question(&mut graph, "B");
        let v = graph.create_answer_variant(a, "Shared", None);
        graph.remove_answer_variant(a, v, Removal::Delete);
        graph.add_answer_variant(b, v);

        assert!(!graph.question(a).members().contains(v));
        assert!(graph.answer_variant_changes(a).is_empty());
        assert_eq!(graph.answer_variants(b, Some(Action::New)).collect::<Vec<_>>(), vec![v]);
        assert_eq!(graph.answer_variant(v).question(), Some(b));

        // No longer tracked by `a`, so this is a no-op.
        graph.remove_answer_variant(a, v, Removal::Delete);
        assert_eq!(graph.answer_variant(v).question(), Some(b));
    }

    #[test]
    fn disagreeing_variant_makes_the_question_mixed() {
        let mut graph = VoteGraph::new();
        let q = question(&mut graph, "Q");
        assert_eq!(graph.question(q).question_type(), QuestionType::Radio);

        graph.create_answer_variant(q, "One", None);
        assert_eq!(graph.question(q).question_type(), QuestionType::Radio);

        graph.create_answer_variant(q, "Two", Some(AnswerVariantType::Checkbox));
        assert_eq!(graph.question(q).question_type(), QuestionType::MixedType);

        graph.create_answer_variant(q, "Three", Some(AnswerVariantType::Radio));
        assert_eq!(graph.question(q).question_type(), QuestionType::MixedType);
    }

    #[test]
    fn created_variant_type_follows_the_question() {
        let mut graph = VoteGraph::new();
        let q = graph.load_question(QuestionData {
            title: "Pick".to_string(),
            question_type: QuestionType::Dropdown,
            ..Default::default()
        });
        let first = graph.create_answer_variant(q, "First", None);
        assert_eq!(graph.answer_variant(first).variant_type(), AnswerVariantType::Dropdown);

        graph.question_mut(q).set_question_type(QuestionType::MixedType);
        let second = graph.create_answer_variant(q, "Second", None);
        assert_eq!(graph.answer_variant(second).variant_type(), AnswerVariantType::Radio);
        let third = graph.create_answer_variant(q, "Third", Some(AnswerVariantType::Textarea));
        assert_eq!(graph.answer_variant(third).variant_type(), AnswerVariantType::Textarea);
    }

    #[test]
    fn identical_variants_are_distinct_members() {
        let mut graph = VoteGraph::new();
        let q = graph.load_question(QuestionData {
            title: "Twins".to_string(),
            answers: vec![AnswerVariantData::default(), AnswerVariantData::default()],
            ..Default::default()
        });

        let members: Vec<_> = graph.answer_variants(q, None).collect();
        assert_eq!(members.len(), 2);
        assert_ne!(members[0], members[1]);
        assert_eq!(graph.answer_variant(members[0]), graph.answer_variant(members[1]));
    }

    #[test]
    fn lookup_by_title_prefers_the_first_live_match() {
        let mut graph = VoteGraph::new();
        let q = question(&mut graph, "Q");
        let first = graph.create_answer_variant(q, "Dup", None);
        let second = graph.create_answer_variant(q, "Dup", None);

        assert_eq!(graph.answer_variant_by_title(q, "Dup"), Some(first));
        graph.remove_answer_variant(q, first, Removal::Delete);
        assert_eq!(graph.answer_variant_by_title(q, "Dup"), Some(second));
        assert_eq!(graph.answer_variant_by_title(q, "Nope"), None);
    }

    #[test]
    fn clone_carries_no_children_or_owner() {
        let mut graph = VoteGraph::new();
        let vote = graph.create_vote("Vote", None);
        let q = graph.create_question(vote, "Original", Some(QuestionType::Checkbox));
        graph.question_mut(q).set_required(true);
        graph.question_mut(q).set_prop("sort", 5);
        graph.create_answer_variant(q, "A", None);

        let copy = graph.clone_question(q);
        let cloned = graph.question(copy);

        assert_eq!(cloned.title(), "Original");
        assert!(cloned.is_required());
        assert_eq!(cloned.question_type(), QuestionType::Checkbox);
        assert_eq!(cloned.vote(), None);
        assert_eq!(cloned.prop("sort"), None);
        assert_eq!(graph.answer_variant_count(copy), 0);
        assert_eq!(graph.answer_variant_count(q), 1);
    }

    #[test]
    fn keyed_values() {
        let mut graph = VoteGraph::new();
        let q = question(&mut graph, "Q");
        graph.question_mut(q).set_multiple(true);

        let entity = graph.question(q);
        assert!(entity.assert_value_by_key("is_multiple", &true.into()));
        assert!(entity.assert_value_by_key("is_required", &false.into()));
        assert!(entity.assert_value_by_key("type", &0.into()));
        assert!(!entity.has_value_key("description"));
    }

    #[test]
    fn serialization_skips_removed_variants() {
        let mut graph = VoteGraph::new();
        let q = question(&mut graph, "Q");
        let gone = graph.create_answer_variant(q, "Gone", None);
        graph.create_answer_variant(q, "Kept", None);
        graph.remove_answer_variant(q, gone, Removal::Delete);

        let data = graph.question_to_data(q);
        let titles: Vec<_> = data.answers.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Kept"]);
    }
}
