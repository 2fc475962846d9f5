use super::{
    answer::AnswerResult,
    data::VoteResultData,
    graph::{AnswerKey, QuestionKey, ResultKey, SchemaKey, VariantKey, VoteGraph},
    props::{KeyedValues, PropValue, PropertyBag},
    staged::{forget_removed, Action, Changes, Members, Removal, StagedMembers},
};
use crate::error::{Error, Result};

/// A set of answers to one vote schema: the root of the result aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteResult {
    /// The schema being answered. Fixed at construction.
    pub(super) vote: SchemaKey,
    pub(super) props: PropertyBag,
    pub(super) answers: StagedMembers<AnswerKey>,
}

impl VoteResult {
    pub fn vote_schema(&self) -> SchemaKey {
        self.vote
    }

    /// Answer results with their pending actions.
    pub fn members(&self) -> &StagedMembers<AnswerKey> {
        &self.answers
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.props.set(key, value);
    }
}

impl KeyedValues for VoteResult {
    const KNOWN_KEYS: &'static [&'static str] = &[];

    fn props(&self) -> &PropertyBag {
        &self.props
    }

    fn known_value(&self, _key: &str) -> Option<PropValue> {
        None
    }
}

/// Operations on the result aggregate. The referenced vote schema is only
/// ever read, never modified.
impl VoteGraph {
    /// Start an empty vote result for `schema`.
    pub fn create_new_result(&mut self, schema: SchemaKey) -> ResultKey {
        self.insert_result(VoteResult {
            vote: schema,
            props: PropertyBag::new(),
            answers: StagedMembers::new(),
        })
    }

    /// Build a vote result for `schema` from its serialized form.
    ///
    /// Answers are resolved by question and variant title; entries that do
    /// not resolve are dropped. Resolved answers are attached as stored,
    /// without single-answer eviction.
    pub fn load_result(&mut self, schema: SchemaKey, data: VoteResultData) -> ResultKey {
        let result = self.insert_result(VoteResult {
            vote: schema,
            props: data.props,
            answers: StagedMembers::new(),
        });

        let total = data.answer.len();
        for answer_data in data.answer {
            let Some(variant) = self.resolve_answer_variant(
                schema,
                &answer_data.question_title,
                &answer_data.answer_variant_title,
            ) else {
                continue;
            };
            let answer = self.insert_answer(AnswerResult {
                variant,
                message: answer_data.message,
                props: answer_data.props,
                vote_result: Some(result),
            });
            self.results[result.0].answers.attach(answer, Action::New);
        }

        let loaded = self.answer_results_count(result);
        if loaded < total {
            debug!(
                "Loading {result} skipped {} unresolvable answer(s)",
                total - loaded
            );
        }
        result
    }

    /// Parse and load a vote result for `schema` from JSON.
    pub fn load_result_json(&mut self, schema: SchemaKey, json: &str) -> Result<ResultKey> {
        let data: VoteResultData = serde_json::from_str(json)?;
        Ok(self.load_result(schema, data))
    }

    /// Record an answer for `variant`. Fails without touching the graph if
    /// the variant does not belong to the result's vote schema.
    pub fn create_answer_result(
        &mut self,
        result: ResultKey,
        variant: VariantKey,
        message: Option<&str>,
    ) -> Result<AnswerKey> {
        self.check_answer_variant(result, variant)?;
        let answer = self.new_answer_result(variant, message);
        self.add_answer_result(result, answer)?;
        Ok(answer)
    }

    /// Record an answer by question and variant title. Returns `None` if
    /// either title does not resolve.
    pub fn create_answer_result_by_title(
        &mut self,
        result: ResultKey,
        question_title: &str,
        variant_title: &str,
        message: Option<&str>,
    ) -> Result<Option<AnswerKey>> {
        let schema = self.vote_result(result).vote;
        match self.resolve_answer_variant(schema, question_title, variant_title) {
            Some(variant) => self.create_answer_result(result, variant, message).map(Some),
            None => Ok(None),
        }
    }

    /// Attach `answer` to `result`.
    ///
    /// For a question that takes a single answer, every live answer to that
    /// question is marked for removal first. An answer owned by another vote
    /// result is detached there and recorded here as [`Action::Moved`].
    pub fn add_answer_result(&mut self, result: ResultKey, answer: AnswerKey) -> Result<()> {
        let variant = self.answer_result(answer).variant;
        let question = self.check_answer_variant(result, variant)?;

        let owner = self.answer_result(answer).vote_result;
        let action = match owner {
            Some(current) if current != result => {
                self.remove_answer_result(current, answer, Removal::Move);
                debug!("Moving {answer} from {current} to {result}");
                Action::Moved
            }
            None => {
                let others = self
                    .results
                    .iter_mut()
                    .enumerate()
                    .filter(|&(index, _)| index != result.0)
                    .map(|(_, other)| &mut other.answers);
                if forget_removed(others, answer) > 0 {
                    debug!("Dropped stale removal of {answer} before adding it to {result}");
                }
                match self.vote_result(result).answers.action(answer) {
                    Some(action) if action.is_live() => action,
                    _ => Action::New,
                }
            }
            Some(_) => match self.vote_result(result).answers.action(answer) {
                Some(action) if action.is_live() => action,
                _ => Action::New,
            },
        };

        if !self.question(question).is_multiple {
            let previous: Vec<AnswerKey> = self
                .answer_results_by_question(result, question)
                .filter(|&other| other != answer)
                .collect();
            for other in previous {
                debug!("{answer} replaces {other} for single-answer {question}");
                self.remove_answer_result(result, other, Removal::Delete);
            }
        }

        self.results[result.0].answers.attach(answer, action);
        self.answers[answer.0].vote_result = Some(result);
        Ok(())
    }

    /// Take `answer` out of `result`. Does nothing if it is not tracked there.
    pub fn remove_answer_result(&mut self, result: ResultKey, answer: AnswerKey, removal: Removal) {
        let answers = &mut self.results[result.0].answers;
        if !answers.contains(answer) {
            return;
        }
        match removal {
            Removal::Delete => {
                answers.set_action(answer, Action::Removed);
                let owner = &mut self.answers[answer.0].vote_result;
                if *owner == Some(result) {
                    *owner = None;
                }
                trace!("Marked {answer} of {result} for removal");
            }
            Removal::Move => {
                answers.detach(answer);
                trace!("Detached {answer} from {result}");
            }
        }
    }

    /// Live answers of `result` to `question`.
    pub fn answer_results_by_question(
        &self,
        result: ResultKey,
        question: QuestionKey,
    ) -> impl Iterator<Item = AnswerKey> + Clone + '_ {
        self.answer_results(result, None)
            .filter(move |&answer| self.answer_result_question(answer) == Some(question))
    }

    /// Live answers of `result` to the question with this title. Empty if
    /// the schema has no such question.
    pub fn answer_results_by_question_title<'a>(
        &'a self,
        result: ResultKey,
        question_title: &str,
    ) -> impl Iterator<Item = AnswerKey> + Clone + 'a {
        self.question_by_title(self.vote_result(result).vote, question_title)
            .into_iter()
            .flat_map(move |question| self.answer_results_by_question(result, question))
    }

    pub fn has_answer_result_by_question(&self, result: ResultKey, question: QuestionKey) -> bool {
        self.answer_results_by_question(result, question).next().is_some()
    }

    pub fn has_answer_result_by_question_title(&self, result: ResultKey, question_title: &str) -> bool {
        self.answer_results_by_question_title(result, question_title)
            .next()
            .is_some()
    }

    /// Answers of `result` with the given action, or every live answer.
    pub fn answer_results(&self, result: ResultKey, action: Option<Action>) -> Members<'_, AnswerKey> {
        self.vote_result(result).answers.view(action)
    }

    pub fn answer_results_count(&self, result: ResultKey) -> usize {
        self.vote_result(result).answers.count()
    }

    /// Pending answer changes of `result`.
    pub fn result_changes(&self, result: ResultKey) -> Changes<AnswerKey> {
        self.vote_result(result).answers.changes()
    }

    /// Record that `result` has been persisted.
    pub fn mark_result_committed(&mut self, result: ResultKey) {
        let dropped = self.results[result.0].answers.commit();
        info!("Committed {result}: dropped {} answer(s)", dropped.len());
    }

    /// Serialize `result` with its live answers.
    pub fn result_to_data(&self, result: ResultKey) -> VoteResultData {
        VoteResultData {
            props: self.vote_result(result).props.clone(),
            answer: self
                .answer_results(result, None)
                .map(|answer| self.answer_result_to_data(answer))
                .collect(),
        }
    }

    /// Serialize `result` to JSON.
    pub fn result_to_json(&self, result: ResultKey) -> Result<String> {
        Ok(serde_json::to_string(&self.result_to_data(result))?)
    }

    /// Walk schema, question and variant by title. Empty titles never resolve.
    fn resolve_answer_variant(
        &self,
        schema: SchemaKey,
        question_title: &str,
        variant_title: &str,
    ) -> Option<VariantKey> {
        if question_title.is_empty() || variant_title.is_empty() {
            return None;
        }
        let question = self.question_by_title(schema, question_title)?;
        self.answer_variant_by_title(question, variant_title)
    }

    /// Ensure `variant` belongs to a question of `result`'s vote schema.
    /// Returns that question.
    fn check_answer_variant(&self, result: ResultKey, variant: VariantKey) -> Result<QuestionKey> {
        let expected = self.vote_result(result).vote;
        let question = self.answer_variant(variant).question;
        match question {
            Some(question) if self.question(question).vote == Some(expected) => Ok(question),
            _ => {
                warn!("Rejected {variant} for {result}: not part of {expected}");
                Err(Error::InvalidAnswerVariant(format!(
                    "{variant} does not belong to {expected}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::data::SchemaData;

    /// Schema "Survey" with a single-answer "Q1" (A, B) and a multiple-answer
    /// question (Keynote, Workshop, Panel).
    fn survey() -> (VoteGraph, SchemaKey) {
        let mut graph = VoteGraph::new();
        let vote = graph.load_vote(SchemaData::example());
        (graph, vote)
    }

    const SESSIONS: &str = "Which sessions did you attend?";

    #[test]
    fn concrete_scenario() {
        log4rs_test_utils::test_logging::init_logging_once_for(["vote_graph"], None, None);

        let (mut graph, vote) = survey();
        let result = graph.create_new_result(vote);

        let first = graph
            .create_answer_result_by_title(result, "Q1", "A", Some("note"))
            .unwrap()
            .unwrap();
        assert_eq!(graph.answer_results(result, None).collect::<Vec<_>>(), vec![first]);
        assert_eq!(
            serde_json::to_value(graph.answer_result_to_data(first)).unwrap(),
            json!({
                "question_title": "Q1",
                "answer_variant_title": "A",
                "message": "note",
                "props": {},
            })
        );

        let second = graph
            .create_answer_result_by_title(result, "Q1", "B", None)
            .unwrap()
            .unwrap();
        assert_eq!(graph.answer_results(result, None).collect::<Vec<_>>(), vec![second]);
        assert_eq!(
            graph.answer_results_by_question_title(result, "Q1").collect::<Vec<_>>(),
            vec![second]
        );
        assert_eq!(
            graph.answer_results(result, Some(Action::Removed)).collect::<Vec<_>>(),
            vec![first]
        );
        assert_eq!(graph.answer_result(first).vote_result(), None);
        assert_eq!(graph.answer_result(second).vote_result(), Some(result));
    }

    #[test]
    fn multiple_answer_questions_accumulate() {
        let (mut graph, vote) = survey();
        let result = graph.create_new_result(vote);

        graph
            .create_answer_result_by_title(result, SESSIONS, "Keynote", None)
            .unwrap();
        graph
            .create_answer_result_by_title(result, SESSIONS, "Panel", None)
            .unwrap();
        graph.create_answer_result_by_title(result, "Q1", "A", None).unwrap();

        assert_eq!(graph.answer_results_count(result), 3);
        assert_eq!(graph.answer_results_by_question_title(result, SESSIONS).count(), 2);
        assert!(graph.has_answer_result_by_question_title(result, "Q1"));
        assert!(!graph.has_answer_result_by_question_title(result, "Unknown"));
        assert_eq!(graph.answer_results_by_question_title(result, "Unknown").count(), 0);
    }

    #[test]
    fn unresolved_titles_give_nothing() {
        let (mut graph, vote) = survey();
        let result = graph.create_new_result(vote);

        assert!(graph
            .create_answer_result_by_title(result, "Q1", "Z", None)
            .unwrap()
            .is_none());
        assert!(graph
            .create_answer_result_by_title(result, "Q9", "A", None)
            .unwrap()
            .is_none());
        assert!(graph
            .create_answer_result_by_title(result, "", "", None)
            .unwrap()
            .is_none());
        assert_eq!(graph.answer_results_count(result), 0);
    }

    #[test]
    fn foreign_variants_are_rejected_without_mutation() {
        let (mut graph, vote) = survey();
        let other = graph.create_vote("Other", None);
        let foreign_question = graph.create_question(other, "Q1", None);
        let foreign = graph.create_answer_variant(foreign_question, "A", None);
        let detached = graph.load_answer_variant(Default::default());

        let result = graph.create_new_result(vote);
        graph.create_answer_result_by_title(result, "Q1", "A", None).unwrap();
        let answers_before = graph.answers.len();

        let err = graph.create_answer_result(result, foreign, None).unwrap_err();
        assert!(err.is_integrity_violation());
        let err = graph.create_answer_result(result, detached, Some("x")).unwrap_err();
        assert!(matches!(err, Error::InvalidAnswerVariant(_)));

        assert_eq!(graph.answers.len(), answers_before);
        assert_eq!(graph.answer_results_count(result), 1);
        assert!(graph.result_changes(result).removed.is_empty());
    }

    #[test]
    fn add_rejects_foreign_answers() {
        let (mut graph, vote) = survey();
        let other = graph.create_vote("Other", None);
        let question = graph.create_question(other, "Elsewhere", None);
        let variant = graph.create_answer_variant(question, "Yes", None);
        let answer = graph.new_answer_result(variant, None);
        let result = graph.create_new_result(vote);

        assert!(graph.add_answer_result(result, answer).is_err());
        assert_eq!(graph.answer_result(answer).vote_result(), None);
        assert_eq!(graph.answer_results(result, Some(Action::New)).count(), 0);
    }

    #[test]
    fn answers_move_between_results() {
        let (mut graph, vote) = survey();
        let first = graph.create_new_result(vote);
        let second = graph.create_new_result(vote);
        let answer = graph
            .create_answer_result_by_title(first, "Q1", "A", None)
            .unwrap()
            .unwrap();

        graph.add_answer_result(second, answer).unwrap();

        for action in [None, Some(Action::New), Some(Action::Moved), Some(Action::Removed)] {
            assert_eq!(graph.answer_results(first, action).count(), 0);
        }
        assert_eq!(
            graph.answer_results(second, Some(Action::Moved)).collect::<Vec<_>>(),
            vec![answer]
        );
        assert_eq!(graph.answer_result(answer).vote_result(), Some(second));
    }

    #[test]
    fn deleted_answer_added_elsewhere_is_reported_once() {
        let (mut graph, vote) = survey();
        let first = graph.create_new_result(vote);
        let second = graph.create_new_result(vote);
        let answer = graph
            .create_answer_result_by_title(first, SESSIONS, "Keynote", None)
            .unwrap()
            .unwrap();
        graph.mark_result_committed(first);

        graph.remove_answer_result(first, answer, Removal::Delete);
        graph.add_answer_result(second, answer).unwrap();

        assert!(graph.result_changes(first).is_empty());
        assert_eq!(graph.result_changes(second).new, vec![answer]);
        assert_eq!(graph.answer_result(answer).vote_result(), Some(second));
    }

    #[test]
    fn removal_modes() {
        let (mut graph, vote) = survey();
        let result = graph.create_new_result(vote);
        let keynote = graph
            .create_answer_result_by_title(result, SESSIONS, "Keynote", None)
            .unwrap()
            .unwrap();
        let panel = graph
            .create_answer_result_by_title(result, SESSIONS, "Panel", None)
            .unwrap()
            .unwrap();

        graph.remove_answer_result(result, keynote, Removal::Delete);
        graph.remove_answer_result(result, panel, Removal::Move);

        assert_eq!(graph.answer_results_count(result), 0);
        assert_eq!(
            graph.answer_results(result, Some(Action::Removed)).collect::<Vec<_>>(),
            vec![keynote]
        );
        assert!(!graph.vote_result(result).members().contains(panel));
    }

    #[test]
    fn lenient_load() {
        let (mut graph, vote) = survey();
        let json = json!({
            "props": {"user_id": 7},
            "answer": [
                {"question_title": "Q1", "answer_variant_title": "A", "message": "first"},
                {"question_title": "Q1", "answer_variant_title": "B"},
                {"question_title": "Gone", "answer_variant_title": "A"},
                {"question_title": "Q1"},
                "garbage",
            ],
        })
        .to_string();

        let result = graph.load_result_json(vote, &json).unwrap();

        // Stored state is taken as-is, even for a single-answer question.
        assert_eq!(graph.answer_results_count(result), 2);
        assert_eq!(graph.answer_results(result, Some(Action::New)).count(), 2);
        assert_eq!(graph.vote_result(result).prop("user_id"), Some(&PropValue::Int(7)));
        let data = graph.result_to_data(result);
        assert_eq!(data.answer[0].message, "first");
        assert_eq!(data.answer[1].answer_variant_title, "B");
    }

    #[test]
    fn round_trip() {
        let (mut graph, vote) = survey();
        let data = VoteResultData::example();
        let result = graph.load_result(vote, data.clone());

        assert_eq!(graph.result_to_data(result), data);
        assert_eq!(graph.vote_result(result).vote_schema(), vote);
        assert!(graph.vote_result(result).assert_value_by_key("user_id", &42.into()));

        let json = graph.result_to_json(result).unwrap();
        let reloaded = graph.load_result_json(vote, &json).unwrap();
        assert_eq!(graph.result_to_data(reloaded), data);
    }

    #[test]
    fn changes_and_commit() {
        let (mut graph, vote) = survey();
        let result = graph.create_new_result(vote);
        let a = graph
            .create_answer_result_by_title(result, "Q1", "A", None)
            .unwrap()
            .unwrap();
        graph.mark_result_committed(result);
        assert!(graph.result_changes(result).is_empty());

        let b = graph
            .create_answer_result_by_title(result, "Q1", "B", None)
            .unwrap()
            .unwrap();
        let changes = graph.result_changes(result);
        assert_eq!(changes.new, vec![b]);
        assert_eq!(changes.removed, vec![a]);

        graph.mark_result_committed(result);
        assert_eq!(
            graph.answer_results(result, Some(Action::Clean)).collect::<Vec<_>>(),
            vec![b]
        );
        assert!(!graph.vote_result(result).members().contains(a));
    }

    #[test]
    fn answers_follow_their_variant() {
        let (mut graph, vote) = survey();
        let result = graph.create_new_result(vote);
        let answer = graph
            .create_answer_result_by_title(result, "Q1", "A", None)
            .unwrap()
            .unwrap();
        let q1 = graph.question_by_title(vote, "Q1").unwrap();
        let sessions = graph.question_by_title(vote, SESSIONS).unwrap();
        let a = graph.answer_variant_by_title(q1, "A").unwrap();

        graph.add_answer_variant(sessions, a);

        assert!(!graph.has_answer_result_by_question(result, q1));
        assert!(graph.has_answer_result_by_question(result, sessions));
        assert_eq!(graph.answer_result_question(answer), Some(sessions));
    }
}
