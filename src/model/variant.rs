use super::{
    data::AnswerVariantData,
    graph::{QuestionKey, VariantKey, VoteGraph},
    props::{KeyedValues, PropValue, PropertyBag},
    types::AnswerVariantType,
};

/// A selectable option of a question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerVariant {
    pub(super) title: String,
    pub(super) variant_type: AnswerVariantType,
    pub(super) props: PropertyBag,
    /// Owning question, if attached.
    pub(super) question: Option<QuestionKey>,
}

impl AnswerVariant {
    pub(super) fn from_data(data: AnswerVariantData) -> Self {
        Self {
            title: data.title,
            variant_type: data.variant_type,
            props: data.props,
            question: None,
        }
    }

    /// Variant text.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Field type (radio, checkbox, dropdown, multiselect, text, textarea).
    pub fn variant_type(&self) -> AnswerVariantType {
        self.variant_type
    }

    /// Changing the type does not re-normalize the owning question; that only
    /// happens when a variant is added.
    pub fn set_variant_type(&mut self, variant_type: AnswerVariantType) {
        self.variant_type = variant_type;
    }

    pub fn question(&self) -> Option<QuestionKey> {
        self.question
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.props.set(key, value);
    }

    pub fn to_data(&self) -> AnswerVariantData {
        AnswerVariantData {
            title: self.title.clone(),
            variant_type: self.variant_type,
            props: self.props.clone(),
        }
    }
}

impl KeyedValues for AnswerVariant {
    const KNOWN_KEYS: &'static [&'static str] = &["title", "type"];

    fn props(&self) -> &PropertyBag {
        &self.props
    }

    fn known_value(&self, key: &str) -> Option<PropValue> {
        match key {
            "title" => Some(self.title.as_str().into()),
            "type" => Some(self.variant_type.code().into()),
            _ => None,
        }
    }
}

impl VoteGraph {
    /// Create a detached answer variant.
    pub fn load_answer_variant(&mut self, data: AnswerVariantData) -> VariantKey {
        self.insert_variant(AnswerVariant::from_data(data))
    }

    /// Copy a variant's title and type into a new, detached variant.
    /// The copy has an empty property bag.
    pub fn clone_answer_variant(&mut self, variant: VariantKey) -> VariantKey {
        let source = self.answer_variant(variant);
        let copy = AnswerVariant {
            title: source.title.clone(),
            variant_type: source.variant_type,
            props: PropertyBag::new(),
            question: None,
        };
        self.insert_variant(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_values() {
        let mut graph = VoteGraph::new();
        let key = graph.load_answer_variant(AnswerVariantData {
            title: "Other".to_string(),
            variant_type: AnswerVariantType::Text,
            props: PropertyBag::from_iter([("placeholder", "Tell us more")]),
        });
        let variant = graph.answer_variant(key);

        assert!(variant.has_value_key("title"));
        assert!(variant.has_value_key("type"));
        assert!(variant.has_value_key("placeholder"));
        assert!(!variant.has_value_key("message"));
        assert_eq!(variant.value_by_key("type"), Some(PropValue::Int(4)));
        assert!(variant.assert_value_by_key("title", &"Other".into()));
        assert!(variant.assert_value_by_key("placeholder", &"Tell us more".into()));
        assert!(!variant.assert_value_by_key("title", &"other".into()));
        assert_eq!(variant.value_by_key("missing"), None);
    }

    #[test]
    fn clone_is_detached_and_bare() {
        let mut graph = VoteGraph::new();
        let question = graph.load_question(Default::default());
        let original = graph.create_answer_variant(question, "Yes", None);
        graph.answer_variant_mut(original).set_prop("color", "green");

        let copy = graph.clone_answer_variant(original);

        assert_ne!(copy, original);
        let copied = graph.answer_variant(copy);
        assert_eq!(copied.title(), "Yes");
        assert_eq!(copied.variant_type(), AnswerVariantType::Radio);
        assert_eq!(copied.question(), None);
        assert_eq!(copied.prop("color"), None);
        // Identity, not equality: the copy is not a member of the question.
        assert_eq!(graph.answer_variants(question, None).collect::<Vec<_>>(), vec![original]);
    }
}
