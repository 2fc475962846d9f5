use serde_repr::{Deserialize_repr, Serialize_repr};

/// Field type of a single answer variant.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum AnswerVariantType {
    #[default]
    Radio = 0,
    Checkbox = 1,
    Dropdown = 2,
    Multiselect = 3,
    Text = 4,
    Textarea = 5,
}

/// Field type of a question. A question whose variants disagree on their
/// type is [`QuestionType::MixedType`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum QuestionType {
    #[default]
    Radio = 0,
    Checkbox = 1,
    Dropdown = 2,
    Multiselect = 3,
    MixedType = 99999,
}

impl QuestionType {
    /// The variant type new answer variants of this question default to.
    /// Mixed questions have no single default.
    pub fn variant_type(self) -> Option<AnswerVariantType> {
        match self {
            Self::Radio => Some(AnswerVariantType::Radio),
            Self::Checkbox => Some(AnswerVariantType::Checkbox),
            Self::Dropdown => Some(AnswerVariantType::Dropdown),
            Self::Multiselect => Some(AnswerVariantType::Multiselect),
            Self::MixedType => None,
        }
    }

    /// Integer code used on the wire.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl AnswerVariantType {
    /// Integer code used on the wire.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Would a variant of this type leave a question of type `question`
    /// uniform? Codes are compared directly, so free-text variants never match.
    pub fn matches(self, question: QuestionType) -> bool {
        self.code() == question.code()
    }
}
