use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Labels treated as "true" when classifying two-choice questions.
pub const TRUE_ALIASES: &[&str] = &["true", "verdadero", "cierto", "v", "verdad", "t", "verdadeiro"];
/// Labels treated as "false" when classifying two-choice questions.
pub const FALSE_ALIASES: &[&str] = &["false", "falso", "f", "fa"];

/// Number of body characters used as a title when the source has none.
pub const TITLE_FALLBACK_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub correct: bool,
    #[serde(default)]
    pub feedback: String,
}

impl Choice {
    pub fn new(text: impl Into<String>, correct: bool, feedback: impl Into<String>) -> Self {
        Choice {
            text: text.into(),
            correct,
            feedback: feedback.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub title: String,
    pub text: String,
    pub text_format: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub general_feedback: String,
}

impl Question {
    /// Build a question; an empty title falls back to the start of the body.
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        text_format: impl Into<String>,
        choices: Vec<Choice>,
        general_feedback: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let mut title = title.into();
        if title.is_empty() {
            title = text.chars().take(TITLE_FALLBACK_CHARS).collect();
        }
        Question {
            title,
            text,
            text_format: text_format.into(),
            choices,
            general_feedback: general_feedback.into(),
        }
    }

    pub fn correct_count(&self) -> usize {
        self.choices.iter().filter(|c| c.correct).count()
    }

    /// Exactly one choice is marked correct.
    pub fn is_single(&self) -> bool {
        self.correct_count() == 1
    }

    /// Two choices whose labels read as true and false (in any of the known
    /// spellings).
    pub fn is_truefalse(&self) -> bool {
        if self.choices.len() != 2 {
            return false;
        }
        let labels: BTreeSet<String> = self
            .choices
            .iter()
            .map(|c| normalize_label(&c.text))
            .collect();
        labels.len() == 2 && labels.contains("true") && labels.contains("false")
    }
}

fn normalize_label(label: &str) -> String {
    let label = label.trim().to_lowercase();
    if TRUE_ALIASES.contains(&label.as_str()) {
        "true".to_string()
    } else if FALSE_ALIASES.contains(&label.as_str()) {
        "false".to_string()
    } else {
        label
    }
}
