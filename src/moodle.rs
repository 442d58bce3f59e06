//! Moodle XML ("PRADO") quiz generation.
//!
//! Every question is emitted as a `multichoice` entry. Question bodies are
//! carried as raw CDATA HTML; every other field is plain escaped text.

use crate::model::Question;
use crate::xml_out::Element;

pub const DEFAULT_GRADE: &str = "1.0000000";
pub const PENALTY: &str = "0.3333333";
pub const ANSWER_NUMBERING: &str = "abc";
/// Fraction given to every incorrect choice.
pub const WRONG_ANSWER_FRACTION: i32 = -25;

/// Percentage score of one choice. Correct choices share 100 with integer
/// truncation (3 correct -> 33 each); incorrect ones get a flat penalty.
pub fn answer_fraction(correct: bool, correct_count: usize) -> i32 {
    if correct {
        let share = 100 / correct_count.max(1);
        share as i32
    } else {
        WRONG_ANSWER_FRACTION
    }
}

/// Body of `questiontext`, as HTML.
pub fn question_html(text: &str) -> String {
    format!("<p>{text}</p>")
}

/// The whole `<quiz>` document: one category entry, then one multichoice
/// entry per question in input order.
pub fn build_quiz(questions: &[Question], category: &str, shuffle: bool) -> Element {
    let mut quiz = Element::new("quiz");
    quiz.push(category_entry(category));
    for question in questions {
        quiz.push(multichoice_entry(question, shuffle));
    }
    quiz
}

fn category_entry(category: &str) -> Element {
    Element::new("question")
        .with_attr("type", "category")
        .with_child(Element::text_wrapper("category", category))
        .with_child(
            Element::text_wrapper("info", "").with_attr("format", "moodle_auto_format"),
        )
        .with_child(Element::new("idnumber"))
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn multichoice_entry(question: &Question, shuffle: bool) -> Element {
    let mut entry = Element::new("question")
        .with_attr("type", "multichoice")
        .with_child(Element::text_wrapper("name", question.title.as_str()))
        .with_child(
            Element::new("questiontext")
                .with_attr("format", "html")
                .with_child(Element::new("text").with_cdata(question_html(&question.text))),
        )
        .with_child(
            Element::text_wrapper("generalfeedback", question.general_feedback.as_str())
                .with_attr("format", "html"),
        )
        .with_child(Element::new("defaultgrade").with_text(DEFAULT_GRADE))
        .with_child(Element::new("penalty").with_text(PENALTY))
        .with_child(Element::new("hidden").with_text("0"))
        .with_child(Element::new("idnumber"))
        .with_child(Element::new("single").with_text(bool_text(question.is_single())))
        .with_child(Element::new("shuffleanswers").with_text(bool_text(shuffle)))
        .with_child(Element::new("answernumbering").with_text(ANSWER_NUMBERING))
        .with_child(Element::new("showstandardinstruction").with_text("1"));

    for tag in ["correctfeedback", "partiallycorrectfeedback", "incorrectfeedback"] {
        entry.push(Element::text_wrapper(tag, "").with_attr("format", "html"));
    }

    let correct_count = question.correct_count();
    for choice in &question.choices {
        let fraction = answer_fraction(choice.correct, correct_count);
        entry.push(
            Element::new("answer")
                .with_attr("fraction", fraction.to_string())
                .with_attr("format", "html")
                .with_child(Element::new("text").with_text(choice.text.as_str()))
                .with_child(
                    Element::text_wrapper("feedback", choice.feedback.as_str())
                        .with_attr("format", "html"),
                ),
        );
    }

    entry
}
