use crate::error::Result;
use crate::mapping::{CompiledMapping, Mapping, QuestionPath};
use crate::model::{Choice, Question};
use roxmltree::{Document, Node, ParsingOptions};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

pub fn parse_swad_from_reader<R: Read>(mut r: R, mapping: &Mapping) -> Result<Vec<Question>> {
    let mut s = String::new();
    r.read_to_string(&mut s)?;
    parse_swad(&s, mapping)
}

pub fn parse_swad_from_file(path: &Path, mapping: &Mapping) -> Result<Vec<Question>> {
    let f = File::open(path)?;
    parse_swad_from_reader(f, mapping)
}

/// Extract every question the mapping locates in `xml`. Finding nothing is
/// not an error here; callers decide what an empty bank means.
pub fn parse_swad(xml: &str, mapping: &Mapping) -> Result<Vec<Question>> {
    let compiled = mapping.compile()?;
    // exports from some SWAD versions carry a DOCTYPE
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let doc = Document::parse_with_options(xml, options)?;
    Ok(parse_document(&doc, &compiled))
}

pub fn parse_document(doc: &Document, mapping: &CompiledMapping) -> Vec<Question> {
    let nodes = match &mapping.questions {
        QuestionPath::Absolute(path) => path.find_all(doc.root()),
        QuestionPath::Anywhere(path) | QuestionPath::Relative(path) => {
            path.find_all(doc.root_element())
        }
    };
    debug!("matched {} question nodes", nodes.len());

    nodes
        .into_iter()
        .enumerate()
        .map(|(idx, node)| parse_question(idx + 1, node, mapping))
        .collect()
}

fn parse_question(position: usize, node: Node, mapping: &CompiledMapping) -> Question {
    let title = mapping.title.extract(node);
    let text = mapping.text.extract(node);

    let choices: Vec<Choice> = mapping
        .answers
        .find_all(node)
        .into_iter()
        .map(|answer| parse_choice(answer, mapping))
        .collect();
    if choices.is_empty() {
        warn!(
            "question {position} has no answers matching {:?}",
            mapping.answers.as_str()
        );
    }

    let general_feedback = mapping
        .question_feedback
        .as_ref()
        .map(|expr| expr.extract(node))
        .unwrap_or_default();

    let question = Question::new(
        title,
        text,
        mapping.text_format.clone(),
        choices,
        general_feedback,
    );
    debug!(
        "question {position}: {:?} ({} choices, {} correct)",
        question.title,
        question.choices.len(),
        question.correct_count()
    );
    question
}

fn parse_choice(node: Node, mapping: &CompiledMapping) -> Choice {
    let text = mapping.answer_text.extract(node);
    let flag = mapping.answer_is_correct.extract(node);
    let feedback = mapping
        .feedback
        .as_ref()
        .map(|expr| expr.extract(node))
        .unwrap_or_default();
    Choice::new(text, mapping.is_truthy(&flag), feedback)
}

// File-system dependent tests belong in the integration test directory `tests/`.
