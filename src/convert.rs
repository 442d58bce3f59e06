use crate::error::{ConvertError, Result};
use crate::mapping::Mapping;
use crate::model::Question;
use crate::moodle::build_quiz;
use crate::parser::{parse_swad, parse_swad_from_file};
use crate::serialize::{to_xml_string, write_xml_file};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Moodle category path, copied verbatim into the category entry.
    pub category: String,
    pub shuffle: bool,
}

impl ConvertOptions {
    pub fn new(category: impl Into<String>) -> Self {
        ConvertOptions {
            category: category.into(),
            shuffle: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Converted {
    pub questions: Vec<Question>,
    pub xml: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub questions: usize,
    /// Questions whose two choices read as true/false. Informational only;
    /// they are still written as multichoice.
    pub true_false_like: usize,
    pub output: PathBuf,
}

pub fn convert_str(xml: &str, mapping: &Mapping, options: &ConvertOptions) -> Result<Converted> {
    let questions = parse_swad(xml, mapping)?;
    let xml = render(&questions, options)?;
    Ok(Converted { questions, xml })
}

/// Convert `input` into `output`. When no question is found the output file
/// is not created.
pub fn convert_file(
    input: &Path,
    output: &Path,
    mapping: &Mapping,
    options: &ConvertOptions,
) -> Result<ConversionReport> {
    let questions = parse_swad_from_file(input, mapping)?;
    ensure_not_empty(&questions)?;

    let quiz = build_quiz(&questions, &options.category, options.shuffle);
    write_xml_file(&quiz, output)?;

    let report = ConversionReport {
        questions: questions.len(),
        true_false_like: count_true_false(&questions),
        output: output.to_path_buf(),
    };
    info!(
        "converted {} questions from {} into {}",
        report.questions,
        input.display(),
        output.display()
    );
    Ok(report)
}

fn render(questions: &[Question], options: &ConvertOptions) -> Result<String> {
    ensure_not_empty(questions)?;
    let quiz = build_quiz(questions, &options.category, options.shuffle);
    to_xml_string(&quiz)
}

fn ensure_not_empty(questions: &[Question]) -> Result<()> {
    if questions.is_empty() {
        return Err(ConvertError::NoQuestionsFound);
    }
    Ok(())
}

fn count_true_false(questions: &[Question]) -> usize {
    questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| {
            let tf = q.is_truefalse();
            if tf {
                debug!("question {} looks like true/false: {:?}", idx + 1, q.title);
            }
            tf
        })
        .count()
}
