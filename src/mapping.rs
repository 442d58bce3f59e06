//! Field mapping: which path expressions locate question and answer data in
//! the source export.
//!
//! A run uses the built-in [`Mapping::default`] unless an override file is
//! given. Override files are JSON, optionally with `//` line comments,
//! `/* */` block comments and trailing commas. Keys missing from the
//! override, or set to `null` or an empty value, keep their default.

use crate::element_path::ElementPath;
use crate::error::{ConvertError, Result};
use crate::extract::PathExpr;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub question_xpath: String,
    pub title: String,
    pub text: String,
    pub text_format: String,
    pub answer_list: String,
    pub answer_text: String,
    pub answer_is_correct: String,
    pub true_values: Vec<String>,
    pub feedback: Option<String>,
    pub question_feedback: Option<String>,
}

impl Default for Mapping {
    fn default() -> Self {
        Mapping {
            question_xpath: ".//question".into(),
            title: "stem".into(),
            text: "stem".into(),
            text_format: "html".into(),
            answer_list: "answer/option".into(),
            answer_text: "text".into(),
            answer_is_correct: "@correct".into(),
            true_values: ["Yes", "yes", "1", "true", "si", "sí"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            feedback: None,
            question_feedback: None,
        }
    }
}

/// Override file contents as written; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOverride {
    pub question_xpath: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub text_format: Option<String>,
    pub answer_list: Option<String>,
    pub answer_text: Option<String>,
    pub answer_is_correct: Option<String>,
    pub true_values: Option<Vec<String>>,
    pub feedback: Option<String>,
    pub question_feedback: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

lazy_static! {
    static ref BLOCK_COMMENT_RE: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref LINE_COMMENT_RE: Regex = Regex::new(r"(?m)^\s*//.*$").unwrap();
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

impl MappingOverride {
    /// Parse strict JSON first; on failure strip comments and trailing commas
    /// and try again.
    pub fn from_tolerant_json(raw: &str) -> Result<Self> {
        match serde_json::from_str(raw) {
            Ok(parsed) => Ok(parsed),
            Err(strict_err) => {
                debug!("strict mapping parse failed ({strict_err}), retrying after cleanup");
                let cleaned = BLOCK_COMMENT_RE.replace_all(raw, "");
                let cleaned = LINE_COMMENT_RE.replace_all(&cleaned, "");
                let cleaned = TRAILING_COMMA_RE.replace_all(&cleaned, "$1");
                Ok(serde_json::from_str(&cleaned)?)
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_tolerant_json(&raw)
    }

    /// Overlay this override on `base`.
    pub fn apply_to(self, base: Mapping) -> Mapping {
        for key in self.extra.keys() {
            warn!("ignoring unknown mapping key {key:?}");
        }
        Mapping {
            question_xpath: pick(self.question_xpath, base.question_xpath),
            title: pick(self.title, base.title),
            text: pick(self.text, base.text),
            text_format: pick(self.text_format, base.text_format),
            answer_list: pick(self.answer_list, base.answer_list),
            answer_text: pick(self.answer_text, base.answer_text),
            answer_is_correct: pick(self.answer_is_correct, base.answer_is_correct),
            true_values: match self.true_values {
                Some(values) if !values.is_empty() => values,
                _ => base.true_values,
            },
            feedback: pick_optional(self.feedback, base.feedback),
            question_feedback: pick_optional(self.question_feedback, base.question_feedback),
        }
    }
}

fn pick(value: Option<String>, default: String) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

fn pick_optional(value: Option<String>, default: Option<String>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => default,
    }
}

/// Effective mapping for a run: the defaults, overlaid with the file at
/// `override_path` when one is given.
pub fn resolve(override_path: Option<&Path>) -> Result<Mapping> {
    match override_path {
        None => Ok(Mapping::default()),
        Some(path) => {
            debug!("loading mapping override from {}", path.display());
            Ok(MappingOverride::from_file(path)?.apply_to(Mapping::default()))
        }
    }
}

/// Where the question nodes live, relative to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionPath {
    /// `//path`: any depth below the root element, which itself never matches.
    Anywhere(ElementPath),
    /// `/root/path`: the first step names the root element.
    Absolute(ElementPath),
    /// Anything else: relative to the root element.
    Relative(ElementPath),
}

impl QuestionPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if let Some(rest) = trimmed.strip_prefix("//") {
            Ok(QuestionPath::Anywhere(ElementPath::parse(&format!(".//{rest}"))?))
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            if rest.is_empty() {
                return Err(ConvertError::invalid_path(expr, "path selects nothing"));
            }
            Ok(QuestionPath::Absolute(ElementPath::parse(rest)?))
        } else {
            Ok(QuestionPath::Relative(ElementPath::parse(trimmed)?))
        }
    }
}

/// A mapping with every expression parsed, ready to evaluate.
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    pub questions: QuestionPath,
    pub title: PathExpr,
    pub text: PathExpr,
    pub text_format: String,
    pub answers: ElementPath,
    pub answer_text: PathExpr,
    pub answer_is_correct: PathExpr,
    pub true_values: HashSet<String>,
    pub feedback: Option<PathExpr>,
    pub question_feedback: Option<PathExpr>,
}

impl Mapping {
    pub fn compile(&self) -> Result<CompiledMapping> {
        let optional = |expr: &Option<String>| -> Result<Option<PathExpr>> {
            match expr.as_deref().map(str::trim) {
                Some(e) if !e.is_empty() => Ok(Some(PathExpr::parse(e)?)),
                _ => Ok(None),
            }
        };

        Ok(CompiledMapping {
            questions: QuestionPath::parse(&self.question_xpath)?,
            title: PathExpr::parse(&self.title)?,
            text: PathExpr::parse(&self.text)?,
            text_format: self.text_format.clone(),
            answers: ElementPath::parse(&self.answer_list)?,
            answer_text: PathExpr::parse(&self.answer_text)?,
            answer_is_correct: PathExpr::parse(&self.answer_is_correct)?,
            true_values: self
                .true_values
                .iter()
                .map(|v| v.to_lowercase())
                .collect(),
            feedback: optional(&self.feedback)?,
            question_feedback: optional(&self.question_feedback)?,
        })
    }
}

impl CompiledMapping {
    /// Case-insensitive membership of `flag` in the configured true values.
    pub fn is_truthy(&self, flag: &str) -> bool {
        self.true_values.contains(&flag.trim().to_lowercase())
    }
}
