//! ElementTree-style path expressions over a parsed XML document.
//!
//! Mapping files are written for the path dialect understood by Python's
//! `xml.etree.ElementTree` (`answer/option`, `.//question[@type='mc']`, ...),
//! so this module implements the useful subset of it on top of `roxmltree`:
//!
//! - steps separated by `/`, with `//` selecting descendants at any depth;
//! - step tests `tag`, `{namespace}tag`, `*`, `.` and `..`;
//! - predicates `[@attr]`, `[@attr='v']`, `[@attr!='v']`, `[tag]`,
//!   `[tag='text']`, `[.='text']`, `[n]`, `[last()]` and `[last()-n]`.
//!
//! Expressions are parsed once into an [`ElementPath`] and evaluated many times.

use crate::error::{ConvertError, Result};
use roxmltree::{Node, NodeId};
use std::collections::HashSet;

/// A compiled relative path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    source: String,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Local(String),
    Qualified { namespace: String, local: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttr(String),
    AttrEq(String, String),
    AttrNe(String, String),
    HasChild(NameTest),
    ChildTextEq(NameTest, String),
    TextEq(String),
    /// 1-based position among siblings
    Position(usize),
    /// offset counted back from the last sibling
    Last(usize),
}

impl ElementPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(ConvertError::invalid_path(expr, "empty path"));
        }
        if trimmed.starts_with('/') {
            return Err(ConvertError::invalid_path(
                expr,
                "absolute path not allowed here",
            ));
        }
        if trimmed.ends_with('/') {
            return Err(ConvertError::invalid_path(expr, "path ends with '/'"));
        }

        let mut steps = Vec::new();
        let mut descendant = false;
        for segment in split_segments(expr, trimmed)? {
            if segment.is_empty() {
                if descendant {
                    return Err(ConvertError::invalid_path(expr, "unexpected '///'"));
                }
                descendant = true;
                continue;
            }
            steps.push(parse_step(expr, segment, descendant)?);
            descendant = false;
        }

        Ok(ElementPath {
            source: trimmed.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// All elements matched from `context`, without duplicates, in first-seen order.
    pub fn find_all<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let mut current = vec![context];
        for step in &self.steps {
            let mut seen: HashSet<NodeId> = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                for found in step.select(*node) {
                    if seen.insert(found.id()) {
                        next.push(found);
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First element matched from `context`.
    pub fn find<'a, 'input>(&self, context: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
        self.find_all(context).into_iter().next()
    }
}

impl Step {
    fn select<'a, 'input>(&self, node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let candidates: Vec<Node<'a, 'input>> = match self.axis {
            Axis::SelfNode => vec![node],
            Axis::Parent => node.parent_element().into_iter().collect(),
            Axis::Child => node
                .children()
                .filter(|n| n.is_element() && self.test.matches(*n))
                .collect(),
            Axis::Descendant => node
                .descendants()
                .skip(1)
                .filter(|n| n.is_element() && self.test.matches(*n))
                .collect(),
        };
        self.predicates
            .iter()
            .fold(candidates, |acc, predicate| predicate.apply(acc))
    }
}

impl NameTest {
    fn matches(&self, node: Node) -> bool {
        let tag = node.tag_name();
        match self {
            NameTest::Any => true,
            NameTest::Local(name) => tag.name() == name,
            NameTest::Qualified { namespace, local } => {
                tag.name() == local && tag.namespace() == Some(namespace.as_str())
            }
        }
    }
}

impl Predicate {
    fn apply<'a, 'input>(&self, nodes: Vec<Node<'a, 'input>>) -> Vec<Node<'a, 'input>> {
        match self {
            Predicate::Position(n) => pick_per_parent(nodes, |group| group.get(n - 1).copied()),
            Predicate::Last(offset) => pick_per_parent(nodes, |group| {
                group
                    .len()
                    .checked_sub(offset + 1)
                    .and_then(|i| group.get(i).copied())
            }),
            _ => nodes.into_iter().filter(|n| self.matches(*n)).collect(),
        }
    }

    fn matches(&self, node: Node) -> bool {
        match self {
            Predicate::HasAttr(name) => node.attribute(name.as_str()).is_some(),
            Predicate::AttrEq(name, value) => node.attribute(name.as_str()) == Some(value.as_str()),
            Predicate::AttrNe(name, value) => node
                .attribute(name.as_str())
                .is_some_and(|v| v != value.as_str()),
            Predicate::HasChild(test) => node.children().any(|c| c.is_element() && test.matches(c)),
            Predicate::ChildTextEq(test, value) => node
                .children()
                .any(|c| c.is_element() && test.matches(c) && full_text(c) == *value),
            Predicate::TextEq(value) => full_text(node) == *value,
            Predicate::Position(_) | Predicate::Last(_) => true,
        }
    }
}

/// Every text node below `node`, concatenated in document order.
pub(crate) fn full_text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn pick_per_parent<'a, 'input, F>(nodes: Vec<Node<'a, 'input>>, pick: F) -> Vec<Node<'a, 'input>>
where
    F: Fn(&[Node<'a, 'input>]) -> Option<Node<'a, 'input>>,
{
    let mut groups: Vec<(Option<NodeId>, Vec<Node<'a, 'input>>)> = Vec::new();
    for node in nodes {
        let parent = node.parent().map(|p| p.id());
        match groups.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, group)) => group.push(node),
            None => groups.push((parent, vec![node])),
        }
    }
    groups
        .iter()
        .filter_map(|(_, group)| pick(group.as_slice()))
        .collect()
}

/// Split on `/` outside of `[...]`, `{...}` and quoted strings.
fn split_segments<'e>(expr: &str, path: &'e str) -> Result<Vec<&'e str>> {
    let mut segments = Vec::new();
    let mut brackets = 0usize;
    let mut in_braces = false;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in path.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' if brackets > 0 => quote = Some(c),
            '{' if brackets == 0 => in_braces = true,
            '}' if brackets == 0 => in_braces = false,
            '[' if !in_braces => brackets += 1,
            ']' if !in_braces => {
                brackets = brackets
                    .checked_sub(1)
                    .ok_or_else(|| ConvertError::invalid_path(expr, "unbalanced ']'"))?;
            }
            '/' if brackets == 0 && !in_braces => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(ConvertError::invalid_path(expr, "unterminated string"));
    }
    if brackets > 0 || in_braces {
        return Err(ConvertError::invalid_path(expr, "unbalanced brackets"));
    }
    segments.push(&path[start..]);
    Ok(segments)
}

fn parse_step(expr: &str, segment: &str, descendant: bool) -> Result<Step> {
    let name_end = if segment.starts_with('{') {
        segment
            .find('}')
            .and_then(|close| segment[close..].find('[').map(|i| close + i))
    } else {
        segment.find('[')
    };
    let (name, rest) = match name_end {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };
    let name = name.trim();

    let (axis, test) = match name {
        "." | ".." if descendant => {
            return Err(ConvertError::invalid_path(
                expr,
                "'//' must be followed by an element test",
            ));
        }
        "." => (Axis::SelfNode, NameTest::Any),
        ".." => (Axis::Parent, NameTest::Any),
        _ => {
            let axis = if descendant {
                Axis::Descendant
            } else {
                Axis::Child
            };
            (axis, parse_name_test(expr, name)?)
        }
    };

    Ok(Step {
        axis,
        test,
        predicates: parse_predicates(expr, rest)?,
    })
}

fn parse_name_test(expr: &str, name: &str) -> Result<NameTest> {
    if name == "*" {
        return Ok(NameTest::Any);
    }
    if let Some(qualified) = name.strip_prefix('{') {
        let (namespace, local) = qualified
            .split_once('}')
            .ok_or_else(|| ConvertError::invalid_path(expr, "unterminated namespace"))?;
        validate_name(expr, local)?;
        return Ok(NameTest::Qualified {
            namespace: namespace.to_string(),
            local: local.to_string(),
        });
    }
    validate_name(expr, name)?;
    Ok(NameTest::Local(name.to_string()))
}

fn validate_name(expr: &str, name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || "@[]='\"/(){}!".contains(c));
    if bad {
        return Err(ConvertError::invalid_path(
            expr,
            format!("invalid element name {name:?}"),
        ));
    }
    Ok(())
}

fn parse_predicates(expr: &str, mut rest: &str) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::new();
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(ConvertError::invalid_path(
                expr,
                format!("unexpected {rest:?} after step"),
            ));
        }
        let close = find_closing_bracket(rest)
            .ok_or_else(|| ConvertError::invalid_path(expr, "unbalanced brackets"))?;
        predicates.push(parse_predicate(expr, &rest[1..close])?);
        rest = &rest[close + 1..];
    }
    Ok(predicates)
}

fn find_closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(expr: &str, inner: &str) -> Result<Predicate> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(ConvertError::invalid_path(expr, "empty predicate"));
    }

    if let Some(attr) = inner.strip_prefix('@') {
        return match split_comparison(attr) {
            Some((name, negated, value)) => {
                validate_name(expr, name)?;
                let value = unquote(expr, value)?;
                Ok(if negated {
                    Predicate::AttrNe(name.to_string(), value)
                } else {
                    Predicate::AttrEq(name.to_string(), value)
                })
            }
            None => {
                validate_name(expr, attr)?;
                Ok(Predicate::HasAttr(attr.to_string()))
            }
        };
    }

    if inner.chars().all(|c| c.is_ascii_digit()) {
        return match inner.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Predicate::Position(n)),
            _ => Err(ConvertError::invalid_path(expr, "positions start at 1")),
        };
    }

    if inner == "last()" {
        return Ok(Predicate::Last(0));
    }
    if let Some(offset) = inner.strip_prefix("last()-") {
        let offset = offset
            .trim()
            .parse::<usize>()
            .map_err(|_| ConvertError::invalid_path(expr, "invalid last() offset"))?;
        return Ok(Predicate::Last(offset));
    }

    match split_comparison(inner) {
        Some((_, true, _)) => Err(ConvertError::invalid_path(
            expr,
            "'!=' is only supported on attributes",
        )),
        Some((".", false, value)) => Ok(Predicate::TextEq(unquote(expr, value)?)),
        Some((name, false, value)) => Ok(Predicate::ChildTextEq(
            parse_name_test(expr, name)?,
            unquote(expr, value)?,
        )),
        None => Ok(Predicate::HasChild(parse_name_test(expr, inner)?)),
    }
}

/// `name='v'` / `name!='v'` -> (name, negated, raw value)
fn split_comparison(s: &str) -> Option<(&str, bool, &str)> {
    let eq = s.find('=')?;
    let (name, negated) = match s[..eq].strip_suffix('!') {
        Some(name) => (name, true),
        None => (&s[..eq], false),
    };
    Some((name.trim(), negated, &s[eq + 1..]))
}

fn unquote(expr: &str, raw: &str) -> Result<String> {
    let raw = raw.trim();
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('\'' | '"')), Some(close)) if open == close && raw.len() >= 2 => {
            Ok(raw[1..raw.len() - 1].to_string())
        }
        _ => Err(ConvertError::invalid_path(
            expr,
            "comparison value must be quoted",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const DOC: &str = r#"<bank>
        <question type="mc" id="q1"><stem>One</stem>
            <answer><option correct="yes">a</option><option>b</option><option>c</option></answer>
        </question>
        <group>
            <question type="tf" id="q2"><stem>Two</stem>
                <answer><option>x</option><option correct="no">y</option></answer>
            </question>
        </group>
    </bank>"#;

    fn ids(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| {
                n.attribute("id")
                    .map(str::to_string)
                    .unwrap_or_else(|| full_text(*n))
            })
            .collect()
    }

    #[test]
    fn child_and_descendant_steps() {
        let doc = Document::parse(DOC).expect("doc");
        let root = doc.root_element();

        let direct = ElementPath::parse("question").unwrap().find_all(root);
        assert_eq!(ids(&direct), vec!["q1"]);

        let anywhere = ElementPath::parse(".//question").unwrap().find_all(root);
        assert_eq!(ids(&anywhere), vec!["q1", "q2"]);

        let nested = ElementPath::parse("group/*/answer/option")
            .unwrap()
            .find_all(root);
        assert_eq!(ids(&nested), vec!["x", "y"]);

        let mixed = ElementPath::parse("question//option").unwrap().find_all(root);
        assert_eq!(ids(&mixed), vec!["a", "b", "c"]);
    }

    #[test]
    fn predicates_filter_candidates() {
        let doc = Document::parse(DOC).expect("doc");
        let root = doc.root_element();

        let find = |expr: &str| ids(&ElementPath::parse(expr).unwrap().find_all(root));

        assert_eq!(find(".//question[@type='tf']"), vec!["q2"]);
        assert_eq!(find(".//question[@type!='tf']"), vec!["q1"]);
        assert_eq!(find(".//option[@correct]"), vec!["a", "y"]);
        assert_eq!(find(".//question[stem='Two']"), vec!["q2"]);
        assert_eq!(find(".//option[.='c']"), vec!["c"]);
        assert_eq!(find(".//question[answer]"), vec!["q1", "q2"]);
        assert_eq!(find(".//option[1]"), vec!["a", "x"]);
        assert_eq!(find(".//option[last()]"), vec!["c", "y"]);
        assert_eq!(find(".//option[last()-1]"), vec!["b", "x"]);
        assert_eq!(find(".//option[@correct][2]"), Vec::<String>::new());
    }

    #[test]
    fn self_and_parent_steps() {
        let doc = Document::parse(DOC).expect("doc");
        let root = doc.root_element();
        let option = ElementPath::parse(".//option").unwrap().find(root).unwrap();

        let parent = ElementPath::parse("../..").unwrap().find(option).unwrap();
        assert_eq!(parent.attribute("id"), Some("q1"));

        let same = ElementPath::parse(".").unwrap().find(option).unwrap();
        assert_eq!(same, option);
    }

    #[test]
    fn namespaced_names() {
        let xml = r#"<r xmlns:s="http://swad.es/ns"><s:q>1</s:q><q>2</q></r>"#;
        let doc = Document::parse(xml).expect("doc");
        let path = ElementPath::parse("{http://swad.es/ns}q").unwrap();
        let found = path.find_all(doc.root_element());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text(), Some("1"));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expr in [
            "",
            "/abs",
            "a/",
            "a///b",
            "a[",
            "a]",
            "a[@x=unquoted]",
            "a[0]",
            "a b",
            ".//.",
            "a[@x='1']junk",
        ] {
            let err = ElementPath::parse(expr).expect_err(expr);
            assert!(
                matches!(err, ConvertError::InvalidPath { .. }),
                "{expr}: {err}"
            );
        }
    }

    #[test]
    fn quoted_values_may_contain_separators() {
        let xml = r#"<r><q k="a/b]c">1</q><q k="x">2</q></r>"#;
        let doc = Document::parse(xml).expect("doc");
        let path = ElementPath::parse(r#"q[@k="a/b]c"]"#).unwrap();
        assert_eq!(path.find_all(doc.root_element()).len(), 1);
    }
}
