use crate::element_path::ElementPath;
use crate::error::Result;
use roxmltree::Node;

/// A mapping field expression, classified once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    /// `"."`: the node's own text.
    SelfText,
    /// `"@name"`: an attribute of the node.
    Attribute(String),
    /// Anything else: the first descendant matched by the path.
    Descendant(ElementPath),
}

impl PathExpr {
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if trimmed == "." {
            return Ok(PathExpr::SelfText);
        }
        if let Some(name) = trimmed.strip_prefix('@') {
            return Ok(PathExpr::Attribute(name.to_string()));
        }
        Ok(PathExpr::Descendant(ElementPath::parse(trimmed)?))
    }

    /// Text content addressed by this expression, trimmed. Missing nodes or
    /// attributes yield an empty string.
    pub fn extract(&self, node: Node) -> String {
        match self {
            PathExpr::SelfText => leading_text(node).trim().to_string(),
            PathExpr::Attribute(name) => node
                .attribute(name.as_str())
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            PathExpr::Descendant(path) => match path.find(node) {
                Some(found) => inner_text(found).trim().to_string(),
                None => String::new(),
            },
        }
    }
}

/// Parse `expr` and evaluate it against `node` in one go.
pub fn extract_text(node: Node, expr: &str) -> Result<String> {
    Ok(PathExpr::parse(expr)?.extract(node))
}

/// The element's text followed by each child element's text and tail.
/// Only one level of nesting is flattened; deeper descendants are skipped.
fn inner_text(node: Node) -> String {
    let mut out = leading_text(node);
    for child in node.children().filter(|c| c.is_element()) {
        out.push_str(&leading_text(child));
        out.push_str(&tail_text(child));
    }
    out
}

/// Text before the first child element. Comments and processing
/// instructions are skipped.
fn leading_text(node: Node) -> String {
    node.children()
        .take_while(|c| !c.is_element())
        .filter_map(|c| if c.is_text() { c.text() } else { None })
        .collect()
}

/// Text after the element's closing tag, up to its next sibling element.
fn tail_text(node: Node) -> String {
    std::iter::successors(node.next_sibling(), |n| n.next_sibling())
        .take_while(|n| !n.is_element())
        .filter_map(|n| if n.is_text() { n.text() } else { None })
        .collect()
}
