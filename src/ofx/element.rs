use anyhow::{bail, Result};

use super::parser::Token;

/// A node of the OFX document tree. Leaf elements carry text, aggregates
/// carry children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    fn aggregate(name: String) -> Self {
        Self {
            name,
            text: None,
            children: vec![],
        }
    }

    fn leaf(name: String, text: String) -> Self {
        Self {
            name,
            text: Some(text),
            children: vec![],
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Text of the first leaf child with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .filter(|child| child.name == name)
            .find_map(|child| child.text.as_deref())
    }

    /// All elements with one of the given names, in document order. Does not
    /// descend into matching elements.
    pub fn descendants_named(&self, names: &[&str]) -> Vec<&Element> {
        let mut result = Vec::new();
        self.collect_descendants(names, &mut result);
        result
    }

    fn collect_descendants<'a>(&'a self, names: &[&str], result: &mut Vec<&'a Element>) {
        for child in &self.children {
            if names.contains(&child.name.as_str()) {
                result.push(child);
            } else {
                child.collect_descendants(names, result);
            }
        }
    }
}

/// Builds the element tree of an OFX body and returns the `<OFX>` element.
///
/// SGML files may leave leaf elements unclosed, so a start tag directly
/// followed by text is a leaf. A start tag that is never closed, like an empty
/// `<MEMO>` in SGML, becomes an empty leaf when an enclosing element is closed,
/// and the elements after it move up to the enclosing element.
pub fn build_tree(tokens: Vec<Token>) -> Result<Element> {
    let mut stack = vec![Element::aggregate(String::new())];
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        match token {
            Token::Open(name) => {
                let text = match tokens.next_if(|token| matches!(token, Token::Text(_))) {
                    Some(Token::Text(text)) => Some(text),
                    _ => None,
                };
                let closed = tokens
                    .next_if(|token| matches!(token, Token::Close(close) if *close == name))
                    .is_some();
                match (text, closed) {
                    (Some(text), _) => top(&mut stack)?.children.push(Element::leaf(name, text)),
                    (None, true) => top(&mut stack)?
                        .children
                        .push(Element::leaf(name, String::new())),
                    (None, false) => stack.push(Element::aggregate(name)),
                }
            }
            Token::Empty(name) => top(&mut stack)?
                .children
                .push(Element::leaf(name, String::new())),
            Token::Close(name) => close_element(&mut stack, &name)?,
            Token::Text(text) => {
                bail!(
                    "Unexpected text {:?} inside <{}>",
                    text,
                    top(&mut stack)?.name
                );
            }
        }
    }

    if stack.len() > 1 {
        let unclosed: Vec<&str> = stack[1..].iter().map(|e| e.name.as_str()).collect();
        bail!(
            "Unexpected end of document, unclosed elements: {}",
            unclosed.join(" > ")
        );
    }
    let Some(root) = stack.pop() else {
        bail!("Document is empty");
    };
    match root.children.into_iter().find(|e| e.name == "OFX") {
        Some(ofx) => Ok(ofx),
        None => bail!("Document has no <OFX> element"),
    }
}

fn top(stack: &mut [Element]) -> Result<&mut Element> {
    match stack.last_mut() {
        Some(top) => Ok(top),
        None => bail!("Element stack is empty"),
    }
}

fn close_element(stack: &mut Vec<Element>, name: &str) -> Result<()> {
    let position = match stack.iter().rposition(|e| e.name == name) {
        Some(position) if position > 0 => position,
        _ => bail!("Closing tag </{}> without opening tag", name),
    };
    let unclosed = stack.split_off(position + 1);
    let Some(mut element) = stack.pop() else {
        bail!("Element stack is empty");
    };
    for empty_leaf in unclosed {
        element
            .children
            .push(Element::leaf(empty_leaf.name, String::new()));
        element.children.extend(empty_leaf.children);
    }
    top(stack)?.children.push(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use nom::combinator::all_consuming;

    use super::*;
    use crate::ofx::parser::tokens;

    fn tree(input: &str) -> Result<Element> {
        let (_, tokens) = all_consuming(tokens)(input).unwrap();
        build_tree(tokens)
    }

    fn leaf(name: &str, text: &str) -> Element {
        Element::leaf(name.to_string(), text.to_string())
    }

    fn aggregate(name: &str, children: Vec<Element>) -> Element {
        Element {
            name: name.to_string(),
            text: None,
            children,
        }
    }

    #[test]
    fn sgml_leaves() {
        assert_eq!(
            tree("<OFX><STATUS><CODE>0<SEVERITY>INFO</STATUS></OFX>").unwrap(),
            aggregate(
                "OFX",
                vec![aggregate(
                    "STATUS",
                    vec![leaf("CODE", "0"), leaf("SEVERITY", "INFO")]
                )]
            )
        );
    }

    #[test]
    fn xml_leaves() {
        assert_eq!(
            tree("<OFX><STATUS><CODE>0</CODE><SEVERITY>INFO</SEVERITY></STATUS></OFX>").unwrap(),
            aggregate(
                "OFX",
                vec![aggregate(
                    "STATUS",
                    vec![leaf("CODE", "0"), leaf("SEVERITY", "INFO")]
                )]
            )
        );
    }

    #[test]
    fn empty_xml_leaf() {
        assert_eq!(
            tree("<OFX><STMTTRN><MEMO></MEMO><NAME>x</NAME></STMTTRN></OFX>").unwrap(),
            aggregate(
                "OFX",
                vec![aggregate(
                    "STMTTRN",
                    vec![leaf("MEMO", ""), leaf("NAME", "x")]
                )]
            )
        );
    }

    #[test]
    fn empty_sgml_leaf() {
        assert_eq!(
            tree("<OFX><STMTTRN><FITID>1<MEMO><NAME>x</STMTTRN></OFX>").unwrap(),
            aggregate(
                "OFX",
                vec![aggregate(
                    "STMTTRN",
                    vec![leaf("FITID", "1"), leaf("MEMO", ""), leaf("NAME", "x")]
                )]
            )
        );
    }

    #[test]
    fn nested_empty_sgml_leaves() {
        assert_eq!(
            tree("<OFX><A><B><C><D>1</A></OFX>").unwrap(),
            aggregate(
                "OFX",
                vec![aggregate(
                    "A",
                    vec![leaf("B", ""), leaf("C", ""), leaf("D", "1")]
                )]
            )
        );
    }

    #[test]
    fn empty_element_tag() {
        assert_eq!(
            tree("<OFX><STMTTRN><MEMO/><NAME>x</NAME></STMTTRN></OFX>").unwrap(),
            aggregate(
                "OFX",
                vec![aggregate(
                    "STMTTRN",
                    vec![leaf("MEMO", ""), leaf("NAME", "x")]
                )]
            )
        );
    }

    #[test]
    fn empty_aggregate() {
        assert_eq!(
            tree("<OFX><BANKTRANLIST></BANKTRANLIST></OFX>").unwrap(),
            aggregate("OFX", vec![leaf("BANKTRANLIST", "")])
        );
    }

    #[test]
    fn closing_tag_without_opening_tag() {
        assert_eq!(
            "Closing tag </STMTRS> without opening tag",
            tree("<OFX></STMTRS></OFX>").unwrap_err().to_string()
        );
    }

    #[test]
    fn unclosed_document() {
        assert_eq!(
            "Unexpected end of document, unclosed elements: OFX > BANKMSGSRSV1",
            tree("<OFX><BANKMSGSRSV1><CODE>0").unwrap_err().to_string()
        );
    }

    #[test]
    fn text_in_aggregate_position() {
        assert!(tree("<OFX><A><B>1</B>stray</A></OFX>").is_err());
    }

    #[test]
    fn missing_ofx_element() {
        assert_eq!(
            "Document has no <OFX> element",
            tree("<FOO>bar</FOO>").unwrap_err().to_string()
        );
    }

    #[test]
    fn navigation() {
        let ofx = tree(
            "<OFX><A><STMTRS><X>1</STMTRS></A><CCSTMTRS><X>2</CCSTMTRS><STMTRS><X>3<X>4</STMTRS></OFX>",
        )
        .unwrap();
        let statements = ofx.descendants_named(&["STMTRS", "CCSTMTRS"]);
        let texts: Vec<_> = statements
            .iter()
            .map(|s| s.child_text("X").unwrap())
            .collect();
        assert_eq!(vec!["1", "2", "3"], texts);
        assert_eq!(2, statements[2].children_named("X").count());
        assert!(ofx.child("A").is_some());
        assert!(ofx.child("STMTRS").is_some());
        assert!(ofx.child("X").is_none());
    }
}
