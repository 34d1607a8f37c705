//! A small mutable document tree. Text sits on the element it opens and the
//! whitespace that follows an element is kept as its tail, so a tree that is
//! parsed and written back keeps its layout.

// our own stuff that we need
use crate::error::Result;

/// Character data, remembering whether it was (or should be) written as CDATA.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text {
    pub content: String,
    pub cdata: bool,
}
impl Text {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            cdata: false,
        }
    }
    pub fn cdata(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            cdata: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Comment {
    pub text: String,
    pub tail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Comment(Comment),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<Text>,
    pub children: Vec<Node>,
    pub tail: String,
}

impl Node {
    pub fn comment(text: impl Into<String>) -> Node {
        Node::Comment(Comment {
            text: text.into(),
            tail: String::new(),
        })
    }
    pub fn tail(&self) -> &str {
        match self {
            Node::Element(element) => &element.tail,
            Node::Comment(comment) => &comment.tail,
        }
    }
    pub fn set_tail(&mut self, tail: impl Into<String>) {
        match self {
            Node::Element(element) => element.tail = tail.into(),
            Node::Comment(comment) => comment.tail = tail.into(),
        }
    }
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Comment(_) => None,
        }
    }
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }
    fn write_into(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_into(out),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(&comment.text);
                out.push_str("-->");
                out.push_str(&comment.tail);
            }
        }
    }
}
impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }
    pub fn with_text(mut self, text: Text) -> Self {
        self.text = Some(text);
        self
    }
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.child_elements().find(|element| element.tag == tag)
    }
    /// Text content, empty when the element has none.
    pub fn text_content(&self) -> &str {
        self.text.as_ref().map(|t| t.content.as_str()).unwrap_or("")
    }
    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }
    /// Swaps the first child element with the given tag for another element,
    /// keeping its tail. Returns false when there was no such child.
    pub fn replace_child(&mut self, tag: &str, mut replacement: Element) -> bool {
        for node in self.children.iter_mut() {
            if let Node::Element(element) = node {
                if element.tag == tag {
                    replacement.tail = std::mem::take(&mut element.tail);
                    *element = replacement;
                    return true;
                }
            }
        }
        false
    }
    /// Pretty-prints the subtree with tabs, one level per depth. Only blank
    /// text and tails are touched.
    pub fn indent(&mut self, level: usize) {
        let newline = format!("\n{}", "\t".repeat(level));
        if !self.children.is_empty() {
            if self.text.as_ref().is_none_or(|t| is_blank(&t.content)) {
                self.text = Some(Text::plain(format!("{newline}\t")));
            }
            if is_blank(&self.tail) {
                self.tail = newline.clone();
            }
            for child in self.children.iter_mut() {
                match child {
                    Node::Element(element) => element.indent(level + 1),
                    Node::Comment(comment) => {
                        if is_blank(&comment.tail) {
                            comment.tail = format!("{newline}\t");
                        }
                    }
                }
            }
            if let Some(last) = self.children.last_mut() {
                if is_blank(last.tail()) {
                    last.set_tail(newline);
                }
            }
        } else if level > 0 && is_blank(&self.tail) {
            self.tail = newline;
        }
    }
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }
    /// The element as a standalone document, XML declaration included.
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_into(&mut out);
        out
    }
    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_attribute(value, out);
            out.push('"');
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            if let Some(text) = &self.text {
                if text.cdata {
                    out.push_str("<![CDATA[");
                    out.push_str(&text.content.replace("]]>", "]]]]><![CDATA[>"));
                    out.push_str("]]>");
                } else {
                    escape_text(&text.content, out);
                }
            }
            for child in &self.children {
                child.write_into(out);
            }
            out.push_str("</");
            out.push_str(&self.tag);
            out.push('>');
        }
        escape_text(&self.tail, out);
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

fn escape_attribute(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
}

/// Parses a document (or a fragment with a single root) into a tree. Anything
/// outside the root element is dropped.
pub fn parse_document(text: &str) -> Result<Element> {
    let document = roxmltree::Document::parse(text)?;
    Ok(convert(document.root_element(), document.input_text()))
}

fn convert(node: roxmltree::Node, input: &str) -> Element {
    let mut element = Element::new(node.tag_name().name());
    for attribute in node.attributes() {
        element
            .attributes
            .push((attribute.name().to_string(), attribute.value().to_string()));
    }
    let leaf = !node.children().any(|child| child.is_element() || child.is_comment());
    for child in node.children() {
        if child.is_element() {
            element.push(convert(child, input));
        } else if child.is_comment() {
            element.push(Node::comment(child.text().unwrap_or_default()));
        } else if child.is_text() {
            let content = child.text().unwrap_or_default();
            match element.children.last_mut() {
                Some(last) => {
                    let tail = format!("{}{}", last.tail(), content);
                    last.set_tail(tail);
                }
                None => {
                    let cdata = leaf && input[node.range()].contains("<![CDATA[");
                    let mut text = element.text.take().unwrap_or_default();
                    text.content.push_str(content);
                    text.cdata |= cdata;
                    element.text = Some(text);
                }
            }
        }
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GsmParamError;

    #[test]
    fn layout_survives_a_round_trip() {
        let source = "<Length Name=\"A\">\n\t\t\t<Description><![CDATA[\"Width\"]]></Description>\n\t\t\t<Fix/>\n\t\t\t<Value>1.5</Value>\n\t\t</Length>";
        let parsed = parse_document(source).unwrap();
        assert_eq!(parsed.to_xml(), source);
        assert!(parsed.child("Description").unwrap().text.as_ref().unwrap().cdata);
        assert!(!parsed.child("Value").unwrap().text.as_ref().unwrap().cdata);
    }

    #[test]
    fn comments_are_kept_in_place() {
        let source = "<Parameters>\n\t\t<!-- Block -->\n\n\t\t<Title Name=\"T\"/>\n\t</Parameters>";
        let parsed = parse_document(source).unwrap();
        assert_eq!(parsed.children.len(), 2);
        assert_eq!(parsed.children[0], Node::Comment(Comment {
            text: " Block ".to_string(),
            tail: "\n\n\t\t".to_string(),
        }));
        assert_eq!(parsed.to_xml(), source);
    }

    #[test]
    fn writer_escapes_markup() {
        let element = Element::new("String")
            .with_attribute("Name", "a\"b<c")
            .with_text(Text::plain("x & y < z"));
        assert_eq!(element.to_xml(), "<String Name=\"a&quot;b&lt;c\">x &amp; y &lt; z</String>");
        let cdata = Element::new("Value").with_text(Text::cdata("a]]>b"));
        assert_eq!(cdata.to_xml(), "<Value><![CDATA[a]]]]><![CDATA[>b]]></Value>");
    }

    #[test]
    fn indentation_uses_tabs_per_level() {
        let mut value = Element::new("Value");
        let mut inner = Element::new("Dictionary");
        inner.push(Element::new("Integer").with_text(Text::plain("1")));
        value.push(Element::new("RealNum").with_text(Text::plain("2.1")));
        value.push(inner);
        value.indent(1);
        assert_eq!(
            value.to_xml(),
            "<Value>\n\t\t<RealNum>2.1</RealNum>\n\t\t<Dictionary>\n\t\t\t<Integer>1</Integer>\n\t\t</Dictionary>\n\t</Value>\n\t"
        );
    }

    #[test]
    fn replacing_a_child_keeps_its_tail() {
        let mut root = parse_document("<Symbol>\n\t<ParamSection/>\n\t<Script_3D/>\n</Symbol>").unwrap();
        assert!(root.replace_child("ParamSection", Element::new("ParamSection").with_attribute("SectVersion", "27")));
        assert_eq!(root.to_xml(), "<Symbol>\n\t<ParamSection SectVersion=\"27\"/>\n\t<Script_3D/>\n</Symbol>");
        assert!(!root.replace_child("Missing", Element::new("Missing")));
    }

    #[test]
    fn broken_documents_are_rejected() {
        assert!(matches!(parse_document("<a><b></a>"), Err(GsmParamError::Xml(_))));
    }
}
