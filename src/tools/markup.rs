//! Tolerant parser for luciform tool documents.
//!
//! Luciforms are hand-written XML-like files. Tag names are often prefixed
//! with alchemical glyphs (`<🜄pacte>`), so element names are compared after
//! stripping any leading non-alphanumeric characters. The parser is strict
//! about nesting: a mismatched close tag is an error, which is what sends
//! extraction to the regex fallback.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unexpected end of document at byte {0}")]
    UnexpectedEof(usize),
    #[error("mismatched closing tag </{found}> for <{expected}> at byte {at}")]
    Mismatched {
        expected: String,
        found: String,
        at: usize,
    },
    #[error("malformed tag at byte {0}")]
    MalformedTag(usize),
    #[error("document has no root element")]
    NoRoot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Tag name as written, glyphs included.
    pub raw_name: String,
    /// Lower-cased tag name without leading glyphs.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(raw_name: &str, attributes: Vec<(String, String)>) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            name: normalize_name(raw_name),
            attributes,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| normalize_name(k) == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First direct child with one of the given names.
    pub fn child(&self, names: &[&str]) -> Option<&Element> {
        self.elements().find(|e| names.contains(&e.name.as_str()))
    }

    /// First descendant (depth-first, self excluded) with one of the names.
    pub fn find(&self, names: &[&str]) -> Option<&Element> {
        for child in self.elements() {
            if names.contains(&child.name.as_str()) {
                return Some(child);
            }
            if let Some(found) = child.find(names) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant with one of the names, in document order.
    pub fn find_all<'a>(&'a self, names: &[&str], out: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if names.contains(&child.name.as_str()) {
                out.push(child);
            }
            child.find_all(names, out);
        }
    }

    /// Concatenated text of this element and its descendants, whitespace
    /// collapsed.
    pub fn text(&self) -> String {
        let mut buf = String::new();
        self.collect_text(&mut buf);
        buf.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, buf: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => {
                    buf.push_str(t);
                    buf.push(' ');
                }
                Node::Element(e) => e.collect_text(buf),
            }
        }
    }

    /// Non-empty text, or `None`.
    pub fn text_opt(&self) -> Option<String> {
        Some(self.text()).filter(|t| !t.is_empty())
    }
}

/// Lower-case a tag name and strip any leading glyphs or punctuation.
pub fn normalize_name(raw: &str) -> String {
    raw.trim_start_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
        .to_lowercase()
}

/// Replace the five predefined XML entities and numeric character references.
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let Some(end) = rest.find(';').filter(|&e| e <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse a document into its root element.
pub fn parse(input: &str) -> Result<Element, MarkupError> {
    let mut parser = Parser { src: input, pos: 0 };
    parser.parse_document()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    /// Advance past `marker`, erroring at EOF.
    fn skip_past(&mut self, marker: &str) -> Result<(), MarkupError> {
        match self.rest().find(marker) {
            Some(idx) => {
                self.pos += idx + marker.len();
                Ok(())
            }
            None => Err(MarkupError::UnexpectedEof(self.src.len())),
        }
    }

    /// Skip prolog, comments, doctype and processing instructions.
    /// Returns true if something was skipped.
    fn skip_misc(&mut self) -> Result<bool, MarkupError> {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            self.skip_past("-->")?;
        } else if rest.starts_with("<?") {
            self.skip_past("?>")?;
        } else if rest.starts_with("<!") && !rest.starts_with("<![CDATA[") {
            self.skip_past(">")?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    fn parse_document(&mut self) -> Result<Element, MarkupError> {
        loop {
            self.skip_whitespace();
            if !self.skip_misc()? {
                break;
            }
        }
        if !self.rest().starts_with('<') {
            return Err(MarkupError::NoRoot);
        }
        let root = self.parse_element()?;
        loop {
            self.skip_whitespace();
            if self.rest().is_empty() || !self.skip_misc()? {
                break;
            }
        }
        // Trailing junk after the root is tolerated; the root is what matters.
        Ok(root)
    }

    fn parse_element(&mut self) -> Result<Element, MarkupError> {
        let start = self.pos;
        let (name, attributes, self_closing) = self.parse_open_tag()?;
        let mut element = Element::new(&name, attributes);
        if self_closing {
            return Ok(element);
        }

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(MarkupError::UnexpectedEof(start));
            }
            if rest.starts_with("</") {
                let at = self.pos;
                self.pos += 2;
                let end = self
                    .rest()
                    .find('>')
                    .ok_or(MarkupError::UnexpectedEof(at))?;
                let closing = self.rest()[..end].trim().to_string();
                self.pos += end + 1;
                if closing != element.raw_name
                    && normalize_name(&closing) != element.name
                {
                    return Err(MarkupError::Mismatched {
                        expected: element.raw_name,
                        found: closing,
                        at,
                    });
                }
                return Ok(element);
            }
            if rest.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let end = self
                    .rest()
                    .find("]]>")
                    .ok_or(MarkupError::UnexpectedEof(self.pos))?;
                element
                    .children
                    .push(Node::Text(self.rest()[..end].to_string()));
                self.pos += end + 3;
                continue;
            }
            if self.skip_misc()? {
                continue;
            }
            if rest.starts_with('<') {
                let child = self.parse_element()?;
                element.children.push(Node::Element(child));
                continue;
            }
            let end = rest.find('<').unwrap_or(rest.len());
            let text = unescape(&rest[..end]);
            if !text.trim().is_empty() {
                element.children.push(Node::Text(text));
            }
            self.pos += end;
        }
    }

    /// Parse `<name attr="v" ...>` or `<name ... />`.
    fn parse_open_tag(&mut self) -> Result<(String, Vec<(String, String)>, bool), MarkupError> {
        let start = self.pos;
        self.pos += 1; // '<'
        let rest = self.rest();
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .ok_or(MarkupError::UnexpectedEof(start))?;
        let name = rest[..name_end].to_string();
        if name.is_empty() {
            return Err(MarkupError::MalformedTag(start));
        }
        self.pos += name_end;

        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(MarkupError::UnexpectedEof(start));
            }
            if let Some(after) = rest.strip_prefix("/>") {
                self.pos = self.src.len() - after.len();
                return Ok((name, attributes, true));
            }
            if let Some(after) = rest.strip_prefix('>') {
                self.pos = self.src.len() - after.len();
                return Ok((name, attributes, false));
            }

            let key_end = rest
                .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
                .ok_or(MarkupError::UnexpectedEof(start))?;
            if key_end == 0 {
                return Err(MarkupError::MalformedTag(self.pos));
            }
            let key = rest[..key_end].to_string();
            self.pos += key_end;
            self.skip_whitespace();

            if !self.rest().starts_with('=') {
                // Bare attribute, e.g. `<param required>`.
                attributes.push((key, String::new()));
                continue;
            }
            self.pos += 1;
            self.skip_whitespace();

            let rest = self.rest();
            let value = match rest.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let close = rest[1..]
                        .find(q)
                        .ok_or(MarkupError::UnexpectedEof(start))?;
                    let v = unescape(&rest[1..1 + close]);
                    self.pos += close + 2;
                    v
                }
                Some(_) => {
                    let end = rest
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(rest.len());
                    let v = rest[..end].trim_end_matches('/').to_string();
                    self.pos += v.len();
                    v
                }
                None => return Err(MarkupError::UnexpectedEof(start)),
            };
            attributes.push((key, value));
        }
    }
}
