use super::{AttrValue, Attribute, Element, Node, Template};
use crate::error::MarkupParseError;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

enum FrameKind {
    Root,
    Element(Element),
    Block { name: String, start: usize },
}

struct Frame {
    kind: FrameKind,
    children: Vec<Node>,
    /// Unmatched `{` seen in text (ICU expressions) while inside a block.
    braces: usize,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    stack: Vec<Frame>,
}

type PResult<T> = Result<T, MarkupParseError>;

/// Parse an Angular template. Any syntax error fails the whole template.
pub fn parse(src: &str) -> PResult<Template> {
    let mut parser = Parser {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        stack: vec![Frame { kind: FrameKind::Root, children: Vec::new(), braces: 0 }],
    };
    parser.run()?;
    parser.finish()
}

fn error(message: impl Into<String>, offset: usize) -> MarkupParseError {
    MarkupParseError { message: message.into(), offset }
}

fn is_name_char(b: u8) -> bool {
    !(b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'<' | b'=' | b'"' | b'\''))
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> PResult<()> {
        while self.pos < self.bytes.len() {
            let rest = &self.src[self.pos..];
            if rest.starts_with("<!--") {
                self.skip_past("-->", "unterminated comment")?;
            } else if rest.starts_with("<![CDATA[") {
                self.skip_past("]]>", "unterminated CDATA section")?;
            } else if rest.starts_with("<!") {
                self.skip_past(">", "unterminated declaration")?;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.open_tag()?;
            } else if rest.starts_with("{{") && !(rest.starts_with("{{{") && self.in_block()) {
                match rest[2..].find("}}") {
                    Some(end) => self.pos += 2 + end + 2,
                    None => self.pos = self.bytes.len(),
                }
            } else if rest.starts_with('@') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.block()?;
            } else if rest.starts_with('{') && self.in_block() {
                self.open_brace();
            } else if rest.starts_with('}') && self.in_block() {
                if !self.close_brace() {
                    self.close_block();
                }
            } else {
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
        Ok(())
    }

    fn finish(mut self) -> PResult<Template> {
        while self.stack.len() > 1 {
            let frame = self.stack.pop().ok_or_else(|| error("parser stack underflow", self.pos))?;
            match frame.kind {
                FrameKind::Block { name, start } => {
                    return Err(error(format!("unclosed block @{}", name), start));
                }
                FrameKind::Element(mut element) => {
                    element.children = frame.children;
                    self.push_node(Node::Element(element));
                }
                FrameKind::Root => {}
            }
        }
        let root = self.stack.pop().map(|f| f.children).unwrap_or_default();
        Ok(Template { nodes: root })
    }

    fn push_node(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    fn in_block(&self) -> bool {
        self.stack
            .iter()
            .any(|f| matches!(f.kind, FrameKind::Block { .. }))
    }

    fn skip_past(&mut self, terminator: &str, message: &str) -> PResult<()> {
        match self.src[self.pos..].find(terminator) {
            Some(idx) => {
                self.pos += idx + terminator.len();
                Ok(())
            }
            None => Err(error(message, self.pos)),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn read_name(&mut self) -> (String, std::ops::Range<usize>) {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_name_char(self.bytes[self.pos]) {
            self.pos += 1;
        }
        (self.src[start..self.pos].to_string(), start..self.pos)
    }

    fn open_tag(&mut self) -> PResult<()> {
        let tag_start = self.pos;
        self.pos += 1;
        let (name, name_span) = self.read_name();
        let mut attrs = Vec::new();

        let self_closing = loop {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() {
                return Err(error(format!("unterminated start tag <{}>", name), tag_start));
            }
            match self.bytes[self.pos] {
                b'>' => {
                    self.pos += 1;
                    break false;
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'>') => {
                    self.pos += 2;
                    break true;
                }
                b'/' => self.pos += 1,
                b'<' => return Err(error(format!("unterminated start tag <{}>", name), tag_start)),
                _ => attrs.push(self.attribute()?),
            }
        };

        let element = Element {
            name: name.clone(),
            name_span,
            start_span: tag_start..self.pos,
            end_name_span: None,
            attrs,
            children: Vec::new(),
            self_closing,
        };

        if self_closing || VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            self.push_node(Node::Element(element));
            return Ok(());
        }

        if RAW_TEXT_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            let closing = format!("</{}", name);
            let Some(idx) = self.src[self.pos..].find(&closing) else {
                return Err(error(format!("unclosed <{}>", name), tag_start));
            };
            self.pos += idx;
            self.stack.push(Frame { kind: FrameKind::Element(element), children: Vec::new(), braces: 0 });
            return self.close_tag();
        }

        self.stack.push(Frame { kind: FrameKind::Element(element), children: Vec::new(), braces: 0 });
        Ok(())
    }

    fn attribute(&mut self) -> PResult<Attribute> {
        let start = self.pos;
        if matches!(self.bytes[self.pos], b'"' | b'\'' | b'=') {
            return Err(error("unexpected character in tag", self.pos));
        }
        let (name, name_span) = self.read_name();

        let checkpoint = self.pos;
        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'=') {
            self.pos = checkpoint;
            return Ok(Attribute { name, name_span, span: start..checkpoint, value: None });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.bytes.get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                let open = self.pos;
                let Some(len) = self.src[open + 1..].find(quote as char) else {
                    return Err(error("unterminated attribute value", open));
                };
                let span = open + 1..open + 1 + len;
                self.pos = span.end + 1;
                AttrValue { text: self.src[span.clone()].to_string(), span, quote: Some(quote as char) }
            }
            Some(_) => {
                let value_start = self.pos;
                while self.pos < self.bytes.len()
                    && !self.bytes[self.pos].is_ascii_whitespace()
                    && self.bytes[self.pos] != b'>'
                {
                    self.pos += 1;
                }
                let span = value_start..self.pos;
                AttrValue { text: self.src[span.clone()].to_string(), span, quote: None }
            }
            None => return Err(error("unterminated attribute value", self.pos)),
        };

        Ok(Attribute { name, name_span, span: start..self.pos, value: Some(value) })
    }

    fn close_tag(&mut self) -> PResult<()> {
        let tag_start = self.pos;
        self.pos += 2;
        let (name, name_span) = self.read_name();
        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'>') {
            return Err(error(format!("unterminated end tag </{}>", name), tag_start));
        }
        self.pos += 1;

        let open = self.stack.iter().rposition(|f| match &f.kind {
            FrameKind::Element(e) => e.name == name,
            _ => false,
        });
        let blocked = open.map_or(true, |idx| {
            self.stack[idx + 1..]
                .iter()
                .any(|f| matches!(f.kind, FrameKind::Block { .. }))
        });
        if blocked {
            return Err(error(format!("unexpected closing tag </{}>", name), tag_start));
        }
        let Some(open) = open else {
            return Err(error(format!("unexpected closing tag </{}>", name), tag_start));
        };

        // elements left open inside the closed one end here without an end tag
        while self.stack.len() > open + 1 {
            self.pop_frame();
        }
        if let Some(frame) = self.stack.pop() {
            if let FrameKind::Element(mut element) = frame.kind {
                element.children = frame.children;
                element.end_name_span = Some(name_span);
                self.push_node(Node::Element(element));
            }
        }
        Ok(())
    }

    fn pop_frame(&mut self) {
        if let Some(frame) = self.stack.pop() {
            match frame.kind {
                FrameKind::Element(mut element) => {
                    element.children = frame.children;
                    self.push_node(Node::Element(element));
                }
                FrameKind::Block { name, .. } => {
                    self.push_node(Node::Block { name, children: frame.children });
                }
                FrameKind::Root => self.stack.push(Frame { kind: FrameKind::Root, children: frame.children, braces: 0 }),
            }
        }
    }

    /// `@name (params) {`, `@let x = expr;`, or a literal `@`.
    fn block(&mut self) -> PResult<()> {
        let start = self.pos;
        self.pos += 1;
        let name_start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_alphabetic() {
            self.pos += 1;
        }
        let mut name = self.src[name_start..self.pos].to_string();

        if name == "let" {
            return self.skip_past(";", "unterminated @let declaration");
        }

        // `@else if`
        let checkpoint = self.pos;
        self.skip_whitespace();
        if name == "else" && self.src[self.pos..].starts_with("if") {
            self.pos += 2;
            name.push_str(" if");
        } else {
            self.pos = checkpoint;
        }

        self.skip_whitespace();
        if self.bytes.get(self.pos) == Some(&b'(') {
            self.skip_parameters(start)?;
            self.skip_whitespace();
        }

        if self.bytes.get(self.pos) != Some(&b'{') {
            // not a block, keep it as text
            self.pos = name_start;
            return Ok(());
        }
        self.pos += 1;
        self.stack.push(Frame { kind: FrameKind::Block { name, start }, children: Vec::new(), braces: 0 });
        Ok(())
    }

    fn skip_parameters(&mut self, block_start: usize) -> PResult<()> {
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            self.pos += 1;
            match quote {
                Some(q) => {
                    if b == b'\\' {
                        self.pos += 1;
                    } else if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' | b'`' => quote = Some(b),
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(());
                        }
                    }
                    _ => {}
                },
            }
        }
        Err(error("unterminated block parameters", block_start))
    }

    fn open_brace(&mut self) {
        self.pos += 1;
        if let Some(frame) = self.stack.last_mut() {
            frame.braces += 1;
        }
    }

    /// Consume a `}` that closes a text brace of the current frame.
    fn close_brace(&mut self) -> bool {
        match self.stack.last_mut() {
            Some(frame) if frame.braces > 0 => {
                frame.braces -= 1;
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn close_block(&mut self) {
        self.pos += 1;
        while let Some(frame) = self.stack.last() {
            let is_block = matches!(frame.kind, FrameKind::Block { .. });
            self.pop_frame();
            if is_block {
                break;
            }
        }
    }
}
