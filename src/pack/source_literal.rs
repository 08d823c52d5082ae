//! PHP array-literal packs: one `return [...]` per namespace.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::PackMap;
use crate::error::{Result, TranslationError};

const NAMESPACE_HEADER: &str = "Namespace:";
const MAX_DEPTH: usize = 100;

/// Render the keys of `pack` as a scaffold.
///
/// Every value is written as `''`: this format produces an untranslated
/// skeleton of the key structure, unlike JSON which carries the real values.
/// Dotted keys are nested into sub-arrays.
pub fn render(pack: &PackMap) -> String {
    let mut out = String::from("<?php\n");
    for (namespace, entries) in pack {
        let mut tree = Map::new();
        for key in entries.keys() {
            let path: Vec<&str> = key.split('.').collect();
            insert_nested_key(&mut tree, &path);
        }
        out.push_str(&format!("\n// {} {}\nreturn [\n", NAMESPACE_HEADER, namespace));
        render_node(&tree, 1, &mut out);
        out.push_str("];\n");
    }
    out
}

/// Insert a dotted path, creating intermediate arrays as needed.
///
/// A path that runs into an existing leaf is stored flat under its remaining
/// dotted name at that level. Keys arrive sorted, so a leaf is always seen
/// before any key nested beneath it.
fn insert_nested_key(tree: &mut Map<String, Value>, path: &[&str]) {
    let mut current = tree;
    for (i, segment) in path.iter().enumerate() {
        if i == path.len() - 1 {
            current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::String(String::new()));
            return;
        }
        if current.get(*segment).is_some_and(|v| !v.is_object()) {
            current.insert(path[i..].join("."), Value::String(String::new()));
            return;
        }
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(nested) => current = nested,
            _ => return,
        }
    }
}

fn render_node(node: &Map<String, Value>, depth: usize, out: &mut String) {
    let pad = "    ".repeat(depth);
    for (key, value) in node {
        match value {
            Value::Object(child) => {
                out.push_str(&format!("{}'{}' => [\n", pad, escape(key)));
                render_node(child, depth + 1, out);
                out.push_str(&format!("{}],\n", pad));
            }
            _ => out.push_str(&format!("{}'{}' => '',\n", pad, escape(key))),
        }
    }
}

/// Escape for a single-quoted PHP string
pub fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Parse a file of `return [...]` array literals back into a pack.
///
/// A `// Namespace: <name>` comment names the group of the array that
/// follows; arrays without one land in `default`. Nested arrays flatten to
/// dotted keys. Only string and number values are accepted.
pub fn parse(content: &str) -> Result<PackMap> {
    let mut parser = Parser::new(content);
    let mut pack: PackMap = BTreeMap::new();
    let mut namespace: Option<String> = None;
    let mut found = false;

    parser.eat("<?php");
    loop {
        parser.skip_trivia(&mut namespace);
        if parser.at_end() {
            break;
        }
        if !parser.eat_keyword("return") {
            return Err(parser.error("expected `return`"));
        }
        parser.skip_trivia(&mut namespace);
        let mut entries = BTreeMap::new();
        parser.parse_array("", 0, &mut entries)?;
        parser.skip_trivia(&mut namespace);
        parser.eat(";");

        let group = namespace.take().unwrap_or_else(|| "default".to_string());
        pack.entry(group).or_default().extend(entries);
        found = true;
    }

    if !found {
        return Err(TranslationError::Format(
            "no `return [...]` array literal found".to_string(),
        ));
    }
    Ok(pack)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(content: &str) -> Self {
        Self {
            chars: content.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        let mut idx = self.pos;
        for c in s.chars() {
            if self.chars.get(idx) != Some(&c) {
                return false;
            }
            idx += 1;
        }
        true
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        let end = self.pos + word.chars().count();
        let boundary = self
            .chars
            .get(end)
            .map_or(true, |c| !(c.is_alphanumeric() || *c == '_'));
        if boundary && self.starts_with(word) {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: &str) -> TranslationError {
        let line = self.chars[..self.pos.min(self.chars.len())]
            .iter()
            .filter(|c| **c == '\n')
            .count()
            + 1;
        TranslationError::Format(format!("source literal line {}: {}", line, reason))
    }

    /// Skip whitespace, comments and closing tags; a namespace header
    /// comment updates `namespace`.
    fn skip_trivia(&mut self, namespace: &mut Option<String>) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('#') => {
                    self.line_comment();
                }
                Some('/') if self.starts_with("//") => {
                    self.pos += 2;
                    let text = self.line_comment();
                    if let Some(name) = text.trim().strip_prefix(NAMESPACE_HEADER) {
                        let name = name.trim();
                        if !name.is_empty() {
                            *namespace = Some(name.to_string());
                        }
                    }
                }
                Some('/') if self.starts_with("/*") => {
                    self.pos += 2;
                    while !self.at_end() && !self.eat("*/") {
                        self.pos += 1;
                    }
                }
                Some('?') if self.starts_with("?>") => self.pos += 2,
                _ => return,
            }
        }
    }

    fn line_comment(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_blank(&mut self) {
        let mut ignored = None;
        self.skip_trivia(&mut ignored);
    }

    /// Consume `[` or `array(`, returning the matching closer
    fn open_array(&mut self) -> Option<char> {
        if self.eat("[") {
            return Some(']');
        }
        let start = self.pos;
        if self.eat_keyword("array") {
            self.skip_blank();
            if self.eat("(") {
                return Some(')');
            }
        }
        self.pos = start;
        None
    }

    fn parse_array(
        &mut self,
        prefix: &str,
        depth: usize,
        out: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(self.error("arrays nested too deeply"));
        }
        let closer = self
            .open_array()
            .ok_or_else(|| self.error("expected an array literal"))?;

        loop {
            self.skip_blank();
            if self.eat(&closer.to_string()) {
                return Ok(());
            }
            let key = self
                .parse_scalar()?
                .ok_or_else(|| self.error("expected a quoted key"))?;
            self.skip_blank();
            if !self.eat("=>") {
                return Err(self.error("expected `=>` after key"));
            }
            self.skip_blank();

            let full_key = if prefix.is_empty() {
                key
            } else {
                format!("{}.{}", prefix, key)
            };
            if self.starts_with("[") || self.starts_with("array") {
                self.parse_array(&full_key, depth + 1, out)?;
            } else {
                let value = self
                    .parse_scalar()?
                    .ok_or_else(|| self.error("expected a string value"))?;
                out.insert(full_key, value);
            }

            self.skip_blank();
            if !self.eat(",") && !self.starts_with(&closer.to_string()) {
                return Err(self.error("expected `,` between entries"));
            }
        }
    }

    /// A quoted string or a bare number; `None` if neither starts here
    fn parse_scalar(&mut self) -> Result<Option<String>> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                self.parse_quoted(quote).map(Some)
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let start = self.pos;
                self.pos += 1;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || c == '.')
                {
                    self.pos += 1;
                }
                Ok(Some(self.chars[start..self.pos].iter().collect()))
            }
            _ => Ok(None),
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        loop {
            let c = self
                .peek()
                .ok_or_else(|| self.error("unterminated string"))?;
            self.pos += 1;
            if c == quote {
                return Ok(value);
            }
            if c != '\\' {
                value.push(c);
                continue;
            }
            let next = self
                .peek()
                .ok_or_else(|| self.error("unterminated string"))?;
            let unescaped = match (quote, next) {
                (_, '\\') => Some('\\'),
                ('\'', '\'') => Some('\''),
                ('"', '"') => Some('"'),
                ('"', 'n') => Some('\n'),
                ('"', 't') => Some('\t'),
                ('"', 'r') => Some('\r'),
                ('"', '$') => Some('$'),
                _ => None,
            };
            match unescaped {
                Some(ch) => {
                    value.push(ch);
                    self.pos += 1;
                }
                // Unknown escapes are literal in PHP
                None => value.push('\\'),
            }
        }
    }
}
