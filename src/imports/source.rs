//! Outline parser for Python source.
//!
//! Not a full grammar: it splits the text into logical lines (joining
//! bracketed and backslash-continued lines, blanking string literals and
//! dropping comments) and recognises the statement heads the analysis needs:
//! `import`, `from … import`, `class`, `def` and decorators. Unterminated
//! strings and unbalanced brackets are reported as [`ParseError`]s.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^from\s+(\.*)\s*([A-Za-z_][\w.]*)?\s*import\b\s*(.*)$").expect("valid from-import regex")
});

static DEF_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("valid def regex")
});

static CLASS_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)").expect("valid class regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: unexpected '{found}'")]
    UnexpectedClose { line: usize, found: char },
    #[error("line {line}: '{open}' is never closed")]
    Unclosed { line: usize, open: char },
    #[error("line {line}: malformed import statement")]
    MalformedImport { line: usize },
}

/// One imported module as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatement {
    /// Dotted module name without leading dots; empty for `from . import x`.
    pub module: String,
    /// Names bound by `from … import …`; empty for plain `import`.
    pub names: Vec<String>,
    /// Number of leading dots (0 for absolute imports).
    pub level: usize,
    pub line: usize,
}

impl ImportStatement {
    pub fn is_relative(&self) -> bool {
        self.level > 0
    }

    /// The import name as the resolver takes it: leading dots plus module.
    pub fn import_name(&self) -> String {
        format!("{}{}", ".".repeat(self.level), self.module)
    }
}

/// What the dependency analysis needs from a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleOutline {
    pub imports: Vec<ImportStatement>,
    pub classes: Vec<String>,
    pub functions: Vec<String>,
    pub decorators: usize,
    pub line_count: usize,
}

struct LogicalLine {
    line: usize,
    text: String,
}

/// Parse `source` into an outline.
pub fn parse_module(source: &str) -> Result<ModuleOutline, ParseError> {
    let mut outline = ModuleOutline {
        line_count: source.lines().count(),
        ..Default::default()
    };

    for logical in logical_lines(source)? {
        for stmt in logical.text.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            parse_statement(stmt, logical.line, &mut outline)?;
        }
    }
    Ok(outline)
}

fn parse_statement(stmt: &str, line: usize, outline: &mut ModuleOutline) -> Result<(), ParseError> {
    if stmt.starts_with('@') {
        outline.decorators += 1;
    } else if let Some(caps) = DEF_HEAD.captures(stmt) {
        outline.functions.push(caps[1].to_string());
    } else if let Some(caps) = CLASS_HEAD.captures(stmt) {
        outline.classes.push(caps[1].to_string());
    } else if let Some(rest) = stmt.strip_prefix("import") {
        if !rest.starts_with(char::is_whitespace) {
            return Ok(());
        }
        for part in rest.split(',') {
            let module = part.split_whitespace().next().unwrap_or("");
            if !is_dotted_identifier(module) {
                return Err(ParseError::MalformedImport { line });
            }
            outline.imports.push(ImportStatement {
                module: module.to_string(),
                names: Vec::new(),
                level: 0,
                line,
            });
        }
    } else if stmt.starts_with("from") && (stmt[4..].starts_with(char::is_whitespace)) {
        let caps = FROM_IMPORT
            .captures(stmt)
            .ok_or(ParseError::MalformedImport { line })?;
        let level = caps[1].len();
        let module = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
        if level == 0 && module.is_empty() {
            return Err(ParseError::MalformedImport { line });
        }
        let names: Vec<String> = caps[3]
            .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
            .split(',')
            .filter_map(|n| n.split_whitespace().next())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(ParseError::MalformedImport { line });
        }
        outline.imports.push(ImportStatement {
            module,
            names,
            level,
            line,
        });
    }

    if let Some(tail) = compound_tail(stmt) {
        parse_statement(tail, line, outline)?;
    }
    Ok(())
}

const COMPOUND_HEADS: &[&str] = &[
    "if", "elif", "else", "try", "except", "finally", "with", "for", "while", "async", "def", "class",
];

/// Body written on the same line as a compound-statement header, as in
/// `try: import ujson as json` or `if TYPE_CHECKING: from x import T`.
fn compound_tail(stmt: &str) -> Option<&str> {
    let head_len = stmt
        .find(|c: char| !(c == '_' || c.is_alphanumeric()))
        .unwrap_or(stmt.len());
    if !COMPOUND_HEADS.contains(&&stmt[..head_len]) {
        return None;
    }

    let mut depth = 0usize;
    for (idx, c) in stmt.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && !stmt[idx + 1..].starts_with('=') => {
                let tail = stmt[idx + 1..].trim();
                return (!tail.is_empty()).then_some(tail);
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn is_dotted_identifier(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

pub(crate) fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Split into logical lines. String literals become `""`, comments vanish,
/// bracketed and backslash continuations are joined.
fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut open: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut start_line = 1;
    let mut i = 0;

    let flush = |current: &mut String, start: usize, out: &mut Vec<LogicalLine>| {
        if !current.trim().is_empty() {
            out.push(LogicalLine {
                line: start,
                text: current.trim().to_string(),
            });
        }
        current.clear();
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '"' | '\'' => {
                let string_start = line;
                let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                i += if triple { 3 } else { 1 };
                loop {
                    let Some(&ch) = chars.get(i) else {
                        return Err(ParseError::UnterminatedString { line: string_start });
                    };
                    match ch {
                        '\\' => {
                            if chars.get(i + 1) == Some(&'\n') {
                                line += 1;
                            }
                            i += 2;
                            continue;
                        }
                        '\n' if !triple => {
                            return Err(ParseError::UnterminatedString { line: string_start });
                        }
                        '\n' => line += 1,
                        q if q == c => {
                            if !triple {
                                i += 1;
                                break;
                            }
                            if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                                i += 3;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                current.push_str("\"\"");
                continue;
            }
            '(' | '[' | '{' => {
                open.push((c, line));
                current.push(c);
            }
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match open.pop() {
                    Some((o, _)) if o == expected => current.push(c),
                    _ => return Err(ParseError::UnexpectedClose { line, found: c }),
                }
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                current.push(' ');
                line += 1;
                i += 2;
                continue;
            }
            '\n' => {
                line += 1;
                if open.is_empty() {
                    flush(&mut current, start_line, &mut out);
                    start_line = line;
                } else {
                    current.push(' ');
                }
            }
            _ => {
                if current.trim().is_empty() && !c.is_whitespace() && open.is_empty() {
                    start_line = line;
                }
                current.push(c);
            }
        }
        i += 1;
    }

    if let Some((o, l)) = open.pop() {
        return Err(ParseError::Unclosed { line: l, open: o });
    }
    flush(&mut current, start_line, &mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#""""Module docstring with import fake
spanning lines."""
import os, sys as system
import json  # trailing comment
from . import sibling
from ..pkg.sub import (
    Alpha,
    Beta as B,
)
from .b import X

@dataclass
class Config:
    def load(self):
        import re
        return "import not_real"

def build_factory():
    pass

async def run(): pass
"#;

    #[test]
    fn outline_collects_imports() {
        let outline = parse_module(SAMPLE).unwrap();
        let names: Vec<String> = outline.imports.iter().map(ImportStatement::import_name).collect();
        assert_eq!(names, vec!["os", "sys", "json", ".", "..pkg.sub", ".b", "re"]);

        let multi = &outline.imports[4];
        assert_eq!(multi.level, 2);
        assert_eq!(multi.names, vec!["Alpha", "Beta"]);
        assert_eq!(multi.line, 6);
        assert!(multi.is_relative());
    }

    #[test]
    fn outline_collects_definitions() {
        let outline = parse_module(SAMPLE).unwrap();
        assert_eq!(outline.classes, vec!["Config"]);
        assert_eq!(outline.functions, vec!["load", "build_factory", "run"]);
        assert_eq!(outline.decorators, 1);
        assert_eq!(outline.line_count, SAMPLE.lines().count());
    }

    #[test]
    fn strings_do_not_produce_imports() {
        let outline = parse_module("x = 'import os'\ny = \"from a import b\"\n").unwrap();
        assert!(outline.imports.is_empty());
    }

    #[test]
    fn semicolon_separated_statements() {
        let outline = parse_module("import a; import b\n").unwrap();
        assert_eq!(outline.imports.len(), 2);
    }

    #[test]
    fn imports_after_a_header_colon_are_found() {
        let source = "try: import ujson as json\n\
                      except ImportError: import json\n\
                      if TYPE_CHECKING: from pkg.types import T\n\
                      def f(x: int) -> None: import re\n\
                      if (n := 3): pass\n";
        let outline = parse_module(source).unwrap();
        let names: Vec<String> = outline.imports.iter().map(ImportStatement::import_name).collect();
        assert_eq!(names, vec!["ujson", "json", "pkg.types", "re"]);
        assert_eq!(outline.imports[2].names, vec!["T"]);
        assert_eq!(outline.imports[2].line, 3);
        assert_eq!(outline.functions, vec!["f"]);
    }

    #[test]
    fn backslash_continuation_joins_lines() {
        let outline = parse_module("from pkg import \\\n    thing\n").unwrap();
        assert_eq!(outline.imports[0].names, vec!["thing"]);
    }

    #[test]
    fn unterminated_triple_quote_is_an_error() {
        let err = parse_module("x = 1\ns = \"\"\"never closed\n").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedString { line: 2 });
    }

    #[test]
    fn unbalanced_brackets_are_errors() {
        assert_eq!(
            parse_module("f(1, 2\n").unwrap_err(),
            ParseError::Unclosed { line: 1, open: '(' }
        );
        assert_eq!(
            parse_module("x = 1)\n").unwrap_err(),
            ParseError::UnexpectedClose { line: 1, found: ')' }
        );
    }

    #[test]
    fn malformed_import_is_an_error() {
        assert!(matches!(
            parse_module("import 3d\n"),
            Err(ParseError::MalformedImport { line: 1 })
        ));
    }

    #[test]
    fn identifiers() {
        assert!(is_dotted_identifier("a.b_c.D1"));
        assert!(!is_dotted_identifier("a..b"));
        assert!(!is_dotted_identifier("1a"));
        assert!(!is_dotted_identifier(""));
    }
}
