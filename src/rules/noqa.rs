//! Per-line suppression. A trailing `# noqa` silences every diagnostic on
//! its line; `# noqa: RP001, RP007` silences only the listed codes. The
//! configured extra marker is a plain substring test against the line.

use crate::analyze::report::Rule;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use ruff_python_ast::token::{TokenKind, Tokens};
use ruff_source_file::LineIndex;
use ruff_text_size::Ranged;
use std::collections::{HashMap, HashSet};

static NOQA_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#\s*noqa(?::\s*(?P<codes>[A-Za-z0-9, \t]+))?").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    All,
    Codes(Vec<String>),
}

#[derive(Debug, Default)]
pub struct NoqaIndex {
    directives: HashMap<usize, Directive>,
    marker_lines: HashSet<usize>,
}

impl NoqaIndex {
    pub fn build(
        tokens: &Tokens,
        source: &str,
        lines: &LineIndex,
        extra_marker: Option<&str>,
    ) -> Self {
        let mut index = NoqaIndex::default();
        for token in tokens {
            if token.kind() != TokenKind::Comment {
                continue;
            }
            let text = &source[token.range()];
            let Some(captures) = NOQA_DIRECTIVE.captures(text) else {
                continue;
            };
            let line = lines.line_index(token.range().start()).get();
            let directive = match captures.name("codes") {
                Some(codes) => Directive::Codes(
                    codes
                        .as_str()
                        .split(',')
                        .map(|code| code.trim().to_ascii_uppercase())
                        .filter(|code| !code.is_empty())
                        .collect(),
                ),
                None => Directive::All,
            };
            // a blanket directive wins over a code list on the same line
            match index.directives.get(&line) {
                Some(Directive::All) => {}
                _ => {
                    index.directives.insert(line, directive);
                }
            }
        }
        if let Some(marker) = extra_marker {
            index.marker_lines = source
                .lines()
                .positions(|line| line.contains(marker))
                .map(|i| i + 1)
                .collect();
        }
        index
    }

    pub fn is_suppressed(&self, line: usize, rule: Rule) -> bool {
        if self.marker_lines.contains(&line) {
            return true;
        }
        match self.directives.get(&line) {
            None => false,
            Some(Directive::All) => true,
            Some(Directive::Codes(codes)) => codes
                .iter()
                .any(|code| code.eq_ignore_ascii_case(rule.code())),
        }
    }
}
