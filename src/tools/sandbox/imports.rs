//! Static scan of Python import statements.
//!
//! The scan looks at `import x`, `from x import y` and literal
//! `__import__("x")` / `importlib.import_module("x")` calls and reports the
//! top-level module names. It does not evaluate code, so reflective loading
//! (computed module names, `exec` of generated source, attribute walks on
//! already-imported objects) is not detected. Treat it as a policy filter, not
//! an isolation boundary.

use crate::tools::error::ToolError;
use regex::Regex;
use std::collections::BTreeSet;

/// Compiled patterns for the import scan.
#[derive(Debug, Clone)]
pub struct ImportScanner {
    import_stmt: Regex,
    from_stmt: Regex,
    dynamic_call: Regex,
}

impl ImportScanner {
    /// Compiles the scanner's patterns.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a pattern fails to compile.
    pub fn new() -> Result<Self, ToolError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ToolError::internal(format!("invalid import pattern: {e}")))
        };

        Ok(Self {
            import_stmt: compile(r"^import\s+(.+)$")?,
            from_stmt: compile(r"^from\s+(\.*)\s*([\w.]*)\s+import\b")?,
            dynamic_call: compile(r#"(?:__import__|import_module)\s*\(\s*[rbu]?['"]([\w.]+)['"]"#)?,
        })
    }

    /// Returns the top-level modules referenced by `code`.
    #[must_use]
    pub fn referenced_modules(&self, code: &str) -> BTreeSet<String> {
        let mut modules = BTreeSet::new();
        let joined = code.replace("\\\r\n", " ").replace("\\\n", " ");

        for line in joined.lines() {
            for statement in split_statements(strip_comment(line)) {
                self.scan_statement(statement.trim(), &mut modules);
            }
        }

        for capture in self.dynamic_call.captures_iter(&joined) {
            if let Some(name) = capture.get(1) {
                insert_top_level(name.as_str(), &mut modules);
            }
        }

        modules
    }

    /// Returns the referenced modules missing from `is_allowed`, sorted.
    #[must_use]
    pub fn disallowed<F>(&self, code: &str, is_allowed: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.referenced_modules(code)
            .into_iter()
            .filter(|module| !is_allowed(module))
            .collect()
    }

    fn scan_statement(&self, statement: &str, modules: &mut BTreeSet<String>) {
        if let Some(capture) = self.import_stmt.captures(statement) {
            if let Some(names) = capture.get(1) {
                for clause in names.as_str().split(',') {
                    let name = clause
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .trim_matches(|c| c == '(' || c == ')');
                    insert_top_level(name, modules);
                }
            }
            return;
        }

        if let Some(capture) = self.from_stmt.captures(statement) {
            let relative = capture.get(1).is_some_and(|dots| !dots.as_str().is_empty());
            if !relative {
                if let Some(name) = capture.get(2) {
                    insert_top_level(name.as_str(), modules);
                }
            }
        }
    }
}

fn insert_top_level(name: &str, modules: &mut BTreeSet<String>) {
    let top = name.split('.').next().unwrap_or_default().trim();
    if !top.is_empty() {
        modules.insert(top.to_string());
    }
}

/// Cuts a line at the first `#` that is not inside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '#' => return &line[..index],
                '\'' | '"' => quote = Some(c),
                _ => {}
            },
        }
    }

    line
}

/// Splits a line on `;` and `:` outside string literals.
///
/// Splitting on `:` exposes the body of any one-line compound statement
/// (`if x: import os`, `def f(): import os`). Pieces that are not import
/// statements simply fail to match.
fn split_statements(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                ';' | ':' => {
                    statements.push(&line[start..index]);
                    start = index + 1;
                }
                '\'' | '"' => quote = Some(c),
                _ => {}
            },
        }
    }

    statements.push(&line[start..]);
    statements
}
