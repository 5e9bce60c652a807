//! Syntax Validator — cheap structural checks on a candidate LaTeX document.
//!
//! # Checks (all run on every pass, never short-circuited)
//! 1. Brace balance: total `{` count equals total `}` count.
//! 2. Environment pairing: every `\begin{X}` is closed by `\end{X}` with
//!    well-formed nesting.
//! 3. Formatting artifacts: no markdown code fences left in the text.
//!
//! Returns human-readable violation strings; an empty list means the text passed.
//! The messages are fed back to the Developer verbatim, so they name the
//! offending marker and its line.

use std::sync::LazyLock;

use regex::Regex;

static ENVIRONMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(begin|end)\s*\{([^}]*)\}").unwrap());

const CODE_FENCE: &str = "```";

/// Runs every syntax check against `text`.
pub fn validate_syntax(text: &str) -> Vec<String> {
    let mut violations = Vec::new();
    violations.extend(check_brace_balance(text));
    violations.extend(check_environment_pairing(text));
    violations.extend(check_formatting_artifacts(text));
    violations
}

fn check_brace_balance(text: &str) -> Option<String> {
    let open = text.matches('{').count();
    let close = text.matches('}').count();

    (open != close).then(|| {
        format!("Mismatched braces: found {open} open '{{' and {close} close '}}'")
    })
}

struct OpenEnvironment<'a> {
    name: &'a str,
    line: usize,
}

fn check_environment_pairing(text: &str) -> Vec<String> {
    let mut violations = Vec::new();
    let mut stack: Vec<OpenEnvironment<'_>> = Vec::new();
    let mut lines = LineCounter::default();

    for caps in ENVIRONMENT_RE.captures_iter(text) {
        let (Some(whole), Some(kind), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let name = name.as_str().trim();
        let line = lines.line_at(text, whole.start());

        if kind.as_str() == "begin" {
            stack.push(OpenEnvironment { name, line });
            continue;
        }

        match stack.iter().rposition(|open| open.name == name) {
            Some(position) => {
                // Anything opened after the matching begin was left unclosed.
                for inner in stack.drain(position + 1..).rev() {
                    violations.push(format!(
                        "Unmatched \\begin{{{}}} (line {}): missing \\end{{{}}} before \\end{{{name}}} (line {line})",
                        inner.name, inner.line, inner.name
                    ));
                }
                stack.pop();
            }
            None => violations.push(format!(
                "Unmatched \\end{{{name}}} (line {line}): no open \\begin{{{name}}}"
            )),
        }
    }

    violations.extend(stack.into_iter().map(|open| {
        format!(
            "Unmatched \\begin{{{}}} (line {}): missing \\end{{{}}}",
            open.name, open.line, open.name
        )
    }));

    violations
}

fn check_formatting_artifacts(text: &str) -> Option<String> {
    let fences = text.matches(CODE_FENCE).count();
    (fences > 0).then(|| {
        format!(
            "Markdown code fence (```) found {fences} time(s) in output; emit raw LaTeX only"
        )
    })
}

/// 1-based line numbers for offsets visited in ascending order; each byte is
/// scanned once across all calls.
#[derive(Default)]
struct LineCounter {
    offset: usize,
    newlines: usize,
}

impl LineCounter {
    fn line_at(&mut self, text: &str, offset: usize) -> usize {
        self.newlines += text[self.offset..offset].matches('\n').count();
        self.offset = offset;
        self.newlines + 1
    }
}
