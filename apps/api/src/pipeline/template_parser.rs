//! Template Parser — splits a LaTeX template into a byte-preserved preamble,
//! a reference body, and the signatures of the custom commands it defines.
//!
//! The preamble is never shown to the Developer as something to rewrite. It is
//! reattached verbatim by [`reassemble`], so preamble correctness does not depend
//! on the model.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::PipelineError;

pub const DOCUMENT_START: &str = r"\begin{document}";
pub const DOCUMENT_END: &str = r"\end{document}";

/// `\newcommand{\name}[N][default]`, also the `renew`/`provide`/`DeclareRobust`
/// forms, starred, and without braces around the name.
static COMMAND_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\(?:newcommand|renewcommand|providecommand|DeclareRobustCommand)\*?\s*\{?\s*\\([A-Za-z@]+)\s*\}?(?:\s*\[\s*(\d)\s*\])?(\s*\[)?",
    )
    .unwrap()
});

/// TeX primitive `\def\name#1#2{...}`.
static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\def\s*\\([A-Za-z@]+)((?:\s*#\d)*)\s*\{").unwrap());

/// A reusable command defined by the template: name plus declared argument count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSignature {
    pub name: String,
    pub arg_count: u8,
    /// First argument is optional (`\newcommand{\x}[2][default]{...}`).
    pub optional_first: bool,
}

impl fmt::Display for CommandSignature {
    /// Renders as `\name{arg1}{arg2}`, or `\name[arg1]{arg2}` with an optional first argument.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\{}", self.name)?;
        for i in 1..=self.arg_count {
            if i == 1 && self.optional_first {
                write!(f, "[arg{i}]")?;
            } else {
                write!(f, "{{arg{i}}}")?;
            }
        }
        Ok(())
    }
}

/// Structural split of a sample template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    /// Everything up to and including `\begin{document}`, byte-for-byte.
    pub preamble: String,
    /// Content between the document markers, trimmed.
    pub body: String,
    pub commands: Vec<CommandSignature>,
}

/// Parses a template. Fails with `MalformedTemplate` when there is no `\begin{document}`.
///
/// A template without `\end{document}` is tolerated: the body runs to the end of
/// the text, and reassembly supplies the closing marker.
pub fn parse_template(template: &str) -> Result<ParsedTemplate, PipelineError> {
    let start = template.find(DOCUMENT_START).ok_or_else(|| {
        PipelineError::MalformedTemplate(format!(
            "template has no {DOCUMENT_START} marker; cannot locate the preamble"
        ))
    })?;

    let body_start = start + DOCUMENT_START.len();
    let preamble = &template[..body_start];
    let rest = &template[body_start..];

    let body = match rest.find(DOCUMENT_END) {
        Some(end) => &rest[..end],
        None => {
            tracing::warn!("Template has no {DOCUMENT_END}; treating the remainder as body");
            rest
        }
    };
    let body = body.trim();

    let mut commands = extract_command_signatures(preamble);
    for sig in extract_command_signatures(body) {
        merge_signature(&mut commands, sig);
    }

    Ok(ParsedTemplate {
        preamble: preamble.to_string(),
        body: body.to_string(),
        commands,
    })
}

/// Scans `text` for command definitions, in order of appearance.
/// A redefinition replaces the earlier signature but keeps its position.
pub fn extract_command_signatures(text: &str) -> Vec<CommandSignature> {
    let mut found: Vec<(usize, CommandSignature)> = Vec::new();

    for caps in COMMAND_DEF_RE.captures_iter(text) {
        let arg_count = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u8>().ok())
            .unwrap_or(0);
        found.push((
            caps.get(0).map_or(0, |m| m.start()),
            CommandSignature {
                name: caps[1].to_string(),
                arg_count,
                optional_first: arg_count > 0 && caps.get(3).is_some(),
            },
        ));
    }

    for caps in DEF_RE.captures_iter(text) {
        let arg_count = caps[2].matches('#').count() as u8;
        found.push((
            caps.get(0).map_or(0, |m| m.start()),
            CommandSignature {
                name: caps[1].to_string(),
                arg_count,
                optional_first: false,
            },
        ));
    }

    found.sort_by_key(|(offset, _)| *offset);

    let mut signatures = Vec::with_capacity(found.len());
    for (_, sig) in found {
        merge_signature(&mut signatures, sig);
    }
    signatures
}

fn merge_signature(signatures: &mut Vec<CommandSignature>, sig: CommandSignature) {
    match signatures.iter_mut().find(|s| s.name == sig.name) {
        Some(existing) => *existing = sig,
        None => signatures.push(sig),
    }
}

/// Human-readable list of the template's custom commands for the Developer prompt.
pub fn command_cheatsheet(commands: &[CommandSignature]) -> String {
    if commands.is_empty() {
        return "No custom commands found in the template.".to_string();
    }

    let mut lines = vec!["Available custom commands from the template:".to_string()];
    lines.extend(commands.iter().map(|sig| format!("  - {sig}")));
    lines.join("\n")
}

/// Joins the original preamble with a freshly generated body and closes the document.
///
/// The output always starts with `preamble` unchanged and ends with exactly one
/// `\end{document}`, whatever the body contains.
pub fn reassemble(preamble: &str, body: &str) -> String {
    format!("{preamble}\n\n{}\n\n{DOCUMENT_END}", body.trim())
}

/// Extracts the `\documentclass` name, ignoring options: `\documentclass[11pt]{article}` → `article`.
pub fn document_class(text: &str) -> Option<&str> {
    static DOCUMENT_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\\documentclass\s*(?:\[[^\]]*\])?\s*\{\s*([^}\s]+)\s*\}").unwrap()
    });

    DOCUMENT_CLASS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
