//! Structural Preservation Validator — rejects gross drift from the sample template.
//!
//! Only two things are checked: the `\documentclass` name, and the presence of
//! both document markers. Packages, custom-command usage and section layout are
//! expected to change as content is adapted, so they are not compared.

use crate::pipeline::template_parser::{document_class, DOCUMENT_END, DOCUMENT_START};

/// Compares `candidate` against the original `template`. Empty list = pass.
pub fn validate_structure(candidate: &str, template: &str) -> Vec<String> {
    let mut violations = Vec::new();

    match (document_class(template), document_class(candidate)) {
        (Some(expected), Some(actual)) if expected != actual => violations.push(format!(
            "Document class mismatch: expected '{expected}', got '{actual}'"
        )),
        (Some(expected), None) => violations.push(format!(
            "Missing \\documentclass declaration: expected '{expected}'"
        )),
        _ => {}
    }

    if !candidate.contains(DOCUMENT_START) {
        violations.push(format!("Missing {DOCUMENT_START}"));
    }
    if !candidate.contains(DOCUMENT_END) {
        violations.push(format!("Missing {DOCUMENT_END}"));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r"\documentclass[11pt]{article}\begin{document}X\end{document}";

    #[test]
    fn test_matching_structure_passes() {
        let candidate = "\\documentclass[11pt]{article}\\begin{document}\n\nY\n\n\\end{document}";
        assert!(validate_structure(candidate, TEMPLATE).is_empty());
    }

    #[test]
    fn test_class_options_are_not_compared() {
        let candidate = r"\documentclass[a4paper,10pt]{article}\begin{document}Y\end{document}";
        assert!(validate_structure(candidate, TEMPLATE).is_empty());
    }

    #[test]
    fn test_class_mismatch_is_reported() {
        let candidate = r"\documentclass{moderncv}\begin{document}Y\end{document}";
        let violations = validate_structure(candidate, TEMPLATE);
        assert_eq!(
            violations,
            vec!["Document class mismatch: expected 'article', got 'moderncv'".to_string()]
        );
    }

    #[test]
    fn test_missing_class_is_reported() {
        let violations = validate_structure(r"\begin{document}Y\end{document}", TEMPLATE);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("Missing \\documentclass"));
    }

    #[test]
    fn test_missing_boundaries_are_reported_separately() {
        let violations = validate_structure(r"\documentclass{article} body only", TEMPLATE);
        assert_eq!(
            violations,
            vec![
                r"Missing \begin{document}".to_string(),
                r"Missing \end{document}".to_string(),
            ]
        );
    }

    #[test]
    fn test_template_without_class_skips_class_check() {
        let template = r"\begin{document}X\end{document}";
        let candidate = r"\documentclass{letter}\begin{document}Y\end{document}";
        assert!(validate_structure(candidate, template).is_empty());
    }

    #[test]
    fn test_packages_and_sections_may_drift() {
        let candidate = "\\documentclass{article}\\usepackage{xcolor}\\begin{document}\\section{New}\\end{document}";
        assert!(validate_structure(candidate, TEMPLATE).is_empty());
    }
}
