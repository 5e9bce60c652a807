// Shared prompt fragments.
// Each pipeline stage defines its own templates in pipeline/prompts.rs;
// this file holds the instructions several stages have in common.

/// Keeps the model from inventing employers, titles, dates or metrics.
pub const TRUTHFULNESS_INSTRUCTION: &str = "\
    CRITICAL: Use ONLY facts present in the candidate's experience. \
    Do NOT invent employers, titles, dates, degrees, or metrics. \
    Reframing and re-emphasis are allowed; fabrication is not.";

/// Enforces raw LaTeX output with no wrapping prose or markdown.
pub const RAW_LATEX_ONLY: &str = "\
    Output ONLY raw LaTeX. \
    Do NOT wrap the output in markdown code fences (```latex or ```). \
    Do NOT include any introduction, explanation, or closing remarks.";

/// Plain-text analysis output; downstream stages read it as context only.
pub const PLAIN_TEXT_ONLY: &str = "\
    Respond in plain text using the exact section headings requested. \
    Do NOT use markdown code fences. Be concise and actionable.";
