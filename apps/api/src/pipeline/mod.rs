//! Resume tailoring pipeline.
//!
//! Parse template → analyze job → plan strategy → write LaTeX → validate,
//! looping back to the writer with the accumulated violations until the
//! candidate passes or the revision budget runs out.

pub mod controller;
pub mod creativity;
pub mod handlers;
pub mod prompts;
pub mod stages;
pub mod state;
pub mod structure_validator;
pub mod syntax_validator;
pub mod template_parser;

#[cfg(test)]
pub mod test_support;
