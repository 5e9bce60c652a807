//! Creativity calibration — maps a 1–5 level to a sampling temperature and a
//! writing directive for the Developer prompt.
//!
//! The directive bounds how far the Developer may depart from the candidate's
//! original wording. Every level stays under `TRUTHFULNESS_INSTRUCTION`.

use serde::Serialize;
use tracing::warn;

use crate::llm_client::DEFAULT_TEMPERATURE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CreativityLevel {
    Conservative,
    Moderate,
    #[default]
    Balanced,
    Creative,
    Bold,
}

impl CreativityLevel {
    /// Out-of-range levels fall back to `Balanced`.
    pub fn from_level(level: Option<u8>) -> Self {
        match level {
            None => CreativityLevel::default(),
            Some(1) => CreativityLevel::Conservative,
            Some(2) => CreativityLevel::Moderate,
            Some(3) => CreativityLevel::Balanced,
            Some(4) => CreativityLevel::Creative,
            Some(5) => CreativityLevel::Bold,
            Some(other) => {
                warn!("Creativity level {other} is out of range 1-5; using Balanced");
                CreativityLevel::default()
            }
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            CreativityLevel::Conservative => 0.3,
            CreativityLevel::Moderate => 0.5,
            CreativityLevel::Balanced => DEFAULT_TEMPERATURE,
            CreativityLevel::Creative => 0.8,
            CreativityLevel::Bold => 0.9,
        }
    }

    pub fn directive(self) -> &'static str {
        match self {
            CreativityLevel::Conservative => "\
CONSERVATIVE MODE:
- Select and reorder existing experience points that match the job
- Keep the original wording wherever possible
- Drop irrelevant items rather than rewriting them",
            CreativityLevel::Moderate => "\
MODERATE MODE:
- Reorder content so relevant experience comes first
- Lightly reword bullets to mirror the job's terminology
- Keep the substance of every original point intact",
            CreativityLevel::Balanced => "\
BALANCED MODE:
- Tailor each bullet to the job requirements
- Connect each achievement to a need named in the analysis
- Quantify achievements where the experience provides numbers",
            CreativityLevel::Creative => "\
CREATIVE MODE:
- Substantially rewrite bullets for maximum relevance
- Surface transferable skills the experience implies
- Use strong action verbs and tight, impactful phrasing",
            CreativityLevel::Bold => "\
BOLD MODE:
- Adapt every section aggressively to the target role
- Articulate skills that are clearly implied by the experience
- Build a narrative that positions the candidate for this exact job",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_map_in_order() {
        let levels: Vec<_> = (1..=5).map(|l| CreativityLevel::from_level(Some(l))).collect();
        assert_eq!(
            levels,
            vec![
                CreativityLevel::Conservative,
                CreativityLevel::Moderate,
                CreativityLevel::Balanced,
                CreativityLevel::Creative,
                CreativityLevel::Bold,
            ]
        );
    }

    #[test]
    fn test_temperature_rises_with_level() {
        let temps: Vec<f32> = (1..=5)
            .map(|l| CreativityLevel::from_level(Some(l)).temperature())
            .collect();
        assert!(temps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_missing_or_invalid_level_is_balanced() {
        assert_eq!(CreativityLevel::from_level(None), CreativityLevel::Balanced);
        assert_eq!(CreativityLevel::from_level(Some(0)), CreativityLevel::Balanced);
        assert_eq!(CreativityLevel::from_level(Some(9)), CreativityLevel::Balanced);
    }

    #[test]
    fn test_directive_names_its_mode() {
        assert!(CreativityLevel::Bold.directive().starts_with("BOLD MODE"));
        assert!(CreativityLevel::Conservative
            .directive()
            .starts_with("CONSERVATIVE MODE"));
    }
}
