//! Decomposition-worthiness scoring.

use crate::domain::models::Task;
use crate::domain::ports::ComplexityScorer;

const BASE_SCORE: f64 = 0.5;
const SCOPE_BONUS: f64 = 0.3;
const REQUIREMENTS_WEIGHT: f64 = 0.2;
const REQUIREMENTS_SATURATION: usize = 3;

/// Scopes that mark a task as broad enough to be worth splitting.
const BROAD_SCOPES: [&str; 3] = ["large", "complex", "distributed"];

/// Default scorer: base 0.5, +0.3 for a broad `scope` attribute, and up to
/// +0.2 for requirements (saturating at three).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicComplexityAnalyzer;

impl HeuristicComplexityAnalyzer {
    pub const fn new() -> Self {
        Self
    }
}

impl ComplexityScorer for HeuristicComplexityAnalyzer {
    fn score(&self, task: &Task) -> f64 {
        let mut score = BASE_SCORE;

        let broad = task
            .attribute_str("scope")
            .is_some_and(|scope| BROAD_SCOPES.contains(&scope.to_lowercase().as_str()));
        if broad {
            score += SCOPE_BONUS;
        }

        let counted = task.requirements.len().min(REQUIREMENTS_SATURATION);
        #[allow(clippy::cast_precision_loss)]
        let ratio = counted as f64 / REQUIREMENTS_SATURATION as f64;
        score += REQUIREMENTS_WEIGHT * ratio;

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(task: &Task) -> f64 {
        HeuristicComplexityAnalyzer::new().score(task)
    }

    #[test]
    fn test_base_score() {
        let task = Task::new("plain", "implementation");
        assert!((score(&task) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_broad_scope_bonus() {
        for scope in ["large", "Complex", "DISTRIBUTED"] {
            let task = Task::new("t", "k").with_attribute("scope", scope);
            assert!((score(&task) - 0.8).abs() < 1e-9, "scope {scope}");
        }
        let small = Task::new("t", "k").with_attribute("scope", "small");
        assert!((score(&small) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_requirements_saturate_at_three() {
        let three = Task::new("t", "k").with_requirements(["a", "b", "c"]);
        let six = Task::new("t", "k").with_requirements(["a", "b", "c", "d", "e", "f"]);
        assert!((score(&three) - 0.7).abs() < 1e-9);
        assert!((score(&six) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_full_score_is_clamped() {
        let task = Task::new("t", "orchestrate")
            .with_attribute("scope", "large")
            .with_requirements(["a", "b", "c", "d"]);
        assert!((score(&task) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_more_requirements_never_lowers_score() {
        let mut previous = 0.0;
        for n in 0..8 {
            let reqs: Vec<String> = (0..n).map(|i| format!("r{i}")).collect();
            let current = score(&Task::new("t", "k").with_requirements(reqs));
            assert!(current >= previous);
            previous = current;
        }
    }
}
