use thiserror::Error;

/// Errors reported by the simulation kernel.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LifeError {
    /// The rule string could not be compiled.
    #[error("invalid rule {rule:?}: {reason}")]
    InvalidRuleSyntax { rule: String, reason: &'static str },
    /// A tile could not be allocated even after reclaiming the morgue.
    /// The last fully computed generation is still intact.
    #[error("out of tiles ({tiles} in use) after reclaiming every morgue tile")]
    ResourceExhausted { tiles: usize },
    /// There is no cached previous generation to return to.
    #[error("cannot step back: the previous generation is not available")]
    InvalidStepBack,
}

impl LifeError {
    pub(crate) fn rule(rule: &str, reason: &'static str) -> Self {
        LifeError::InvalidRuleSyntax {
            rule: rule.to_owned(),
            reason,
        }
    }
}
