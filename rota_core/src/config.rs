use std::time::Duration;

/// Which model the compiler builds for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Formulation {
    /// Continuous start times with big-M exclusivity. The primary model.
    #[default]
    Continuous,
    /// Boolean nurse/slot assignment with clustering bonuses.
    Discrete,
}

impl Formulation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" => Some(Formulation::Continuous),
            "discrete" => Some(Formulation::Discrete),
            _ => None,
        }
    }
}

/// Caps on the model a request may build. Pairwise constraint generation is
/// quadratic in the instance count, so oversized inputs are refused before
/// anything is allocated.
#[derive(Debug, Clone, Copy)]
pub struct ModelLimits {
    pub max_variables: usize,
    pub max_constraints: usize,
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self {
            max_variables: 50_000,
            max_constraints: 200_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveConfig {
    pub formulation: Formulation,
    /// Wall-clock budget for the solve call. `None` means unbounded, which
    /// is only sensible for offline use.
    pub deadline: Option<Duration>,
    pub limits: ModelLimits,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            formulation: Formulation::default(),
            deadline: Some(Duration::from_secs(30)),
            limits: ModelLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formulation_names() {
        assert_eq!(Formulation::parse("discrete"), Some(Formulation::Discrete));
        assert_eq!(
            Formulation::parse(" Continuous "),
            Some(Formulation::Continuous)
        );
        assert_eq!(Formulation::parse("sat"), None);
    }

    #[test]
    fn default_config_has_a_deadline() {
        assert!(SolveConfig::default().deadline.is_some());
    }
}
