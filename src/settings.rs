use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Inch,
}

/// Required sheet orientation, applied once per sheet before placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialOrientation {
    /// Keep the sheet's natural dimensions.
    #[default]
    None,
    /// width >= height
    Horizontal,
    /// height >= width
    Vertical,
}

impl std::str::FromStr for MaterialOrientation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(MaterialOrientation::None),
            "horizontal" => Ok(MaterialOrientation::Horizontal),
            "vertical" => Ok(MaterialOrientation::Vertical),
            _ => Err(format!(
                "invalid orientation '{}', expected: none, horizontal, or vertical",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationStrategy {
    /// Direct placement: lattice scan, first free position wins.
    FirstFit,
    BestFit,
    BottomLeft,
    Genetic,
    #[default]
    Guillotine,
}

impl OptimizationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationStrategy::FirstFit => "first-fit",
            OptimizationStrategy::BestFit => "best-fit",
            OptimizationStrategy::BottomLeft => "bottom-left",
            OptimizationStrategy::Genetic => "genetic",
            OptimizationStrategy::Guillotine => "guillotine",
        }
    }
}

impl std::fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for OptimizationStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first-fit" => Ok(OptimizationStrategy::FirstFit),
            "best-fit" => Ok(OptimizationStrategy::BestFit),
            "bottom-left" => Ok(OptimizationStrategy::BottomLeft),
            "genetic" => Ok(OptimizationStrategy::Genetic),
            "guillotine" => Ok(OptimizationStrategy::Guillotine),
            _ => Err(format!(
                "unknown strategy '{}', expected: first-fit, guillotine, or genetic",
                s
            )),
        }
    }
}

/// Tuning knobs for the genetic optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneticParams {
    pub population_size: usize,
    pub max_generations: u32,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub elite_ratio: f64,
    /// Stop once the best waste percentage drops below this value.
    pub convergence_threshold: f64,
    pub max_stagnant_generations: u32,
    /// Wall-clock budget for one sheet's search; `None` means generations only.
    pub time_limit_ms: Option<u64>,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 100,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_ratio: 0.1,
            convergence_threshold: 0.01,
            max_stagnant_generations: 20,
            time_limit_ms: Some(10_000),
        }
    }
}

impl GeneticParams {
    /// Tiered defaults: bigger problems get larger populations and generation
    /// budgets, with lower mutation rates and convergence thresholds.
    pub fn for_piece_count(pieces: usize) -> Self {
        let base = Self::default();
        if pieces <= 30 {
            Self {
                population_size: 30,
                max_generations: 50,
                mutation_rate: 0.15,
                convergence_threshold: 1.0,
                max_stagnant_generations: 15,
                ..base
            }
        } else if pieces <= 100 {
            Self {
                population_size: 50,
                max_generations: 100,
                mutation_rate: 0.1,
                convergence_threshold: 0.5,
                max_stagnant_generations: 20,
                ..base
            }
        } else {
            Self {
                population_size: 80,
                max_generations: 150,
                mutation_rate: 0.05,
                convergence_threshold: 0.1,
                max_stagnant_generations: 30,
                ..base
            }
        }
    }

    pub fn elite_count(&self) -> usize {
        ((self.population_size as f64 * self.elite_ratio).floor() as usize).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(PlanError::InvalidSettings(
                "genetic population size must be at least 2".to_string(),
            ));
        }
        for (name, rate) in [
            ("crossover rate", self.crossover_rate),
            ("mutation rate", self.mutation_rate),
            ("elite ratio", self.elite_ratio),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PlanError::InvalidSettings(format!(
                    "genetic {name} must be within 0..=1, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CuttingSettings {
    pub unit: Unit,
    /// Saw blade width.
    pub kerf_width: f64,
    /// Trim kept clear along every sheet edge.
    pub margin: f64,
    pub allow_rotation: bool,
    pub material_orientation: MaterialOrientation,
    pub optimization_strategy: OptimizationStrategy,
    /// Overrides the piece-count tiers of [`GeneticParams::for_piece_count`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genetic: Option<GeneticParams>,
    /// Seed for the genetic search; entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for CuttingSettings {
    fn default() -> Self {
        Self {
            unit: Unit::Mm,
            kerf_width: 3.0,
            margin: 5.0,
            allow_rotation: true,
            material_orientation: MaterialOrientation::None,
            optimization_strategy: OptimizationStrategy::Guillotine,
            genetic: None,
            seed: None,
        }
    }
}

impl CuttingSettings {
    pub fn with_strategy(mut self, strategy: OptimizationStrategy) -> Self {
        self.optimization_strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.kerf_width.is_finite() || self.kerf_width < 0.0 {
            return Err(PlanError::InvalidSettings(format!(
                "kerf width must be a non-negative number, got {}",
                self.kerf_width
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(PlanError::InvalidSettings(format!(
                "margin must be a non-negative number, got {}",
                self.margin
            )));
        }
        if let Some(params) = &self.genetic {
            params.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let s: CuttingSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, CuttingSettings::default());
        assert_eq!(s.kerf_width, 3.0);
        assert_eq!(s.margin, 5.0);
    }

    #[test]
    fn test_strategy_wire_names() {
        let s: CuttingSettings =
            serde_json::from_str(r#"{"optimizationStrategy":"best-fit","kerfWidth":2}"#).unwrap();
        assert_eq!(s.optimization_strategy, OptimizationStrategy::BestFit);
        assert_eq!(s.kerf_width, 2.0);
        assert_eq!("genetic".parse(), Ok(OptimizationStrategy::Genetic));
        assert!("simulated-annealing".parse::<OptimizationStrategy>().is_err());
    }

    #[test]
    fn test_tiers_shrink_mutation_and_threshold() {
        let small = GeneticParams::for_piece_count(12);
        let medium = GeneticParams::for_piece_count(60);
        let large = GeneticParams::for_piece_count(500);
        assert!(small.population_size < medium.population_size);
        assert!(medium.population_size < large.population_size);
        assert!(small.max_generations < large.max_generations);
        assert!(small.mutation_rate > medium.mutation_rate);
        assert!(medium.convergence_threshold > large.convergence_threshold);
    }

    #[test]
    fn test_elite_count_at_least_one() {
        let p = GeneticParams {
            population_size: 4,
            elite_ratio: 0.1,
            ..GeneticParams::default()
        };
        assert_eq!(p.elite_count(), 1);
        assert_eq!(GeneticParams::default().elite_count(), 5);
    }

    #[test]
    fn test_validate_rejects_negative_kerf() {
        let s = CuttingSettings {
            kerf_width: -1.0,
            ..CuttingSettings::default()
        };
        assert!(matches!(s.validate(), Err(PlanError::InvalidSettings(_))));
    }
}
