use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::allocator::{SheetAllocator, SheetLayout};
use crate::error::{PlanError, Result};
use crate::events::{NoopObserver, PlanObserver};
use crate::first_fit::FirstFitPlacer;
use crate::genetic::GeneticOptimizer;
use crate::guillotine::GuillotinePlacer;
use crate::ids::{IdSource, SequentialIds};
use crate::pieces::orientations;
use crate::settings::{CuttingSettings, OptimizationStrategy};
use crate::types::{CuttingItem, CuttingResult, Material};

/// Strategy suggested when the requested one has no implementation.
const SUGGESTED_STRATEGY: OptimizationStrategy = OptimizationStrategy::Guillotine;

pub struct Planner {
    settings: CuttingSettings,
    ids: Box<dyn IdSource>,
    observer: Arc<dyn PlanObserver>,
}

impl Planner {
    pub fn new(settings: CuttingSettings) -> Self {
        Self {
            settings,
            ids: Box::new(SequentialIds::new()),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_id_source(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_observer(mut self, observer: impl PlanObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn settings(&self) -> &CuttingSettings {
        &self.settings
    }

    /// Plans sheets of `selected` until every item quantity is cut.
    ///
    /// `materials` and `items` are only read. Fatal input problems are
    /// returned as errors before any placement; a stall or the sheet cap
    /// yields the sheets laid out so far, with the first sheet's summary
    /// recording the shortfall.
    pub fn plan(
        &mut self,
        materials: &[Material],
        items: &[CuttingItem],
        selected: Option<&Material>,
    ) -> Result<Vec<CuttingResult>> {
        if materials.is_empty() || items.is_empty() {
            return Ok(Vec::new());
        }
        let selected = selected.ok_or(PlanError::NoMaterialSelected)?;

        self.settings.validate()?;
        self.validate(materials, selected, items)?;

        let strategy = self.settings.optimization_strategy;
        tracing::info!(
            %strategy,
            material = %selected.id,
            items = items.len(),
            pieces = items.iter().map(|i| i.quantity).sum::<u32>(),
            "planning layout"
        );

        let mut layout = self.strategy(strategy)?;
        let allocator = SheetAllocator::new(selected, self.settings.material_orientation);
        let sheets =
            allocator.allocate(items, layout.as_mut(), self.ids.as_mut(), self.observer.as_ref());
        if sheets.is_empty() {
            return Err(PlanError::Validation(format!(
                "no item fits on the selected material \"{}\"",
                selected.name
            )));
        }
        Ok(sheets)
    }

    fn strategy(&self, strategy: OptimizationStrategy) -> Result<Box<dyn SheetLayout>> {
        let guillotine = GuillotinePlacer::new(&self.settings);
        match strategy {
            OptimizationStrategy::Guillotine => Ok(Box::new(guillotine)),
            OptimizationStrategy::FirstFit => Ok(Box::new(FirstFitPlacer::new(&self.settings))),
            OptimizationStrategy::Genetic => Ok(Box::new(
                GeneticOptimizer::new(guillotine, self.settings.genetic.clone(), self.settings.seed)
                    .with_observer(self.observer.clone()),
            )),
            OptimizationStrategy::BestFit | OptimizationStrategy::BottomLeft => {
                Err(PlanError::StrategyNotImplemented {
                    strategy: strategy.name().to_string(),
                    suggestion: SUGGESTED_STRATEGY.name().to_string(),
                })
            }
        }
    }

    /// Extra room a lone piece needs on an empty sheet. Guillotine layouts
    /// reserve the kerf strip behind every piece; the lattice scan does not.
    fn fit_clearance(&self) -> f64 {
        match self.settings.optimization_strategy {
            OptimizationStrategy::FirstFit => 0.0,
            _ => self.settings.kerf_width,
        }
    }

    fn validate(&self, materials: &[Material], selected: &Material, items: &[CuttingItem]) -> Result<()> {
        for material in materials.iter().chain(std::iter::once(selected)) {
            if !(material.width > 0.0 && material.height > 0.0) {
                return Err(PlanError::Validation(format!(
                    "invalid material dimensions: {}",
                    material.name
                )));
            }
        }

        for item in items {
            if !(item.width > 0.0 && item.length > 0.0) || item.quantity == 0 {
                return Err(PlanError::Validation(format!(
                    "invalid cutting item dimensions or quantity: {}",
                    item.label()
                )));
            }
        }

        let clearance = self.fit_clearance();
        for item in items {
            let candidates = orientations(item.rect(), item.rotation, self.settings.allow_rotation);
            let fits_somewhere = materials.iter().chain(std::iter::once(selected)).any(|m| {
                let usable = m
                    .oriented(self.settings.material_orientation)
                    .usable_rect(self.settings.margin);
                candidates
                    .iter()
                    .any(|o| o.rect.inflated(clearance).fits_in(&usable))
            });
            if !fits_somewhere {
                return Err(PlanError::Validation(format!(
                    "item \"{}\" is too large to fit in any available material",
                    item.label()
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyReport {
    pub materials_used: usize,
    pub total_waste: f64,
    pub waste_percentage: f64,
    pub items_placed: usize,
    pub recommendations: Vec<String>,
}

/// Totals over all sheets plus rule-of-thumb advice.
pub fn efficiency_report(results: &[CuttingResult]) -> EfficiencyReport {
    if results.is_empty() {
        return EfficiencyReport {
            materials_used: 0,
            total_waste: 0.0,
            waste_percentage: 0.0,
            items_placed: 0,
            recommendations: vec!["No cutting results to analyze".to_string()],
        };
    }

    let sheets_used = results.len();
    let total_waste: f64 = results.iter().map(|r| r.total_waste_area).sum();
    let total_area: f64 = results
        .iter()
        .map(|r| r.utilized_area + r.total_waste_area)
        .sum();
    let waste_percentage = if total_area > 0.0 {
        total_waste / total_area * 100.0
    } else {
        0.0
    };
    let items_placed: usize = results.iter().map(|r| r.cuts.len()).sum();

    let mut recommendations = Vec::new();
    if let Some(summary) = results[0].summary.as_ref().filter(|s| !s.is_complete()) {
        recommendations.push(format!(
            "Only {} of {} pieces could be placed; check for oversized items",
            summary.total_items_placed, summary.total_items_requested
        ));
    }
    if waste_percentage > 30.0 {
        recommendations
            .push("High waste rate; consider adjusting piece sizes or a larger sheet size".to_string());
    }
    if sheets_used > 5 {
        recommendations.push("Many sheets used; consider a larger material size".to_string());
    }
    if waste_percentage < 10.0 {
        recommendations.push("Excellent material utilization!".to_string());
    }
    if sheets_used == 1 {
        recommendations.push("All items fit on a single sheet. Very efficient!".to_string());
    }

    EfficiencyReport {
        materials_used: sheets_used,
        total_waste,
        waste_percentage,
        items_placed,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MaterialOrientation;
    use crate::test_support::assert_layout_valid;
    use crate::types::{RotationPolicy, StopReason};

    fn ply() -> Material {
        Material::new("ply", "Plywood 18", 2440.0, 1220.0)
    }

    fn settings(strategy: OptimizationStrategy) -> CuttingSettings {
        CuttingSettings::default().with_strategy(strategy)
    }

    #[test]
    fn test_empty_inputs_return_nothing() {
        let mut planner = Planner::new(CuttingSettings::default());
        assert_eq!(planner.plan(&[], &[CuttingItem::new("a", 1.0, 1.0, 1)], None), Ok(vec![]));
        assert_eq!(planner.plan(&[ply()], &[], None), Ok(vec![]));
    }

    #[test]
    fn test_requires_selected_material() {
        let mut planner = Planner::new(CuttingSettings::default());
        let err = planner
            .plan(&[ply()], &[CuttingItem::new("a", 100.0, 100.0, 1)], None)
            .unwrap_err();
        assert_eq!(err, PlanError::NoMaterialSelected);
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        let mut planner = Planner::new(CuttingSettings::default());
        let bad_item = CuttingItem::new("a", 0.0, 100.0, 1);
        let err = planner.plan(&[ply()], &[bad_item], Some(&ply())).unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));

        let zero_qty = CuttingItem::new("a", 10.0, 100.0, 0);
        let err = planner.plan(&[ply()], &[zero_qty], Some(&ply())).unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));

        let bad_material = Material::new("x", "Broken", -5.0, 100.0);
        let err = planner
            .plan(&[bad_material], &[CuttingItem::new("a", 10.0, 10.0, 1)], Some(&ply()))
            .unwrap_err();
        assert!(matches!(err, PlanError::Validation(m) if m.contains("Broken")));
    }

    #[test]
    fn test_rotation_makes_item_fit() {
        // 1300 along x only fits once turned.
        let item = CuttingItem::new("long", 500.0, 1300.0, 1);
        let mut planner = Planner::new(CuttingSettings {
            allow_rotation: false,
            material_orientation: MaterialOrientation::Vertical,
            ..CuttingSettings::default()
        });
        assert!(matches!(
            planner.plan(&[ply()], &[item.clone()], Some(&ply())),
            Err(PlanError::Validation(_))
        ));

        let mut planner = Planner::new(CuttingSettings {
            material_orientation: MaterialOrientation::Vertical,
            ..CuttingSettings::default()
        });
        let results = planner.plan(&[ply()], &[item], Some(&ply())).unwrap();
        assert_eq!(results[0].cuts.len(), 1);
        assert!(results[0].cuts[0].rotated);
    }

    #[test]
    fn test_fit_check_counts_kerf_for_guillotine_layouts() {
        // Fills the usable area exactly, leaving no room for the kerf strip.
        let item = CuttingItem::new("full", 1210.0, 2430.0, 1);
        for strategy in [OptimizationStrategy::Guillotine, OptimizationStrategy::Genetic] {
            let mut planner = Planner::new(settings(strategy));
            let err = planner.plan(&[ply()], &[item.clone()], Some(&ply())).unwrap_err();
            assert!(
                matches!(err, PlanError::Validation(ref m) if m.contains("too large")),
                "{strategy}: {err}"
            );
        }

        let mut planner = Planner::new(settings(OptimizationStrategy::FirstFit));
        let results = planner.plan(&[ply()], &[item], Some(&ply())).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].cuts.len(), 1);
        let summary = results[0].summary.as_ref().unwrap();
        assert_eq!(summary.stop_reason, StopReason::Completed);
    }

    #[test]
    fn test_item_fitting_with_kerf_is_placed() {
        let item = CuttingItem::new("snug", 1207.0, 2427.0, 1);
        let mut planner = Planner::new(CuttingSettings::default());
        let results = planner.plan(&[ply()], &[item], Some(&ply())).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].cuts.len(), 1);
        assert!(results[0].summary.as_ref().unwrap().is_complete());
    }

    #[test]
    fn test_nothing_fits_selected_material() {
        let offcut = Material::new("off", "Offcut", 400.0, 300.0);
        let item = CuttingItem::new("panel", 600.0, 500.0, 2);
        let mut planner = Planner::new(CuttingSettings::default());
        let err = planner.plan(&[ply()], &[item], Some(&offcut)).unwrap_err();
        assert!(matches!(err, PlanError::Validation(ref m) if m.contains("Offcut")), "{err}");
    }

    #[test]
    fn test_unimplemented_strategies_are_named() {
        for strategy in [OptimizationStrategy::BestFit, OptimizationStrategy::BottomLeft] {
            let mut planner = Planner::new(settings(strategy));
            let err = planner
                .plan(&[ply()], &[CuttingItem::new("a", 100.0, 100.0, 1)], Some(&ply()))
                .unwrap_err();
            assert_eq!(
                err,
                PlanError::StrategyNotImplemented {
                    strategy: strategy.name().to_string(),
                    suggestion: "guillotine".to_string(),
                }
            );
            assert!(err.to_string().contains(strategy.name()));
        }
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut planner = Planner::new(CuttingSettings {
            margin: f64::NAN,
            ..CuttingSettings::default()
        });
        let err = planner
            .plan(&[ply()], &[CuttingItem::new("a", 100.0, 100.0, 1)], Some(&ply()))
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidSettings(_)));
    }

    #[test]
    fn test_each_strategy_places_everything() {
        let items = vec![
            CuttingItem::new("door", 700.0, 400.0, 4),
            CuttingItem::new("shelf", 560.0, 300.0, 6),
            CuttingItem::new("back", 600.0, 600.0, 2).with_rotation(RotationPolicy::FixedDefault),
        ];
        for strategy in [
            OptimizationStrategy::FirstFit,
            OptimizationStrategy::Guillotine,
            OptimizationStrategy::Genetic,
        ] {
            let mut planner = Planner::new(CuttingSettings {
                seed: Some(17),
                ..settings(strategy)
            });
            let results = planner.plan(&[ply()], &items, Some(&ply())).unwrap();
            let placed: usize = results.iter().map(|r| r.cuts.len()).sum();
            assert_eq!(placed, 12, "{strategy}");
            for r in &results {
                assert_layout_valid(r, 5.0, 3.0);
            }
            let summary = results[0].summary.as_ref().unwrap();
            assert_eq!(summary.stop_reason, StopReason::Completed);
        }
    }

    #[test]
    fn test_injected_ids() {
        let mut n = 0;
        let mut planner = Planner::new(CuttingSettings::default()).with_id_source(move |_: &str| {
            n += 1;
            format!("piece-{n:03}")
        });
        let results = planner
            .plan(&[ply()], &[CuttingItem::new("a", 100.0, 100.0, 2)], Some(&ply()))
            .unwrap();
        let ids: Vec<&str> = results[0].cuts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["piece-001", "piece-002"]);
    }

    #[test]
    fn test_report_recommendations() {
        let mut planner = Planner::new(CuttingSettings::default());
        let results = planner
            .plan(&[ply()], &[CuttingItem::new("a", 600.0, 400.0, 2)], Some(&ply()))
            .unwrap();
        let report = efficiency_report(&results);
        assert_eq!(report.materials_used, 1);
        assert_eq!(report.items_placed, 2);
        assert!(report.waste_percentage > 30.0);
        assert!(report.recommendations.iter().any(|r| r.contains("single sheet")));
        assert!(report.recommendations.iter().any(|r| r.contains("High waste")));
    }

    #[test]
    fn test_report_praises_low_waste() {
        let items = vec![CuttingItem::new("full", 1220.0, 2440.0, 1)];
        let mut planner = Planner::new(CuttingSettings {
            kerf_width: 0.0,
            margin: 0.0,
            ..CuttingSettings::default()
        });
        let results = planner.plan(&[ply()], &items, Some(&ply())).unwrap();
        let report = efficiency_report(&results);
        assert_eq!(report.waste_percentage, 0.0);
        assert!(report.recommendations.iter().any(|r| r.contains("Excellent")));
    }

    #[test]
    fn test_report_empty() {
        let report = efficiency_report(&[]);
        assert_eq!(report.materials_used, 0);
        assert_eq!(report.recommendations, vec!["No cutting results to analyze"]);
    }
}
