use crate::events::{PlanEvent, PlanObserver};
use crate::first_fit::FirstFitPlacer;
use crate::genetic::GeneticOptimizer;
use crate::guillotine::GuillotinePlacer;
use crate::ids::IdSource;
use crate::pieces::{UnitPiece, expand_remaining};
use crate::settings::MaterialOrientation;
use crate::types::{CuttingItem, CuttingResult, Material, RunSummary, StopReason};

/// Hard cap on sheets for one run.
pub const MAX_SHEETS: usize = 100;

/// Lays out as many of `pieces` as fit on one sheet.
pub trait SheetLayout {
    fn layout(&mut self, sheet: &Material, pieces: &[UnitPiece]) -> CuttingResult;
}

impl SheetLayout for GuillotinePlacer {
    fn layout(&mut self, sheet: &Material, pieces: &[UnitPiece]) -> CuttingResult {
        GuillotinePlacer::layout(self, sheet, pieces)
    }
}

impl SheetLayout for FirstFitPlacer {
    fn layout(&mut self, sheet: &Material, pieces: &[UnitPiece]) -> CuttingResult {
        FirstFitPlacer::layout(self, sheet, pieces)
    }
}

impl SheetLayout for GeneticOptimizer {
    fn layout(&mut self, sheet: &Material, pieces: &[UnitPiece]) -> CuttingResult {
        GeneticOptimizer::layout(self, sheet, pieces)
    }
}

/// Opens sheets of one material until every requested piece is placed.
pub struct SheetAllocator<'a> {
    material: &'a Material,
    orientation: MaterialOrientation,
    max_sheets: usize,
}

impl<'a> SheetAllocator<'a> {
    pub fn new(material: &'a Material, orientation: MaterialOrientation) -> Self {
        Self {
            material,
            orientation,
            max_sheets: MAX_SHEETS,
        }
    }

    pub fn with_max_sheets(mut self, max_sheets: usize) -> Self {
        self.max_sheets = max_sheets;
        self
    }

    /// Runs the sheet loop. Stalls and the sheet cap end the loop early; the
    /// sheets laid out so far are returned and the summary on the first one
    /// records why.
    pub fn allocate(
        &self,
        items: &[CuttingItem],
        strategy: &mut dyn SheetLayout,
        ids: &mut dyn IdSource,
        observer: &dyn PlanObserver,
    ) -> Vec<CuttingResult> {
        let mut remaining: Vec<u32> = items.iter().map(|item| item.quantity).collect();
        let mut sheets: Vec<CuttingResult> = Vec::new();

        let stop_reason = loop {
            let left: u32 = remaining.iter().sum();
            if left == 0 {
                break StopReason::Completed;
            }
            if sheets.len() >= self.max_sheets {
                tracing::error!(
                    cap = self.max_sheets,
                    pieces_remaining = left,
                    "sheet cap reached, stopping allocation"
                );
                observer.on_event(&PlanEvent::SheetCapReached {
                    cap: self.max_sheets,
                    pieces_remaining: left,
                });
                break StopReason::SheetCapReached;
            }

            let sheet_number = sheets.len() + 1;
            let sheet = self.material.sheet(sheet_number).oriented(self.orientation);
            let pieces = expand_remaining(items, &remaining);
            let mut result = strategy.layout(&sheet, &pieces);

            if result.cuts.is_empty() {
                tracing::warn!(
                    sheet_number,
                    pieces_remaining = left,
                    "no remaining piece fits on a fresh sheet"
                );
                observer.on_event(&PlanEvent::Stalled {
                    sheet_number,
                    pieces_remaining: left,
                });
                break StopReason::Stalled;
            }

            for cut in &mut result.cuts {
                cut.id = ids.next_id("cut");
                remaining[cut.item_index] = remaining[cut.item_index].saturating_sub(1);
            }

            tracing::info!(
                sheet_number,
                pieces = result.cuts.len(),
                waste = result.waste_percentage,
                "sheet laid out"
            );
            observer.on_event(&PlanEvent::SheetPlaced {
                sheet_number,
                pieces_placed: result.cuts.len(),
                waste_percentage: result.waste_percentage,
            });
            sheets.push(result);
        };

        attach_summary(&mut sheets, items, stop_reason);
        sheets
    }
}

fn attach_summary(sheets: &mut [CuttingResult], items: &[CuttingItem], stop_reason: StopReason) {
    let total_utilized_area: f64 = sheets.iter().map(|s| s.utilized_area).sum();
    let total_waste_area: f64 = sheets.iter().map(|s| s.total_waste_area).sum();
    let total_material_area = total_utilized_area + total_waste_area;
    let summary = RunSummary {
        total_materials_used: sheets.len(),
        total_utilized_area,
        total_waste_area,
        total_material_area,
        overall_waste_percentage: if total_material_area > 0.0 {
            total_waste_area / total_material_area * 100.0
        } else {
            0.0
        },
        total_items_placed: sheets.iter().map(|s| s.cuts.len() as u32).sum(),
        total_items_requested: items.iter().map(|item| item.quantity).sum(),
        stop_reason,
    };
    if let Some(first) = sheets.first_mut() {
        first.summary = Some(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopObserver;
    use crate::ids::SequentialIds;
    use crate::test_support::assert_layout_valid;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn guillotine() -> GuillotinePlacer {
        GuillotinePlacer {
            margin: 0.0,
            kerf: 0.0,
            allow_rotation: false,
        }
    }

    fn run(material: &Material, items: &[CuttingItem], max_sheets: usize) -> Vec<CuttingResult> {
        SheetAllocator::new(material, MaterialOrientation::None)
            .with_max_sheets(max_sheets)
            .allocate(items, &mut guillotine(), &mut SequentialIds::new(), &NoopObserver)
    }

    #[test]
    fn test_needs_several_sheets() {
        let material = Material::new("ply", "Ply", 100.0, 100.0);
        let items = vec![CuttingItem::new("a", 60.0, 60.0, 4)];
        let sheets = run(&material, &items, MAX_SHEETS);
        // A 60x60 leaves no room for a second one.
        assert_eq!(sheets.len(), 4);
        let ids: Vec<&str> = sheets.iter().map(|s| s.material_id.as_str()).collect();
        assert_eq!(ids, ["ply_sheet_1", "ply_sheet_2", "ply_sheet_3", "ply_sheet_4"]);
        let summary = sheets[0].summary.as_ref().unwrap();
        assert_eq!(summary.total_materials_used, 4);
        assert_eq!(summary.total_items_placed, 4);
        assert_eq!(summary.stop_reason, StopReason::Completed);
        assert!(sheets[1..].iter().all(|s| s.summary.is_none()));
        // Caller's items untouched.
        assert_eq!(items[0].quantity, 4);
    }

    #[test]
    fn test_piece_identities_unique_across_sheets() {
        let material = Material::new("m", "M", 100.0, 100.0);
        let items = vec![
            CuttingItem::new("a", 50.0, 50.0, 7),
            CuttingItem::new("b", 30.0, 20.0, 5),
        ];
        let sheets = run(&material, &items, MAX_SHEETS);
        let cuts: Vec<_> = sheets.iter().flat_map(|s| &s.cuts).collect();
        assert_eq!(cuts.len(), 12);
        let piece_ids: HashSet<&str> = cuts.iter().map(|c| c.piece_id.as_str()).collect();
        assert_eq!(piece_ids.len(), 12);
        let cut_ids: HashSet<&str> = cuts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(cut_ids.len(), 12);
        assert_eq!(cuts.iter().filter(|c| c.item_id == "a").count(), 7);
        for s in &sheets {
            assert_layout_valid(s, 0.0, 0.0);
        }
    }

    #[test]
    fn test_sheet_cap_returns_partial() {
        let material = Material::new("m", "M", 100.0, 100.0);
        let items = vec![CuttingItem::new("a", 100.0, 100.0, 5)];
        let sheets = run(&material, &items, 3);
        assert_eq!(sheets.len(), 3);
        let summary = sheets[0].summary.as_ref().unwrap();
        assert_eq!(summary.stop_reason, StopReason::SheetCapReached);
        assert_eq!(summary.total_items_placed, 3);
        assert_eq!(summary.total_items_requested, 5);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_stall_returns_partial() {
        let material = Material::new("m", "M", 100.0, 100.0);
        let items = vec![
            CuttingItem::new("ok", 40.0, 40.0, 1),
            CuttingItem::new("huge", 200.0, 200.0, 1),
        ];
        let stalled = Mutex::new(Vec::new());
        let observer = |e: &PlanEvent| {
            if let PlanEvent::Stalled { sheet_number, pieces_remaining } = e {
                stalled.lock().unwrap().push((*sheet_number, *pieces_remaining));
            }
        };
        let sheets = SheetAllocator::new(&material, MaterialOrientation::None).allocate(
            &items,
            &mut guillotine(),
            &mut SequentialIds::new(),
            &observer,
        );
        assert_eq!(sheets.len(), 1);
        assert_eq!(*stalled.lock().unwrap(), vec![(2, 1)]);
        let summary = sheets[0].summary.as_ref().unwrap();
        assert_eq!(summary.stop_reason, StopReason::Stalled);
        assert_eq!(summary.total_items_placed, 1);
        assert_eq!(summary.total_items_requested, 2);
    }

    #[test]
    fn test_orientation_applied_per_sheet() {
        let material = Material::new("m", "M", 50.0, 200.0);
        let items = vec![CuttingItem::new("a", 40.0, 180.0, 1)];
        let sheets = SheetAllocator::new(&material, MaterialOrientation::Horizontal).allocate(
            &items,
            &mut guillotine(),
            &mut SequentialIds::new(),
            &NoopObserver,
        );
        assert_eq!(sheets[0].actual_material.width, 200.0);
        assert_eq!(sheets[0].actual_material.height, 50.0);
        assert_eq!(sheets[0].cuts.len(), 1);
    }

    #[test]
    fn test_summary_area_totals() {
        let material = Material::new("m", "M", 100.0, 100.0);
        let items = vec![CuttingItem::new("a", 50.0, 100.0, 3)];
        let sheets = run(&material, &items, MAX_SHEETS);
        let summary = sheets[0].summary.as_ref().unwrap();
        assert_eq!(summary.total_material_area, 10_000.0 * sheets.len() as f64);
        assert!((summary.total_utilized_area - 15_000.0).abs() < 1e-9);
        assert!(
            (summary.overall_waste_percentage
                - summary.total_waste_area / summary.total_material_area * 100.0)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_empty_items_yield_no_sheets() {
        let material = Material::new("m", "M", 100.0, 100.0);
        assert!(run(&material, &[], MAX_SHEETS).is_empty());
    }
}
