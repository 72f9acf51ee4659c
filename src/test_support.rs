use crate::types::{CutPiece, CuttingResult};

/// Validates one sheet layout:
/// 1. Every piece lies inside the margin-inset area
/// 2. No two kerf-inflated pieces overlap
/// 3. Area bookkeeping adds up to the sheet area
pub fn assert_layout_valid(result: &CuttingResult, margin: f64, kerf: f64) {
    let sheet = &result.actual_material;
    for (i, p) in result.cuts.iter().enumerate() {
        assert!(
            p.x >= margin - 1e-9 && p.y >= margin - 1e-9,
            "piece {i} at ({}, {}) starts inside the margin",
            p.x,
            p.y
        );
        assert!(
            p.x + p.width <= sheet.width - margin + 1e-9,
            "piece {i} exceeds usable width: x={} + w={} > {}",
            p.x,
            p.width,
            sheet.width - margin
        );
        assert!(
            p.y + p.height <= sheet.height - margin + 1e-9,
            "piece {i} exceeds usable height: y={} + h={} > {}",
            p.y,
            p.height,
            sheet.height - margin
        );
    }
    assert_no_overlaps(&result.cuts, kerf);

    let total = result.utilized_area + result.total_waste_area;
    assert!((total - sheet.width * sheet.height).abs() < 1e-6);
    if total > 0.0 {
        assert!((result.waste_percentage - result.total_waste_area / total * 100.0).abs() < 1e-9);
    }
}

pub fn assert_no_overlaps(cuts: &[CutPiece], kerf: f64) {
    for i in 0..cuts.len() {
        for j in (i + 1)..cuts.len() {
            let a = &cuts[i];
            let b = &cuts[j];
            let overlaps = a.x < b.x + b.width + kerf - 1e-9
                && b.x < a.x + a.width + kerf - 1e-9
                && a.y < b.y + b.height + kerf - 1e-9
                && b.y < a.y + a.height + kerf - 1e-9;
            assert!(
                !overlaps,
                "piece {i} ({}x{} @ ({},{})) overlaps piece {j} ({}x{} @ ({},{}))",
                a.width, a.height, a.x, a.y, b.width, b.height, b.x, b.y
            );
        }
    }
}
