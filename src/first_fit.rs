//! Direct placement: scan a position lattice row by row and take the first
//! spot where the piece clears everything already on the sheet.
//!
//! No free-space bookkeeping and no cut plan; the lattice step is the kerf
//! width (at least one length unit).

use crate::pieces::{UnitPiece, sort_by_area_desc};
use crate::settings::CuttingSettings;
use crate::types::{CutPiece, CuttingResult, EPSILON, Material, Rect};

#[derive(Debug, Clone, Copy)]
pub struct FirstFitPlacer {
    pub margin: f64,
    pub kerf: f64,
    pub allow_rotation: bool,
}

impl FirstFitPlacer {
    pub fn new(settings: &CuttingSettings) -> Self {
        Self {
            margin: settings.margin,
            kerf: settings.kerf_width,
            allow_rotation: settings.allow_rotation,
        }
    }

    pub fn layout(&self, sheet: &Material, pieces: &[UnitPiece]) -> CuttingResult {
        let mut ordered = pieces.to_vec();
        sort_by_area_desc(&mut ordered);

        let mut cuts: Vec<CutPiece> = Vec::new();
        for piece in &ordered {
            for orientation in piece.orientations(self.allow_rotation) {
                if let Some((x, y)) = self.find_position(sheet, orientation.rect, &cuts) {
                    cuts.push(CutPiece {
                        id: format!("cut_{}", piece.id),
                        piece_id: piece.id.clone(),
                        item_id: piece.item_id.clone(),
                        item_index: piece.item_index,
                        x,
                        y,
                        width: orientation.rect.w,
                        height: orientation.rect.h,
                        rotated: orientation.rotated,
                    });
                    break;
                }
            }
        }

        CuttingResult::new(sheet, cuts, Vec::new(), None)
    }

    fn find_position(&self, sheet: &Material, rect: Rect, placed: &[CutPiece]) -> Option<(f64, f64)> {
        let step = self.kerf.max(1.0);
        let max_x = sheet.width - self.margin - rect.w;
        let max_y = sheet.height - self.margin - rect.h;
        let lattice = |i: u64| self.margin + i as f64 * step;

        let mut row = 0u64;
        while lattice(row) <= max_y + EPSILON {
            let y = lattice(row);
            let mut col = 0u64;
            while lattice(col) <= max_x + EPSILON {
                let x = lattice(col);
                match placed.iter().find(|p| self.overlaps(x, y, rect, p)) {
                    None => return Some((x, y)),
                    Some(p) => {
                        // Every lattice point left of the blocker's far edge
                        // still overlaps it.
                        let edge = p.x + p.width + self.kerf;
                        let skip = ((edge - self.margin) / step - EPSILON).ceil().max(0.0) as u64;
                        col = skip.max(col + 1);
                    }
                }
            }
            row += 1;
        }
        None
    }

    fn overlaps(&self, x: f64, y: f64, rect: Rect, p: &CutPiece) -> bool {
        let k = self.kerf;
        x < p.x + p.width + k - EPSILON
            && p.x < x + rect.w + k - EPSILON
            && y < p.y + p.height + k - EPSILON
            && p.y < y + rect.h + k - EPSILON
    }
}
