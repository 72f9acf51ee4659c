use crate::pieces::{Orientation, UnitPiece, sort_by_area_desc};
use crate::settings::CuttingSettings;
use crate::tree::CuttingTree;
use crate::types::{
    CutDirection, CutPiece, CuttingResult, CuttingStep, EPSILON, Material, Point, Rect,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeRect {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub rect: Rect,
    /// Cutting-tree leaf covering this region.
    node: usize,
}

impl FreeRect {
    /// True when `self` lies entirely inside `other` (all four edges).
    pub fn is_contained_in(&self, other: &FreeRect) -> bool {
        self.x + EPSILON >= other.x
            && self.y + EPSILON >= other.y
            && self.x + self.rect.w <= other.x + other.rect.w + EPSILON
            && self.y + self.rect.h <= other.y + other.rect.h + EPSILON
    }
}

/// Empty regions of one sheet, kept in insertion order so that the first-found
/// tie-break of [`GuillotineSheet::find_best`] is stable.
#[derive(Debug, Clone, Default)]
pub struct FreeRectPool {
    rects: Vec<FreeRect>,
    next_id: usize,
}

impl FreeRectPool {
    pub fn as_slice(&self) -> &[FreeRect] {
        &self.rects
    }

    fn add(&mut self, x: f64, y: f64, rect: Rect, node: usize) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.rects.push(FreeRect {
            id,
            x,
            y,
            rect,
            node,
        });
        id
    }

    fn remove(&mut self, idx: usize) -> FreeRect {
        self.rects.remove(idx)
    }

    /// Drops degenerate rectangles, then any rectangle contained in another,
    /// until a pass removes nothing.
    pub fn cleanup(&mut self) {
        self.rects
            .retain(|f| f.rect.w > EPSILON && f.rect.h > EPSILON);

        loop {
            let contained = (0..self.rects.len()).rev().find(|&i| {
                (0..self.rects.len())
                    .any(|j| i != j && self.rects[i].is_contained_in(&self.rects[j]))
            });
            match contained {
                Some(i) => {
                    self.rects.remove(i);
                }
                None => break,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredPlacement {
    pub free_idx: usize,
    pub orientation: Orientation,
    /// Negated leftover area of the free rectangle; higher is better.
    pub score: f64,
}

/// One sheet under construction.
#[derive(Debug, Clone)]
pub struct GuillotineSheet {
    sheet: Material,
    kerf: f64,
    pool: FreeRectPool,
    tree: CuttingTree,
    pub placements: Vec<CutPiece>,
    steps: Vec<CuttingStep>,
}

impl GuillotineSheet {
    /// `sheet` must already be orientation-adjusted.
    pub fn new(sheet: &Material, margin: f64, kerf: f64) -> Self {
        let mut pool = FreeRectPool::default();
        let usable = sheet.usable_rect(margin);
        if usable.w > EPSILON && usable.h > EPSILON {
            pool.add(margin, margin, usable, 0);
        }
        Self {
            sheet: sheet.clone(),
            kerf,
            pool,
            tree: CuttingTree::new(sheet.rect()),
            placements: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn free_rects(&self) -> &[FreeRect] {
        self.pool.as_slice()
    }

    pub fn steps(&self) -> &[CuttingStep] {
        &self.steps
    }

    /// Least-waste fit over every free rectangle and candidate orientation.
    /// Rectangles are the outer loop, orientations the inner one; the first
    /// candidate found wins ties.
    pub fn find_best(&self, candidates: &[Orientation]) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;

        for (idx, free) in self.pool.as_slice().iter().enumerate() {
            for &orientation in candidates {
                let footprint = orientation.rect.inflated(self.kerf);
                if !footprint.fits_in(&free.rect) {
                    continue;
                }
                let score = -(free.rect.area() - footprint.area());
                if best.is_none_or(|b| score > b.score) {
                    best = Some(ScoredPlacement {
                        free_idx: idx,
                        orientation,
                        score,
                    });
                }
            }
        }

        best
    }

    pub fn place(&mut self, scored: ScoredPlacement, piece: &UnitPiece) -> &CutPiece {
        let free = self.pool.remove(scored.free_idx);
        let placed = scored.orientation.rect;

        self.split(free, placed, &piece.id);
        self.placements.push(CutPiece {
            id: format!("cut_{}", piece.id),
            piece_id: piece.id.clone(),
            item_id: piece.item_id.clone(),
            item_index: piece.item_index,
            x: free.x,
            y: free.y,
            width: placed.w,
            height: placed.h,
            rotated: scored.orientation.rotated,
        });
        self.pool.cleanup();

        &self.placements[self.placements.len() - 1]
    }

    /// Places `piece` in the best of `candidates`; `false` when nothing fits.
    pub fn try_place(&mut self, piece: &UnitPiece, candidates: &[Orientation]) -> bool {
        match self.find_best(candidates) {
            Some(scored) => {
                self.place(scored, piece);
                true
            }
            None => false,
        }
    }

    /// Guillotine split of `free` around a piece at its origin. The direction
    /// leaving the larger remainder gets the through cut spanning the whole
    /// rectangle; the second cut only runs alongside the piece.
    fn split(&mut self, free: FreeRect, placed: Rect, piece_id: &str) {
        let used = placed.inflated(self.kerf);
        let right_w = free.rect.w - used.w;
        let bottom_h = free.rect.h - used.h;
        let has_right = right_w > EPSILON;
        let has_bottom = bottom_h > EPSILON;
        let cut_x = free.x + used.w;
        let cut_y = free.y + used.h;

        let right_area = right_w * free.rect.h;
        let bottom_area = free.rect.w * bottom_h;

        let piece_node = if right_area >= bottom_area {
            // Vertical through cut, then a short horizontal one under the piece.
            let mut strip = free.node;
            if has_right {
                let step = self.add_step(
                    CutDirection::Vertical,
                    cut_x,
                    Point { x: cut_x, y: free.y },
                    Point {
                        x: cut_x,
                        y: free.y + free.rect.h,
                    },
                );
                let (left, right) = self.tree.split(free.node, CutDirection::Vertical, cut_x, &step);
                self.pool
                    .add(cut_x, free.y, Rect::new(right_w, free.rect.h), right);
                strip = left;
            }
            if has_bottom {
                let step = self.add_step(
                    CutDirection::Horizontal,
                    cut_y,
                    Point { x: free.x, y: cut_y },
                    Point { x: cut_x, y: cut_y },
                );
                let (top, bottom) = self.tree.split(strip, CutDirection::Horizontal, cut_y, &step);
                self.pool
                    .add(free.x, cut_y, Rect::new(used.w, bottom_h), bottom);
                top
            } else {
                strip
            }
        } else {
            // Horizontal through cut, then a short vertical one beside the piece.
            let mut strip = free.node;
            if has_bottom {
                let step = self.add_step(
                    CutDirection::Horizontal,
                    cut_y,
                    Point { x: free.x, y: cut_y },
                    Point {
                        x: free.x + free.rect.w,
                        y: cut_y,
                    },
                );
                let (top, bottom) =
                    self.tree.split(free.node, CutDirection::Horizontal, cut_y, &step);
                self.pool
                    .add(free.x, cut_y, Rect::new(free.rect.w, bottom_h), bottom);
                strip = top;
            }
            if has_right {
                let step = self.add_step(
                    CutDirection::Vertical,
                    cut_x,
                    Point { x: cut_x, y: free.y },
                    Point { x: cut_x, y: cut_y },
                );
                let (left, right) = self.tree.split(strip, CutDirection::Vertical, cut_x, &step);
                self.pool
                    .add(cut_x, free.y, Rect::new(right_w, used.h), right);
                left
            } else {
                strip
            }
        };

        self.tree.mark_piece(piece_node, piece_id);
    }

    fn add_step(&mut self, direction: CutDirection, position: f64, start: Point, end: Point) -> String {
        let step_number = self.steps.len() + 1;
        let id = format!("step_{step_number}");
        let description = match direction {
            CutDirection::Vertical => format!("Vertical cut at X={position}"),
            CutDirection::Horizontal => format!("Horizontal cut at Y={position}"),
        };
        self.steps.push(CuttingStep {
            id: id.clone(),
            step_number,
            direction,
            position,
            start_point: start,
            end_point: end,
            description,
        });
        id
    }

    pub fn into_result(mut self) -> CuttingResult {
        self.tree.finish();
        CuttingResult::new(&self.sheet, self.placements, self.steps, Some(self.tree))
    }
}

/// Free-rectangle guillotine placer.
#[derive(Debug, Clone, Copy)]
pub struct GuillotinePlacer {
    pub margin: f64,
    pub kerf: f64,
    pub allow_rotation: bool,
}

impl GuillotinePlacer {
    pub fn new(settings: &CuttingSettings) -> Self {
        Self {
            margin: settings.margin,
            kerf: settings.kerf_width,
            allow_rotation: settings.allow_rotation,
        }
    }

    /// Largest pieces first, each in its best orientation. Pieces that fit
    /// nowhere are skipped and left for the next sheet.
    pub fn layout(&self, sheet: &Material, pieces: &[UnitPiece]) -> CuttingResult {
        let mut ordered = pieces.to_vec();
        sort_by_area_desc(&mut ordered);

        let mut bin = GuillotineSheet::new(sheet, self.margin, self.kerf);
        for piece in &ordered {
            bin.try_place(piece, &piece.orientations(self.allow_rotation));
        }
        bin.into_result()
    }

    /// Places `genes` exactly in the given order, each in its chosen
    /// orientation. A piece whose chosen orientation fits nowhere falls back
    /// to the other one when its policy lets it turn.
    pub fn layout_ordered(&self, sheet: &Material, genes: &[(&UnitPiece, bool)]) -> CuttingResult {
        let mut bin = GuillotineSheet::new(sheet, self.margin, self.kerf);
        for &(piece, rotated) in genes {
            if !bin.try_place(piece, &[piece.orientation(rotated)])
                && piece.can_flip(self.allow_rotation)
            {
                bin.try_place(piece, &[piece.orientation(!rotated)]);
            }
        }
        bin.into_result()
    }
}
