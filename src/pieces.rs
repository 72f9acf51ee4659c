//! Orientation resolution and quantity expansion.
//!
//! Items arrive as `(dimensions, quantity)` demands; the placers work on
//! individual unit pieces, each of which remembers the item it came from.

use crate::types::{CuttingItem, Rect, RotationPolicy};

/// One way of laying a piece on the sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub rect: Rect,
    pub rotated: bool,
}

/// Candidate orientations for a piece whose unrotated footprint is `rect`.
///
/// The order is the tie-break when two orientations fit equally well, so the
/// unrotated candidate always comes first for [`RotationPolicy::Auto`].
pub fn orientations(rect: Rect, policy: RotationPolicy, allow_rotation: bool) -> Vec<Orientation> {
    let upright = Orientation {
        rect,
        rotated: false,
    };
    let turned = Orientation {
        rect: rect.rotated(),
        rotated: true,
    };
    match policy {
        RotationPolicy::FixedDefault => vec![upright],
        RotationPolicy::FixedRotate => vec![turned],
        RotationPolicy::Auto => {
            if allow_rotation && !rect.is_square() {
                vec![upright, turned]
            } else {
                vec![upright]
            }
        }
    }
}

/// A single physical piece to cut.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPiece {
    /// `{item_id}_{n}`, unique across a whole run.
    pub id: String,
    pub item_id: String,
    /// Position of the originating item in the caller's list.
    pub item_index: usize,
    /// Unrotated footprint (`width x length`).
    pub rect: Rect,
    pub rotation: RotationPolicy,
}

impl UnitPiece {
    pub fn area(&self) -> f64 {
        self.rect.area()
    }

    pub fn orientations(&self, allow_rotation: bool) -> Vec<Orientation> {
        orientations(self.rect, self.rotation, allow_rotation)
    }

    /// Whether a search may choose this piece's orientation freely.
    pub fn can_flip(&self, allow_rotation: bool) -> bool {
        self.rotation == RotationPolicy::Auto && allow_rotation && !self.rect.is_square()
    }

    /// Orientation used when rotation is decided outside the placer.
    pub fn orientation(&self, rotated: bool) -> Orientation {
        if rotated {
            Orientation {
                rect: self.rect.rotated(),
                rotated: true,
            }
        } else {
            Orientation {
                rect: self.rect,
                rotated: false,
            }
        }
    }
}

/// Expands every item into `quantity` unit pieces.
pub fn expand_items(items: &[CuttingItem]) -> Vec<UnitPiece> {
    let remaining: Vec<u32> = items.iter().map(|item| item.quantity).collect();
    expand_remaining(items, &remaining)
}

/// Expands the still-unplaced quantities of `items`. `remaining[i]` pieces of
/// `items[i]` are produced, numbered after the ones already placed so that
/// piece ids never repeat between sheets.
pub fn expand_remaining(items: &[CuttingItem], remaining: &[u32]) -> Vec<UnitPiece> {
    let mut pieces = Vec::new();
    for (index, (item, &left)) in items.iter().zip(remaining).enumerate() {
        let placed = item.quantity.saturating_sub(left);
        for n in placed..placed + left {
            pieces.push(UnitPiece {
                id: format!("{}_{}", item.id, n),
                item_id: item.id.clone(),
                item_index: index,
                rect: item.rect(),
                rotation: item.rotation,
            });
        }
    }
    pieces
}

/// Largest first; equal areas keep their input order.
pub fn sort_by_area_desc(pieces: &mut [UnitPiece]) {
    pieces.sort_by(|a, b| b.area().total_cmp(&a.area()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_orientations() {
        let o = orientations(Rect::new(40.0, 60.0), RotationPolicy::Auto, true);
        assert_eq!(o.len(), 2);
        assert!(!o[0].rotated);
        assert_eq!(o[0].rect, Rect::new(40.0, 60.0));
        assert!(o[1].rotated);
        assert_eq!(o[1].rect, Rect::new(60.0, 40.0));
    }

    #[test]
    fn test_auto_without_global_rotation() {
        let o = orientations(Rect::new(40.0, 60.0), RotationPolicy::Auto, false);
        assert_eq!(o.len(), 1);
        assert!(!o[0].rotated);
    }

    #[test]
    fn test_square_never_rotates() {
        let o = orientations(Rect::new(50.0, 50.0), RotationPolicy::Auto, true);
        assert_eq!(o.len(), 1);
    }

    #[test]
    fn test_fixed_policies() {
        let r = Rect::new(40.0, 60.0);
        let d = orientations(r, RotationPolicy::FixedDefault, true);
        assert_eq!(d, vec![Orientation { rect: r, rotated: false }]);
        let t = orientations(r, RotationPolicy::FixedRotate, false);
        assert_eq!(
            t,
            vec![Orientation {
                rect: r.rotated(),
                rotated: true
            }]
        );
    }

    #[test]
    fn test_expand_quantities() {
        let items = vec![
            CuttingItem::new("shelf", 600.0, 300.0, 3),
            CuttingItem::new("side", 800.0, 400.0, 1),
        ];
        let pieces = expand_items(&items);
        assert_eq!(pieces.len(), 4);
        let ids: Vec<&str> = pieces.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["shelf_0", "shelf_1", "shelf_2", "side_0"]);
        assert!(pieces[..3].iter().all(|p| p.item_id == "shelf" && p.item_index == 0));
        assert_eq!(pieces[3].item_index, 1);
        assert_eq!(pieces[3].rect, Rect::new(400.0, 800.0));
        // Caller's items untouched.
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn test_expand_remaining_continues_numbering() {
        let items = vec![CuttingItem::new("a_b", 10.0, 10.0, 5)];
        let pieces = expand_remaining(&items, &[2]);
        let ids: Vec<&str> = pieces.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a_b_3", "a_b_4"]);
        assert!(pieces.iter().all(|p| p.item_id == "a_b"));
    }

    #[test]
    fn test_sort_is_stable() {
        let items = vec![
            CuttingItem::new("small", 10.0, 10.0, 1),
            CuttingItem::new("wide", 20.0, 10.0, 1),
            CuttingItem::new("tall", 10.0, 20.0, 1),
        ];
        let mut pieces = expand_items(&items);
        sort_by_area_desc(&mut pieces);
        let ids: Vec<&str> = pieces.iter().map(|p| p.item_id.as_str()).collect();
        assert_eq!(ids, ["wide", "tall", "small"]);
    }
}
