use serde::{Deserialize, Serialize};

use crate::settings::MaterialOrientation;
use crate::tree::CuttingTree;

/// Tolerance used for every fit and containment comparison on `f64` lengths.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w + EPSILON && self.h <= other.h + EPSILON
    }

    pub fn is_square(&self) -> bool {
        (self.w - self.h).abs() <= EPSILON
    }

    /// Grows both sides by `by`, the footprint a piece occupies once the blade
    /// has passed along its trailing edges.
    pub fn inflated(&self, by: f64) -> Self {
        Self {
            w: self.w + by,
            h: self.h + by,
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Stock sheet template. The allocator clones it once per sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub name: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub thickness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
}

impl Material {
    pub fn new(id: impl Into<String>, name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            width,
            height,
            thickness: 0.0,
            material_type: None,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Area left for pieces once `margin` is trimmed from every edge.
    pub fn usable_rect(&self, margin: f64) -> Rect {
        Rect::new(self.width - 2.0 * margin, self.height - 2.0 * margin)
    }

    /// Clone used as the `number`-th physical sheet of this material.
    pub fn sheet(&self, number: usize) -> Material {
        Material {
            id: format!("{}_sheet_{}", self.id, number),
            name: format!("{} - sheet {}", self.name, number),
            ..self.clone()
        }
    }

    /// Swaps width and height when the sheet's natural dimensions violate the
    /// requested orientation.
    pub fn oriented(&self, orientation: MaterialOrientation) -> Material {
        let swap = match orientation {
            MaterialOrientation::Horizontal => self.height > self.width,
            MaterialOrientation::Vertical => self.width > self.height,
            MaterialOrientation::None => false,
        };
        if swap {
            Material {
                width: self.height,
                height: self.width,
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationPolicy {
    /// The algorithm decides, subject to the global rotation flag.
    #[default]
    #[serde(alias = "any")]
    Auto,
    /// Always `width x length`.
    FixedDefault,
    /// Always `length x width`.
    FixedRotate,
}

impl std::str::FromStr for RotationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" | "any" => Ok(RotationPolicy::Auto),
            "fixed-default" => Ok(RotationPolicy::FixedDefault),
            "fixed-rotate" => Ok(RotationPolicy::FixedRotate),
            _ => Err(format!(
                "invalid rotation policy '{}', expected: auto, fixed-default, or fixed-rotate",
                s
            )),
        }
    }
}

/// A requested piece type. `width` runs along the sheet's x axis and `length`
/// along its y axis when unrotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuttingItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub length: f64,
    pub width: f64,
    pub quantity: u32,
    #[serde(default, alias = "rotatation")]
    pub rotation: RotationPolicy,
}

impl CuttingItem {
    pub fn new(id: impl Into<String>, length: f64, width: f64, quantity: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            length,
            width,
            quantity,
            rotation: RotationPolicy::Auto,
        }
    }

    pub fn with_rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed item")
    }

    /// Unrotated footprint.
    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.length)
    }
}

/// One placed piece on a sheet, in sheet coordinates (origin at the sheet
/// corner, so the first piece sits at `(margin, margin)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutPiece {
    pub id: String,
    /// Identity of the unit piece this cut realises.
    pub piece_id: String,
    pub item_id: String,
    pub item_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotated: bool,
}

impl CutPiece {
    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutDirection {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for CutDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutDirection::Horizontal => write!(f, "horizontal"),
            CutDirection::Vertical => write!(f, "vertical"),
        }
    }
}

/// One guillotine cut line, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuttingStep {
    pub id: String,
    pub step_number: usize,
    pub direction: CutDirection,
    /// x for vertical cuts, y for horizontal ones.
    pub position: f64,
    pub start_point: Point,
    pub end_point: Point,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Completed,
    /// A fresh sheet accepted none of the remaining pieces.
    Stalled,
    /// The hard sheet cap was hit before everything was placed.
    SheetCapReached,
}

/// Run-level totals, attached to the first sheet's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_materials_used: usize,
    pub total_utilized_area: f64,
    pub total_waste_area: f64,
    pub total_material_area: f64,
    pub overall_waste_percentage: f64,
    pub total_items_placed: u32,
    pub total_items_requested: u32,
    pub stop_reason: StopReason,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.total_items_placed == self.total_items_requested
    }
}

/// Layout of one physical sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuttingResult {
    pub material_id: String,
    pub cuts: Vec<CutPiece>,
    pub waste_percentage: f64,
    pub total_waste_area: f64,
    pub utilized_area: f64,
    /// Sheet as actually used, after any orientation swap.
    pub actual_material: Material,
    pub cutting_steps: Vec<CuttingStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutting_tree: Option<CuttingTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

impl CuttingResult {
    /// Builds a result for `sheet`, deriving the area metrics from `cuts`.
    pub fn new(
        sheet: &Material,
        cuts: Vec<CutPiece>,
        cutting_steps: Vec<CuttingStep>,
        cutting_tree: Option<CuttingTree>,
    ) -> Self {
        let sheet_area = sheet.area();
        let utilized_area: f64 = cuts.iter().map(CutPiece::area).sum();
        let total_waste_area = sheet_area - utilized_area;
        let waste_percentage = if sheet_area > 0.0 {
            total_waste_area / sheet_area * 100.0
        } else {
            0.0
        };
        Self {
            material_id: sheet.id.clone(),
            cuts,
            waste_percentage,
            total_waste_area,
            utilized_area,
            actual_material: sheet.clone(),
            cutting_steps,
            cutting_tree,
            summary: None,
        }
    }

    /// Fraction of the sheet covered by pieces, in `0.0..=1.0`.
    pub fn utilization(&self) -> f64 {
        (100.0 - self.waste_percentage) / 100.0
    }
}
