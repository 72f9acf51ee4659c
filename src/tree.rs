//! Binary split history of one sheet.
//!
//! Nodes live in a flat arena with index links; index 0 is the root and spans
//! the whole sheet. Every guillotine cut turns a leaf into an internal node
//! with two children, so the leaves always tile the sheet: pieces (with their
//! trailing kerf strip and any trim margin they border) and waste regions.

use serde::{Deserialize, Serialize};

use crate::types::{CutDirection, Rect};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    /// Still available for placement. Only seen while a sheet is being built.
    Free,
    Waste,
    #[serde(rename_all = "camelCase")]
    Piece { piece_id: String },
    #[serde(rename_all = "camelCase")]
    Cut {
        direction: CutDirection,
        position: f64,
        step_id: String,
        /// Left part of a vertical cut, top part of a horizontal one.
        first: usize,
        second: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingTreeNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub rect: Rect,
    pub kind: NodeKind,
}

impl CuttingTreeNode {
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Cut { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingTree {
    pub nodes: Vec<CuttingTreeNode>,
}

impl CuttingTree {
    pub fn new(sheet: Rect) -> Self {
        Self {
            nodes: vec![CuttingTreeNode {
                id: "root".to_string(),
                x: 0.0,
                y: 0.0,
                rect: sheet,
                kind: NodeKind::Free,
            }],
        }
    }

    pub fn root(&self) -> &CuttingTreeNode {
        &self.nodes[0]
    }

    pub fn children(&self, index: usize) -> Option<(usize, usize)> {
        match self.nodes.get(index)?.kind {
            NodeKind::Cut { first, second, .. } => Some((first, second)),
            _ => None,
        }
    }

    pub fn leaves(&self) -> impl Iterator<Item = &CuttingTreeNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// Divides leaf `index` with a full-span cut at `position`.
    pub fn split(
        &mut self,
        index: usize,
        direction: CutDirection,
        position: f64,
        step_id: &str,
    ) -> (usize, usize) {
        let parent = &self.nodes[index];
        let (x, y, rect) = (parent.x, parent.y, parent.rect);
        let (a, b) = match direction {
            CutDirection::Vertical => {
                let left = position - x;
                (
                    (x, y, Rect::new(left, rect.h)),
                    (position, y, Rect::new(rect.w - left, rect.h)),
                )
            }
            CutDirection::Horizontal => {
                let top = position - y;
                (
                    (x, y, Rect::new(rect.w, top)),
                    (x, position, Rect::new(rect.w, rect.h - top)),
                )
            }
        };
        let first = self.push(a);
        let second = self.push(b);
        self.nodes[index].kind = NodeKind::Cut {
            direction,
            position,
            step_id: step_id.to_string(),
            first,
            second,
        };
        (first, second)
    }

    pub fn mark_piece(&mut self, index: usize, piece_id: &str) {
        self.nodes[index].kind = NodeKind::Piece {
            piece_id: piece_id.to_string(),
        };
    }

    /// Turns every still-free leaf into waste once placement is over.
    pub fn finish(&mut self) {
        for node in &mut self.nodes {
            if node.kind == NodeKind::Free {
                node.kind = NodeKind::Waste;
            }
        }
    }

    fn push(&mut self, (x, y, rect): (f64, f64, Rect)) -> usize {
        let index = self.nodes.len();
        self.nodes.push(CuttingTreeNode {
            id: format!("node_{index}"),
            x,
            y,
            rect,
            kind: NodeKind::Free,
        });
        index
    }
}
