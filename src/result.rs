//! Host-facing recognition results
//!
//! The engine reports a nested structure (zones containing line records);
//! callers get one flat ordered sequence of [`LineResult`]s.

use serde::{Deserialize, Serialize};

use crate::engine::TextZone;

/// One recognized MRZ text line.
///
/// The four corners are in the engine's winding order, starting at the
/// top-left of the detected line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineResult {
    /// Engine confidence score.
    pub confidence: i32,
    /// Recognized characters.
    pub text: String,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub x3: i32,
    pub y3: i32,
    pub x4: i32,
    pub y4: i32,
}

/// Flatten the engine's nested zones into one ordered sequence of lines.
///
/// Zone order and line order within each zone are both preserved.
pub(crate) fn flatten_zones(zones: Vec<TextZone>) -> Vec<LineResult> {
    let mut results = Vec::new();
    for zone in zones {
        for line in zone.lines {
            let [(x1, y1), (x2, y2), (x3, y3), (x4, y4)] = line.corners;
            results.push(LineResult {
                confidence: line.confidence,
                text: line.text,
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
                x4,
                y4,
            });
        }
    }
    results
}
