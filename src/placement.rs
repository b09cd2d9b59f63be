//! Placement geometry for logo overlays.
//!
//! A single closed-form function maps a named anchor plus an edge margin to
//! the top-left pixel of the logo on the canvas. The result is intentionally
//! unclamped: a margin or scale that pushes the logo past the canvas edge
//! yields out-of-bounds coordinates, and the paste step clips them.

/// Named position at which the logo's top-left corner is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Bottom-right corner, inset by the margin.
    BottomRight,
    /// Bottom-left corner, inset by the margin.
    BottomLeft,
    /// Top-right corner, inset by the margin.
    TopRight,
    /// Top-left corner, inset by the margin.
    TopLeft,
    /// Centered on the canvas; the margin is ignored.
    Center,
}

/// Compute the top-left insertion point for a logo on a canvas.
///
/// Corner anchors inset the logo by `margin` pixels from the two nearest
/// edges; `Center` uses floor division and ignores the margin. Coordinates
/// may be negative or exceed the canvas when the logo plus margin does not
/// fit. This function never fails and never clamps.
#[must_use]
pub fn compute_position(
    canvas_w: u32,
    canvas_h: u32,
    logo_w: u32,
    logo_h: u32,
    anchor: Anchor,
    margin: u32,
) -> (i64, i64) {
    let cw = i64::from(canvas_w);
    let ch = i64::from(canvas_h);
    let lw = i64::from(logo_w);
    let lh = i64::from(logo_h);
    let m = i64::from(margin);

    match anchor {
        Anchor::BottomRight => (cw - lw - m, ch - lh - m),
        Anchor::BottomLeft => (m, ch - lh - m),
        Anchor::TopRight => (cw - lw - m, m),
        Anchor::TopLeft => (m, m),
        Anchor::Center => ((cw - lw).div_euclid(2), (ch - lh).div_euclid(2)),
    }
}
