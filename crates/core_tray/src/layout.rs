//! Icon layout engine.
//!
//! Icons are laid out in a single row from a fixed left margin, each one
//! vertically centered in the host's height band. Every call recomputes all
//! positions from scratch.

use crate::{Rect, Size, TrayGeometry, WindowId};

/// Computed placement for one icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconPlacement {
    /// The icon window.
    pub window: WindowId,
    /// Target rectangle relative to the host window.
    pub rect: Rect,
    /// Whether the fallback size was used because the size query failed.
    pub fallback: bool,
}

/// Compute placements for `icons` in order.
///
/// `size_of` reports each icon's current size; `None` substitutes the
/// geometry's fallback icon size so the row is always complete.
pub fn compute_placements<I, F>(
    icons: I,
    geometry: &TrayGeometry,
    mut size_of: F,
) -> Vec<IconPlacement>
where
    I: IntoIterator<Item = WindowId>,
    F: FnMut(WindowId) -> Option<Size>,
{
    let mut placements = Vec::new();
    let mut cursor = geometry.left_margin;

    for window in icons {
        let (size, fallback) = match size_of(window) {
            Some(size) => (size, false),
            None => (geometry.fallback_icon_size(), true),
        };

        placements.push(IconPlacement {
            window,
            rect: Rect::new(
                cursor,
                centered_y(geometry.height, size.height),
                size.width,
                size.height,
            ),
            fallback,
        });

        cursor += size.width + geometry.icon_padding;
    }

    placements
}

/// Vertical offset that centers an item of `item_height` in a band of `band_height`.
///
/// Rounds toward zero, so items taller than the band get a negative offset.
pub fn centered_y(band_height: i32, item_height: i32) -> i32 {
    (band_height - item_height) / 2
}
