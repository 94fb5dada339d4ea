//! xtray Core
//!
//! Platform-agnostic implementation of the freedesktop system tray protocol.
//!
//! This crate holds the protocol state and the logic around it:
//! - The icon registry (which foreign windows are embedded, in which order)
//! - The layout engine (where each icon sits inside the host window)
//! - The protocol handshake (claiming the `_NET_SYSTEM_TRAY_S<N>` selection)
//! - The dock/undock state machine and the event dispatch loop
//!
//! The display server itself is abstracted behind [`DisplayServer`], so the
//! whole lifecycle can be driven by a fake display in tests.

pub mod display;
pub mod event_loop;
pub mod handshake;
pub mod layout;
pub mod registry;
pub mod tray;

#[cfg(test)]
mod testing;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use display::{Atom, ClientMessage, DisplayError, DisplayEvent, DisplayServer, EventInterest};
pub use event_loop::{EventSource, LoopExit, StopHandle};
pub use handshake::{TrayAtoms, TrayHandles};
pub use layout::IconPlacement;
pub use registry::IconRegistry;
pub use tray::Tray;

/// Identifier of a window owned by the display server.
/// On X11 this is the XID.
pub type WindowId = u32;

/// Opcode of a `_NET_SYSTEM_TRAY_OPCODE` message asking the tray to embed a window.
pub const SYSTEM_TRAY_REQUEST_DOCK: u32 = 0;

/// Name of the per-screen opcode message type.
pub const NET_SYSTEM_TRAY_OPCODE: &str = "_NET_SYSTEM_TRAY_OPCODE";

/// Name of the manager broadcast message type.
pub const MANAGER: &str = "MANAGER";

/// Screen whose tray selection is claimed.
pub const DEFAULT_SCREEN: usize = 0;

/// Timestamp value meaning "now" to the display server.
pub const CURRENT_TIME: u32 = 0;

/// Name of the tray selection for a screen (`_NET_SYSTEM_TRAY_S<N>`).
pub fn tray_selection_name(screen: usize) -> String {
    format!("_NET_SYSTEM_TRAY_S{}", screen)
}

/// Errors that can occur while running the tray.
#[derive(Debug, Error)]
pub enum TrayError {
    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error("Tray selection {selection} is already owned by window 0x{owner:x}")]
    SelectionOwned { selection: String, owner: WindowId },

    #[error("Tray selection {0} has no owner after claiming it")]
    SelectionNotAcquired(String),
}

/// A rectangle in window coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }
}

/// Width and height of a window as reported by the display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// A square of the given side length.
    pub fn square(side: i32) -> Self {
        Self::new(side, side)
    }
}

/// Fixed geometry of the host window and its icon slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrayGeometry {
    /// Host window origin, x.
    pub x: i32,
    /// Host window origin, y.
    pub y: i32,
    /// Host window width.
    pub width: i32,
    /// Host window height. Icons are centered vertically in this band.
    pub height: i32,
    /// Host window border width.
    pub border_width: u16,
    /// Icon slot size, also the fallback size when a geometry query fails.
    pub icon_size: i32,
    /// Horizontal gap between two icons.
    pub icon_padding: i32,
    /// Distance from the host's left edge to the first icon.
    pub left_margin: i32,
}

impl Default for TrayGeometry {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 400,
            height: 40,
            border_width: 1,
            icon_size: 32,
            icon_padding: 4,
            left_margin: 10,
        }
    }
}

impl TrayGeometry {
    /// Rectangle of the host window on the root window.
    pub fn host_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Size substituted for icons whose geometry cannot be queried.
    pub fn fallback_icon_size(&self) -> Size {
        Size::square(self.icon_size)
    }
}

/// Everything the tray needs to know at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct TrayOptions {
    /// Host window geometry.
    pub geometry: TrayGeometry,
    /// Title stored on the host window.
    pub title: String,
    /// Screen index used to build the selection name.
    pub screen: usize,
}

impl Default for TrayOptions {
    fn default() -> Self {
        Self {
            geometry: TrayGeometry::default(),
            title: "X11 System Tray".to_string(),
            screen: DEFAULT_SCREEN,
        }
    }
}
