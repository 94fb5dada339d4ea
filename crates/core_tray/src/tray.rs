//! Dock/undock state machine.
//!
//! [`Tray`] is the single context object the event loop drives: it owns the
//! display capability, the handshake result and the icon registry. Every
//! registry change is followed by a full relayout.

use crate::display::{DisplayError, DisplayServer, EventInterest};
use crate::handshake::{claim_tray, TrayHandles};
use crate::layout::{compute_placements, IconPlacement};
use crate::registry::IconRegistry;
use crate::{TrayError, TrayGeometry, TrayOptions, WindowId, SYSTEM_TRAY_REQUEST_DOCK};
use tracing::{debug, info, warn};

/// Running tray manager state.
pub struct Tray<D: DisplayServer> {
    display: D,
    handles: TrayHandles,
    geometry: TrayGeometry,
    registry: IconRegistry,
}

impl<D: DisplayServer> Tray<D> {
    /// Perform the handshake and return a tray with no icons.
    pub fn start(mut display: D, options: &TrayOptions) -> Result<Self, TrayError> {
        let handles = claim_tray(&mut display, options)?;
        Ok(Self {
            display,
            handles,
            geometry: options.geometry,
            registry: IconRegistry::new(),
        })
    }

    /// Windows and atoms established at startup.
    pub fn handles(&self) -> &TrayHandles {
        &self.handles
    }

    /// The host window icons are embedded in.
    pub fn host_window(&self) -> WindowId {
        self.handles.host
    }

    /// Currently docked icons in layout order.
    pub fn icons(&self) -> Vec<WindowId> {
        self.registry.iter().collect()
    }

    /// The icon registry.
    pub fn registry(&self) -> &IconRegistry {
        &self.registry
    }

    /// The display capability.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// The display capability, mutably.
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Handle a `_NET_SYSTEM_TRAY_OPCODE` message payload.
    ///
    /// Only `SYSTEM_TRAY_REQUEST_DOCK` is understood; other opcodes are ignored.
    pub fn handle_opcode(&mut self, data: [u32; 5]) -> Result<(), DisplayError> {
        match data[1] {
            SYSTEM_TRAY_REQUEST_DOCK => self.dock(data[2]),
            opcode => {
                debug!("Ignoring tray opcode {}", opcode);
                Ok(())
            }
        }
    }

    /// Embed `window` into the host window and relayout.
    ///
    /// A window that is already docked is embedded again but keeps its slot.
    /// If the window is gone before it could be re-parented, it is not
    /// registered.
    pub fn dock(&mut self, window: WindowId) -> Result<(), DisplayError> {
        if let Err(e) = self.embed(window) {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("Failed to dock icon window 0x{:x}: {}", window, e);
            return Ok(());
        }

        if self.registry.insert(window) {
            info!("Icon window 0x{:x} docked into system tray", window);
        } else {
            debug!("Icon window 0x{:x} re-docked, keeping its slot", window);
        }

        self.relayout()?;
        Ok(())
    }

    fn embed(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.display
            .reparent_window(window, self.handles.host, 0, 0)?;
        self.display.map_window(window)?;
        // Needed to learn about the icon's destruction
        self.display.select_input(window, EventInterest::STRUCTURE)?;
        Ok(())
    }

    /// Forget a destroyed icon window and relayout.
    ///
    /// Unknown windows are ignored; destroy notifications for windows that
    /// were never docked are normal traffic.
    pub fn undock(&mut self, window: WindowId) -> Result<(), DisplayError> {
        if !self.registry.remove(window) {
            return Ok(());
        }

        self.relayout()?;
        info!("Icon window 0x{:x} removed from system tray", window);
        Ok(())
    }

    /// Recompute every icon position and move the icons there.
    ///
    /// Geometry query failures fall back to the icon slot size. Move failures
    /// are logged and skipped.
    pub fn relayout(&mut self) -> Result<Vec<IconPlacement>, DisplayError> {
        let display = &mut self.display;
        let mut fatal = None;

        let placements = compute_placements(self.registry.iter(), &self.geometry, |window| {
            match display.window_size(window) {
                Ok(size) => Some(size),
                Err(e) => {
                    warn!("Get icon window 0x{:x} size failed: {}", window, e);
                    if e.is_fatal() {
                        fatal = Some(e);
                    }
                    None
                }
            }
        });
        if let Some(e) = fatal {
            return Err(e);
        }

        for placement in &placements {
            if let Err(e) =
                display.move_window(placement.window, placement.rect.x, placement.rect.y)
            {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Failed to move icon window 0x{:x}: {}", placement.window, e);
                continue;
            }
            debug!(
                "Icon window 0x{:x} at ({}, {}) size {}x{}",
                placement.window,
                placement.rect.x,
                placement.rect.y,
                placement.rect.width,
                placement.rect.height
            );
        }

        display.flush()?;
        Ok(placements)
    }

    /// Repaint the host window background.
    pub fn redraw(&mut self) -> Result<(), DisplayError> {
        self.display.clear_window(self.handles.host)?;
        self.display.flush()
    }

    /// Release everything the tray holds on the display server.
    ///
    /// Docked icons are unmapped and handed back to the root window, the selection is
    /// released if we still own it, and both tray windows are destroyed.
    /// Every step is best-effort.
    pub fn shutdown(mut self) -> D {
        let root = self.handles.root;
        let icons: Vec<WindowId> = self.registry.iter().collect();
        for window in icons {
            // Hidden first, or the icon shows up as a stray top-level window
            if let Err(e) = self.display.unmap_window(window) {
                warn!("Failed to unmap icon window 0x{:x}: {}", window, e);
            }
            if let Err(e) = self.display.reparent_window(window, root, 0, 0) {
                warn!("Failed to release icon window 0x{:x}: {}", window, e);
            }
            self.registry.remove(window);
        }

        match self.display.selection_owner(self.handles.atoms.selection) {
            Ok(Some(owner)) if owner == self.handles.selection_owner => {
                if let Err(e) = self
                    .display
                    .set_selection_owner(self.handles.atoms.selection, None)
                {
                    warn!("Failed to release tray selection: {}", e);
                }
            }
            Ok(_) => debug!("Tray selection no longer ours, not releasing it"),
            Err(e) => warn!("Failed to query tray selection owner: {}", e),
        }

        for window in [self.handles.selection_owner, self.handles.host] {
            if let Err(e) = self.display.destroy_window(window) {
                warn!("Failed to destroy window 0x{:x}: {}", window, e);
            }
        }

        if let Err(e) = self.display.flush() {
            warn!("Failed to flush display during shutdown: {}", e);
        }
        info!("System tray released");

        self.display
    }
}
