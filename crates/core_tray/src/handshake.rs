//! Tray manager handshake.
//!
//! Runs once at startup: interns the protocol atoms, creates the host and
//! selection windows, claims `_NET_SYSTEM_TRAY_S<N>` and broadcasts `MANAGER`
//! on the root window so tray icon clients can find us.

use crate::display::{Atom, ClientMessage, DisplayServer, EventInterest};
use crate::{
    tray_selection_name, Rect, TrayError, TrayOptions, WindowId, CURRENT_TIME, MANAGER,
    NET_SYSTEM_TRAY_OPCODE,
};
use tracing::{debug, info, warn};

/// Atoms of the system tray protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrayAtoms {
    /// `_NET_SYSTEM_TRAY_S<N>`
    pub selection: Atom,
    /// `_NET_SYSTEM_TRAY_OPCODE`
    pub opcode: Atom,
    /// `MANAGER`
    pub manager: Atom,
}

impl TrayAtoms {
    /// Intern the three protocol atoms for `screen`.
    pub fn intern<D: DisplayServer>(display: &mut D, screen: usize) -> Result<Self, TrayError> {
        Ok(Self {
            selection: display.intern_atom(&tray_selection_name(screen))?,
            opcode: display.intern_atom(NET_SYSTEM_TRAY_OPCODE)?,
            manager: display.intern_atom(MANAGER)?,
        })
    }
}

/// Windows and atoms established by a successful handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrayHandles {
    pub atoms: TrayAtoms,
    /// Root window of the tray's screen.
    pub root: WindowId,
    /// Visible container the icons are embedded in.
    pub host: WindowId,
    /// Invisible 1x1 window owning the tray selection.
    pub selection_owner: WindowId,
}

/// Build the `MANAGER` announcement: `{timestamp, selection, owner, 0, 0}`.
pub fn manager_message(root: WindowId, atoms: &TrayAtoms, owner: WindowId) -> ClientMessage {
    ClientMessage::new(
        root,
        atoms.manager,
        [CURRENT_TIME, atoms.selection, owner, 0, 0],
    )
}

/// Claim the tray selection and announce the tray.
///
/// Fails with [`TrayError::SelectionOwned`] if another tray manager holds the
/// selection. In that case the windows created here are destroyed again and
/// nothing has been mapped.
pub fn claim_tray<D: DisplayServer>(
    display: &mut D,
    options: &TrayOptions,
) -> Result<TrayHandles, TrayError> {
    let atoms = TrayAtoms::intern(display, options.screen)?;
    let root = display.root_window();
    let selection_name = tray_selection_name(options.screen);
    debug!(
        "Interned atoms: {}={}, {}={}, {}={}",
        selection_name, atoms.selection, NET_SYSTEM_TRAY_OPCODE, atoms.opcode, MANAGER, atoms.manager
    );

    let geometry = &options.geometry;
    let host = display.create_window(
        root,
        geometry.host_rect(),
        geometry.border_width,
        EventInterest::HOST,
    )?;
    display.set_title(host, &options.title)?;

    let selection_owner =
        display.create_window(root, Rect::new(0, 0, 1, 1), 0, EventInterest::NONE)?;

    display.set_selection_owner(atoms.selection, Some(selection_owner))?;
    let owner = display.selection_owner(atoms.selection)?;
    if owner != Some(selection_owner) {
        for window in [selection_owner, host] {
            if let Err(e) = display.destroy_window(window) {
                warn!("Failed to destroy window 0x{:x}: {}", window, e);
            }
        }
        let _ = display.flush();
        return Err(match owner {
            Some(owner) => TrayError::SelectionOwned {
                selection: selection_name,
                owner,
            },
            None => TrayError::SelectionNotAcquired(selection_name),
        });
    }

    display.map_window(host)?;

    let announcement = manager_message(root, &atoms, selection_owner);
    display.send_client_message(root, announcement, EventInterest::STRUCTURE)?;
    display.flush()?;

    info!(
        "Acquired {} with window 0x{:x}, host window 0x{:x}",
        selection_name, selection_owner, host
    );

    Ok(TrayHandles {
        atoms,
        root,
        host,
        selection_owner,
    })
}
