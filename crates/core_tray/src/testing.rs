//! Recording fake display used by the unit tests.

use crate::display::{Atom, ClientMessage, DisplayError, DisplayServer, EventInterest};
use crate::{Rect, Size, WindowId};
use std::collections::{HashMap, HashSet};

pub const ROOT: WindowId = 0x100;

/// A request the tray issued, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateWindow {
        window: WindowId,
        parent: WindowId,
        rect: Rect,
        border_width: u16,
        interest: EventInterest,
    },
    SetTitle(WindowId, String),
    Map(WindowId),
    Unmap(WindowId),
    Destroy(WindowId),
    SetSelectionOwner(Atom, Option<WindowId>),
    SendClientMessage {
        destination: WindowId,
        message: ClientMessage,
        interest: EventInterest,
    },
    Reparent {
        window: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
    },
    SelectInput(WindowId, EventInterest),
    Move(WindowId, i32, i32),
    Clear(WindowId),
}

#[derive(Debug, Default)]
pub struct FakeDisplay {
    pub calls: Vec<Call>,
    pub atoms: HashMap<String, Atom>,
    pub sizes: HashMap<WindowId, Size>,
    pub selection_owners: HashMap<Atom, WindowId>,
    /// Selections another client holds; claiming them silently fails.
    pub contested: HashSet<Atom>,
    /// Windows whose requests fail as if they were already destroyed.
    pub gone: HashSet<WindowId>,
    pub connection_lost: bool,
    next_window: WindowId,
    next_atom: Atom,
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self {
            next_window: 0x400001,
            next_atom: 300,
            ..Default::default()
        }
    }

    pub fn with_icon(mut self, window: WindowId, width: i32, height: i32) -> Self {
        self.sizes.insert(window, Size::new(width, height));
        self
    }

    /// Pretend another tray already holds `name`.
    pub fn with_foreign_owner(mut self, name: &str, owner: WindowId) -> Self {
        let atom = self.atom(name);
        self.selection_owners.insert(atom, owner);
        self.contested.insert(atom);
        self
    }

    pub fn atom(&mut self, name: &str) -> Atom {
        if let Some(&atom) = self.atoms.get(name) {
            return atom;
        }
        let atom = self.next_atom;
        self.next_atom += 1;
        self.atoms.insert(name.to_string(), atom);
        atom
    }

    /// Moves issued since the last call to `take_moves`.
    pub fn take_moves(&mut self) -> Vec<(WindowId, i32, i32)> {
        let moves = self
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Move(w, x, y) => Some((*w, *x, *y)),
                _ => None,
            })
            .collect();
        self.calls.retain(|c| !matches!(c, Call::Move(..)));
        moves
    }

    pub fn created_windows(&self) -> Vec<WindowId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateWindow { window, .. } => Some(*window),
                _ => None,
            })
            .collect()
    }

    fn check(&self, window: WindowId, request: &'static str) -> Result<(), DisplayError> {
        if self.connection_lost {
            return Err(DisplayError::Connection("connection reset".to_string()));
        }
        if self.gone.contains(&window) {
            return Err(DisplayError::request(request, "BadWindow"));
        }
        Ok(())
    }
}

impl DisplayServer for FakeDisplay {
    fn root_window(&self) -> WindowId {
        ROOT
    }

    fn intern_atom(&mut self, name: &str) -> Result<Atom, DisplayError> {
        self.check(ROOT, "InternAtom")?;
        Ok(self.atom(name))
    }

    fn create_window(
        &mut self,
        parent: WindowId,
        rect: Rect,
        border_width: u16,
        interest: EventInterest,
    ) -> Result<WindowId, DisplayError> {
        self.check(parent, "CreateWindow")?;
        let window = self.next_window;
        self.next_window += 1;
        self.calls.push(Call::CreateWindow {
            window,
            parent,
            rect,
            border_width,
            interest,
        });
        Ok(window)
    }

    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), DisplayError> {
        self.check(window, "ChangeProperty")?;
        self.calls.push(Call::SetTitle(window, title.to_string()));
        Ok(())
    }

    fn map_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.check(window, "MapWindow")?;
        self.calls.push(Call::Map(window));
        Ok(())
    }

    fn unmap_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.check(window, "UnmapWindow")?;
        self.calls.push(Call::Unmap(window));
        Ok(())
    }

    fn destroy_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.check(window, "DestroyWindow")?;
        self.calls.push(Call::Destroy(window));
        Ok(())
    }

    fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: Option<WindowId>,
    ) -> Result<(), DisplayError> {
        self.check(ROOT, "SetSelectionOwner")?;
        self.calls.push(Call::SetSelectionOwner(selection, owner));
        if self.contested.contains(&selection) {
            return Ok(());
        }
        match owner {
            Some(window) => self.selection_owners.insert(selection, window),
            None => self.selection_owners.remove(&selection),
        };
        Ok(())
    }

    fn selection_owner(&mut self, selection: Atom) -> Result<Option<WindowId>, DisplayError> {
        self.check(ROOT, "GetSelectionOwner")?;
        Ok(self.selection_owners.get(&selection).copied())
    }

    fn send_client_message(
        &mut self,
        destination: WindowId,
        message: ClientMessage,
        interest: EventInterest,
    ) -> Result<(), DisplayError> {
        self.check(destination, "SendEvent")?;
        self.calls.push(Call::SendClientMessage {
            destination,
            message,
            interest,
        });
        Ok(())
    }

    fn reparent_window(
        &mut self,
        window: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
    ) -> Result<(), DisplayError> {
        self.check(window, "ReparentWindow")?;
        self.calls.push(Call::Reparent { window, parent, x, y });
        Ok(())
    }

    fn select_input(
        &mut self,
        window: WindowId,
        interest: EventInterest,
    ) -> Result<(), DisplayError> {
        self.check(window, "ChangeWindowAttributes")?;
        self.calls.push(Call::SelectInput(window, interest));
        Ok(())
    }

    fn window_size(&mut self, window: WindowId) -> Result<Size, DisplayError> {
        self.check(window, "GetGeometry")?;
        self.sizes
            .get(&window)
            .copied()
            .ok_or(DisplayError::NoSuchWindow(window))
    }

    fn move_window(&mut self, window: WindowId, x: i32, y: i32) -> Result<(), DisplayError> {
        self.check(window, "ConfigureWindow")?;
        self.calls.push(Call::Move(window, x, y));
        Ok(())
    }

    fn clear_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.check(window, "ClearArea")?;
        self.calls.push(Call::Clear(window));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if self.connection_lost {
            return Err(DisplayError::Connection("connection reset".to_string()));
        }
        Ok(())
    }
}
