//! Display server capability.
//!
//! The tray never talks to a windowing library directly. Everything it needs
//! from the display server goes through [`DisplayServer`], and everything the
//! display server tells it arrives as a [`DisplayEvent`].

use crate::{Rect, Size, WindowId};
use thiserror::Error;

/// Interned identifier for a name on the display server.
pub type Atom = u32;

/// Errors reported by a display server implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("Display connection failed: {0}")]
    Connection(String),

    #[error("{request} request failed: {message}")]
    Request {
        request: &'static str,
        message: String,
    },

    #[error("Window 0x{0:x} does not exist")]
    NoSuchWindow(WindowId),
}

impl DisplayError {
    /// Build a request failure.
    pub fn request(request: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            request,
            message: message.into(),
        }
    }

    /// Whether the connection itself is gone (no further request can succeed).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Event categories a window can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventInterest {
    /// Redraw requests.
    pub exposure: bool,
    /// Pointer button presses.
    pub button_press: bool,
    /// Structural changes of the window itself (destroy, reparent, resize).
    pub structure: bool,
}

impl EventInterest {
    /// No events.
    pub const NONE: Self = Self {
        exposure: false,
        button_press: false,
        structure: false,
    };

    /// Structural changes only. Used for docked icons and the manager broadcast.
    pub const STRUCTURE: Self = Self {
        exposure: false,
        button_press: false,
        structure: true,
    };

    /// Everything the host window listens to.
    pub const HOST: Self = Self {
        exposure: true,
        button_press: true,
        structure: true,
    };
}

/// A 32-bit format client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientMessage {
    /// Window the message is about.
    pub window: WindowId,
    /// Message type atom.
    pub message_type: Atom,
    /// Data format (8, 16 or 32).
    pub format: u8,
    /// Payload as five 32-bit fields.
    pub data: [u32; 5],
}

impl ClientMessage {
    /// Create a 32-bit format message.
    pub fn new(window: WindowId, message_type: Atom, data: [u32; 5]) -> Self {
        Self {
            window,
            message_type,
            format: 32,
            data,
        }
    }
}

/// Events delivered by the display server, reduced to what the tray classifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Part of a window needs repainting.
    Expose { window: WindowId, count: u16 },
    /// A client message arrived.
    ClientMessage(ClientMessage),
    /// A window we subscribed to was destroyed.
    DestroyNotify { window: WindowId },
    /// A pointer button was pressed inside a window.
    ButtonPress {
        window: WindowId,
        button: u8,
        x: i16,
        y: i16,
    },
    /// Another client took ownership of a selection we owned.
    SelectionClear { owner: WindowId, selection: Atom },
    /// The event stream ended because the connection to the server broke.
    ConnectionLost(String),
    /// Any other event kind.
    Other,
}

/// Operations the tray needs from the display server.
pub trait DisplayServer {
    /// Root window of the screen the tray runs on.
    fn root_window(&self) -> WindowId;

    /// Resolve a name to an atom, creating it if necessary.
    fn intern_atom(&mut self, name: &str) -> Result<Atom, DisplayError>;

    /// Create an unmapped window.
    fn create_window(
        &mut self,
        parent: WindowId,
        rect: Rect,
        border_width: u16,
        interest: EventInterest,
    ) -> Result<WindowId, DisplayError>;

    /// Store a human readable title on a window.
    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), DisplayError>;

    /// Make a window visible.
    fn map_window(&mut self, window: WindowId) -> Result<(), DisplayError>;

    /// Hide a window without destroying it.
    fn unmap_window(&mut self, window: WindowId) -> Result<(), DisplayError>;

    /// Destroy a window created by this client.
    fn destroy_window(&mut self, window: WindowId) -> Result<(), DisplayError>;

    /// Set (or with `None`, release) the owner of a selection.
    fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: Option<WindowId>,
    ) -> Result<(), DisplayError>;

    /// Current owner of a selection, if any.
    fn selection_owner(&mut self, selection: Atom) -> Result<Option<WindowId>, DisplayError>;

    /// Send a client message to `destination` for clients listening to `interest`.
    fn send_client_message(
        &mut self,
        destination: WindowId,
        message: ClientMessage,
        interest: EventInterest,
    ) -> Result<(), DisplayError>;

    /// Make `window` a child of `parent` at `(x, y)`.
    fn reparent_window(
        &mut self,
        window: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
    ) -> Result<(), DisplayError>;

    /// Subscribe to events on a window we do not own.
    fn select_input(&mut self, window: WindowId, interest: EventInterest)
        -> Result<(), DisplayError>;

    /// Query the current size of a window.
    fn window_size(&mut self, window: WindowId) -> Result<Size, DisplayError>;

    /// Move a window relative to its parent.
    fn move_window(&mut self, window: WindowId, x: i32, y: i32) -> Result<(), DisplayError>;

    /// Clear a window to its background.
    fn clear_window(&mut self, window: WindowId) -> Result<(), DisplayError>;

    /// Push buffered requests to the server.
    fn flush(&mut self) -> Result<(), DisplayError>;
}
