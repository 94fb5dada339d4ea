//! xtray Platform X11
//!
//! X11 implementation of the tray's display capability, built on x11rb.
//!
//! This crate handles:
//! - Connecting to the X server and picking the screen's root window
//! - Window creation, titles, re-parenting and moves
//! - Selection ownership and client message delivery
//! - Translating raw X11 events into [`DisplayEvent`]s

use std::sync::Arc;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::{self, ConnectionExt as _, EventMask};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use xtray_core::{
    Atom, ClientMessage, DisplayError, DisplayEvent, DisplayServer, EventInterest, Rect, Size,
    WindowId, CURRENT_TIME,
};

/// Connection to an X server acting as the tray's display.
pub struct X11Display {
    conn: Arc<RustConnection>,
    screen_num: usize,
    root: WindowId,
    white_pixel: u32,
    black_pixel: u32,
}

impl X11Display {
    /// Connect to `display_name`, or to `$DISPLAY` when `None`.
    pub fn connect(display_name: Option<&str>) -> Result<Self, DisplayError> {
        let (conn, screen_num) = RustConnection::connect(display_name)
            .map_err(|e| DisplayError::Connection(e.to_string()))?;

        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| DisplayError::Connection(format!("Screen {} not found", screen_num)))?;
        let root = screen.root;
        let white_pixel = screen.white_pixel;
        let black_pixel = screen.black_pixel;

        debug!(
            "Connected to X server, screen {} root 0x{:x}",
            screen_num, root
        );

        Ok(Self {
            conn: Arc::new(conn),
            screen_num,
            root,
            white_pixel,
            black_pixel,
        })
    }

    /// Screen the connection was opened for.
    pub fn screen_number(&self) -> usize {
        self.screen_num
    }

    /// A blocking event reader sharing this connection.
    ///
    /// The reader can be moved to another thread while requests keep going
    /// through this display.
    pub fn event_reader(&self) -> EventReader {
        EventReader {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Blocking reader of X11 events.
pub struct EventReader {
    conn: Arc<RustConnection>,
}

impl EventReader {
    /// Wait for the next event from the X server.
    pub fn next_event(&self) -> Result<DisplayEvent, DisplayError> {
        let event = self.conn.wait_for_event().map_err(connection_error)?;
        Ok(translate_event(event))
    }
}

/// Reduce an X11 event to the kinds the tray dispatches on.
pub fn translate_event(event: Event) -> DisplayEvent {
    match event {
        Event::Expose(e) => DisplayEvent::Expose {
            window: e.window,
            count: e.count,
        },
        Event::ClientMessage(e) => DisplayEvent::ClientMessage(ClientMessage {
            window: e.window,
            message_type: e.type_,
            format: e.format,
            data: e.data.as_data32(),
        }),
        Event::DestroyNotify(e) => DisplayEvent::DestroyNotify { window: e.window },
        Event::ButtonPress(e) => DisplayEvent::ButtonPress {
            window: e.event,
            button: e.detail,
            x: e.event_x,
            y: e.event_y,
        },
        Event::SelectionClear(e) => DisplayEvent::SelectionClear {
            owner: e.owner,
            selection: e.selection,
        },
        Event::Error(e) => {
            // Errors of unchecked requests, e.g. a move racing a destroyed icon
            debug!("X11 error {:?} for request {}", e.error_kind, e.major_opcode);
            DisplayEvent::Other
        }
        _ => DisplayEvent::Other,
    }
}

/// X11 event mask for an interest set.
pub fn event_mask(interest: EventInterest) -> EventMask {
    let mut mask = EventMask::NO_EVENT;
    if interest.exposure {
        mask = mask | EventMask::EXPOSURE;
    }
    if interest.button_press {
        mask = mask | EventMask::BUTTON_PRESS;
    }
    if interest.structure {
        mask = mask | EventMask::STRUCTURE_NOTIFY;
    }
    mask
}

fn connection_error(e: ConnectionError) -> DisplayError {
    DisplayError::Connection(e.to_string())
}

fn reply_error(request: &'static str) -> impl Fn(ReplyError) -> DisplayError {
    move |e| match e {
        ReplyError::ConnectionError(e) => connection_error(e),
        ReplyError::X11Error(e) => DisplayError::request(request, format!("{:?}", e.error_kind)),
    }
}

fn id_error(request: &'static str) -> impl Fn(ReplyOrIdError) -> DisplayError {
    move |e| match e {
        ReplyOrIdError::ConnectionError(e) => connection_error(e),
        ReplyOrIdError::IdsExhausted => DisplayError::request(request, "X11 ids exhausted"),
        ReplyOrIdError::X11Error(e) => {
            DisplayError::request(request, format!("{:?}", e.error_kind))
        }
    }
}

fn coord(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn extent(value: i32) -> u16 {
    value.clamp(1, u16::MAX as i32) as u16
}

impl DisplayServer for X11Display {
    fn root_window(&self) -> WindowId {
        self.root
    }

    fn intern_atom(&mut self, name: &str) -> Result<Atom, DisplayError> {
        Ok(self
            .conn
            .intern_atom(false, name.as_bytes())
            .map_err(connection_error)?
            .reply()
            .map_err(reply_error("InternAtom"))?
            .atom)
    }

    fn create_window(
        &mut self,
        parent: WindowId,
        rect: Rect,
        border_width: u16,
        interest: EventInterest,
    ) -> Result<WindowId, DisplayError> {
        let window = self.conn.generate_id().map_err(id_error("CreateWindow"))?;
        let values = xproto::CreateWindowAux::new()
            .event_mask(event_mask(interest))
            .background_pixel(self.black_pixel)
            .border_pixel(self.white_pixel);

        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                parent,
                coord(rect.x),
                coord(rect.y),
                extent(rect.width),
                extent(rect.height),
                border_width,
                xproto::WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &values,
            )
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("CreateWindow"))?;

        Ok(window)
    }

    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), DisplayError> {
        self.conn
            .change_property8(
                xproto::PropMode::REPLACE,
                window,
                xproto::AtomEnum::WM_NAME,
                xproto::AtomEnum::STRING,
                title.as_bytes(),
            )
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("ChangeProperty"))
    }

    fn map_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.conn
            .map_window(window)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("MapWindow"))
    }

    fn unmap_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.conn
            .unmap_window(window)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("UnmapWindow"))
    }

    fn destroy_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        self.conn
            .destroy_window(window)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("DestroyWindow"))
    }

    fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: Option<WindowId>,
    ) -> Result<(), DisplayError> {
        self.conn
            .set_selection_owner(owner.unwrap_or(x11rb::NONE), selection, CURRENT_TIME)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("SetSelectionOwner"))
    }

    fn selection_owner(&mut self, selection: Atom) -> Result<Option<WindowId>, DisplayError> {
        let owner = self
            .conn
            .get_selection_owner(selection)
            .map_err(connection_error)?
            .reply()
            .map_err(reply_error("GetSelectionOwner"))?
            .owner;
        Ok((owner != x11rb::NONE).then_some(owner))
    }

    fn send_client_message(
        &mut self,
        destination: WindowId,
        message: ClientMessage,
        interest: EventInterest,
    ) -> Result<(), DisplayError> {
        let event = xproto::ClientMessageEvent::new(
            message.format,
            message.window,
            message.message_type,
            message.data,
        );
        self.conn
            .send_event(false, destination, event_mask(interest), event)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("SendEvent"))
    }

    fn reparent_window(
        &mut self,
        window: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
    ) -> Result<(), DisplayError> {
        self.conn
            .reparent_window(window, parent, coord(x), coord(y))
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("ReparentWindow"))
    }

    fn select_input(
        &mut self,
        window: WindowId,
        interest: EventInterest,
    ) -> Result<(), DisplayError> {
        let values = xproto::ChangeWindowAttributesAux::new().event_mask(event_mask(interest));
        self.conn
            .change_window_attributes(window, &values)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("ChangeWindowAttributes"))
    }

    fn window_size(&mut self, window: WindowId) -> Result<Size, DisplayError> {
        let geometry = self
            .conn
            .get_geometry(window)
            .map_err(connection_error)?
            .reply()
            .map_err(reply_error("GetGeometry"))?;
        Ok(Size::new(geometry.width.into(), geometry.height.into()))
    }

    fn move_window(&mut self, window: WindowId, x: i32, y: i32) -> Result<(), DisplayError> {
        let values = xproto::ConfigureWindowAux::new().x(x).y(y);
        self.conn
            .configure_window(window, &values)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("ConfigureWindow"))
    }

    fn clear_window(&mut self, window: WindowId) -> Result<(), DisplayError> {
        // Zero width and height clear to the window's edges
        self.conn
            .clear_area(false, window, 0, 0, 0, 0)
            .map_err(connection_error)?
            .check()
            .map_err(reply_error("ClearArea"))
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.conn.flush().map_err(connection_error)
    }
}
