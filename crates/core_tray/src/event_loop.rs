//! Event dispatch loop.
//!
//! Single-threaded: one event is fully processed before the next is fetched,
//! so the registry needs no locking. The loop stops when a [`StopHandle`] is
//! triggered, when the event source closes, or when another tray manager
//! takes the selection away.

use crate::display::{DisplayError, DisplayEvent, DisplayServer};
use crate::tray::Tray;
use crate::TrayError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use tracing::{debug, info, warn};

/// Blocking source of display events.
pub trait EventSource {
    /// Wait for the next event. `None` means no more events will arrive.
    fn next_event(&mut self) -> Option<DisplayEvent>;
}

impl EventSource for mpsc::Receiver<DisplayEvent> {
    fn next_event(&mut self) -> Option<DisplayEvent> {
        self.recv().ok()
    }
}

impl EventSource for VecDeque<DisplayEvent> {
    fn next_event(&mut self) -> Option<DisplayEvent> {
        self.pop_front()
    }
}

/// Cloneable stop signal checked before each event.
///
/// A loop blocked in [`EventSource::next_event`] only notices the request
/// once the next event arrives, so whoever stops the loop should also
/// deliver a wake-up event.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop before processing another event.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop handle was triggered.
    StopRequested,
    /// The event source has no more events.
    SourceClosed,
    /// Another client took the tray selection.
    SelectionLost,
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    SelectionLost,
}

/// Route one event to the state machine or to host window maintenance.
pub fn dispatch<D: DisplayServer>(
    tray: &mut Tray<D>,
    event: &DisplayEvent,
) -> Result<Flow, DisplayError> {
    let handles = *tray.handles();

    match *event {
        DisplayEvent::Expose { window, .. } if window == handles.host => {
            tray.redraw()?;
        }
        DisplayEvent::ClientMessage(message) if message.message_type == handles.atoms.opcode => {
            tray.handle_opcode(message.data)?;
        }
        DisplayEvent::DestroyNotify { window } => {
            tray.undock(window)?;
        }
        DisplayEvent::ButtonPress { window, button, x, y } if window == handles.host => {
            info!("Button {} pressed at ({}, {})", button, x, y);
        }
        DisplayEvent::SelectionClear { owner, selection }
            if owner == handles.selection_owner && selection == handles.atoms.selection =>
        {
            warn!("Tray selection taken over by another client");
            return Ok(Flow::SelectionLost);
        }
        DisplayEvent::ConnectionLost(ref reason) => {
            return Err(DisplayError::Connection(reason.clone()));
        }
        _ => {}
    }

    Ok(Flow::Continue)
}

/// Process events until stopped.
///
/// Request failures are logged and the loop continues; a lost display
/// connection ends it with an error.
pub fn run<D, S>(
    tray: &mut Tray<D>,
    source: &mut S,
    stop: &StopHandle,
) -> Result<LoopExit, TrayError>
where
    D: DisplayServer,
    S: EventSource + ?Sized,
{
    let mut processed: u64 = 0;

    let exit = loop {
        if stop.is_stop_requested() {
            break LoopExit::StopRequested;
        }

        let Some(event) = source.next_event() else {
            break LoopExit::SourceClosed;
        };
        processed += 1;

        match dispatch(tray, &event) {
            Ok(Flow::Continue) => {}
            Ok(Flow::SelectionLost) => break LoopExit::SelectionLost,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => warn!("Failed to handle {:?}: {}", event, e),
        }
    };

    debug!("Event loop exited ({:?}) after {} events", exit, processed);
    Ok(exit)
}
