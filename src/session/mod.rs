//! Interview session state machine
//!
//! This module provides:
//! - The event and effect vocabulary exchanged with adapters
//! - Session/Turn data and the phase enum
//! - The pure transition function driving one interview

pub mod controller;
pub mod events;
pub mod state;
pub mod text;

pub use controller::InterviewController;
pub use events::{Effect, EventSink, SessionEvent, Ticket, UserAction};
pub use state::{Phase, PhaseKind, Session, StopReason, Turn};
