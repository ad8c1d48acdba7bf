//! agentdeck streams replies from a tool-using agent and assembles them into a
//! structured transcript.
//!
//! The crate is organized in a few layers:
//! - [`core::frame`] and [`core::event`] turn a `text/event-stream` body into
//!   typed agent events.
//! - [`core::assembler`] folds those events into the ordered text and tool
//!   parts of the assistant message being generated.
//! - [`core::conversation`] owns the single in-flight stream of a
//!   conversation, including supersession and cancellation, and
//!   [`core::driver`] runs it against the transport and the session store.
//! - [`api`] defines request and history payloads plus the HTTP session store.
//!
//! The binary routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
