//! Chatbridge is the client-side state and API-bridging layer of a desktop
//! chatbot client for remote LLM APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] owns the streaming request bridge: it correlates backend
//!   invocations with asynchronous progress events by random id, routes each
//!   event to the caller that requested it, and exposes the session/verify
//!   HTTP helpers.
//! - [`core`] owns user state: the persisted settings store, the defaults it
//!   merges over, and the chat session/message shapes shared with the rest of
//!   the application.
//! - [`utils`] holds small helpers (URL normalization) used by the API layer.
//!
//! The embedding application constructs an [`api::ChatDispatcher`] once at
//! startup, hands the matching [`api::ProgressSender`] to whatever transport
//! produces progress events, and drives conversations through
//! [`api::ChatDispatcher::send_chat`].

pub mod api;
pub mod core;
pub mod utils;
