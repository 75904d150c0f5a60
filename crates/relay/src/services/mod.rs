//! Business logic shared by slash commands and dialog callbacks.

pub mod builds;
mod responder;

pub use responder::Responder;
