//! HTTP middleware and extractors.

pub mod auth;

pub use auth::{MattermostUser, USER_ID_HEADER};
