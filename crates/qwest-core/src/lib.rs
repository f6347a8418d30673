//! qwest-core: the game session engine, scoring, and history.
//!
//! This crate defines the fundamental data model, the session state
//! machine, and the pure scoring and content-filter functions that the
//! entire qwest system builds on.

pub mod error;
pub mod event;
pub mod history;
pub mod model;
pub mod parser;
pub mod profanity;
pub mod scoring;
pub mod session;
pub mod traits;
