//! Core of the KSK roster bot.
//!
//! Turns a KSK addon export into paginated chat messages: decode, validate,
//! denormalize lists → users → classes, paginate, render. The chat platform
//! lives behind [`messaging::port::MessagingPort`], implemented in adapter
//! crates.

pub mod config;
pub mod document;
pub mod domain;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod messaging;
pub mod paginate;
pub mod pipeline;
pub mod publisher;
pub mod render;
pub mod transform;
pub mod validate;

pub use errors::{Error, Result};
