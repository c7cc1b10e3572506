//! Core types shared across Comhon facilities
//!
//! This crate provides the canonical schema constants used by both the
//! error facility and the logging facility of `comhon-core`:
//!
//! - **Field keys**: component, op, event, model, property path
//! - **Event names**: start, end, end_error

pub mod schema;
