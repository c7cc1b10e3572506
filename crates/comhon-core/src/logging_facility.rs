//! Structured logging
//!
//! Model loads, imports, exports, validations, casts and stored loads are
//! the logged operations; per-value work on instances stays silent. Each
//! operation goes through [`log_op_start!`](crate::log_op_start),
//! [`log_op_end!`](crate::log_op_end) or
//! [`log_op_error!`](crate::log_op_error), which emit the field keys of
//! [`comhon_core_types::schema`].
//!
//! ```rust
//! use comhon_core::logging_facility::{init, Profile};
//!
//! init(Profile::Production);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
