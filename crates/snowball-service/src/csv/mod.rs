//! Contact list parsing and per-row validation.

pub mod parser;
pub mod validator;

pub use parser::{ContactRow, parse_contacts};
pub use validator::{SkipReason, normalize_address, validate_address};
