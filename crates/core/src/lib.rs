//! `scopekit-core`: shared building blocks with no IO.
//!
//! This crate contains the JSON codec, the structured `(code, message)` error
//! convention and per-request serial numbers.

pub mod codec;
pub mod error;
pub mod id;

pub use codec::{CodecError, decode, encode, to_pretty_json};
pub use error::{CodedError, ErrorCode};
pub use id::SerialNum;
