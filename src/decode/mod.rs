//! Response decoder module
//!
//! Supports: JSON (default, via serde) and caller-supplied callbacks
//!
//! # Overview
//!
//! A [`Decoder`] turns one raw page into a typed value. The gather stages
//! are generic over the decoder, so swapping the decoding strategy never
//! duplicates pipeline logic.

mod decoders;
mod types;

pub use decoders::{FnDecoder, JsonDecoder, ValueDecoder};
pub use types::Decoder;
