//! Photo diary and class album tools.
//!
//! Photos are uploaded through a small web UI, handed to a multimodal model
//! for a diary entry or a class letter, and can be stitched into a looping GIF.

#![allow(clippy::multiple_crate_versions)]
#![deny(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::disallowed_methods)]
#![deny(clippy::expect_used)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::panic)]
#![deny(clippy::perf)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::unreachable)]
#![deny(clippy::unwrap_used)]
#![deny(warnings)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod animation;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod gemini;
pub mod ingest;
pub mod prompts;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
