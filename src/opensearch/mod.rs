//! OpenSearch component template API
//!
//! Thin REST client for `/_component_template` plus the request and response
//! types exchanged with it.

mod client;
mod requests;

pub use client::*;
pub use requests::*;
