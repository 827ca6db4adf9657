//! REST client for the DigiSeal API.

mod client;
mod types;

pub use client::{ClientError, DigiSealClient};
pub use types::*;
