//! DigiSeal CLI: the web frontend's flows on the command line.
//!
//! ```text
//! digiseal register  ──┐
//! digiseal transfer  ──┤
//! digiseal verify    ──┼──► DigiSeal API (REST) ──► ProductVerification contract
//! digiseal history   ──┤
//! digiseal roles     ──┘
//! ```
//!
//! `verify` accepts whatever a QR scanner produced: see [`scan`].

pub mod api;
pub mod scan;

pub use api::{ClientError, DigiSealClient};
pub use scan::{product_id_from_payload, ScanError};
