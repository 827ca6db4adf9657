//! # Integration Flows
//!
//! End-to-end checks across the contract binding, the REST API and the
//! command line client, all talking to an in-process [`crate::FakeNode`].

pub mod api_e2e;
pub mod registry_flows;
