//! Domain Control Validation core for a publicly-trusted Certificate
//! Authority (CA/Browser Forum Baseline Requirements §3.2.2.4, RFC 8555).
//!
//! This crate is a library, not a service: it has no persistence, no
//! ACME server, and issues nothing. Callers own the HTTP surface, the
//! email transport, and the concrete [`mpic::MpicClient`] transport;
//! this crate supplies the validation engine, the MPIC decision table,
//! the network probe clients a `MpicClient` implementation can build on,
//! the PSL engine, and the WHOIS client.
//!
//! No logger is installed here — unlike a deployable binary, a library
//! must not configure global logging state out from under its caller.
//! Emit events via the `log` facade and let the embedding application's
//! binary decide how (or whether) to render them.

pub mod challenge;
pub mod config;
pub mod domain;
pub mod error;
pub mod mpic;
pub mod net;
pub mod psl;
pub mod state;
pub mod validation_state;
pub mod validators;

pub use config::{DcvConfig, DcvConfigBuilder};
pub use error::{ConfigError, DcvError, DcvErrorSet, DcvResult};
pub use state::{
    ChallengeType, DcvMethod, DcvRequestType, DnsType, DomainValidationEvidence, MpicDetails,
    ValidationState,
};
