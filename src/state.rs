//! Core data model (spec §3): domain validation state, challenges,
//! request types, and the evidence emitted on success.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DcvError;

/// A DNS record type consulted by the DNS validator / MPIC orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnsType {
    Txt,
    Cname,
    Caa,
}

/// Which kind of challenge backs a given [`DcvRequestType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeType {
    RandomValue,
    RequestToken,
}

/// The BR-citation / RFC-citation method behind a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcvMethod {
    Br3_2_2_4_4,
    Br3_2_2_4_7,
    Br3_2_2_4_13,
    Br3_2_2_4_14,
    Br3_2_2_4_18,
    AcmeDns01,
    AcmeHttp01,
}

/// `DcvRequestType -> (method, source, challenge)` (spec §3 authoritative
/// mapping table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcvRequestType {
    DnsTxt,
    DnsCname,
    DnsTxtToken,
    EmailConstructed,
    EmailDnsTxt,
    EmailDnsCaa,
    FileValidation,
    FileValidationToken,
    AcmeDns,
    AcmeHttp,
}

impl DcvRequestType {
    pub fn method(self) -> DcvMethod {
        match self {
            DcvRequestType::DnsTxt
            | DcvRequestType::DnsCname
            | DcvRequestType::DnsTxtToken => DcvMethod::Br3_2_2_4_7,
            DcvRequestType::EmailConstructed => DcvMethod::Br3_2_2_4_4,
            DcvRequestType::EmailDnsTxt => DcvMethod::Br3_2_2_4_14,
            DcvRequestType::EmailDnsCaa => DcvMethod::Br3_2_2_4_13,
            DcvRequestType::FileValidation | DcvRequestType::FileValidationToken => {
                DcvMethod::Br3_2_2_4_18
            }
            DcvRequestType::AcmeDns => DcvMethod::AcmeDns01,
            DcvRequestType::AcmeHttp => DcvMethod::AcmeHttp01,
        }
    }

    pub fn challenge_type(self) -> ChallengeType {
        match self {
            DcvRequestType::DnsTxtToken | DcvRequestType::FileValidationToken => {
                ChallengeType::RequestToken
            }
            _ => ChallengeType::RandomValue,
        }
    }

    /// The DNS record type a DNS-sourced request type is read from, or
    /// `None` for request types that aren't DNS-sourced at all.
    pub fn dns_record_type(self) -> Option<DnsType> {
        match self {
            DcvRequestType::DnsTxt | DcvRequestType::DnsTxtToken | DcvRequestType::AcmeDns => {
                Some(DnsType::Txt)
            }
            DcvRequestType::DnsCname => Some(DnsType::Cname),
            DcvRequestType::EmailDnsTxt => Some(DnsType::Txt),
            DcvRequestType::EmailDnsCaa => Some(DnsType::Caa),
            _ => None,
        }
    }
}

/// Opaque handle returned by `prepare` and consumed by `validate`.
/// Immutable; callers persist and echo it back unchanged (spec §6.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationState {
    pub domain: String,
    pub prepare_time: chrono::DateTime<chrono::Utc>,
    pub method: DcvRequestType,
}

impl ValidationState {
    pub fn new(domain: String, method: DcvRequestType) -> Self {
        Self {
            domain,
            prepare_time: chrono::Utc::now(),
            method,
        }
    }

    /// Rejects a state that doesn't match the validator invoking it, or
    /// that has outlived `validity_period` (spec §3, configurable 1..30
    /// days).
    pub fn check(&self, expected_method: DcvRequestType, validity_period: Duration) -> Result<(), DcvError> {
        if self.method != expected_method {
            return Err(DcvError::InvalidDcvMethod);
        }
        let elapsed = chrono::Utc::now().signed_duration_since(self.prepare_time);
        let elapsed = elapsed.to_std().unwrap_or(Duration::ZERO);
        if elapsed > validity_period {
            return Err(DcvError::RandomValueExpired);
        }
        Ok(())
    }
}

/// An ordered DNS record observed while following a CNAME chain, kept for
/// forensic logging in [`MpicDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnameRecord {
    pub name: String,
    pub target: String,
}

/// Per-probe MPIC corroboration outcome (spec §3 "MpicDetails").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpicDetails {
    pub corroborated: bool,
    pub primary_agent_id: String,
    pub secondaries_checked: u32,
    pub secondaries_corroborated: u32,
    pub per_agent_corroboration: std::collections::BTreeMap<String, bool>,
    pub cname_chain: Option<Vec<CnameRecord>>,
}

/// Immutable record emitted on successful validation (spec §3
/// "DomainValidationEvidence"). Created inside the validator, returned to
/// the caller, never mutated thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainValidationEvidence {
    pub domain: String,
    pub method: DcvMethod,
    pub br_version: String,
    pub validation_date: chrono::DateTime<chrono::Utc>,
    pub dns_type: Option<DnsType>,
    pub dns_record_name: Option<String>,
    pub dns_server: Option<String>,
    pub file_url: Option<String>,
    pub email_address: Option<String>,
    pub random_value: Option<String>,
    pub request_token: Option<String>,
    pub mpic_details: MpicDetails,
}

pub const BR_VERSION: &str = "2.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_method() {
        let state = ValidationState::new("example.com".to_string(), DcvRequestType::DnsTxt);
        let err = state
            .check(DcvRequestType::FileValidation, Duration::from_secs(86400))
            .unwrap_err();
        assert_eq!(err, DcvError::InvalidDcvMethod);
    }

    #[test]
    fn accepts_fresh_state() {
        let state = ValidationState::new("example.com".to_string(), DcvRequestType::DnsTxt);
        assert!(state.check(DcvRequestType::DnsTxt, Duration::from_secs(86400)).is_ok());
    }

    #[test]
    fn rejects_expired_state() {
        let mut state = ValidationState::new("example.com".to_string(), DcvRequestType::DnsTxt);
        state.prepare_time = chrono::Utc::now() - chrono::Duration::days(31);
        let err = state
            .check(DcvRequestType::DnsTxt, Duration::from_secs(30 * 86400))
            .unwrap_err();
        assert_eq!(err, DcvError::RandomValueExpired);
    }
}
