//! Multi-Perspective Issuance Corroboration orchestrator (spec §4.5, §6.1).
//!
//! The concrete transport — how a "secondary perspective" is actually
//! reached — is injected via [`MpicClient`]; this module only consumes
//! the aggregated primary/secondary result and applies the
//! corroboration decision table.

pub mod testing;

use async_trait::async_trait;

use crate::error::DcvError;
use crate::state::{CnameRecord, DnsType, MpicDetails};

/// Outcome of comparing a primary perspective's result against its
/// secondaries, as reported by the injected [`MpicClient`] (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorroborationStatus {
    Corroborated,
    NonCorroborated,
    ValueNotFound,
    PrimaryAgentFailure,
    Error,
}

/// One secondary perspective's verdict on a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryResult {
    pub agent_id: String,
    pub corroborates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpicDnsResponse {
    pub primary_agent_id: String,
    pub primary_records: Vec<String>,
    pub secondary_results: Vec<SecondaryResult>,
    pub status: CorroborationStatus,
    pub cname_chain: Option<Vec<CnameRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryDnsResponse {
    pub agent_id: String,
    pub records: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpicFileResponse {
    pub primary_agent_id: String,
    pub primary_status_code: u16,
    pub primary_body: String,
    pub secondary_results: Vec<SecondaryResult>,
    pub status: CorroborationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryFileResponse {
    pub agent_id: String,
    pub status_code: u16,
    pub body: String,
}

/// The single extension point (spec §6.1): callers supply how a primary
/// and its secondaries are actually reached. This crate never opens a
/// socket to a "perspective" directly — only to the DNS resolvers / HTTP
/// origins described by [`crate::net`].
#[async_trait]
pub trait MpicClient: Send + Sync {
    async fn get_mpic_dns_response(
        &self,
        domain: &str,
        dns_type: DnsType,
        challenge_value: Option<&str>,
    ) -> MpicDnsResponse;

    async fn get_primary_only_dns_response(&self, domain: &str, dns_type: DnsType) -> PrimaryDnsResponse;

    async fn get_mpic_file_response(
        &self,
        file_url: &str,
        challenge_value: Option<&str>,
    ) -> MpicFileResponse;

    async fn get_primary_only_file_response(&self, file_url: &str) -> PrimaryFileResponse;

    /// Mandated `true` after 2025-09-15; overridable only for pre-mandate
    /// deployments or test harnesses.
    fn should_enforce_corroboration(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpicDnsDetails {
    pub mpic_details: MpicDetails,
    pub domain: String,
    pub records: Vec<String>,
    pub dcv_error: Option<DcvError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpicFileDetails {
    pub mpic_details: MpicDetails,
    pub file_url: String,
    pub file_content: String,
    pub status_code: u16,
    pub dcv_error: Option<DcvError>,
}

/// Corroboration decision table (spec §4.5), applied identically to DNS
/// and file probes. `empty_error`/`not_found_error` let each caller plug
/// in its method-specific error variant.
fn decide(
    status: CorroborationStatus,
    records_empty: bool,
    enforce: bool,
    empty_error: DcvError,
    not_found_error: DcvError,
) -> Option<DcvError> {
    if status == CorroborationStatus::Error {
        return Some(DcvError::MpicInvalidResponse);
    }
    if records_empty {
        return Some(empty_error);
    }
    if matches!(
        status,
        CorroborationStatus::ValueNotFound | CorroborationStatus::PrimaryAgentFailure
    ) {
        return Some(not_found_error);
    }
    if enforce && status == CorroborationStatus::NonCorroborated {
        return Some(DcvError::MpicCorroborationError);
    }
    None
}

fn mpic_details_from_secondaries(
    primary_agent_id: &str,
    secondaries: &[SecondaryResult],
    status: CorroborationStatus,
    cname_chain: Option<Vec<CnameRecord>>,
) -> MpicDetails {
    let secondaries_checked = secondaries.len() as u32;
    let secondaries_corroborated = secondaries.iter().filter(|s| s.corroborates).count() as u32;
    let per_agent_corroboration = secondaries
        .iter()
        .map(|s| (s.agent_id.clone(), s.corroborates))
        .collect();
    MpicDetails {
        corroborated: status == CorroborationStatus::Corroborated,
        primary_agent_id: primary_agent_id.to_string(),
        secondaries_checked,
        secondaries_corroborated,
        per_agent_corroboration,
        cname_chain,
    }
}

/// `getDnsDetails` (spec §4.5) for a single candidate name.
pub async fn get_dns_details(
    client: &dyn MpicClient,
    domain: &str,
    dns_type: DnsType,
    expected_value: Option<&str>,
) -> MpicDnsDetails {
    let response = client.get_mpic_dns_response(domain, dns_type, expected_value).await;
    let dcv_error = decide(
        response.status,
        response.primary_records.is_empty(),
        client.should_enforce_corroboration(),
        DcvError::DnsLookupRecordNotFound,
        DcvError::DnsLookupRecordNotFound,
    );
    MpicDnsDetails {
        mpic_details: mpic_details_from_secondaries(
            &response.primary_agent_id,
            &response.secondary_results,
            response.status,
            response.cname_chain,
        ),
        domain: domain.to_string(),
        records: response.primary_records,
        dcv_error,
    }
}

/// List variant: tries each `name` in order, returning the first
/// error-free result; if every candidate errors, returns the first
/// candidate's result (spec §4.5: "else the first error result").
pub async fn get_dns_details_list(
    client: &dyn MpicClient,
    names: &[String],
    dns_type: DnsType,
    expected_value: Option<&str>,
) -> MpicDnsDetails {
    let mut first = None;
    for name in names {
        let details = get_dns_details(client, name, dns_type, expected_value).await;
        if details.dcv_error.is_none() {
            return details;
        }
        if first.is_none() {
            first = Some(details);
        }
    }
    first.expect("names must be non-empty")
}

/// `getPrimaryOnlyDnsDetails`: no corroboration, used for request-token
/// discovery (spec §4.6, §4.8) so a scan doesn't incur multi-perspective
/// traffic before a valid token is even found.
pub async fn get_primary_only_dns_details(
    client: &dyn MpicClient,
    domain: &str,
    dns_type: DnsType,
) -> MpicDnsDetails {
    let response = client.get_primary_only_dns_response(domain, dns_type).await;
    let dcv_error = if response.records.is_empty() {
        Some(DcvError::DnsLookupRecordNotFound)
    } else {
        None
    };
    MpicDnsDetails {
        mpic_details: MpicDetails {
            corroborated: false,
            primary_agent_id: response.agent_id,
            secondaries_checked: 0,
            secondaries_corroborated: 0,
            per_agent_corroboration: Default::default(),
            cname_chain: None,
        },
        domain: domain.to_string(),
        records: response.records,
        dcv_error,
    }
}

/// `getMpicFileDetails` for a single URL.
pub async fn get_mpic_file_details(
    client: &dyn MpicClient,
    file_url: &str,
    expected_value: Option<&str>,
) -> MpicFileDetails {
    let response = client.get_mpic_file_response(file_url, expected_value).await;
    let dcv_error = decide(
        response.status,
        response.primary_body.is_empty(),
        client.should_enforce_corroboration(),
        DcvError::FileValidationEmptyResponse,
        DcvError::FileValidationNotFound,
    );
    MpicFileDetails {
        mpic_details: mpic_details_from_secondaries(
            &response.primary_agent_id,
            &response.secondary_results,
            response.status,
            None,
        ),
        file_url: file_url.to_string(),
        file_content: response.primary_body,
        status_code: response.primary_status_code,
        dcv_error,
    }
}

/// List variant for file URLs, same first-success/else-first-error rule
/// as [`get_dns_details_list`].
pub async fn get_mpic_file_details_list(
    client: &dyn MpicClient,
    urls: &[String],
    expected_value: Option<&str>,
) -> MpicFileDetails {
    let mut first = None;
    for url in urls {
        let details = get_mpic_file_details(client, url, expected_value).await;
        if details.dcv_error.is_none() {
            return details;
        }
        if first.is_none() {
            first = Some(details);
        }
    }
    first.expect("urls must be non-empty")
}

pub async fn get_primary_only_file_details(client: &dyn MpicClient, file_url: &str) -> MpicFileDetails {
    let response = client.get_primary_only_file_response(file_url).await;
    let dcv_error = if response.body.is_empty() {
        Some(DcvError::FileValidationEmptyResponse)
    } else {
        None
    };
    MpicFileDetails {
        mpic_details: MpicDetails {
            corroborated: false,
            primary_agent_id: response.agent_id,
            secondaries_checked: 0,
            secondaries_corroborated: 0,
            per_agent_corroboration: Default::default(),
            cname_chain: None,
        },
        file_url: file_url.to_string(),
        file_content: response.body,
        status_code: response.status_code,
        dcv_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpic::testing::StubMpicClient;

    #[tokio::test]
    async fn corroborated_hit_has_no_error() {
        let client = StubMpicClient::builder()
            .dns_response(
                "example.com",
                MpicDnsResponse {
                    primary_agent_id: "primary".to_string(),
                    primary_records: vec!["R123".to_string()],
                    secondary_results: vec![SecondaryResult {
                        agent_id: "s1".to_string(),
                        corroborates: true,
                    }],
                    status: CorroborationStatus::Corroborated,
                    cname_chain: None,
                },
            )
            .build();
        let details = get_dns_details(&client, "example.com", DnsType::Txt, Some("R123")).await;
        assert!(details.dcv_error.is_none());
        assert!(details.mpic_details.corroborated);
    }

    #[tokio::test]
    async fn non_corroborated_errors_when_enforced() {
        let client = StubMpicClient::builder()
            .dns_response(
                "example.com",
                MpicDnsResponse {
                    primary_agent_id: "primary".to_string(),
                    primary_records: vec!["R123".to_string()],
                    secondary_results: vec![SecondaryResult {
                        agent_id: "s1".to_string(),
                        corroborates: false,
                    }],
                    status: CorroborationStatus::NonCorroborated,
                    cname_chain: None,
                },
            )
            .build();
        let details = get_dns_details(&client, "example.com", DnsType::Txt, Some("R123")).await;
        assert_eq!(details.dcv_error, Some(DcvError::MpicCorroborationError));
    }

    #[tokio::test]
    async fn non_corroborated_succeeds_when_not_enforced() {
        let client = StubMpicClient::builder()
            .enforce_corroboration(false)
            .dns_response(
                "example.com",
                MpicDnsResponse {
                    primary_agent_id: "primary".to_string(),
                    primary_records: vec!["R123".to_string()],
                    secondary_results: vec![],
                    status: CorroborationStatus::NonCorroborated,
                    cname_chain: None,
                },
            )
            .build();
        let details = get_dns_details(&client, "example.com", DnsType::Txt, Some("R123")).await;
        assert!(details.dcv_error.is_none());
    }

    #[tokio::test]
    async fn list_falls_back_to_bare_domain() {
        let client = StubMpicClient::builder()
            .dns_response(
                "_dnsauth.example.com",
                MpicDnsResponse {
                    primary_agent_id: "primary".to_string(),
                    primary_records: vec![],
                    secondary_results: vec![],
                    status: CorroborationStatus::Corroborated,
                    cname_chain: None,
                },
            )
            .dns_response(
                "example.com",
                MpicDnsResponse {
                    primary_agent_id: "primary".to_string(),
                    primary_records: vec!["R123".to_string()],
                    secondary_results: vec![],
                    status: CorroborationStatus::Corroborated,
                    cname_chain: None,
                },
            )
            .build();
        let names = vec!["_dnsauth.example.com".to_string(), "example.com".to_string()];
        let details = get_dns_details_list(&client, &names, DnsType::Txt, Some("R123")).await;
        assert_eq!(details.domain, "example.com");
        assert!(details.dcv_error.is_none());
    }

    #[tokio::test]
    async fn error_status_maps_to_invalid_response() {
        let client = StubMpicClient::builder()
            .dns_response(
                "example.com",
                MpicDnsResponse {
                    primary_agent_id: "primary".to_string(),
                    primary_records: vec![],
                    secondary_results: vec![],
                    status: CorroborationStatus::Error,
                    cname_chain: None,
                },
            )
            .build();
        let details = get_dns_details(&client, "example.com", DnsType::Txt, None).await;
        assert_eq!(details.dcv_error, Some(DcvError::MpicInvalidResponse));
    }
}
