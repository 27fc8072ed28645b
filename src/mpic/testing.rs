//! In-memory fake [`MpicClient`] used by unit and integration tests
//! (spec's "Tests" transformation rule: no real network I/O in tests).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::mpic::{
    CorroborationStatus, MpicClient, MpicDnsResponse, MpicFileResponse, PrimaryDnsResponse,
    PrimaryFileResponse,
};
use crate::state::DnsType;

/// Canned responses keyed by domain/URL. Anything not explicitly
/// registered resolves to an empty, `Error`-status response so that
/// forgetting to stub a candidate fails the test loudly rather than
/// silently succeeding.
pub struct StubMpicClient {
    dns_responses: HashMap<String, MpicDnsResponse>,
    file_responses: HashMap<String, MpicFileResponse>,
    primary_dns_responses: HashMap<String, PrimaryDnsResponse>,
    primary_file_responses: HashMap<String, PrimaryFileResponse>,
    enforce_corroboration: bool,
}

impl Default for StubMpicClient {
    fn default() -> Self {
        Self {
            dns_responses: HashMap::new(),
            file_responses: HashMap::new(),
            primary_dns_responses: HashMap::new(),
            primary_file_responses: HashMap::new(),
            enforce_corroboration: true,
        }
    }
}

impl StubMpicClient {
    pub fn builder() -> StubMpicClientBuilder {
        StubMpicClientBuilder::default()
    }
}

pub struct StubMpicClientBuilder {
    inner: StubMpicClient,
}

impl Default for StubMpicClientBuilder {
    fn default() -> Self {
        Self {
            inner: StubMpicClient::default(),
        }
    }
}

impl StubMpicClientBuilder {
    pub fn dns_response(mut self, name: impl Into<String>, response: MpicDnsResponse) -> Self {
        self.inner.dns_responses.insert(name.into(), response);
        self
    }

    pub fn file_response(mut self, url: impl Into<String>, response: MpicFileResponse) -> Self {
        self.inner.file_responses.insert(url.into(), response);
        self
    }

    pub fn primary_dns_response(mut self, name: impl Into<String>, response: PrimaryDnsResponse) -> Self {
        self.inner.primary_dns_responses.insert(name.into(), response);
        self
    }

    pub fn primary_file_response(mut self, url: impl Into<String>, response: PrimaryFileResponse) -> Self {
        self.inner.primary_file_responses.insert(url.into(), response);
        self
    }

    pub fn enforce_corroboration(mut self, enforce: bool) -> Self {
        self.inner.enforce_corroboration = enforce;
        self
    }

    pub fn build(self) -> StubMpicClient {
        self.inner
    }
}

#[async_trait]
impl MpicClient for StubMpicClient {
    async fn get_mpic_dns_response(
        &self,
        domain: &str,
        _dns_type: DnsType,
        _challenge_value: Option<&str>,
    ) -> MpicDnsResponse {
        self.dns_responses.get(domain).cloned().unwrap_or(MpicDnsResponse {
            primary_agent_id: "primary".to_string(),
            primary_records: vec![],
            secondary_results: vec![],
            status: CorroborationStatus::Error,
            cname_chain: None,
        })
    }

    async fn get_primary_only_dns_response(&self, domain: &str, _dns_type: DnsType) -> PrimaryDnsResponse {
        self.primary_dns_responses
            .get(domain)
            .cloned()
            .unwrap_or(PrimaryDnsResponse {
                agent_id: "primary".to_string(),
                records: vec![],
            })
    }

    async fn get_mpic_file_response(
        &self,
        file_url: &str,
        _challenge_value: Option<&str>,
    ) -> MpicFileResponse {
        self.file_responses.get(file_url).cloned().unwrap_or(MpicFileResponse {
            primary_agent_id: "primary".to_string(),
            primary_status_code: 0,
            primary_body: String::new(),
            secondary_results: vec![],
            status: CorroborationStatus::Error,
        })
    }

    async fn get_primary_only_file_response(&self, file_url: &str) -> PrimaryFileResponse {
        self.primary_file_responses
            .get(file_url)
            .cloned()
            .unwrap_or(PrimaryFileResponse {
                agent_id: "primary".to_string(),
                status_code: 0,
                body: String::new(),
            })
    }

    fn should_enforce_corroboration(&self) -> bool {
        self.enforce_corroboration
    }
}
