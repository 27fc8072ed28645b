//! DNS probe client (spec §4.3): resolves TXT/CNAME/CAA against
//! caller-configured resolvers, in candidate-name order, with a
//! timeout/retry budget per query.

use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::RecordType;
use log::{debug, warn};

use crate::error::DcvError;
use crate::state::DnsType;

/// Result of probing one or more candidate names for one record type
/// (spec §4.3 `DnsData`).
#[derive(Debug, Clone)]
pub struct DnsData {
    pub server_with_data: Option<String>,
    pub domain: String,
    pub dns_type: DnsType,
    pub records: Vec<String>,
    pub errors: Vec<DcvError>,
}

pub struct DnsProbeClient {
    resolver: TokioAsyncResolver,
}

impl DnsProbeClient {
    /// Builds a resolver pinned to `servers` (plain IP addresses), with
    /// `timeout` applied per attempt and `retries` additional attempts
    /// beyond the first.
    pub fn new(servers: &[String], timeout: Duration, retries: u32) -> Result<Self, DcvError> {
        let ips: Vec<IpAddr> = servers
            .iter()
            .map(|s| s.parse::<IpAddr>())
            .collect::<Result<_, _>>()
            .map_err(|_| DcvError::DnsLookupBadRequest)?;
        let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = (retries as usize) + 1;
        let resolver = TokioAsyncResolver::tokio(config, opts);
        Ok(Self { resolver })
    }

    /// Queries `names` in order; returns the first name whose record set
    /// is non-empty, filtered by `caa_tag` when probing CAA. If every
    /// candidate comes up empty or errors, returns the last candidate's
    /// errors (spec §4.3: "else the last error").
    pub async fn query(&self, names: &[String], dns_type: DnsType, caa_tag: Option<&str>) -> DnsData {
        let mut last = DnsData {
            server_with_data: None,
            domain: String::new(),
            dns_type,
            records: vec![],
            errors: vec![DcvError::DnsLookupRecordNotFound],
        };
        for name in names {
            match self.query_one(name, dns_type, caa_tag).await {
                Ok(records) if !records.is_empty() => {
                    return DnsData {
                        server_with_data: Some(name.clone()),
                        domain: name.clone(),
                        dns_type,
                        records,
                        errors: vec![],
                    };
                }
                Ok(_) => {
                    last = DnsData {
                        server_with_data: None,
                        domain: name.clone(),
                        dns_type,
                        records: vec![],
                        errors: vec![DcvError::DnsLookupRecordNotFound],
                    };
                }
                Err(err) => {
                    last = DnsData {
                        server_with_data: None,
                        domain: name.clone(),
                        dns_type,
                        records: vec![],
                        errors: vec![err],
                    };
                }
            }
        }
        last
    }

    async fn query_one(
        &self,
        name: &str,
        dns_type: DnsType,
        caa_tag: Option<&str>,
    ) -> Result<Vec<String>, DcvError> {
        debug!("[dns] querying {name} for {dns_type:?}");
        match dns_type {
            DnsType::Txt => {
                let lookup = self.resolver.txt_lookup(name).await.map_err(map_resolve_error)?;
                Ok(lookup
                    .iter()
                    .map(|txt| {
                        txt.txt_data()
                            .iter()
                            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                    .collect())
            }
            DnsType::Cname => {
                let lookup = self
                    .resolver
                    .lookup(name, RecordType::CNAME)
                    .await
                    .map_err(map_resolve_error)?;
                Ok(lookup.iter().map(|rdata| rdata.to_string()).collect())
            }
            DnsType::Caa => {
                let lookup = self
                    .resolver
                    .lookup(name, RecordType::CAA)
                    .await
                    .map_err(map_resolve_error)?;
                Ok(lookup
                    .iter()
                    .filter_map(|rdata| {
                        let text = rdata.to_string();
                        match caa_tag {
                            Some(tag) if !text.contains(tag) => None,
                            _ => Some(text),
                        }
                    })
                    .collect())
            }
        }
    }
}

fn map_resolve_error(err: ResolveError) -> DcvError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => DcvError::DnsLookupRecordNotFound,
        ResolveErrorKind::Timeout => DcvError::DnsLookupTimeout,
        ResolveErrorKind::Io(_) => DcvError::DnsLookupIoException,
        ResolveErrorKind::Proto(_) | ResolveErrorKind::Message(_) => {
            DcvError::DnsLookupTextParseException
        }
        _ => {
            warn!("[dns] unmapped resolve error: {err}");
            DcvError::DnsLookupUnknownHostException
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_ip_server() {
        let err = DnsProbeClient::new(&["not-an-ip".to_string()], Duration::from_secs(1), 0)
            .unwrap_err();
        assert_eq!(err, DcvError::DnsLookupBadRequest);
    }

    #[test]
    fn accepts_valid_servers() {
        let client = DnsProbeClient::new(
            &["1.1.1.1".to_string(), "8.8.8.8".to_string()],
            Duration::from_secs(1),
            0,
        );
        assert!(client.is_ok());
    }
}
