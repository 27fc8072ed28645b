//! WHOIS client and parser (spec §4.10), an optional email source for
//! the email validator. Plain TCP port 43, referral chasing bounded by a
//! visited-hosts set to avoid loops.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::DcvError;

const IANA_WHOIS_HOST: &str = "whois.iana.org";
const WHOIS_PORT: u16 = 43;
const MAX_REFERRALS: usize = 8;

pub struct WhoisClient {
    socket_timeout: Duration,
}

impl WhoisClient {
    pub fn new(socket_timeout: Duration) -> Self {
        Self { socket_timeout }
    }

    /// Queries `domain`, following `refer:`/`whois:`/`Registrar WHOIS
    /// Server:` referral lines until none remain or [`MAX_REFERRALS`] is
    /// hit, then returns the union of contact emails found across every
    /// response visited.
    pub async fn lookup_emails(&self, domain: &str) -> Result<Vec<String>, DcvError> {
        let mut host = IANA_WHOIS_HOST.to_string();
        let mut visited = HashSet::new();
        let mut emails = HashSet::new();
        let mut any_response = false;

        for _ in 0..MAX_REFERRALS {
            if !visited.insert(host.clone()) {
                break;
            }
            let response = self.query(&host, domain).await?;
            if response.trim().is_empty() {
                if any_response {
                    break;
                }
                return Err(DcvError::WhoisEmptyResponse);
            }
            any_response = true;
            emails.extend(extract_emails(&response));

            match find_referral(&response) {
                Some(next_host) if next_host != host => {
                    debug!("[whois] following referral to {next_host}");
                    host = next_host;
                }
                _ => break,
            }
        }

        if emails.is_empty() {
            return Err(DcvError::WhoisNoEmailsFound);
        }
        let mut emails: Vec<String> = emails.into_iter().collect();
        emails.sort();
        Ok(emails)
    }

    async fn query(&self, host: &str, domain: &str) -> Result<String, DcvError> {
        let addr = format!("{host}:{WHOIS_PORT}");
        let connect = TcpStream::connect(&addr);
        let mut stream = timeout(self.socket_timeout, connect)
            .await
            .map_err(|_| DcvError::WhoisQueryError)?
            .map_err(|_| DcvError::WhoisQueryError)?;

        let request = format!("{domain}\r\n");
        timeout(self.socket_timeout, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| DcvError::WhoisQueryError)?
            .map_err(|_| DcvError::WhoisQueryError)?;

        let mut buf = Vec::new();
        timeout(self.socket_timeout, stream.read_to_end(&mut buf))
            .await
            .map_err(|_| DcvError::WhoisQueryError)?
            .map_err(|_| DcvError::WhoisQueryError)?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn find_referral(response: &str) -> Option<String> {
    for line in response.lines() {
        let lower = line.to_ascii_lowercase();
        for prefix in ["refer:", "whois:", "registrar whois server:", "whois server:"] {
            if let Some(value) = lower.strip_prefix(prefix) {
                let candidate = value.trim();
                if !candidate.is_empty() {
                    return Some(candidate.to_string());
                }
            }
        }
    }
    None
}

fn extract_emails(response: &str) -> HashSet<String> {
    let mut found = HashSet::new();
    for line in response.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let normalized = normalize_label(label);
        if normalized.contains("email") {
            for candidate in value.split_whitespace() {
                if looks_like_email(candidate) {
                    found.insert(candidate.trim_matches(|c: char| c == ',' || c == ';').to_string());
                }
            }
        }
    }
    if found.is_empty() {
        warn!("[whois] no e-mail labeled lines found in response");
    }
    found
}

fn normalize_label(label: &str) -> String {
    label
        .to_ascii_lowercase()
        .replace(['-', '_'], " ")
        .replace("e mail", "email")
}

fn looks_like_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.contains('@')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_email_labeled_lines() {
        let response = "Registrant Email: admin@example.com\nAdmin e-mail: tech@example.com\n";
        let emails = extract_emails(response);
        assert!(emails.contains("admin@example.com"));
        assert!(emails.contains("tech@example.com"));
    }

    #[test]
    fn finds_refer_line() {
        let response = "refer: whois.example-registry.net\n";
        assert_eq!(find_referral(response), Some("whois.example-registry.net".to_string()));
    }

    #[test]
    fn finds_registrar_whois_server_line() {
        let response = "Registrar WHOIS Server: whois.registrar.example\n";
        assert_eq!(find_referral(response), Some("whois.registrar.example".to_string()));
    }

    #[test]
    fn no_referral_when_absent() {
        assert_eq!(find_referral("Domain Name: example.com\n"), None);
    }
}
