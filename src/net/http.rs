//! HTTP file probe client (spec §4.4): fetches `.well-known` URLs under a
//! strict, manually-implemented redirect policy — `reqwest`'s own
//! redirect following is disabled so every hop can be validated against
//! §4.4's scheme/port/base-domain rules before it's taken.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};

use crate::error::DcvError;
use crate::psl::PslEngine;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct FileClientResponse {
    pub url: String,
    pub status_code: u16,
    pub file_content: String,
    pub dcv_error: Option<DcvError>,
}

pub struct HttpFileProbeClient {
    client: Client,
    max_body_length: usize,
}

impl HttpFileProbeClient {
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        max_body_length: usize,
        user_agent: &str,
    ) -> Result<Self, DcvError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|_| DcvError::FileValidationBadRequest)?;
        Ok(Self { client, max_body_length })
    }

    /// Constructs candidate URLs for `domain`/`path` and tries HTTPS then
    /// HTTP (or the reverse, per `https_first`), each under the strict
    /// redirect policy. `check_https` toggles whether HTTP is tried at
    /// all alongside HTTPS.
    pub fn candidate_urls(domain: &str, path: &str, check_https: bool, https_first: bool) -> Vec<String> {
        let https = format!("https://{domain}{path}");
        let http = format!("http://{domain}{path}");
        if !check_https {
            return vec![http];
        }
        if https_first {
            vec![https, http]
        } else {
            vec![http, https]
        }
    }

    pub async fn fetch(&self, url: &str, psl: &PslEngine) -> FileClientResponse {
        let mut current = url.to_string();
        let mut visited = HashSet::new();
        visited.insert(current.clone());

        for _ in 0..MAX_REDIRECTS {
            let response = match self.client.get(&current).send().await {
                Ok(resp) => resp,
                Err(err) => {
                    return FileClientResponse {
                        url: current,
                        status_code: 0,
                        file_content: String::new(),
                        dcv_error: Some(map_request_error(&err)),
                    };
                }
            };

            let status = response.status();
            if is_redirect(status) {
                let Some(location) = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                else {
                    return FileClientResponse {
                        url: current,
                        status_code: status.as_u16(),
                        file_content: String::new(),
                        dcv_error: Some(DcvError::FileValidationBadResponse),
                    };
                };

                let next = match resolve_redirect_target(&current, &location, psl) {
                    Ok(next) => next,
                    Err(err) => {
                        return FileClientResponse {
                            url: current,
                            status_code: status.as_u16(),
                            file_content: String::new(),
                            dcv_error: Some(err),
                        };
                    }
                };

                if !visited.insert(next.clone()) {
                    warn!("[http] circular redirect detected at {next}");
                    return FileClientResponse {
                        url: current,
                        status_code: status.as_u16(),
                        file_content: String::new(),
                        dcv_error: Some(DcvError::FileValidationBadResponse),
                    };
                }

                debug!("[http] following redirect {current} -> {next}");
                current = next;
                continue;
            }

            return self.finish(current, response).await;
        }

        FileClientResponse {
            url: current,
            status_code: 0,
            file_content: String::new(),
            dcv_error: Some(DcvError::FileValidationBadResponse),
        }
    }

    async fn finish(&self, url: String, response: reqwest::Response) -> FileClientResponse {
        let status = response.status();
        let dcv_error = status_error(status);
        let body = match response.text().await {
            Ok(body) => body,
            Err(_) => {
                return FileClientResponse {
                    url,
                    status_code: status.as_u16(),
                    file_content: String::new(),
                    dcv_error: Some(DcvError::FileValidationBadResponse),
                };
            }
        };
        let truncated: String = body.chars().take(self.max_body_length).collect();
        let dcv_error = dcv_error.or_else(|| {
            if truncated.is_empty() {
                Some(DcvError::FileValidationEmptyResponse)
            } else {
                None
            }
        });
        FileClientResponse {
            url,
            status_code: status.as_u16(),
            file_content: truncated,
            dcv_error,
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn status_error(status: StatusCode) -> Option<DcvError> {
    if status.is_success() {
        None
    } else if status.is_client_error() {
        Some(DcvError::FileValidationClientError)
    } else if status.is_server_error() {
        Some(DcvError::FileValidationServerError)
    } else {
        Some(DcvError::FileValidationInvalidStatusCode)
    }
}

fn map_request_error(err: &reqwest::Error) -> DcvError {
    if err.is_timeout() {
        DcvError::FileValidationTimeout
    } else if err.is_connect() {
        DcvError::FileValidationNotFound
    } else {
        DcvError::FileValidationBadResponse
    }
}

/// Resolves `location` against `source_url` and validates it against
/// the strict redirect policy (spec §4.4): relative locations are
/// always followed; absolute locations must use http/https, a
/// scheme-matching (or unspecified) port, and a base domain equal to
/// the source's.
fn resolve_redirect_target(source_url: &str, location: &str, psl: &PslEngine) -> Result<String, DcvError> {
    let source = reqwest::Url::parse(source_url).map_err(|_| DcvError::FileValidationBadResponse)?;

    let target = if location.starts_with("http://") || location.starts_with("https://") {
        reqwest::Url::parse(location).map_err(|_| DcvError::FileValidationBadResponse)?
    } else {
        source
            .join(location)
            .map_err(|_| DcvError::FileValidationBadResponse)?
    };

    if target.scheme() != "http" && target.scheme() != "https" {
        return Err(DcvError::FileValidationBadResponse);
    }

    if let Some(port) = target.port() {
        let expected = if target.scheme() == "https" { 443 } else { 80 };
        if port != expected {
            return Err(DcvError::FileValidationBadResponse);
        }
    }

    let source_host = source.host_str().ok_or(DcvError::FileValidationBadResponse)?;
    let target_host = target.host_str().ok_or(DcvError::FileValidationBadResponse)?;

    let source_base = psl
        .base_domain(source_host)
        .map_err(|_| DcvError::FileValidationBadResponse)?;
    let target_base = psl
        .base_domain(target_host)
        .map_err(|_| DcvError::FileValidationBadResponse)?;

    if source_base != target_base {
        return Err(DcvError::FileValidationBadResponse);
    }

    Ok(target.to_string())
}
