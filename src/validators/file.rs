//! File validator, BR 3.2.2.4.18 (spec §4.8).

use crate::challenge::{RandomValueGenerator, RequestTokenData, RequestTokenValidator, find_random_value};
use crate::config::DcvConfig;
use crate::error::{DcvError, DcvErrorSet};
use crate::mpic::{self, MpicClient};
use crate::net::HttpFileProbeClient;
use crate::state::{ChallengeType, DcvMethod, DcvRequestType, DomainValidationEvidence, ValidationState};
use crate::validation_state;

const WELL_KNOWN_PATH: &str = "/.well-known/pki-validation";

pub struct FilePreparation {
    pub domain: String,
    pub file_location: String,
    pub challenge_type: ChallengeType,
    pub random_value: Option<String>,
    pub validation_state: String,
}

pub fn prepare(
    domain: &str,
    request_type: DcvRequestType,
    config: &DcvConfig,
) -> Result<FilePreparation, DcvErrorSet> {
    if domain.starts_with("*.") {
        return Err(DcvErrorSet::single(DcvError::DomainInvalidWildcardNotAllowed));
    }
    crate::domain::validate_domain_syntax(domain).map_err(DcvErrorSet::from)?;

    let challenge_type = request_type.challenge_type();
    let random_value = match challenge_type {
        ChallengeType::RandomValue => Some(RandomValueGenerator::default_charset().generate()),
        ChallengeType::RequestToken => None,
    };

    let file_location = format!("{WELL_KNOWN_PATH}/{}", config.file_validation_filename);
    let validation_state = validation_state::seal(&ValidationState::new(domain.to_string(), request_type));

    Ok(FilePreparation {
        domain: domain.to_string(),
        file_location,
        challenge_type,
        random_value,
        validation_state,
    })
}

pub struct FileValidationRequest {
    pub domain: String,
    pub request_type: DcvRequestType,
    pub validation_state: String,
    pub random_value: Option<String>,
    pub request_token_data: Option<RequestTokenData>,
}

pub async fn validate(
    request: FileValidationRequest,
    config: &DcvConfig,
) -> Result<DomainValidationEvidence, DcvErrorSet> {
    if request.domain.starts_with("*.") {
        return Err(DcvErrorSet::single(DcvError::DomainInvalidWildcardNotAllowed));
    }

    let state = validation_state::open(&request.validation_state).map_err(DcvErrorSet::from)?;
    state
        .check(request.request_type, config.random_value_validity_period)
        .map_err(DcvErrorSet::from)?;

    let path = format!("{WELL_KNOWN_PATH}/{}", config.file_validation_filename);
    let urls = HttpFileProbeClient::candidate_urls(
        &request.domain,
        &path,
        config.file_validation_check_https,
        config.file_validation_check_https_first,
    );
    let client = config.mpic_client.as_ref();

    let (found_value, details) = match request.request_type.challenge_type() {
        ChallengeType::RandomValue => {
            let random_value = request
                .random_value
                .ok_or(DcvErrorSet::single(DcvError::RandomValueRequired))?;
            let details = mpic::get_mpic_file_details_list(client, &urls, Some(&random_value)).await;
            if let Some(err) = details.dcv_error.clone() {
                return Err(DcvErrorSet::single(err));
            }
            find_random_value(&[details.file_content.as_str()], &random_value)?;
            (random_value, details)
        }
        ChallengeType::RequestToken => {
            let token_data = request
                .request_token_data
                .ok_or(DcvErrorSet::single(DcvError::RequestTokenDataRequired))?;
            let (url, token) =
                discover_request_token(client, &urls, &token_data, config.request_token_validator.as_ref())
                    .await?;
            let details = mpic::get_mpic_file_details(client, &url, Some(&token)).await;
            if let Some(err) = details.dcv_error.clone() {
                return Err(DcvErrorSet::single(err));
            }
            (token, details)
        }
    };

    Ok(DomainValidationEvidence {
        domain: request.domain,
        method: DcvMethod::Br3_2_2_4_18,
        br_version: crate::state::BR_VERSION.to_string(),
        validation_date: chrono::Utc::now(),
        dns_type: None,
        dns_record_name: None,
        dns_server: None,
        file_url: Some(details.file_url.clone()),
        email_address: None,
        random_value: Some(found_value),
        request_token: None,
        mpic_details: details.mpic_details,
    })
}

/// Scans each candidate URL's primary-only body for a token whose
/// format and `hashingKey`/`hashingValue` binding verify against
/// `validator`, trying URLs in order (spec §4.8, mirrors
/// `dns::discover_request_token`).
async fn discover_request_token(
    client: &dyn MpicClient,
    urls: &[String],
    token_data: &RequestTokenData,
    validator: &dyn RequestTokenValidator,
) -> Result<(String, String), DcvErrorSet> {
    for url in urls {
        let primary = mpic::get_primary_only_file_details(client, url).await;
        if let Ok(found) = validator.find_token(&[primary.file_content.as_str()], token_data) {
            return Ok((url.clone(), found.challenge_value));
        }
    }
    Err(DcvErrorSet::single(DcvError::RequestTokenErrorNotFound))
}
