//! DNS validator, BR 3.2.2.4.7 (spec §4.6).

use crate::challenge::{RandomValueGenerator, RequestTokenData, RequestTokenValidator, find_random_value};
use crate::config::DcvConfig;
use crate::error::{DcvError, DcvErrorSet};
use crate::mpic::{self, MpicClient};
use crate::state::{
    ChallengeType, DcvMethod, DcvRequestType, DnsType, DomainValidationEvidence, ValidationState,
};
use crate::validation_state;

pub struct DnsPreparation {
    pub domain: String,
    pub allowed_fqdns: Vec<String>,
    pub dns_type: DnsType,
    pub challenge_type: ChallengeType,
    pub random_value: Option<String>,
    pub validation_state: String,
}

/// Generates the challenge (for `RANDOM_VALUE` request types) and the set
/// of FQDNs a successful validation of `domain` will authorize — the
/// domain plus every ancestor up to, but not including, its registry
/// suffix (spec §4.6 `allowedFqdns`).
pub fn prepare(
    domain: &str,
    request_type: DcvRequestType,
    config: &DcvConfig,
) -> Result<DnsPreparation, DcvErrorSet> {
    let dns_type = request_type
        .dns_record_type()
        .ok_or(DcvErrorSet::single(DcvError::DnsTypeRequired))?;

    config.psl.validate_domain_name(domain).map_err(DcvErrorSet::from)?;

    let allowed_fqdns = config.psl.domain_and_parents(domain).map_err(DcvErrorSet::from)?;

    let challenge_type = request_type.challenge_type();
    let random_value = match challenge_type {
        ChallengeType::RandomValue => Some(RandomValueGenerator::default_charset().generate()),
        ChallengeType::RequestToken => None,
    };

    let validation_state = validation_state::seal(&ValidationState::new(domain.to_string(), request_type));

    Ok(DnsPreparation {
        domain: domain.to_string(),
        allowed_fqdns,
        dns_type,
        challenge_type,
        random_value,
        validation_state,
    })
}

pub struct DnsValidationRequest {
    pub domain: String,
    pub request_type: DcvRequestType,
    pub validation_state: String,
    pub random_value: Option<String>,
    pub request_token_data: Option<RequestTokenData>,
}

/// Tries `[dnsDomainLabel + domain, domain]` in order; the first name
/// yielding a successful corroborated hit wins (spec §4.6).
pub async fn validate(
    request: DnsValidationRequest,
    config: &DcvConfig,
) -> Result<DomainValidationEvidence, DcvErrorSet> {
    crate::domain::validate_domain_syntax(&request.domain).map_err(DcvErrorSet::from)?;

    let state = validation_state::open(&request.validation_state).map_err(DcvErrorSet::from)?;
    state
        .check(request.request_type, config.random_value_validity_period)
        .map_err(DcvErrorSet::from)?;

    let dns_type = request
        .request_type
        .dns_record_type()
        .ok_or(DcvErrorSet::single(DcvError::DnsTypeRequired))?;

    let names = vec![
        format!("{}{}", config.dns_domain_label, request.domain),
        request.domain.clone(),
    ];

    let client = config.mpic_client.as_ref();

    let (record_name, found_value, details) = match request.request_type.challenge_type() {
        ChallengeType::RandomValue => {
            let random_value = request
                .random_value
                .clone()
                .ok_or(DcvErrorSet::single(DcvError::RandomValueRequired))?;
            config
                .random_value_validator
                .validate(&random_value)
                .map_err(DcvErrorSet::from)?;
            let details =
                mpic::get_dns_details_list(client, &names, dns_type, Some(&random_value)).await;
            if let Some(err) = details.dcv_error.clone() {
                return Err(DcvErrorSet::single(err));
            }
            find_random_value(
                &details.records.iter().map(String::as_str).collect::<Vec<_>>(),
                &random_value,
            )?;
            (details.domain.clone(), random_value, details)
        }
        ChallengeType::RequestToken => {
            let token_data = request
                .request_token_data
                .ok_or(DcvErrorSet::single(DcvError::RequestTokenDataRequired))?;
            let token = discover_request_token(
                client,
                &names,
                dns_type,
                &token_data,
                config.request_token_validator.as_ref(),
            )
            .await?;
            let details = mpic::get_dns_details_list(client, &names, dns_type, Some(&token)).await;
            if let Some(err) = details.dcv_error.clone() {
                return Err(DcvErrorSet::single(err));
            }
            (details.domain.clone(), token, details)
        }
    };

    Ok(DomainValidationEvidence {
        domain: request.domain,
        method: DcvMethod::Br3_2_2_4_7,
        br_version: crate::state::BR_VERSION.to_string(),
        validation_date: chrono::Utc::now(),
        dns_type: Some(dns_type),
        dns_record_name: Some(record_name),
        dns_server: None,
        file_url: None,
        email_address: None,
        random_value: Some(found_value),
        request_token: None,
        mpic_details: details.mpic_details,
    })
}

/// Scans each candidate name's primary-only records for a token whose
/// format and `hashingKey`/`hashingValue` binding verify against
/// `validator`, trying names in order (spec §4.6: "scan records for a
/// valid token").
async fn discover_request_token(
    client: &dyn MpicClient,
    names: &[String],
    dns_type: DnsType,
    token_data: &RequestTokenData,
    validator: &dyn RequestTokenValidator,
) -> Result<String, DcvErrorSet> {
    for name in names {
        let details = mpic::get_primary_only_dns_details(client, name, dns_type).await;
        let candidates: Vec<&str> = details.records.iter().map(String::as_str).collect();
        if let Ok(found) = validator.find_token(&candidates, token_data) {
            return Ok(found.challenge_value);
        }
    }
    Err(DcvErrorSet::single(DcvError::RequestTokenErrorNotFound))
}
