//! Email validator (spec §4.7): BR 3.2.2.4.4 (constructed), 3.2.2.4.14
//! (DNS TXT contact), 3.2.2.4.13 (DNS CAA contact), plus an optional
//! WHOIS-sourced variant.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::challenge::RandomValueGenerator;
use crate::config::DcvConfig;
use crate::error::{DcvError, DcvErrorSet};
use crate::mpic;
use crate::net::WhoisClient;
use crate::state::{DcvMethod, DcvRequestType, DnsType, DomainValidationEvidence, MpicDetails, ValidationState};

const CONSTRUCTED_ROLES: &[&str] = &["admin", "administrator", "hostmaster", "postmaster", "webmaster"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSource {
    Constructed,
    DnsTxt,
    DnsCaa,
    Whois,
}

impl EmailSource {
    fn request_type(self) -> DcvRequestType {
        match self {
            EmailSource::Constructed | EmailSource::Whois => DcvRequestType::EmailConstructed,
            EmailSource::DnsTxt => DcvRequestType::EmailDnsTxt,
            EmailSource::DnsCaa => DcvRequestType::EmailDnsCaa,
        }
    }

    fn method(self) -> DcvMethod {
        self.request_type().method()
    }
}

pub struct EmailPreparationResponse {
    pub domain: String,
    pub email_source: EmailSource,
    pub email_with_random_value: Vec<(String, String)>,
    pub validation_state: String,
}

/// Sealed companion to the generic [`ValidationState`], carrying the
/// prepared `{email, randomValue}` pairs the email validator must
/// re-check at `validate` time (spec §4.7). Still opaque to callers —
/// the envelope format is this validator's own concern, not a
/// cross-method contract.
#[derive(Serialize, Deserialize)]
struct EmailEnvelope {
    v: u8,
    state: ValidationState,
    pairs: Vec<(String, String)>,
}

const EMAIL_ENVELOPE_VERSION: u8 = 1;

fn seal_email_state(state: &ValidationState, pairs: &[(String, String)]) -> String {
    let envelope = EmailEnvelope {
        v: EMAIL_ENVELOPE_VERSION,
        state: state.clone(),
        pairs: pairs.to_vec(),
    };
    let json = serde_json::to_vec(&envelope).expect("EmailEnvelope always serializes");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

fn open_email_state(sealed: &str) -> Result<(ValidationState, Vec<(String, String)>), DcvError> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(sealed)
        .map_err(|_| DcvError::ValidationStateParsingError)?;
    let envelope: EmailEnvelope =
        serde_json::from_slice(&bytes).map_err(|_| DcvError::ValidationStateParsingError)?;
    if envelope.v != EMAIL_ENVELOPE_VERSION {
        return Err(DcvError::ValidationStateParsingError);
    }
    Ok((envelope.state, envelope.pairs))
}

pub async fn prepare(
    domain: &str,
    source: EmailSource,
    config: &DcvConfig,
    whois: Option<&WhoisClient>,
) -> Result<EmailPreparationResponse, DcvErrorSet> {
    let candidates = discover_candidates(domain, source, config, whois).await?;

    let generator = RandomValueGenerator::default_charset();
    let email_with_random_value: Vec<(String, String)> =
        candidates.into_iter().map(|email| (email, generator.generate())).collect();

    let state = ValidationState::new(domain.to_string(), source.request_type());
    let validation_state = seal_email_state(&state, &email_with_random_value);

    Ok(EmailPreparationResponse {
        domain: domain.to_string(),
        email_source: source,
        email_with_random_value,
        validation_state,
    })
}

async fn discover_candidates(
    domain: &str,
    source: EmailSource,
    config: &DcvConfig,
    whois: Option<&WhoisClient>,
) -> Result<Vec<String>, DcvErrorSet> {
    match source {
        EmailSource::Constructed => Ok(CONSTRUCTED_ROLES
            .iter()
            .map(|role| format!("{role}@{domain}"))
            .collect()),
        EmailSource::DnsTxt => {
            let name = format!("_validation-contactemail.{domain}");
            let client = config.mpic_client.as_ref();
            let details = mpic::get_dns_details(client, &name, DnsType::Txt, None).await;
            if let Some(err) = details.dcv_error {
                return Err(DcvErrorSet::single(err));
            }
            let emails: Vec<String> = details
                .records
                .iter()
                .filter_map(|record| parse_candidate_email(record))
                .collect();
            if emails.is_empty() {
                return Err(DcvErrorSet::single(DcvError::DnsLookupRecordNotFound));
            }
            Ok(emails)
        }
        EmailSource::DnsCaa => {
            let client = config.mpic_client.as_ref();
            let details = mpic::get_dns_details(client, domain, DnsType::Caa, None).await;
            if let Some(err) = details.dcv_error {
                return Err(DcvErrorSet::single(err));
            }
            let emails: Vec<String> = details
                .records
                .iter()
                .filter(|record| record.to_ascii_lowercase().contains("contactemail"))
                .filter_map(|record| parse_candidate_email(record))
                .collect();
            if emails.is_empty() {
                return Err(DcvErrorSet::single(DcvError::DnsLookupRecordNotFound));
            }
            Ok(emails)
        }
        EmailSource::Whois => {
            let whois = whois.ok_or(DcvErrorSet::single(DcvError::WhoisQueryError))?;
            whois.lookup_emails(domain).await.map_err(DcvErrorSet::from)
        }
    }
}

/// Strips surrounding quotes/whitespace and accepts the remainder only
/// if it is a syntactically plausible email address (spec §4.7: no
/// control chars, exactly one `@`, no consecutive dots, valid domain
/// side per §4.1).
fn parse_candidate_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('"').trim();
    let candidate = trimmed.rsplit(' ').next().unwrap_or(trimmed);
    if is_valid_email_syntax(candidate) {
        Some(candidate.to_string())
    } else {
        None
    }
}

fn is_valid_email_syntax(email: &str) -> bool {
    if email.chars().any(|c| c.is_control()) {
        return false;
    }
    let Some((local, domain_part)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain_part.is_empty() {
        return false;
    }
    if domain_part.matches('@').count() > 0 {
        return false;
    }
    if local.contains("..") || domain_part.contains("..") {
        return false;
    }
    crate::domain::validate_domain_syntax(&domain_part.to_ascii_lowercase()).is_ok()
}

pub struct EmailValidationRequest {
    pub domain: String,
    pub email_source: EmailSource,
    pub email_address: String,
    pub random_value: String,
    pub validation_state: String,
}

pub fn validate(
    request: EmailValidationRequest,
    config: &DcvConfig,
) -> Result<DomainValidationEvidence, DcvErrorSet> {
    let (state, pairs) = open_email_state(&request.validation_state).map_err(DcvErrorSet::from)?;
    state
        .check(request.email_source.request_type(), config.random_value_validity_period)
        .map_err(DcvErrorSet::from)?;

    let matched = pairs
        .iter()
        .any(|(email, value)| *email == request.email_address && *value == request.random_value);
    if !matched {
        return Err(DcvErrorSet::single(DcvError::RandomValueNotFound));
    }

    Ok(DomainValidationEvidence {
        domain: request.domain,
        method: request.email_source.method(),
        br_version: crate::state::BR_VERSION.to_string(),
        validation_date: chrono::Utc::now(),
        dns_type: None,
        dns_record_name: None,
        dns_server: None,
        file_url: None,
        email_address: Some(request.email_address),
        random_value: Some(request.random_value),
        request_token: None,
        mpic_details: MpicDetails {
            corroborated: true,
            primary_agent_id: "n/a".to_string(),
            secondaries_checked: 0,
            secondaries_corroborated: 0,
            per_agent_corroboration: Default::default(),
            cname_chain: None,
        },
    })
}
