//! End-to-end prepare/validate scenarios across the public validator API
//! (spec §8.3): each test drives a full method's prepare→validate round
//! trip against a `StubMpicClient`, with no real network I/O.

use std::sync::Arc;

use dcv_core::challenge::{RequestTokenData, default_expected_token};
use dcv_core::mpic::testing::StubMpicClient;
use dcv_core::mpic::{CorroborationStatus, MpicDnsResponse, MpicFileResponse, SecondaryResult};
use dcv_core::validators::{acme, dns, email, file};
use dcv_core::{DcvConfig, DcvError, DcvMethod, DcvRequestType};

fn corroborated_dns(records: Vec<&str>) -> MpicDnsResponse {
    MpicDnsResponse {
        primary_agent_id: "primary".to_string(),
        primary_records: records.into_iter().map(str::to_string).collect(),
        secondary_results: vec![SecondaryResult {
            agent_id: "secondary-1".to_string(),
            corroborates: true,
        }],
        status: CorroborationStatus::Corroborated,
        cname_chain: None,
    }
}

fn corroborated_file(body: &str) -> MpicFileResponse {
    MpicFileResponse {
        primary_agent_id: "primary".to_string(),
        primary_status_code: 200,
        primary_body: body.to_string(),
        secondary_results: vec![SecondaryResult {
            agent_id: "secondary-1".to_string(),
            corroborates: true,
        }],
        status: CorroborationStatus::Corroborated,
    }
}

#[tokio::test]
async fn dns_txt_happy_path_uses_dnsauth_label() {
    let bootstrap_config = DcvConfig::builder(Arc::new(StubMpicClient::default())).build().unwrap();
    let prep = dns::prepare("example.com", DcvRequestType::DnsTxt, &bootstrap_config).unwrap();
    let random_value = prep.random_value.clone().unwrap();

    let client = StubMpicClient::builder()
        .dns_response("_dnsauth.example.com", corroborated_dns(vec![random_value.as_str()]))
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let evidence = dns::validate(
        dns::DnsValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::DnsTxt,
            validation_state: prep.validation_state,
            random_value: Some(random_value),
            request_token_data: None,
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(evidence.method, DcvMethod::Br3_2_2_4_7);
    assert_eq!(evidence.dns_record_name, Some("_dnsauth.example.com".to_string()));
}

#[tokio::test]
async fn dns_txt_falls_back_to_bare_domain_when_label_empty() {
    let bootstrap_config = DcvConfig::builder(Arc::new(StubMpicClient::default())).build().unwrap();
    let prep = dns::prepare("example.com", DcvRequestType::DnsTxt, &bootstrap_config).unwrap();
    let random_value = prep.random_value.clone().unwrap();

    let client = StubMpicClient::builder()
        .dns_response("_dnsauth.example.com", corroborated_dns(vec![]))
        .dns_response("example.com", corroborated_dns(vec![random_value.as_str()]))
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let evidence = dns::validate(
        dns::DnsValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::DnsTxt,
            validation_state: prep.validation_state,
            random_value: Some(random_value),
            request_token_data: None,
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(evidence.dns_record_name, Some("example.com".to_string()));
}

#[tokio::test]
async fn file_random_value_non_corroborated_is_rejected_by_default() {
    let config = DcvConfig::builder(Arc::new(StubMpicClient::default())).build().unwrap();
    let prep = file::prepare("example.com", DcvRequestType::FileValidation, &config).unwrap();
    let random_value = prep.random_value.clone().unwrap();
    let url = "https://example.com/.well-known/pki-validation/fileauth.txt".to_string();

    let client = StubMpicClient::builder()
        .file_response(
            &url,
            MpicFileResponse {
                primary_agent_id: "primary".to_string(),
                primary_status_code: 200,
                primary_body: random_value.clone(),
                secondary_results: vec![SecondaryResult {
                    agent_id: "secondary-1".to_string(),
                    corroborates: false,
                }],
                status: CorroborationStatus::NonCorroborated,
            },
        )
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let err = file::validate(
        file::FileValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::FileValidation,
            validation_state: prep.validation_state,
            random_value: Some(random_value),
            request_token_data: None,
        },
        &config,
    )
    .await
    .unwrap_err();

    assert_eq!(err.first(), &DcvError::MpicCorroborationError);
}

#[tokio::test]
async fn file_random_value_non_corroborated_allowed_when_enforcement_disabled() {
    let config = DcvConfig::builder(Arc::new(StubMpicClient::default())).build().unwrap();
    let prep = file::prepare("example.com", DcvRequestType::FileValidation, &config).unwrap();
    let random_value = prep.random_value.clone().unwrap();
    let url = "https://example.com/.well-known/pki-validation/fileauth.txt".to_string();

    let client = StubMpicClient::builder()
        .enforce_corroboration(false)
        .file_response(
            &url,
            MpicFileResponse {
                primary_agent_id: "primary".to_string(),
                primary_status_code: 200,
                primary_body: random_value.clone(),
                secondary_results: vec![SecondaryResult {
                    agent_id: "secondary-1".to_string(),
                    corroborates: false,
                }],
                status: CorroborationStatus::NonCorroborated,
            },
        )
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let evidence = file::validate(
        file::FileValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::FileValidation,
            validation_state: prep.validation_state,
            random_value: Some(random_value),
            request_token_data: None,
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(evidence.method, DcvMethod::Br3_2_2_4_18);
}

#[tokio::test]
async fn acme_http01_round_trip() {
    let token = "challenge-token-xyz";
    let thumbprint = "account-thumbprint";
    let key_authorization = format!("{token}.{thumbprint}");
    let url = format!("http://example.com/.well-known/acme-challenge/{token}");

    let client = StubMpicClient::builder()
        .file_response(&url, corroborated_file(&key_authorization))
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let evidence = acme::validate(
        acme::AcmeValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::AcmeHttp,
            token: token.to_string(),
            acme_thumbprint: Some(thumbprint.to_string()),
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(evidence.method, DcvMethod::AcmeHttp01);
    assert_eq!(evidence.file_url, Some(url));
}

#[tokio::test]
async fn acme_dns01_round_trip() {
    let token = "challenge-token-xyz";
    let thumbprint = "account-thumbprint";
    let key_authorization = format!("{token}.{thumbprint}");

    use base64::Engine as _;
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(key_authorization.as_bytes());
    let expected = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest);

    let client = StubMpicClient::builder()
        .dns_response("_acme-challenge.example.com", corroborated_dns(vec![expected.as_str()]))
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let evidence = acme::validate(
        acme::AcmeValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::AcmeDns,
            token: token.to_string(),
            acme_thumbprint: Some(thumbprint.to_string()),
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(evidence.method, DcvMethod::AcmeDns01);
}

#[tokio::test]
async fn email_constructed_round_trip() {
    let config = DcvConfig::builder(Arc::new(StubMpicClient::default())).build().unwrap();
    let prep = email::prepare("example.com", email::EmailSource::Constructed, &config, None)
        .await
        .unwrap();
    let (chosen_email, random_value) = prep.email_with_random_value[2].clone();

    let evidence = email::validate(
        email::EmailValidationRequest {
            domain: "example.com".to_string(),
            email_source: email::EmailSource::Constructed,
            email_address: chosen_email.clone(),
            random_value,
            validation_state: prep.validation_state,
        },
        &config,
    )
    .unwrap();

    assert_eq!(evidence.email_address, Some(chosen_email));
    assert_eq!(evidence.method, DcvMethod::Br3_2_2_4_4);
}

#[tokio::test]
async fn dns_request_token_rejects_unbound_attacker_txt() {
    let token_data = RequestTokenData {
        hashing_key: "order-key".to_string(),
        hashing_value: "order-value".to_string(),
    };

    let client = StubMpicClient::builder()
        .primary_dns_response(
            "_dnsauth.example.com",
            dcv_core::mpic::PrimaryDnsResponse {
                agent_id: "primary".to_string(),
                records: vec!["request-token=deadbeef".to_string()],
            },
        )
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let state = dcv_core::state::ValidationState::new("example.com".to_string(), DcvRequestType::DnsTxtToken);
    let sealed = dcv_core::validation_state::seal(&state);

    let err = dns::validate(
        dns::DnsValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::DnsTxtToken,
            validation_state: sealed,
            random_value: None,
            request_token_data: Some(token_data),
        },
        &config,
    )
    .await
    .unwrap_err();

    assert_eq!(err.first(), &DcvError::RequestTokenErrorNotFound);
}

#[tokio::test]
async fn dns_request_token_accepts_bound_token_and_corroborates() {
    let token_data = RequestTokenData {
        hashing_key: "order-key".to_string(),
        hashing_value: "order-value".to_string(),
    };
    let expected = default_expected_token(&token_data);
    let record = format!("request-token={expected}");

    let client = StubMpicClient::builder()
        .primary_dns_response(
            "_dnsauth.example.com",
            dcv_core::mpic::PrimaryDnsResponse {
                agent_id: "primary".to_string(),
                records: vec![record.clone()],
            },
        )
        .dns_response("_dnsauth.example.com", corroborated_dns(vec![record.as_str()]))
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let state = dcv_core::state::ValidationState::new("example.com".to_string(), DcvRequestType::DnsTxtToken);
    let sealed = dcv_core::validation_state::seal(&state);

    let evidence = dns::validate(
        dns::DnsValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::DnsTxtToken,
            validation_state: sealed,
            random_value: None,
            request_token_data: Some(token_data),
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(evidence.dns_record_name, Some("_dnsauth.example.com".to_string()));
}

#[tokio::test]
async fn file_request_token_rejects_unbound_attacker_body() {
    let token_data = RequestTokenData {
        hashing_key: "order-key".to_string(),
        hashing_value: "order-value".to_string(),
    };
    let config = DcvConfig::builder(Arc::new(StubMpicClient::default())).build().unwrap();
    let prep = file::prepare("example.com", DcvRequestType::FileValidationToken, &config).unwrap();
    let url = "https://example.com/.well-known/pki-validation/fileauth.txt".to_string();

    let client = StubMpicClient::builder()
        .primary_file_response(
            &url,
            dcv_core::mpic::PrimaryFileResponse {
                agent_id: "primary".to_string(),
                status_code: 200,
                body: "request-token=deadbeef".to_string(),
            },
        )
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let err = file::validate(
        file::FileValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::FileValidationToken,
            validation_state: prep.validation_state,
            random_value: None,
            request_token_data: Some(token_data),
        },
        &config,
    )
    .await
    .unwrap_err();

    assert_eq!(err.first(), &DcvError::RequestTokenErrorNotFound);
}

#[tokio::test]
async fn file_request_token_accepts_bound_token_and_corroborates() {
    let token_data = RequestTokenData {
        hashing_key: "order-key".to_string(),
        hashing_value: "order-value".to_string(),
    };
    let expected = default_expected_token(&token_data);

    let config = DcvConfig::builder(Arc::new(StubMpicClient::default())).build().unwrap();
    let prep = file::prepare("example.com", DcvRequestType::FileValidationToken, &config).unwrap();
    let url = "https://example.com/.well-known/pki-validation/fileauth.txt".to_string();

    let client = StubMpicClient::builder()
        .primary_file_response(
            &url,
            dcv_core::mpic::PrimaryFileResponse {
                agent_id: "primary".to_string(),
                status_code: 200,
                body: expected.clone(),
            },
        )
        .file_response(&url, corroborated_file(&expected))
        .build();
    let config = DcvConfig::builder(Arc::new(client)).build().unwrap();

    let evidence = file::validate(
        file::FileValidationRequest {
            domain: "example.com".to_string(),
            request_type: DcvRequestType::FileValidationToken,
            validation_state: prep.validation_state,
            random_value: None,
            request_token_data: Some(token_data),
        },
        &config,
    )
    .await
    .unwrap();

    assert_eq!(evidence.method, DcvMethod::Br3_2_2_4_18);
}
