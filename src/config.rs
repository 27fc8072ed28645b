use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::challenge::{
    DefaultRandomValueValidator, DefaultRequestTokenValidator, RandomValueValidator, RequestTokenValidator,
};
use crate::error::ConfigError;
use crate::mpic::MpicClient;
use crate::psl::{PslEngine, PslOverride};

/// Recognized configuration options (spec §6.5), validated once at build
/// time rather than surfacing bad values the first time they are used.
pub struct DcvConfig {
    pub dns_servers: Vec<String>,
    pub dns_timeout: Duration,
    pub dns_retries: u32,
    pub dns_domain_label: String,
    pub file_validation_filename: String,
    pub file_validation_check_https: bool,
    pub file_validation_check_https_first: bool,
    pub file_validation_connect_timeout: Duration,
    pub file_validation_read_timeout: Duration,
    pub file_validation_max_body_length: usize,
    pub file_validation_user_agent: String,
    pub random_value_validity_period: Duration,
    pub random_value_validator: Arc<dyn RandomValueValidator>,
    pub request_token_validator: Arc<dyn RequestTokenValidator>,
    pub psl: PslEngine,
    pub mpic_client: Arc<dyn MpicClient>,
}

impl DcvConfig {
    pub fn builder(mpic_client: Arc<dyn MpicClient>) -> DcvConfigBuilder {
        DcvConfigBuilder::new(mpic_client)
    }
}

pub struct DcvConfigBuilder {
    dns_servers: Vec<String>,
    dns_timeout: Duration,
    dns_retries: u32,
    dns_domain_label: String,
    file_validation_filename: String,
    file_validation_check_https: bool,
    file_validation_check_https_first: bool,
    file_validation_connect_timeout: Duration,
    file_validation_read_timeout: Duration,
    file_validation_max_body_length: usize,
    file_validation_user_agent: String,
    random_value_validity_period_days: u32,
    random_value_validator: Arc<dyn RandomValueValidator>,
    request_token_validator: Arc<dyn RequestTokenValidator>,
    psl_override_supplier: Option<Box<dyn PslOverride>>,
    mpic_client: Option<Arc<dyn MpicClient>>,
}

impl DcvConfigBuilder {
    pub fn new(mpic_client: Arc<dyn MpicClient>) -> Self {
        Self {
            dns_servers: vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()],
            dns_timeout: Duration::from_millis(15_000),
            dns_retries: 0,
            dns_domain_label: "_dnsauth.".to_string(),
            file_validation_filename: "fileauth.txt".to_string(),
            file_validation_check_https: true,
            file_validation_check_https_first: true,
            file_validation_connect_timeout: Duration::from_secs(2),
            file_validation_read_timeout: Duration::from_secs(2),
            file_validation_max_body_length: 4096,
            file_validation_user_agent: "dcv-core/1.0".to_string(),
            random_value_validity_period_days: 30,
            random_value_validator: Arc::new(DefaultRandomValueValidator),
            request_token_validator: Arc::new(DefaultRequestTokenValidator),
            psl_override_supplier: None,
            mpic_client: Some(mpic_client),
        }
    }

    pub fn dns_servers(mut self, servers: Vec<String>) -> Self {
        self.dns_servers = servers;
        self
    }

    pub fn dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    pub fn dns_retries(mut self, retries: u32) -> Self {
        self.dns_retries = retries;
        self
    }

    pub fn dns_domain_label(mut self, label: impl Into<String>) -> Self {
        self.dns_domain_label = label.into();
        self
    }

    pub fn file_validation_filename(mut self, filename: impl Into<String>) -> Self {
        self.file_validation_filename = filename.into();
        self
    }

    pub fn file_validation_check_https(mut self, enabled: bool) -> Self {
        self.file_validation_check_https = enabled;
        self
    }

    pub fn file_validation_check_https_first(mut self, https_first: bool) -> Self {
        self.file_validation_check_https_first = https_first;
        self
    }

    pub fn file_validation_connect_timeout(mut self, timeout: Duration) -> Self {
        self.file_validation_connect_timeout = timeout;
        self
    }

    pub fn file_validation_read_timeout(mut self, timeout: Duration) -> Self {
        self.file_validation_read_timeout = timeout;
        self
    }

    pub fn file_validation_max_body_length(mut self, max_bytes: usize) -> Self {
        self.file_validation_max_body_length = max_bytes;
        self
    }

    pub fn random_value_validity_period_days(mut self, days: u32) -> Self {
        self.random_value_validity_period_days = days;
        self
    }

    pub fn random_value_validator(mut self, validator: Arc<dyn RandomValueValidator>) -> Self {
        self.random_value_validator = validator;
        self
    }

    pub fn request_token_validator(mut self, validator: Arc<dyn RequestTokenValidator>) -> Self {
        self.request_token_validator = validator;
        self
    }

    pub fn psl_override_supplier(mut self, supplier: Box<dyn PslOverride>) -> Self {
        self.psl_override_supplier = Some(supplier);
        self
    }

    pub fn build(self) -> Result<DcvConfig, ConfigError> {
        if self.dns_servers.is_empty() {
            return Err(ConfigError::DnsServersEmpty);
        }
        if !self.dns_domain_label.starts_with('_') {
            return Err(ConfigError::DnsDomainLabelMissingUnderscore(
                self.dns_domain_label,
            ));
        }
        if !is_valid_filename(&self.file_validation_filename) {
            return Err(ConfigError::InvalidFileValidationFilename(
                self.file_validation_filename,
            ));
        }
        if !(1..=30).contains(&self.random_value_validity_period_days) {
            return Err(ConfigError::InvalidRandomValueValidityPeriod(
                self.random_value_validity_period_days,
            ));
        }
        let Some(mpic_client) = self.mpic_client else {
            return Err(ConfigError::MissingMpicClient);
        };

        let dns_domain_label = if self.dns_domain_label.ends_with('.') {
            self.dns_domain_label
        } else {
            warn!("[config] dnsDomainLabel missing trailing dot, appending one");
            format!("{}.", self.dns_domain_label)
        };

        let psl = match self.psl_override_supplier {
            Some(supplier) => PslEngine::builtin().with_override(supplier),
            None => PslEngine::builtin(),
        };

        Ok(DcvConfig {
            dns_servers: self.dns_servers,
            dns_timeout: self.dns_timeout,
            dns_retries: self.dns_retries,
            dns_domain_label,
            file_validation_filename: self.file_validation_filename,
            file_validation_check_https: self.file_validation_check_https,
            file_validation_check_https_first: self.file_validation_check_https_first,
            file_validation_connect_timeout: self.file_validation_connect_timeout,
            file_validation_read_timeout: self.file_validation_read_timeout,
            file_validation_max_body_length: self.file_validation_max_body_length,
            file_validation_user_agent: self.file_validation_user_agent,
            random_value_validity_period: Duration::from_secs(
                u64::from(self.random_value_validity_period_days) * 24 * 3600,
            ),
            random_value_validator: self.random_value_validator,
            request_token_validator: self.request_token_validator,
            psl,
            mpic_client,
        })
    }
}

fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
