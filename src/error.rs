use std::fmt;

/// The full DCV error taxonomy (spec §7). Each validator and probe client
/// maps its failures onto one of these variants; nothing here is raised as
/// a panic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DcvError {
    // -- Input --
    #[error("domain is required")]
    DomainRequired,
    #[error("domain does not match the required name pattern")]
    DomainInvalidIncorrectNamePattern,
    #[error("domain exceeds the maximum allowed length")]
    DomainInvalidTooLong,
    #[error("domain is not under a public suffix")]
    DomainInvalidNotUnderPublicSuffix,
    #[error("wildcard domains are not allowed for this method")]
    DomainInvalidWildcardNotAllowed,
    #[error("a DNS record type is required")]
    DnsTypeRequired,
    #[error("a secret type is required")]
    SecretTypeRequired,
    #[error("a random value is required")]
    RandomValueRequired,
    #[error("random value does not carry sufficient entropy")]
    RandomValueInsufficientEntropy,
    #[error("request token data is required")]
    RequestTokenDataRequired,
    #[error("request token hashing key is required")]
    TokenKeyRequired,
    #[error("request token hashing value is required")]
    TokenValueRequired,
    #[error("the DCV method is not valid for this validator")]
    InvalidDcvMethod,
    #[error("validation state could not be parsed")]
    ValidationStateParsingError,
    #[error("validation state is missing a required field")]
    ValidationStateMissingField,

    // -- State --
    #[error("random value has expired")]
    RandomValueExpired,

    // -- DNS probe --
    #[error("DNS lookup received a bad request")]
    DnsLookupBadRequest,
    #[error("DNS lookup timed out")]
    DnsLookupTimeout,
    #[error("DNS lookup failed due to an I/O error")]
    DnsLookupIoException,
    #[error("DNS lookup found no such domain")]
    DnsLookupDomainNotFound,
    #[error("DNS lookup found no matching records")]
    DnsLookupRecordNotFound,
    #[error("DNS lookup response could not be parsed")]
    DnsLookupTextParseException,
    #[error("DNS lookup could not resolve the host")]
    DnsLookupUnknownHostException,

    // -- File probe --
    #[error("file validation request was malformed")]
    FileValidationBadRequest,
    #[error("file validation endpoint returned a client error")]
    FileValidationClientError,
    #[error("file validation endpoint returned a server error")]
    FileValidationServerError,
    #[error("file validation request timed out")]
    FileValidationTimeout,
    #[error("file validation response was malformed")]
    FileValidationBadResponse,
    #[error("file validation endpoint could not be found")]
    FileValidationNotFound,
    #[error("file validation endpoint returned an unexpected status code")]
    FileValidationInvalidStatusCode,
    #[error("file validation response body was empty")]
    FileValidationEmptyResponse,
    #[error("file validation response body exceeded the configured limit")]
    FileValidationInvalidContent,

    // -- Challenge --
    #[error("the random value was not found in the probed artifact")]
    RandomValueNotFound,
    #[error("no request token matching the expected format was found")]
    RequestTokenErrorNotFound,
    #[error("the probed artifact had an empty text body")]
    RequestTokenEmptyTextBody,

    // -- MPIC --
    #[error("the MPIC client returned an invalid response")]
    MpicInvalidResponse,
    #[error("secondary perspectives did not corroborate the primary result")]
    MpicCorroborationError,

    // -- ACME --
    #[error("ACME validation failed")]
    AcmeValidationFailed,
    #[error("ACME key authorization digest could not be computed")]
    AcmeDnsKeyError,
    #[error("account is not configured for ACME validation")]
    AccountNotAcmeConfigured,

    // -- WHOIS --
    #[error("no contact emails were found in the WHOIS record")]
    WhoisNoEmailsFound,
    #[error("WHOIS server returned an empty response")]
    WhoisEmptyResponse,
    #[error("WHOIS query failed")]
    WhoisQueryError,
}

/// A non-empty accumulation of [`DcvError`]s.
///
/// Network errors accumulate across candidate names/URLs (spec §7
/// propagation policy); this is returned only once every candidate has
/// failed. Input/state errors are always a single-element set, since those
/// fail fast before any I/O is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcvErrorSet(Vec<DcvError>);

impl DcvErrorSet {
    pub fn single(err: DcvError) -> Self {
        Self(vec![err])
    }

    pub fn new(errors: Vec<DcvError>) -> Option<Self> {
        if errors.is_empty() { None } else { Some(Self(errors)) }
    }

    pub fn errors(&self) -> &[DcvError] {
        &self.0
    }

    pub fn first(&self) -> &DcvError {
        &self.0[0]
    }

    pub fn contains(&self, err: &DcvError) -> bool {
        self.0.contains(err)
    }

    pub fn merge(mut self, other: DcvErrorSet) -> Self {
        self.0.extend(other.0);
        self
    }
}

impl fmt::Display for DcvErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for DcvErrorSet {}

impl From<DcvError> for DcvErrorSet {
    fn from(err: DcvError) -> Self {
        DcvErrorSet::single(err)
    }
}

pub type DcvResult<T> = Result<T, DcvErrorSet>;

/// Errors raised while building a [`crate::config::DcvConfig`]. Kept distinct
/// from [`DcvError`] since these never occur at validation time, only at
/// startup (spec §6.5: "Invalid values reject at build time").
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("dnsServers must not be empty")]
    DnsServersEmpty,
    #[error("dnsDomainLabel must begin with '_': {0}")]
    DnsDomainLabelMissingUnderscore(String),
    #[error("fileValidationFilename must be 1-64 characters of [A-Za-z0-9._-]: {0}")]
    InvalidFileValidationFilename(String),
    #[error("randomValueValidityPeriod must be between 1 and 30 days, got {0}")]
    InvalidRandomValueValidityPeriod(u32),
    #[error("mpicClient is required")]
    MissingMpicClient,
}
