//! Domain name normalization and syntax validation (spec §3 "Domain name").

use crate::error::DcvError;

pub const MAX_DOMAIN_LENGTH: usize = 253;
pub const MAX_LABEL_LENGTH: usize = 63;
pub const MAX_LABELS: usize = 127;

/// Normalizes a caller-supplied domain to lowercase ASCII (IDNA A-label
/// form) with any trailing dot stripped, the way the teacher's
/// `normalize_domain_for_storage` does for inventory persistence.
pub fn normalize_domain(input: &str) -> Result<String, DcvError> {
    let trimmed = input.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(DcvError::DomainRequired);
    }
    let ascii = idna::domain_to_ascii(trimmed)
        .map_err(|_| DcvError::DomainInvalidIncorrectNamePattern)?;
    // idna lower-cases ASCII already, but never rely on locale-sensitive
    // case folding (e.g. Turkish dotless i) for a domain name.
    Ok(ascii_lowercase(&ascii))
}

fn ascii_lowercase(s: &str) -> String {
    s.bytes()
        .map(|b| b.to_ascii_lowercase() as char)
        .collect()
}

/// Validates the syntax rules from spec §3, over an already-normalized
/// (lowercase ASCII) domain. Does not consult the PSL; see
/// [`crate::psl::PslEngine::validate_domain_name`] for the full check
/// including "must live under a public suffix".
pub fn validate_domain_syntax(domain: &str) -> Result<(), DcvError> {
    if domain.is_empty() {
        return Err(DcvError::DomainRequired);
    }
    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(DcvError::DomainInvalidTooLong);
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() > MAX_LABELS {
        return Err(DcvError::DomainInvalidIncorrectNamePattern);
    }

    for (idx, label) in labels.iter().enumerate() {
        validate_label(label, idx == labels.len() - 1)?;
    }

    Ok(())
}

fn validate_label(label: &str, is_last: bool) -> Result<(), DcvError> {
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return Err(DcvError::DomainInvalidIncorrectNamePattern);
    }
    if !label
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(DcvError::DomainInvalidIncorrectNamePattern);
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(DcvError::DomainInvalidIncorrectNamePattern);
    }
    if label.starts_with('_') || label.ends_with('_') {
        return Err(DcvError::DomainInvalidIncorrectNamePattern);
    }
    if is_last && label.as_bytes()[0].is_ascii_digit() {
        return Err(DcvError::DomainInvalidIncorrectNamePattern);
    }
    Ok(())
}

/// Normalizes a domain for display (Unicode form), mirroring the teacher's
/// `normalize_domain_for_display`. Never used for comparisons or storage
/// keys — only for presenting a human-readable domain back to a caller.
pub fn normalize_domain_for_display(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('.');
    let (unicode, _) = idna::domain_to_unicode(trimmed);
    ascii_lowercase_preserving_unicode(&unicode)
}

fn ascii_lowercase_preserving_unicode(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}
