//! Opaque serialization envelope for [`crate::state::ValidationState`]
//! (SPEC_FULL §3). Callers treat the sealed string as a black box; this
//! module just needs to round-trip it and reject anything it didn't
//! produce itself.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::DcvError;
use crate::state::ValidationState;

const ENVELOPE_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    state: ValidationState,
}

/// Serializes a [`ValidationState`] into an opaque, base64url string a
/// caller can persist and echo back unchanged.
pub fn seal(state: &ValidationState) -> String {
    let envelope = Envelope {
        v: ENVELOPE_VERSION,
        state: state.clone(),
    };
    let json = serde_json::to_vec(&envelope).expect("ValidationState always serializes");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

/// Parses a string previously produced by [`seal`]. Any malformed or
/// version-mismatched payload surfaces as `ValidationStateParsingError`
/// (spec §6.4).
pub fn open(sealed: &str) -> Result<ValidationState, DcvError> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(sealed)
        .map_err(|_| DcvError::ValidationStateParsingError)?;
    let envelope: Envelope =
        serde_json::from_slice(&bytes).map_err(|_| DcvError::ValidationStateParsingError)?;
    if envelope.v != ENVELOPE_VERSION {
        return Err(DcvError::ValidationStateParsingError);
    }
    Ok(envelope.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DcvRequestType;

    #[test]
    fn round_trips() {
        let state = ValidationState::new("example.com".to_string(), DcvRequestType::DnsTxt);
        let sealed = seal(&state);
        let opened = open(&sealed).unwrap();
        assert_eq!(state, opened);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            open("not-a-valid-envelope").unwrap_err(),
            DcvError::ValidationStateParsingError
        );
    }

    #[test]
    fn rejects_future_version() {
        let state = ValidationState::new("example.com".to_string(), DcvRequestType::DnsTxt);
        let envelope = Envelope { v: 99, state };
        let json = serde_json::to_vec(&envelope).unwrap();
        let sealed = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json);
        assert_eq!(open(&sealed).unwrap_err(), DcvError::ValidationStateParsingError);
    }
}
