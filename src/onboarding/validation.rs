//! Local input checks run before anything reaches the gateway.

use std::sync::LazyLock;

use regex::Regex;

use super::model::ErrorInfo;

/// Minimum accepted phone number length, in characters.
pub const MIN_PHONE_LEN: usize = 10;

static PIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("valid PIN regex"));

/// Both document images must carry bytes.
pub fn validate_documents(id_image: &[u8], selfie_image: &[u8]) -> Result<(), ErrorInfo> {
    if id_image.is_empty() {
        return Err(ErrorInfo::validation("ID document image is missing"));
    }
    if selfie_image.is_empty() {
        return Err(ErrorInfo::validation("Selfie image is missing"));
    }
    Ok(())
}

/// Non-blank and at least [`MIN_PHONE_LEN`] characters. Returns the trimmed
/// number.
pub fn validate_phone(phone: &str) -> Result<&str, ErrorInfo> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ErrorInfo::validation("Enter your phone number"));
    }
    if phone.chars().count() < MIN_PHONE_LEN {
        return Err(ErrorInfo::validation(format!(
            "Phone number must be at least {MIN_PHONE_LEN} characters"
        )));
    }
    Ok(phone)
}

pub fn validate_otp(code: &str) -> Result<&str, ErrorInfo> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ErrorInfo::validation("Enter the code we sent you"));
    }
    Ok(code)
}

/// Exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), ErrorInfo> {
    if PIN_RE.is_match(pin) {
        Ok(())
    } else {
        Err(ErrorInfo::validation("PIN must be exactly 4 digits"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::ErrorKind;

    #[test]
    fn documents_need_both_payloads() {
        assert!(validate_documents(b"id", b"selfie").is_ok());
        assert_eq!(
            validate_documents(b"", b"selfie").unwrap_err().code,
            ErrorKind::ValidationError
        );
        assert!(validate_documents(b"id", b"").is_err());
    }

    #[test]
    fn phone_length_boundary() {
        assert!(validate_phone("123456789").is_err());
        assert_eq!(validate_phone("1234567890").unwrap(), "1234567890");
        assert_eq!(validate_phone("  +254700000000 ").unwrap(), "+254700000000");
    }

    #[test]
    fn blank_phone_rejected() {
        let err = validate_phone("   ").unwrap_err();
        assert_eq!(err.code, ErrorKind::ValidationError);
        assert_eq!(err.message, "Enter your phone number");
    }

    #[test]
    fn pin_must_be_four_ascii_digits() {
        assert!(validate_pin("4821").is_ok());
        assert!(validate_pin("0000").is_ok());
        for bad in ["", "123", "12345", "12a4", " 123", "١٢٣٤"] {
            assert!(validate_pin(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn otp_must_not_be_blank() {
        assert!(validate_otp(" ").is_err());
        assert_eq!(validate_otp(" 445566 ").unwrap(), "445566");
    }
}
