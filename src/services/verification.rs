//! One-time email verification codes.
//!
//! A code is `base64url("<user id>:<token>")`, so the link alone identifies
//! the account. The token half is random hex; only its SHA-256 is stored.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use uuid::Uuid;

const CODE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CodeError {
    #[error("Verification code is not valid base64url")]
    Encoding,

    #[error("Verification code is malformed")]
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub user_id: Uuid,
    pub token: String,
}

pub fn encode_code(user_id: Uuid, token: &str) -> String {
    CODE_ENGINE.encode(format!("{}:{}", user_id, token))
}

pub fn decode_code(code: &str) -> Result<VerificationCode, CodeError> {
    let bytes = CODE_ENGINE
        .decode(code.trim())
        .map_err(|_| CodeError::Encoding)?;
    let decoded = String::from_utf8(bytes).map_err(|_| CodeError::Encoding)?;

    let (user_id, token) = decoded.split_once(':').ok_or(CodeError::Malformed)?;
    if token.is_empty() {
        return Err(CodeError::Malformed);
    }

    let user_id = Uuid::parse_str(user_id).map_err(|_| CodeError::Malformed)?;

    Ok(VerificationCode {
        user_id,
        token: token.to_string(),
    })
}
