//! Signature methods and the verification of signed requests.
//!
//! OAuth 1.0a commits a request to its parameters by signing a canonical base string: the
//! uppercase HTTP method, the base URL and the sorted, encoded parameter set, joined with `&`
//! after encoding each part. The signing key concatenates the encoded consumer secret and the
//! encoded token secret (empty when no token is in play).
//!
//! Verification never errors on a bad signature, it simply does not verify. The closed set of
//! supported methods means any unknown `oauth_signature_method` value fails closed.
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::primitives::consumer::Consumer;
use crate::primitives::token::Token;

use super::Request;

type HmacSha1 = Hmac<Sha1>;

/// Everything outside the RFC 3986 unreserved set is escaped, as RFC 5849 demands.
const PARAMETER_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The closed set of supported signature methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureMethod {
    /// Keyed SHA-1 MAC over the signature base string.
    HmacSha1,

    /// The signature is the signing key itself. Only acceptable over a confidential transport.
    Plaintext,
}

/// Error marker for an `oauth_signature_method` value outside the supported set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnsupportedMethod;

impl FromStr for SignatureMethod {
    type Err = UnsupportedMethod;

    fn from_str(raw: &str) -> Result<SignatureMethod, UnsupportedMethod> {
        match raw {
            "HMAC-SHA1" => Ok(SignatureMethod::HmacSha1),
            "PLAINTEXT" => Ok(SignatureMethod::Plaintext),
            _ => Err(UnsupportedMethod),
        }
    }
}

/// Percent-encode a parameter component with the OAuth encode set.
pub fn percent_encode(raw: &str) -> String {
    utf8_percent_encode(raw, PARAMETER_ENCODE_SET).to_string()
}

/// Assemble the signing key from the consumer secret and the optional token secret.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or(""))
    )
}

/// Construct the signature base string for a canonical request.
///
/// All transmitted parameters except `oauth_signature` take part, sorted by encoded key and then
/// encoded value.
pub fn base_string(request: &dyn Request) -> String {
    let mut pairs: Vec<(String, String)> = request
        .parameters()
        .into_iter()
        .filter(|(key, _)| key != "oauth_signature")
        .map(|(key, value)| (percent_encode(&key), percent_encode(&value)))
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        request.method().to_ascii_uppercase(),
        percent_encode(request.url().as_ref()),
        percent_encode(&normalized)
    )
}

/// Compute the base64 encoded HMAC-SHA1 signature for a request.
///
/// This is the signature a correctly behaving client would transmit; it is exposed for client
/// implementations and tests.
pub fn hmac_sha1_signature(
    request: &dyn Request, consumer_secret: &str, token_secret: Option<&str>,
) -> String {
    let key = signing_key(consumer_secret, token_secret);
    STANDARD.encode(hmac_tag(&key, &base_string(request)))
}

/// Check the supplied `oauth_signature` against the one the request parameters demand.
///
/// Returns `false` for a missing, undecodable or mismatching signature and for any signature
/// method outside the supported set: a badly signed request is unverified, not an error.
pub fn verify(request: &dyn Request, consumer: &Consumer, token: Option<&Token>) -> bool {
    let supplied = match request.parameter("oauth_signature") {
        Some(supplied) => supplied.into_owned(),
        None => return false,
    };

    let method = match request.parameter("oauth_signature_method") {
        Some(raw) => match raw.as_ref().parse::<SignatureMethod>() {
            Ok(method) => method,
            // Unknown methods fail closed.
            Err(UnsupportedMethod) => return false,
        },
        None => return false,
    };

    let key = signing_key(&consumer.secret, token.map(|token| token.secret.as_str()));

    match method {
        SignatureMethod::Plaintext => constant_time_eq(supplied.as_bytes(), key.as_bytes()),
        SignatureMethod::HmacSha1 => {
            let expected = hmac_tag(&key, &base_string(request));
            let supplied = match STANDARD.decode(supplied.as_bytes()) {
                Ok(raw) => raw,
                Err(_) => return false,
            };
            constant_time_eq(&supplied, &expected)
        }
    }
}

fn hmac_tag(key: &str, message: &str) -> Vec<u8> {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
