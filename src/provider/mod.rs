//! The three-legged token exchange and the checks every signed request passes.
//!
//! Each endpoint of the exchange lives in its own module as a free function over two seams: a
//! [`Request`], the canonical view of the inbound request, and an [`Endpoint`], which hands the
//! flow its credential store. A frontend translates its web stack's request type into a
//! [`Request`] (or uses [`CanonicalRequest`]), calls the flow, and renders the returned response
//! type or [`Error`].
//!
//! * [`request_token`]: a consumer obtains a fresh request token.
//! * [`authorization`]: an authenticated user approves the token.
//! * [`access_token`]: the consumer trades the approved token in; the request token row is
//!   deleted in the same step.
//!
//! Both signed endpoints funnel through the same pipeline: required parameters must be present,
//! the nonce must never have been seen for this (consumer, token) pair, and the signature must
//! verify under the declared method.
//!
//! [`Request`]: trait.Request.html
//! [`Endpoint`]: trait.Endpoint.html
//! [`CanonicalRequest`]: request/struct.CanonicalRequest.html
//! [`Error`]: error/enum.Error.html
//! [`request_token`]: request_token/fn.request_token.html
//! [`authorization`]: authorization/fn.authorization.html
//! [`access_token`]: access_token/fn.access_token.html
use std::borrow::Cow;

use chrono::{DateTime, TimeZone, Utc};

use crate::primitives::consumer::Consumer;
use crate::primitives::store::Store;
use crate::primitives::token::Token;

pub mod access_token;
pub mod authorization;
pub mod error;
pub mod request;
pub mod request_token;
pub mod signature;

use self::error::Error;

/// Trait based retrieval of the canonical parameters of an inbound request.
///
/// The parameter set is expected to already merge the query string, the urlencoded body and any
/// `Authorization: OAuth` header, with header values taking precedence.
/// [`CanonicalRequest::from_parts`] implements exactly that and most frontends should go through
/// it.
///
/// [`CanonicalRequest::from_parts`]: request/struct.CanonicalRequest.html#method.from_parts
pub trait Request {
    /// Received request might not be encoded correctly. This method gives implementors the
    /// chance to signal that a request was received but its encoding was generally malformed; if
    /// so, no other attribute will be queried.
    fn valid(&self) -> bool;

    /// The HTTP method of the request. Case does not matter, signing uppercases it.
    fn method(&self) -> Cow<str>;

    /// The base URL the request was made against: scheme, authority and path, no query.
    fn url(&self) -> Cow<str>;

    /// The **unique** value of a parameter.
    ///
    /// A parameter transmitted more than once must yield `None` here; order dependent handling
    /// of duplicates is how validation layers get subverted.
    fn parameter(&self, key: &str) -> Option<Cow<str>>;

    /// Every transmitted pair, duplicates included, for the signature base string.
    fn parameters(&self) -> Vec<(String, String)>;
}

/// Required functionality to execute a token exchange flow.
///
/// Each flow only needs the credential store; this trait is the point where an application wires
/// its chosen backend in.
pub trait Endpoint {
    /// The credential store holding consumers, tokens and nonces.
    fn store(&mut self) -> &mut dyn Store;
}

/// Parameters every signed request must carry.
const REQUIRED_PARAMETERS: [&str; 6] = [
    "oauth_consumer_key",
    "oauth_signature_method",
    "oauth_signature",
    "oauth_timestamp",
    "oauth_nonce",
    "oauth_version",
];

pub(crate) fn require<'a>(
    request: &'a dyn Request, name: &'static str,
) -> Result<Cow<'a, str>, Error> {
    request.parameter(name).ok_or(Error::MissingParameter(name))
}

pub(crate) fn parse_timestamp(request: &dyn Request) -> Result<DateTime<Utc>, Error> {
    let raw = require(request, "oauth_timestamp")?;
    let seconds: i64 = raw
        .parse()
        .map_err(|_| Error::Malformed("oauth_timestamp"))?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(Error::Malformed("oauth_timestamp"))
}

/// The shared gate of endpoints 1 and 3: parameter presence, replay protection, signature.
///
/// The nonce is recorded against the (consumer, token) pair before signature work begins, with
/// the empty string standing in for "no token". Any failure leaves no state behind other than
/// the recorded nonce.
pub(crate) fn verify_signed(
    store: &mut dyn Store, request: &dyn Request, consumer: &Consumer, token: Option<&Token>,
) -> Result<(), Error> {
    for &name in &REQUIRED_PARAMETERS {
        require(request, name)?;
    }

    if require(request, "oauth_version")? != "1.0" {
        return Err(Error::Malformed("oauth_version"));
    }
    parse_timestamp(request)?;

    let nonce = require(request, "oauth_nonce")?;
    let token_key = token.map(|token| token.key.as_str()).unwrap_or("");
    if !store.check_and_record_nonce(&consumer.key, token_key, &nonce)? {
        log::debug!("nonce replay for consumer {}", consumer.key);
        return Err(Error::NonceReplayed);
    }

    if !signature::verify(request, consumer, token) {
        log::debug!("signature verification failed for consumer {}", consumer.key);
        return Err(Error::SignatureFailed);
    }

    Ok(())
}
