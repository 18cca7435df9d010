//! Provides the handling for request token requests, the first leg of the exchange.
use crate::primitives::store::Store;
use crate::primitives::token::Callback;

use super::error::Error;
use super::{parse_timestamp, require, verify_signed, Endpoint, Request};

/// Issue a fresh request token to a signed consumer request.
///
/// Preconditions, in order: the request must carry `oauth_callback` (its absence is a protocol
/// violation under 1.0a semantics), the consumer key must resolve, the nonce must be fresh for
/// this consumer, and the signature must verify against the consumer secret with an empty token
/// secret. Every failure is a rejection before any token is created.
pub fn request_token(
    handler: &mut dyn Endpoint, request: &dyn Request,
) -> Result<IssuedRequestToken, Error> {
    if !request.valid() {
        return Err(Error::Malformed("request"));
    }

    let callback = require(request, "oauth_callback")?;
    let callback = Callback::parse(&callback).ok_or(Error::Malformed("oauth_callback"))?;
    let timestamp = parse_timestamp(request)?;

    let consumer_key = require(request, "oauth_consumer_key")?;
    let consumer = handler.store().get_consumer(&consumer_key)?;

    verify_signed(handler.store(), request, &consumer, None)?;

    let token = handler
        .store()
        .create_request_token(&consumer, callback, timestamp)?;

    Ok(IssuedRequestToken {
        token: token.key,
        secret: token.secret,
    })
}

/// The credentials returned from a successful request token call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedRequestToken {
    /// The request token key.
    pub token: String,

    /// The matching token secret.
    pub secret: String,
}

impl IssuedRequestToken {
    /// Render the `application/x-www-form-urlencoded` success body.
    ///
    /// The fixed `oauth_callback_confirmed=true` flag announces callback-aware (1.0a) behaviour.
    pub fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("oauth_token", &self.token)
            .append_pair("oauth_token_secret", &self.secret)
            .append_pair("oauth_callback_confirmed", "true")
            .finish()
    }
}
