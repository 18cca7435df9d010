//! Provides the handling for the user-facing authorization step.
//!
//! This endpoint requires an authenticated end-user, which is deliberately the calling
//! application's concern: sessions, login redirects and the consent form are rendered outside
//! this library. The flow here only validates the token, exposes what the consent page needs,
//! and executes the approval.
use url::Url;

use crate::primitives::consumer::Consumer;
use crate::primitives::store::Store;
use crate::primitives::token::{Callback, Token};

use super::error::Error;
use super::{require, Endpoint, Request};

/// Resolve the request token named by an authorization request.
///
/// The token must exist and still be unauthorized; an approved token cannot enter the
/// authorization step a second time, its verifier is minted exactly once. Nothing is mutated
/// here. The returned [`Pending`] is what the calling application shows its consent page for,
/// and only [`Pending::authorize`] changes state.
///
/// [`Pending`]: struct.Pending.html
/// [`Pending::authorize`]: struct.Pending.html#method.authorize
pub fn authorization(handler: &mut dyn Endpoint, request: &dyn Request) -> Result<Pending, Error> {
    if !request.valid() {
        return Err(Error::Malformed("request"));
    }

    let token_key = require(request, "oauth_token")?;
    let token = handler.store().get_request_token(&token_key)?;

    if token.approved {
        return Err(Error::InvalidRequestToken);
    }

    let consumer = handler.store().consumer_for_request_token(&token.key)?;

    Ok(Pending { token, consumer })
}

/// A valid, not yet approved authorization request.
///
/// Dropping this value is the denial path and leaves the token untouched.
// Don't ever implement `Clone` here. It must be hard to accidentally respond to a request in two
// conflicting ways, which has security impact if one of them was an approval.
pub struct Pending {
    token: Token,
    consumer: Consumer,
}

/// How the verifier travels back to the consumer after approval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// Send the user-agent to the consumer's callback; token key and verifier ride along as
    /// query parameters.
    Redirect(Url),

    /// The callback was out-of-band: display the verifier to the user for manual copying.
    DisplayVerifier {
        /// The approved request token key.
        token: String,

        /// The code the user hands to the consumer.
        verifier: String,
    },
}

impl Pending {
    /// The consumer asking for access, for display on the consent page.
    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// The request token under consideration.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Record the consent of `user` and determine where the verifier goes.
    ///
    /// Call this only after the calling application authenticated the user and received an
    /// affirmative answer from the consent form.
    pub fn authorize(
        self, handler: &mut dyn Endpoint, user: &str,
    ) -> Result<AuthorizationOutcome, Error> {
        let approved = handler
            .store()
            .authorize_request_token(&self.token.key, user)?;
        let verifier = approved.verifier.ok_or(Error::Primitive)?;

        match &self.token.callback {
            Some(Callback::Url(callback)) => {
                let mut target = callback.clone();
                target
                    .query_pairs_mut()
                    .append_pair("oauth_token", &approved.key)
                    .append_pair("oauth_verifier", &verifier)
                    .finish();
                Ok(AuthorizationOutcome::Redirect(target))
            }
            _ => Ok(AuthorizationOutcome::DisplayVerifier {
                token: approved.key,
                verifier,
            }),
        }
    }
}
