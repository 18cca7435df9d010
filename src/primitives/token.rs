//! The owned token representation shared by request and access credentials.
//!
//! Request and access tokens are the same entity tagged with a [`TokenKind`]: both carry a
//! key/secret pair, both belong to exactly one consumer. Only a request token carries a callback
//! and, once authorized, a verifier; an access token carries the user it was issued on behalf of.
use url::Url;

use super::Time;

/// Distinguishes the two credentials of the three-legged exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// A short-lived credential used only to complete the authorization handshake.
    Request,

    /// A long-lived credential used to sign API requests on behalf of a user.
    Access,
}

/// Where the user-agent should be sent after the user authorized a request token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callback {
    /// The client has no reachable redirect target; the verifier is displayed to the user
    /// directly instead.
    Oob,

    /// Redirect to this URL, with token key and verifier appended as query parameters.
    Url(Url),
}

/// An owned token as stored by and retrieved from a [`Store`].
///
/// This can be kept in a database without lifetime concerns and shared across thread boundaries.
/// All mutation happens through store operations, callers never write fields directly.
///
/// [`Store`]: ../store/trait.Store.html
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The public, opaque identifier of the token.
    pub key: String,

    /// The signing secret for requests made with this token. Confidential.
    pub secret: String,

    /// Whether this is a request or an access token.
    pub kind: TokenKind,

    /// Key of the consumer the token was issued to.
    pub consumer_key: String,

    /// The authorizing user. Unset on a request token until authorization; always set on an
    /// access token.
    pub user: Option<String>,

    /// The callback given when the request token was created. Never set on access tokens.
    pub callback: Option<Callback>,

    /// One-time code bound to the authorization event. Unset until the request token is
    /// authorized, then set exactly once.
    pub verifier: Option<String>,

    /// Creation time, as claimed by the request that created the token.
    pub timestamp: Time,

    /// Whether a user has authorized this request token.
    pub approved: bool,
}

impl Callback {
    /// Interpret an `oauth_callback` parameter value.
    ///
    /// The literal `oob` selects the out-of-band flow; anything else must parse as an absolute
    /// URL. Relative or otherwise unparseable values yield `None`.
    pub fn parse(raw: &str) -> Option<Callback> {
        if raw == "oob" {
            return Some(Callback::Oob);
        }

        Url::parse(raw).ok().map(Callback::Url)
    }

    /// The redirect URL, or `None` for the out-of-band marker.
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Callback::Url(url) => Some(url),
            Callback::Oob => None,
        }
    }
}

impl Token {
    /// Whether this token can still enter the authorization handshake.
    pub fn is_request(&self) -> bool {
        self.kind == TokenKind::Request
    }
}
