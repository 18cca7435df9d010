//! The rejection taxonomy of the token exchange protocol.
use std::fmt;

use crate::primitives::store::StoreError;

/// Why a protocol endpoint refused a request.
///
/// Every variant except [`Primitive`] is a client error: the request itself was unacceptable and
/// no state was changed on its behalf. `Primitive` signals that a backend failed mid-operation
/// and must surface as a server-side fault, never as a rejection attributable to the client.
///
/// The variants are deliberately distinguishable, so logs and messages can name the cause, but a
/// frontend is free to collapse all client errors onto one status code.
///
/// [`Primitive`]: #variant.Primitive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The consumer key does not resolve to a registered consumer.
    InvalidConsumer,

    /// The request token key is unknown, of the wrong kind, or in the wrong state.
    InvalidRequestToken,

    /// The access token key is unknown or of the wrong kind.
    InvalidAccessToken,

    /// The recomputed signature does not match the supplied one, or the declared signature
    /// method is unsupported.
    SignatureFailed,

    /// The nonce was already seen for this (consumer, token) pair.
    NonceReplayed,

    /// The supplied verifier does not match the one generated at authorization.
    VerifierMismatch,

    /// A required OAuth parameter is absent from the request.
    MissingParameter(&'static str),

    /// A parameter is present but unusable, e.g. a callback that is neither `oob` nor a URL.
    Malformed(&'static str),

    /// A store operation failed for backend reasons.
    Primitive,
}

impl Error {
    /// Whether the rejection is attributable to the client.
    ///
    /// `false` only for [`Primitive`], which a frontend should map to a server error status
    /// instead of a 400.
    ///
    /// [`Primitive`]: #variant.Primitive
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::Primitive)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidConsumer => write!(f, "Invalid consumer."),
            Error::InvalidRequestToken => write!(f, "Invalid request token."),
            Error::InvalidAccessToken => write!(f, "Invalid access token."),
            Error::SignatureFailed => write!(f, "Could not verify OAuth request."),
            Error::NonceReplayed => write!(f, "Nonce already used."),
            Error::VerifierMismatch => write!(f, "Invalid OAuth verifier."),
            Error::MissingParameter(name) => write!(f, "Missing OAuth parameter: {}.", name),
            Error::Malformed(name) => write!(f, "Malformed OAuth parameter: {}.", name),
            Error::Primitive => write!(f, "Internal provider failure."),
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Error {
        match err {
            StoreError::InvalidConsumer => Error::InvalidConsumer,
            StoreError::InvalidRequestToken => Error::InvalidRequestToken,
            StoreError::InvalidAccessToken => Error::InvalidAccessToken,
            StoreError::Primitive => Error::Primitive,
        }
    }
}
