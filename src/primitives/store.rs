//! The credential store administers consumers, tokens and nonces.
//!
//! This is the sole persistence boundary of the provider: every protocol flow reads and mutates
//! state exclusively through [`Store`] operations, so all cross-request coordination reduces to
//! the transactional guarantees of the one store implementation in use. Alternate backends
//! (relational, distributed cache) are polymorphic implementations of the same trait, chosen at
//! construction time.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{MutexGuard, RwLockWriteGuard};

use chrono::{Duration, Utc};

use super::consumer::Consumer;
use super::generator::{KeyGenerator, RandomGenerator};
use super::token::{Callback, Token, TokenKind};
use super::Time;

/// Persists consumers, tokens and nonces and owns every mutation of them.
///
/// Implementations must uphold two atomicity guarantees under concurrent use:
///
/// * [`check_and_record_nonce`] is a single check-and-set, never a check followed by a record.
/// * [`create_access_token`] removes the source request token if and only if it is still present
///   and approved, so of two racing exchanges exactly one wins and the loser observes
///   `InvalidRequestToken`.
///
/// Both come for free here through the `&mut self` receivers; a store shared between threads gets
/// them from its lock (see the `MutexGuard` impl below), a database-backed store from a
/// transaction or conditional delete.
///
/// [`check_and_record_nonce`]: #tymethod.check_and_record_nonce
/// [`create_access_token`]: #tymethod.create_access_token
pub trait Store {
    /// Look up a consumer by its key.
    fn get_consumer(&self, consumer_key: &str) -> Result<Consumer, StoreError>;

    /// The consumer a request token was issued to.
    fn consumer_for_request_token(&self, token_key: &str) -> Result<Consumer, StoreError>;

    /// The consumer an access token was issued to.
    fn consumer_for_access_token(&self, token_key: &str) -> Result<Consumer, StoreError>;

    /// Create a fresh, unapproved request token bound to the consumer and callback.
    fn create_request_token(
        &mut self, consumer: &Consumer, callback: Callback, timestamp: Time,
    ) -> Result<Token, StoreError>;

    /// Look up a request token by its key. Access token keys do not resolve here.
    fn get_request_token(&self, key: &str) -> Result<Token, StoreError>;

    /// Mark a request token approved, attach the authorizing user and generate its verifier.
    ///
    /// Only an unapproved token can be authorized; a second authorization attempt fails with
    /// `InvalidRequestToken`, keeping the verifier unique per authorization event.
    fn authorize_request_token(&mut self, key: &str, user: &str) -> Result<Token, StoreError>;

    /// Exchange an approved request token for a fresh access token.
    ///
    /// The request token is deleted as part of this operation. The exchange is conditional on the
    /// token still being present, approved and owned by `consumer`; otherwise nothing changes and
    /// `InvalidRequestToken` is returned.
    fn create_access_token(
        &mut self, consumer: &Consumer, request_token_key: &str,
    ) -> Result<Token, StoreError>;

    /// Look up an access token by its key. Request token keys do not resolve here.
    fn get_access_token(&self, key: &str) -> Result<Token, StoreError>;

    /// Atomically record the (consumer, token, nonce) triple if it has not been seen before.
    ///
    /// Returns `true` on first use (the triple is now recorded) and `false` on a replay. The
    /// token key is the empty string for requests made without a token.
    fn check_and_record_nonce(
        &mut self, consumer_key: &str, token_key: &str, nonce: &str,
    ) -> Result<bool, StoreError>;
}

/// Failures a store can report.
///
/// The first three identify the credential the caller named and are converted into client
/// rejections by the protocol flows. `Primitive` is different in kind: the backend itself failed
/// (storage unavailable, transaction aborted) and the condition is a server-side fault, never
/// attributable to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The consumer key is unknown, or the consumer may not be used.
    InvalidConsumer,

    /// No request token under this key, or the token is in the wrong state for the operation.
    InvalidRequestToken,

    /// No access token under this key.
    InvalidAccessToken,

    /// The backend failed; no statement about the credentials is implied.
    Primitive,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::InvalidConsumer => write!(f, "invalid consumer"),
            StoreError::InvalidRequestToken => write!(f, "invalid request token"),
            StoreError::InvalidAccessToken => write!(f, "invalid access token"),
            StoreError::Primitive => write!(f, "store backend failure"),
        }
    }
}

impl std::error::Error for StoreError {}

/// An in-memory store backed by hash maps.
///
/// Request and access tokens live in separate maps, so a key only ever resolves under its own
/// kind. The generator is trait based and can be chosen during construction; it is assumed that
/// two generated handles never collide during their overlapping lifetime.
///
/// The nonce table grows without bound by default. Long-lived deployments should either call
/// [`retain_nonces_for`] with a window no shorter than whatever timestamp freshness policy they
/// enforce in front of the provider, or use a backend with its own expiry.
///
/// [`retain_nonces_for`]: #method.retain_nonces_for
pub struct MemoryStore<G: KeyGenerator = Box<dyn KeyGenerator + Send + Sync + 'static>> {
    generator: G,
    require_accepted: bool,
    nonce_window: Option<Duration>,
    consumers: HashMap<String, Consumer>,
    request_tokens: HashMap<String, Token>,
    access_tokens: HashMap<String, Token>,
    nonces: HashMap<(String, String, String), Time>,
}

impl MemoryStore {
    /// Create an empty store with the default random generator.
    pub fn new() -> MemoryStore {
        MemoryStore::with_generator(Box::new(RandomGenerator::new(18)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl<G: KeyGenerator> MemoryStore<G> {
    /// Create an empty store generating token material with `generator`.
    pub fn with_generator(generator: G) -> Self {
        MemoryStore {
            generator,
            require_accepted: false,
            nonce_window: None,
            consumers: HashMap::new(),
            request_tokens: HashMap::new(),
            access_tokens: HashMap::new(),
            nonces: HashMap::new(),
        }
    }

    /// Insert or update a consumer record.
    ///
    /// Provisioning is an administrative action and not part of the protocol surface, but any
    /// usable backend needs some way in.
    pub fn register_consumer(&mut self, consumer: Consumer) {
        self.consumers.insert(consumer.key.clone(), consumer);
    }

    /// Reject consumers that are not in the `Accepted` state.
    ///
    /// Off by default. The protocol core never inspects consumer status itself; this toggle is
    /// the store-level policy hook for deployments that gate issuance on registration review.
    pub fn require_accepted(&mut self, require: bool) {
        self.require_accepted = require;
    }

    /// Bound the nonce table by dropping entries older than `window`.
    ///
    /// Within the retained window a duplicate nonce is never accepted. A nonce older than the
    /// window could be replayed, so the window must not be shorter than the timestamp freshness
    /// policy enforced in front of the provider.
    pub fn retain_nonces_for(&mut self, window: Duration) {
        self.nonce_window = Some(window);
    }

    fn fresh_token(&mut self, kind: TokenKind, consumer_key: &str, timestamp: Time) -> Token {
        let token = Token {
            key: self.generator.generate(),
            secret: self.generator.generate(),
            kind,
            consumer_key: consumer_key.to_owned(),
            user: None,
            callback: None,
            verifier: None,
            timestamp,
            approved: false,
        };
        debug_assert!(
            !token.key.is_empty() && !token.secret.is_empty(),
            "An empty token component was generated, this is horribly insecure."
        );
        token
    }
}

impl<G: KeyGenerator> Store for MemoryStore<G> {
    fn get_consumer(&self, consumer_key: &str) -> Result<Consumer, StoreError> {
        let consumer = self
            .consumers
            .get(consumer_key)
            .ok_or(StoreError::InvalidConsumer)?;

        if self.require_accepted && !consumer.is_accepted() {
            return Err(StoreError::InvalidConsumer);
        }

        Ok(consumer.clone())
    }

    fn consumer_for_request_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        let token = self
            .request_tokens
            .get(token_key)
            .ok_or(StoreError::InvalidConsumer)?;
        self.get_consumer(&token.consumer_key)
    }

    fn consumer_for_access_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        let token = self
            .access_tokens
            .get(token_key)
            .ok_or(StoreError::InvalidConsumer)?;
        self.get_consumer(&token.consumer_key)
    }

    fn create_request_token(
        &mut self, consumer: &Consumer, callback: Callback, timestamp: Time,
    ) -> Result<Token, StoreError> {
        let mut token = self.fresh_token(TokenKind::Request, &consumer.key, timestamp);
        token.callback = Some(callback);
        self.request_tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    fn get_request_token(&self, key: &str) -> Result<Token, StoreError> {
        self.request_tokens
            .get(key)
            .cloned()
            .ok_or(StoreError::InvalidRequestToken)
    }

    fn authorize_request_token(&mut self, key: &str, user: &str) -> Result<Token, StoreError> {
        let verifier = self.generator.generate();
        let token = self
            .request_tokens
            .get_mut(key)
            .ok_or(StoreError::InvalidRequestToken)?;

        if token.approved {
            // No AUTHORIZED -> AUTHORIZED edge: the verifier is set exactly once.
            return Err(StoreError::InvalidRequestToken);
        }

        token.approved = true;
        token.user = Some(user.to_owned());
        token.verifier = Some(verifier);
        Ok(token.clone())
    }

    fn create_access_token(
        &mut self, consumer: &Consumer, request_token_key: &str,
    ) -> Result<Token, StoreError> {
        // Conditional take: only the first of two racing exchanges finds the token.
        let source = self
            .request_tokens
            .remove(request_token_key)
            .ok_or(StoreError::InvalidRequestToken)?;

        if !source.approved || source.consumer_key != consumer.key || source.user.is_none() {
            self.request_tokens.insert(source.key.clone(), source);
            return Err(StoreError::InvalidRequestToken);
        }

        let mut token = self.fresh_token(TokenKind::Access, &consumer.key, Utc::now());
        token.user = source.user;
        self.access_tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    fn get_access_token(&self, key: &str) -> Result<Token, StoreError> {
        self.access_tokens
            .get(key)
            .cloned()
            .ok_or(StoreError::InvalidAccessToken)
    }

    fn check_and_record_nonce(
        &mut self, consumer_key: &str, token_key: &str, nonce: &str,
    ) -> Result<bool, StoreError> {
        if let Some(window) = self.nonce_window {
            let cutoff = Utc::now() - window;
            self.nonces.retain(|_, seen| *seen >= cutoff);
        }

        let triple = (
            consumer_key.to_owned(),
            token_key.to_owned(),
            nonce.to_owned(),
        );

        match self.nonces.entry(triple) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(Utc::now());
                Ok(true)
            }
        }
    }
}

impl<'s, S: Store + ?Sized> Store for &'s mut S {
    fn get_consumer(&self, consumer_key: &str) -> Result<Consumer, StoreError> {
        (**self).get_consumer(consumer_key)
    }

    fn consumer_for_request_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_request_token(token_key)
    }

    fn consumer_for_access_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_access_token(token_key)
    }

    fn create_request_token(
        &mut self, consumer: &Consumer, callback: Callback, timestamp: Time,
    ) -> Result<Token, StoreError> {
        (**self).create_request_token(consumer, callback, timestamp)
    }

    fn get_request_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_request_token(key)
    }

    fn authorize_request_token(&mut self, key: &str, user: &str) -> Result<Token, StoreError> {
        (**self).authorize_request_token(key, user)
    }

    fn create_access_token(
        &mut self, consumer: &Consumer, request_token_key: &str,
    ) -> Result<Token, StoreError> {
        (**self).create_access_token(consumer, request_token_key)
    }

    fn get_access_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_access_token(key)
    }

    fn check_and_record_nonce(
        &mut self, consumer_key: &str, token_key: &str, nonce: &str,
    ) -> Result<bool, StoreError> {
        (**self).check_and_record_nonce(consumer_key, token_key, nonce)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn get_consumer(&self, consumer_key: &str) -> Result<Consumer, StoreError> {
        (**self).get_consumer(consumer_key)
    }

    fn consumer_for_request_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_request_token(token_key)
    }

    fn consumer_for_access_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_access_token(token_key)
    }

    fn create_request_token(
        &mut self, consumer: &Consumer, callback: Callback, timestamp: Time,
    ) -> Result<Token, StoreError> {
        (**self).create_request_token(consumer, callback, timestamp)
    }

    fn get_request_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_request_token(key)
    }

    fn authorize_request_token(&mut self, key: &str, user: &str) -> Result<Token, StoreError> {
        (**self).authorize_request_token(key, user)
    }

    fn create_access_token(
        &mut self, consumer: &Consumer, request_token_key: &str,
    ) -> Result<Token, StoreError> {
        (**self).create_access_token(consumer, request_token_key)
    }

    fn get_access_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_access_token(key)
    }

    fn check_and_record_nonce(
        &mut self, consumer_key: &str, token_key: &str, nonce: &str,
    ) -> Result<bool, StoreError> {
        (**self).check_and_record_nonce(consumer_key, token_key, nonce)
    }
}

impl<'s, S: Store + ?Sized + 's> Store for MutexGuard<'s, S> {
    fn get_consumer(&self, consumer_key: &str) -> Result<Consumer, StoreError> {
        (**self).get_consumer(consumer_key)
    }

    fn consumer_for_request_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_request_token(token_key)
    }

    fn consumer_for_access_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_access_token(token_key)
    }

    fn create_request_token(
        &mut self, consumer: &Consumer, callback: Callback, timestamp: Time,
    ) -> Result<Token, StoreError> {
        (**self).create_request_token(consumer, callback, timestamp)
    }

    fn get_request_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_request_token(key)
    }

    fn authorize_request_token(&mut self, key: &str, user: &str) -> Result<Token, StoreError> {
        (**self).authorize_request_token(key, user)
    }

    fn create_access_token(
        &mut self, consumer: &Consumer, request_token_key: &str,
    ) -> Result<Token, StoreError> {
        (**self).create_access_token(consumer, request_token_key)
    }

    fn get_access_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_access_token(key)
    }

    fn check_and_record_nonce(
        &mut self, consumer_key: &str, token_key: &str, nonce: &str,
    ) -> Result<bool, StoreError> {
        (**self).check_and_record_nonce(consumer_key, token_key, nonce)
    }
}

impl<'s, S: Store + ?Sized + 's> Store for RwLockWriteGuard<'s, S> {
    fn get_consumer(&self, consumer_key: &str) -> Result<Consumer, StoreError> {
        (**self).get_consumer(consumer_key)
    }

    fn consumer_for_request_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_request_token(token_key)
    }

    fn consumer_for_access_token(&self, token_key: &str) -> Result<Consumer, StoreError> {
        (**self).consumer_for_access_token(token_key)
    }

    fn create_request_token(
        &mut self, consumer: &Consumer, callback: Callback, timestamp: Time,
    ) -> Result<Token, StoreError> {
        (**self).create_request_token(consumer, callback, timestamp)
    }

    fn get_request_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_request_token(key)
    }

    fn authorize_request_token(&mut self, key: &str, user: &str) -> Result<Token, StoreError> {
        (**self).authorize_request_token(key, user)
    }

    fn create_access_token(
        &mut self, consumer: &Consumer, request_token_key: &str,
    ) -> Result<Token, StoreError> {
        (**self).create_access_token(consumer, request_token_key)
    }

    fn get_access_token(&self, key: &str) -> Result<Token, StoreError> {
        (**self).get_access_token(key)
    }

    fn check_and_record_nonce(
        &mut self, consumer_key: &str, token_key: &str, nonce: &str,
    ) -> Result<bool, StoreError> {
        (**self).check_and_record_nonce(consumer_key, token_key, nonce)
    }
}
