//! Provides the handling for access token requests, the final leg of the exchange.
use crate::primitives::store::Store;

use super::error::Error;
use super::signature::constant_time_eq;
use super::{require, verify_signed, Endpoint, Request};

/// Exchange an authorized request token for a fresh access token.
///
/// Preconditions, in order: `oauth_token` and `oauth_verifier` must be present, the consumer
/// must resolve, the request token must resolve, belong to that consumer and be approved, the
/// nonce must be fresh for the (consumer, token) pair, the signature must verify against
/// consumer secret plus token secret, and the supplied verifier must match the stored one
/// exactly.
///
/// The store deletes the request token in the same operation that creates the access token, so
/// the exchange happens at most once even under concurrent duplicate attempts. On any failure
/// the request token is left untouched; a `VerifierMismatch` in particular leaves it approved
/// and exchangeable with the correct verifier.
pub fn access_token(
    handler: &mut dyn Endpoint, request: &dyn Request,
) -> Result<IssuedAccessToken, Error> {
    if !request.valid() {
        return Err(Error::Malformed("request"));
    }

    let token_key = require(request, "oauth_token")?;
    let supplied_verifier = require(request, "oauth_verifier")?.into_owned();

    let consumer_key = require(request, "oauth_consumer_key")?;
    let consumer = handler.store().get_consumer(&consumer_key)?;

    let request_token = handler.store().get_request_token(&token_key)?;
    if !request_token.approved || request_token.consumer_key != consumer.key {
        return Err(Error::InvalidRequestToken);
    }

    verify_signed(handler.store(), request, &consumer, Some(&request_token))?;

    let stored_verifier = request_token.verifier.as_deref().ok_or(Error::Primitive)?;
    if !constant_time_eq(supplied_verifier.as_bytes(), stored_verifier.as_bytes()) {
        log::debug!("verifier mismatch for request token {}", request_token.key);
        return Err(Error::VerifierMismatch);
    }

    let token = handler
        .store()
        .create_access_token(&consumer, &request_token.key)?;

    Ok(IssuedAccessToken {
        token: token.key,
        secret: token.secret,
    })
}

/// The credentials returned from a successful access token call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedAccessToken {
    /// The access token key.
    pub token: String,

    /// The matching token secret.
    pub secret: String,
}

impl IssuedAccessToken {
    /// Render the `application/x-www-form-urlencoded` success body.
    pub fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("oauth_token", &self.token)
            .append_pair("oauth_token_secret", &self.secret)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::consumer::Consumer;
    use crate::primitives::store::{MemoryStore, Store};
    use crate::primitives::token::Callback;
    use crate::provider::request::CanonicalRequest;
    use crate::provider::signature;
    use chrono::Utc;

    struct Provider {
        store: MemoryStore,
    }

    impl Endpoint for Provider {
        fn store(&mut self) -> &mut dyn Store {
            &mut self.store
        }
    }

    struct Exchange {
        provider: Provider,
        token_key: String,
        token_secret: String,
        verifier: String,
    }

    fn authorized_exchange() -> Exchange {
        let mut store = MemoryStore::new();
        let consumer = Consumer::new("demo", "s3cr3t");
        store.register_consumer(consumer.clone());

        let token = store
            .create_request_token(&consumer, Callback::Oob, Utc::now())
            .unwrap();
        let authorized = store.authorize_request_token(&token.key, "alice").unwrap();

        Exchange {
            provider: Provider { store },
            token_key: token.key,
            token_secret: token.secret,
            verifier: authorized.verifier.unwrap(),
        }
    }

    fn exchange_request(exchange: &Exchange, nonce: &str, verifier: &str) -> CanonicalRequest {
        let request = CanonicalRequest::new("POST", "http://provider.example/access_token")
            .with_parameter("oauth_consumer_key", "demo")
            .with_parameter("oauth_token", exchange.token_key.clone())
            .with_parameter("oauth_verifier", verifier)
            .with_parameter("oauth_signature_method", "HMAC-SHA1")
            .with_parameter("oauth_timestamp", "1191242096")
            .with_parameter("oauth_nonce", nonce)
            .with_parameter("oauth_version", "1.0");
        let signature =
            signature::hmac_sha1_signature(&request, "s3cr3t", Some(&exchange.token_secret));
        request.with_parameter("oauth_signature", signature)
    }

    #[test]
    fn exchanges_exactly_once() {
        let mut exchange = authorized_exchange();

        let request = exchange_request(&exchange, "n1", &exchange.verifier.clone());
        let issued = access_token(&mut exchange.provider, &request)
            .expect("authorized token should exchange");

        // The request token is consumed, the access token live.
        assert!(exchange
            .provider
            .store
            .get_request_token(&exchange.token_key)
            .is_err());
        let stored = exchange.provider.store.get_access_token(&issued.token).unwrap();
        assert_eq!(stored.user.as_deref(), Some("alice"));
        assert_eq!(stored.secret, issued.secret);

        // A second attempt finds no request token and mints nothing.
        let replay = exchange_request(&exchange, "n2", &exchange.verifier.clone());
        assert_eq!(
            access_token(&mut exchange.provider, &replay),
            Err(Error::InvalidRequestToken)
        );
    }

    #[test]
    fn unauthorized_token_does_not_exchange() {
        let mut store = MemoryStore::new();
        let consumer = Consumer::new("demo", "s3cr3t");
        store.register_consumer(consumer.clone());
        let token = store
            .create_request_token(&consumer, Callback::Oob, Utc::now())
            .unwrap();
        let mut provider = Provider { store };

        let request = CanonicalRequest::new("POST", "http://provider.example/access_token")
            .with_parameter("oauth_consumer_key", "demo")
            .with_parameter("oauth_token", token.key.clone())
            .with_parameter("oauth_verifier", "guess")
            .with_parameter("oauth_signature_method", "HMAC-SHA1")
            .with_parameter("oauth_timestamp", "1191242096")
            .with_parameter("oauth_nonce", "n1")
            .with_parameter("oauth_version", "1.0");
        let signature = signature::hmac_sha1_signature(&request, "s3cr3t", Some(&token.secret));
        let request = request.with_parameter("oauth_signature", signature);

        assert_eq!(
            access_token(&mut provider, &request),
            Err(Error::InvalidRequestToken)
        );
        assert!(provider.store.get_request_token(&token.key).is_ok());
    }

    #[test]
    fn wrong_verifier_leaves_the_token_exchangeable() {
        let mut exchange = authorized_exchange();

        let wrong = exchange_request(&exchange, "n1", "not-the-verifier");
        assert_eq!(
            access_token(&mut exchange.provider, &wrong),
            Err(Error::VerifierMismatch)
        );

        let stored = exchange
            .provider
            .store
            .get_request_token(&exchange.token_key)
            .expect("token must survive a verifier mismatch");
        assert!(stored.approved);

        let correct = exchange_request(&exchange, "n2", &exchange.verifier.clone());
        access_token(&mut exchange.provider, &correct)
            .expect("correct verifier should still exchange");
    }

    #[test]
    fn missing_exchange_parameters_are_named() {
        let mut exchange = authorized_exchange();

        let request = CanonicalRequest::new("POST", "http://provider.example/access_token")
            .with_parameter("oauth_consumer_key", "demo");
        assert_eq!(
            access_token(&mut exchange.provider, &request),
            Err(Error::MissingParameter("oauth_token"))
        );

        let request = CanonicalRequest::new("POST", "http://provider.example/access_token")
            .with_parameter("oauth_consumer_key", "demo")
            .with_parameter("oauth_token", exchange.token_key.clone());
        assert_eq!(
            access_token(&mut exchange.provider, &request),
            Err(Error::MissingParameter("oauth_verifier"))
        );
    }

    #[test]
    fn signature_must_cover_the_token_secret() {
        let mut exchange = authorized_exchange();

        // Signed as if no token secret were involved.
        let request = CanonicalRequest::new("POST", "http://provider.example/access_token")
            .with_parameter("oauth_consumer_key", "demo")
            .with_parameter("oauth_token", exchange.token_key.clone())
            .with_parameter("oauth_verifier", exchange.verifier.clone())
            .with_parameter("oauth_signature_method", "HMAC-SHA1")
            .with_parameter("oauth_timestamp", "1191242096")
            .with_parameter("oauth_nonce", "n1")
            .with_parameter("oauth_version", "1.0");
        let signature = signature::hmac_sha1_signature(&request, "s3cr3t", None);
        let request = request.with_parameter("oauth_signature", signature);

        assert_eq!(
            access_token(&mut exchange.provider, &request),
            Err(Error::SignatureFailed)
        );
    }

    #[test]
    fn token_of_another_consumer_is_rejected() {
        let mut exchange = authorized_exchange();
        exchange
            .provider
            .store
            .register_consumer(Consumer::new("intruder", "other"));

        let request = CanonicalRequest::new("POST", "http://provider.example/access_token")
            .with_parameter("oauth_consumer_key", "intruder")
            .with_parameter("oauth_token", exchange.token_key.clone())
            .with_parameter("oauth_verifier", exchange.verifier.clone())
            .with_parameter("oauth_signature_method", "HMAC-SHA1")
            .with_parameter("oauth_timestamp", "1191242096")
            .with_parameter("oauth_nonce", "n1")
            .with_parameter("oauth_version", "1.0");
        let signature =
            signature::hmac_sha1_signature(&request, "other", Some(&exchange.token_secret));
        let request = request.with_parameter("oauth_signature", signature);

        assert_eq!(
            access_token(&mut exchange.provider, &request),
            Err(Error::InvalidRequestToken)
        );
    }

    #[test]
    fn success_body_is_urlencoded() {
        let issued = IssuedAccessToken {
            token: "token2".into(),
            secret: "secret2".into(),
        };

        assert_eq!(
            issued.to_urlencoded(),
            "oauth_token=token2&oauth_token_secret=secret2"
        );
    }
}
