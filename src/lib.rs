//! # patina-oauth
//!
//! An OAuth 1.0a provider library, for use behind whatever web front-end handles your network
//! traffic, featuring a set of configurable and pluggable back-ends.
//!
//! ## About
//!
//! `patina-oauth` implements the provider side of the three-legged OAuth 1.0a exchange: issuing
//! request tokens, collecting user authorization, trading approved tokens for access tokens,
//! verifying HMAC-SHA1 and PLAINTEXT signed requests, and rejecting replays by nonce tracking.
//! The main interface is designed around traits in both directions: the inbound request is
//! abstracted by [`Request`] so that any HTTP stack can be adapted, and all persistent state
//! lives behind the [`Store`] trait so that policies and storage are pluggable.
//!
//! ## Run an OAuth 1.0a provider
//!
//! Choose a [`Store`] implementation and hand it to the flow functions through an [`Endpoint`].
//! The in-memory [`MemoryStore`] works out of the box, more serious deployments implement the
//! trait over their database. Translate each inbound HTTP request into a
//! [`CanonicalRequest`] (method, base URL, decoded query/body parameters and the
//! `Authorization` header) and call the flow for the route it arrived on:
//! [`request_token`], [`authorization`] or [`access_token`]. Successful flows return response
//! types that render the `application/x-www-form-urlencoded` success bodies; failures are
//! [`Error`] values carrying a short plain-text reason. Every rejection with
//! [`is_client_error`] is a 400-class answer, the rest are yours to map to a 500.
//!
//! User authentication and the consent page of the authorization step stay with the calling
//! application; the flow hands out a [`Pending`] and only mutates state once consent is
//! confirmed.
//!
//! _WARNING_: OAuth 1.0a secrets are signing keys. Transport them over TLS only, and never
//! store consumer secrets behind a one-way hash.
//!
//! [`Request`]: provider/trait.Request.html
//! [`Endpoint`]: provider/trait.Endpoint.html
//! [`Store`]: primitives/store/trait.Store.html
//! [`MemoryStore`]: primitives/store/struct.MemoryStore.html
//! [`CanonicalRequest`]: provider/request/struct.CanonicalRequest.html
//! [`request_token`]: provider/request_token/fn.request_token.html
//! [`authorization`]: provider/authorization/fn.authorization.html
//! [`access_token`]: provider/access_token/fn.access_token.html
//! [`Pending`]: provider/authorization/struct.Pending.html
//! [`Error`]: provider/error/enum.Error.html
//! [`is_client_error`]: provider/error/enum.Error.html#method.is_client_error
#![warn(missing_docs)]

pub mod primitives;
pub mod provider;
