//! The canonical request representation handed to the protocol flows.
//!
//! HTTP routing is out of scope for this library; a frontend translates whatever its web stack
//! gives it into a [`CanonicalRequest`] (method, base URL and the decoded parameters from the
//! query string, the form body and the `Authorization` header) and the flows take it from
//! there.
use std::borrow::Cow;
use std::fmt;

use percent_encoding::percent_decode_str;

use super::Request;

/// An owned, already decoded request, the reference implementation of [`Request`].
///
/// Parameters are kept in transmission order, duplicates included, since the signature base
/// string covers every transmitted pair. Lookup through [`Request::parameter`] only answers for
/// keys that occur exactly once; a duplicated key never produces a value.
///
/// [`Request`]: ../trait.Request.html
/// [`Request::parameter`]: ../trait.Request.html#tymethod.parameter
#[derive(Clone, Debug, Default)]
pub struct CanonicalRequest {
    method: String,
    url: String,
    pairs: Vec<(String, String)>,
}

/// The `Authorization` header was present but not parseable as an OAuth header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidHeader;

impl fmt::Display for InvalidHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed OAuth Authorization header")
    }
}

impl std::error::Error for InvalidHeader {}

impl CanonicalRequest {
    /// Start a request from the HTTP method and the base URL (no query component).
    pub fn new(method: &str, url: &str) -> CanonicalRequest {
        CanonicalRequest {
            method: method.to_owned(),
            url: url.to_owned(),
            pairs: Vec::new(),
        }
    }

    /// Assemble a request from transport parameters and an optional `Authorization` header.
    ///
    /// `parameters` are the decoded pairs from the query string and the urlencoded body, in
    /// transmission order. Header parameters are merged in with precedence: a header parameter
    /// replaces all transport pairs of the same name, per the usual OAuth merging semantics. The
    /// `realm` entry of the header is not an OAuth parameter and is dropped.
    pub fn from_parts<I>(
        method: &str, url: &str, parameters: I, authorization: Option<&str>,
    ) -> Result<CanonicalRequest, InvalidHeader>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut request = CanonicalRequest::new(method, url);
        request.pairs.extend(parameters);

        if let Some(header) = authorization {
            for (key, value) in parse_authorization(header)? {
                request.pairs.retain(|(existing, _)| *existing != key);
                request.pairs.push((key, value));
            }
        }

        Ok(request)
    }

    /// Append one decoded parameter pair.
    pub fn push_parameter<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.pairs.push((key.into(), value.into()));
    }

    /// Builder form of [`push_parameter`](#method.push_parameter).
    pub fn with_parameter<K, V>(mut self, key: K, value: V) -> CanonicalRequest
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push_parameter(key, value);
        self
    }
}

impl Request for CanonicalRequest {
    fn valid(&self) -> bool {
        true
    }

    fn method(&self) -> Cow<str> {
        Cow::Borrowed(&self.method)
    }

    fn url(&self) -> Cow<str> {
        Cow::Borrowed(&self.url)
    }

    fn parameter(&self, key: &str) -> Option<Cow<str>> {
        let mut matches = self.pairs.iter().filter(|(existing, _)| existing == key);
        let first = matches.next()?;
        if matches.next().is_some() {
            // A duplicated key is poisoned, it never resolves to a value.
            return None;
        }
        Some(Cow::Borrowed(first.1.as_str()))
    }

    fn parameters(&self) -> Vec<(String, String)> {
        self.pairs.clone()
    }
}

/// Split an `Authorization: OAuth ...` header into decoded parameter pairs.
fn parse_authorization(header: &str) -> Result<Vec<(String, String)>, InvalidHeader> {
    let rest = match header.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("oauth ") => &header[6..],
        _ => return Err(InvalidHeader),
    };

    let mut parameters = Vec::new();
    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut halves = part.splitn(2, '=');
        let key = halves.next().unwrap_or("");
        let value = halves.next().ok_or(InvalidHeader)?;
        let value = value
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .ok_or(InvalidHeader)?;

        if key.eq_ignore_ascii_case("realm") {
            continue;
        }

        let key = percent_decode_str(key)
            .decode_utf8()
            .map_err(|_| InvalidHeader)?
            .into_owned();
        let value = percent_decode_str(value)
            .decode_utf8()
            .map_err(|_| InvalidHeader)?
            .into_owned();
        parameters.push((key, value));
    }

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_lookup() {
        let request = CanonicalRequest::new("GET", "http://provider.example/request_token")
            .with_parameter("oauth_consumer_key", "demo")
            .with_parameter("plain", "value");

        assert_eq!(request.parameter("oauth_consumer_key").unwrap(), "demo");
        assert_eq!(request.parameter("absent"), None);
    }

    #[test]
    fn duplicate_parameters_poison_lookup() {
        let request = CanonicalRequest::new("GET", "http://provider.example/request_token")
            .with_parameter("oauth_nonce", "one")
            .with_parameter("oauth_nonce", "two");

        assert_eq!(request.parameter("oauth_nonce"), None);
        // Both pairs still take part in the signature base string.
        assert_eq!(request.parameters().len(), 2);
    }

    #[test]
    fn header_parameters_take_precedence() {
        let request = CanonicalRequest::from_parts(
            "POST",
            "http://provider.example/access_token",
            vec![
                ("oauth_consumer_key".to_owned(), "from-body".to_owned()),
                ("plain".to_owned(), "kept".to_owned()),
            ],
            Some(r#"OAuth realm="Provider", oauth_consumer_key="from-header", oauth_nonce="n1""#),
        )
        .expect("header should parse");

        assert_eq!(request.parameter("oauth_consumer_key").unwrap(), "from-header");
        assert_eq!(request.parameter("oauth_nonce").unwrap(), "n1");
        assert_eq!(request.parameter("plain").unwrap(), "kept");
        assert_eq!(request.parameter("realm"), None);
    }

    #[test]
    fn header_values_are_percent_decoded() {
        let request = CanonicalRequest::from_parts(
            "GET",
            "http://provider.example/request_token",
            Vec::new(),
            Some(r#"OAuth oauth_callback="http%3A%2F%2Fapp.example%2Fcb""#),
        )
        .expect("header should parse");

        assert_eq!(
            request.parameter("oauth_callback").unwrap(),
            "http://app.example/cb"
        );
    }

    #[test]
    fn rejects_foreign_and_broken_headers() {
        assert_eq!(
            CanonicalRequest::from_parts("GET", "http://x.example/", Vec::new(), Some("Basic abc"))
                .unwrap_err(),
            InvalidHeader
        );
        assert_eq!(
            CanonicalRequest::from_parts(
                "GET",
                "http://x.example/",
                Vec::new(),
                Some("OAuth oauth_nonce=unquoted"),
            )
            .unwrap_err(),
            InvalidHeader
        );
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let request = CanonicalRequest::from_parts(
            "GET",
            "http://provider.example/request_token",
            Vec::new(),
            Some(r#"oauth oauth_nonce="n1""#),
        )
        .expect("lowercase scheme should parse");

        assert_eq!(request.parameter("oauth_nonce").unwrap(), "n1");
    }
}
