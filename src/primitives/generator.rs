//! Generators produce the key, secret and verifier strings handed out by a store.
//!
//! Every credential issued by this library is a pure random handle: the string itself encodes
//! nothing and all state lives in the store. The generator is the single point deciding how much
//! entropy backs each handle.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;

/// A source of fresh token components.
///
/// ## Requirements on implementations
///
/// Output MUST be indistinguishable from a random function to anyone not holding the generator's
/// internal state. Keys, secrets and verifiers issued from it gate token theft and token
/// substitution, so a predictable implementation voids every security property of the protocol.
/// Collisions are assumed to be too improbable to check for, as with any adequately sized random
/// output.
pub trait KeyGenerator {
    /// Produce one fresh, unguessable string.
    fn generate(&mut self) -> String;
}

/// Generates strings from random bytes of a chosen length.
///
/// Bytes come from the thread-local system RNG and are base64url encoded, so the output is safe
/// to embed in query strings and form bodies without further escaping.
pub struct RandomGenerator {
    len: usize,
}

impl RandomGenerator {
    /// Generate strings backed by `length` random bytes each.
    pub fn new(length: usize) -> RandomGenerator {
        RandomGenerator { len: length }
    }
}

impl KeyGenerator for RandomGenerator {
    fn generate(&mut self) -> String {
        let mut bytes = vec![0; self.len];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(&bytes)
    }
}

impl<G: KeyGenerator + ?Sized> KeyGenerator for Box<G> {
    fn generate(&mut self) -> String {
        (**self).generate()
    }
}

impl<'a, G: KeyGenerator + ?Sized> KeyGenerator for &'a mut G {
    fn generate(&mut self) -> String {
        (**self).generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_output() {
        let mut generator = RandomGenerator::new(16);
        let one = generator.generate();
        let two = generator.generate();
        assert!(!one.is_empty());
        assert_ne!(one, two);
    }

    #[test]
    fn output_is_query_safe() {
        let mut generator = RandomGenerator::new(32);
        let value = generator.generate();
        assert!(value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    #[allow(dead_code, unused)]
    fn assert_send_sync_static() {
        fn uses<T: Send + Sync + 'static>(arg: T) {}
        let _ = uses(RandomGenerator::new(16));
    }
}
