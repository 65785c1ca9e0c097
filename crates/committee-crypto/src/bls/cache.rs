use super::PublicKey;
use crate::CryptoResult;

use log::trace;
use lru::LruCache;

const DEFAULT_CAPACITY: usize = 512;

/// Holds recently decoded public keys. Decoding a key means a subgroup check, which dominates
/// the cost of registering an operator whose key was seen before.
pub struct PublicKeyCache {
    /// An in-memory mapping of serialized pubkey byte arrays to their decoded
    /// group element representation
    de: LruCache<Vec<u8>, PublicKey>,
}

impl Default for PublicKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PublicKeyCache {
    /// Initializes an empty cache
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            de: LruCache::new(capacity),
        }
    }

    pub fn clear_cache(&mut self) {
        self.de.clear();
    }

    pub fn len(&self) -> usize {
        self.de.len()
    }

    pub fn is_empty(&self) -> bool {
        self.de.is_empty()
    }

    /// Returns the PublicKey corresponding to the serialized data from the cache, or decodes
    /// the element, saves it to the cache for later use and returns it. Invalid keys are
    /// never cached.
    pub fn deserialize(&mut self, data: &[u8]) -> CryptoResult<PublicKey> {
        let key = data.to_vec();
        match self.de.get(&key).copied() {
            // cache hit
            Some(cached) => Ok(cached),
            // cache miss
            None => {
                trace!("public key cache miss");
                let decoded = PublicKey::from_be_bytes(data)?;
                self.de.put(key, decoded);
                Ok(decoded)
            }
        }
    }
}
