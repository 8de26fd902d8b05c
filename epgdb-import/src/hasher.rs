//! String hashing for text deduplication.
//!
//! The native cache identifies titles and descriptions by a 32-bit string
//! hash it computes itself; hosts that can call into the engine should
//! inject that function so imported rows line up with rows the engine
//! writes on its own.

/// Platform string hash used for `T_Title` / description `hash` columns.
pub trait StringHasher: Send + Sync {
    fn string_hash(&self, text: &str) -> u32;
}

/// Rolling 31-multiplier hash over the UTF-8 bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStringHasher;

impl StringHasher for DefaultStringHasher {
    fn string_hash(&self, text: &str) -> u32 {
        text.bytes()
            .fold(0u32, |hash, b| hash.wrapping_mul(31).wrapping_add(u32::from(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hash_is_deterministic() {
        let hasher = DefaultStringHasher;
        assert_eq!(hasher.string_hash("Tagesschau"), hasher.string_hash("Tagesschau"));
        assert_ne!(hasher.string_hash("Tagesschau"), hasher.string_hash("Tagesthemen"));
        assert_eq!(hasher.string_hash(""), 0);
        assert_eq!(hasher.string_hash("a"), 97);
        assert_eq!(hasher.string_hash("ab"), 97 * 31 + 98);
    }
}
