//! Domain-separated SHA-256.

use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};

/// Hash `parts` under `tag`.
///
/// The tag is prefixed with its length (u32 BE) so that distinct tags can never
/// produce the same preimage, even when one tag is a prefix of another.
pub fn tagged(tag: &[u8], parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(&(tag.len() as u32).to_be_bytes());
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_is_length_prefixed() {
        // Moving bytes between tag and payload must change the digest.
        let a = tagged(b"_TAG", &[b"X"]);
        let b = tagged(b"_TAGX", &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parts_are_concatenated() {
        assert_eq!(tagged(b"_TAG", &[b"ab", b"c"]), tagged(b"_TAG", &[b"abc"]));
    }
}
