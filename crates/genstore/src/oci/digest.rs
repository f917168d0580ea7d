//! Content digests (`sha256:<hex>`).

use sha2::Digest;
use sha2::Sha256;

use crate::error::Error;
use crate::error::Result;
use crate::oci::Descriptor;

const SHA256_PREFIX: &str = "sha256:";

pub fn sha256(content: &[u8]) -> String {
    format!("{}{}", SHA256_PREFIX, hex::encode(Sha256::digest(content)))
}

/// Whether `reference` is a digest rather than a tag.
pub fn is_digest(reference: &str) -> bool {
    reference.starts_with(SHA256_PREFIX)
}

/// Checks that `content` is exactly what `desc` describes.
pub fn verify(desc: &Descriptor, content: &[u8]) -> Result<()> {
    if !is_digest(&desc.digest) {
        return Err(Error::UnsupportedDigest(desc.digest.clone()));
    }

    let actual = sha256(content);
    if actual != desc.digest {
        return Err(Error::DigestMismatch {
            expected: desc.digest.clone(),
            actual,
        });
    }

    let size = content.len() as u64;
    if size != desc.size {
        return Err(Error::SizeMismatch {
            expected: desc.size,
            actual: size,
        });
    }

    Ok(())
}
