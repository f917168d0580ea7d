//! Copies a tagged manifest and everything it references between targets.

use tracing::debug;
use tracing::instrument;

use crate::error::Result;
use crate::oci::Descriptor;
use crate::oci::Target;
use crate::oci::successors;

/// Copies the manifest `src_ref` resolves to in `src` into `dst`, tagged
/// `dst_ref`.
///
/// Blobs go first and are skipped when `dst` already has them. The manifest
/// is pushed last, so a failure part way leaves `dst_ref` untouched.
#[instrument(skip(src, dst), err)]
pub async fn copy<S, D>(src: &S, src_ref: &str, dst: &D, dst_ref: &str) -> Result<Descriptor>
where
    S: Target + ?Sized,
    D: Target + ?Sized,
{
    let root = src.resolve(src_ref).await?;
    let manifest = src.fetch(&root).await?;

    for node in successors(&root, &manifest)? {
        if dst.exists(&node).await? {
            debug!(digest = %node.digest, "already present, skipping");
            continue;
        }
        let content = src.fetch(&node).await?;
        dst.push(&node, content).await?;
        debug!(digest = %node.digest, media_type = %node.media_type, "copied");
    }

    dst.push_reference(&root, manifest, dst_ref).await?;
    debug!(digest = %root.digest, "copied manifest");
    Ok(root)
}
