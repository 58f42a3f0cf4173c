use sha2::{Digest as _, Sha256};

/// SHA-256 digest (32 bytes).
pub type Digest = [u8; 32];

/// Hash arbitrary data using SHA-256.
pub fn sha256(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

/// Compute the Merkle root of a list of digests.
/// Returns a zero digest for empty input and the element itself for a single
/// element. An odd trailing node is paired with itself.
pub fn merkle_root(leaves: &[Digest]) -> Digest {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<Digest> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                let mut hasher = Sha256::new();
                hasher.update(pair[0]);
                hasher.update(right);
                hasher.finalize().into()
            })
            .collect();
    }

    level[0]
}
