//! Content hashing for `ipfs://` URIs
//!
//! Recomputes the CIDv0 an IPFS node assigns to a file added with default
//! settings: 256 KiB chunks wrapped as UnixFS `File` nodes in dag-pb,
//! balanced layout with at most 174 links per node, sha2-256 multihash,
//! base58btc encoding.

use sha2::{Digest, Sha256};

/// Size of one UnixFS leaf chunk
pub const CHUNK_SIZE: usize = 256 * 1024;
/// Maximum number of links in one balanced-layout node
pub const MAX_LINKS: usize = 174;

const SHA2_256: u8 = 0x12;
const SHA2_256_LEN: u8 = 0x20;
const UNIXFS_FILE: u64 = 2;

/// Compute the CIDv0 (`Qm...`) of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    let root = if bytes.len() <= CHUNK_SIZE {
        leaf(bytes)
    } else {
        let leaves: Vec<Node> = bytes.chunks(CHUNK_SIZE).map(leaf).collect();
        balance(leaves)
    };
    bs58::encode(root.multihash).into_string()
}

/// Check whether `value` has the shape of a CIDv0
pub fn is_cid_v0(value: &str) -> bool {
    value.len() == 46
        && value.starts_with("Qm")
        && bs58::decode(value)
            .into_vec()
            .map(|raw| raw.len() == 34 && raw[0] == SHA2_256 && raw[1] == SHA2_256_LEN)
            .unwrap_or(false)
}

/// A serialized dag-pb node and what its parent needs to know about it
struct Node {
    multihash: Vec<u8>,
    /// Encoded size of this node plus every node below it
    cumulative_size: u64,
    /// Number of file bytes this node covers
    file_size: u64,
}

fn leaf(chunk: &[u8]) -> Node {
    let mut unixfs = Vec::with_capacity(chunk.len() + 16);
    put_varint_field(&mut unixfs, 1, UNIXFS_FILE);
    if !chunk.is_empty() {
        put_bytes_field(&mut unixfs, 2, chunk);
    }
    put_varint_field(&mut unixfs, 3, chunk.len() as u64);

    let mut block = Vec::with_capacity(unixfs.len() + 8);
    put_bytes_field(&mut block, 1, &unixfs);
    seal(block, chunk.len() as u64, 0)
}

fn balance(mut level: Vec<Node>) -> Node {
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() / MAX_LINKS + 1);
        let mut rest = level.into_iter().peekable();
        while rest.peek().is_some() {
            let group: Vec<Node> = rest.by_ref().take(MAX_LINKS).collect();
            next.push(parent(&group));
        }
        level = next;
    }
    // `content_hash` only balances two or more leaves
    level.pop().unwrap_or_else(|| leaf(&[]))
}

fn parent(children: &[Node]) -> Node {
    let file_size: u64 = children.iter().map(|c| c.file_size).sum();

    let mut unixfs = Vec::new();
    put_varint_field(&mut unixfs, 1, UNIXFS_FILE);
    put_varint_field(&mut unixfs, 3, file_size);
    for child in children {
        put_varint_field(&mut unixfs, 4, child.file_size);
    }

    // dag-pb writes Links (field 2) before Data (field 1)
    let mut block = Vec::new();
    let mut children_size = 0;
    for child in children {
        let mut link = Vec::new();
        put_bytes_field(&mut link, 1, &child.multihash);
        put_bytes_field(&mut link, 2, b"");
        put_varint_field(&mut link, 3, child.cumulative_size);
        put_bytes_field(&mut block, 2, &link);
        children_size += child.cumulative_size;
    }
    put_bytes_field(&mut block, 1, &unixfs);
    seal(block, file_size, children_size)
}

fn seal(block: Vec<u8>, file_size: u64, children_size: u64) -> Node {
    let digest = Sha256::digest(&block);
    let mut multihash = Vec::with_capacity(34);
    multihash.push(SHA2_256);
    multihash.push(SHA2_256_LEN);
    multihash.extend_from_slice(&digest);
    Node {
        multihash,
        cumulative_size: block.len() as u64 + children_size,
        file_size,
    }
}

fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn put_varint_field(buf: &mut Vec<u8>, field: u64, value: u64) {
    put_varint(buf, field << 3);
    put_varint(buf, value);
}

fn put_bytes_field(buf: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    put_varint(buf, (field << 3) | 2);
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}
