//! # Storage Root
//!
//! Merkle-Patricia root computation over an account's storage pairs. Keys are
//! hashed before insertion (secure-trie form); values are RLP of the
//! zero-trimmed big-endian word. Only the root is computed here — the pairs
//! themselves persist in the flat storage column.

use shared_types::{empty_trie_root, keccak256, H256, U256};
use std::collections::BTreeMap;

/// Compute the storage root of `pairs` (slot → value). Zero values must be
/// absent from the map.
pub fn storage_root(pairs: &BTreeMap<H256, H256>) -> H256 {
    if pairs.is_empty() {
        return empty_trie_root();
    }
    let mut items: Vec<(Vec<u8>, Vec<u8>)> = pairs
        .iter()
        .map(|(slot, value)| {
            let nibbles = to_nibbles(keccak256(slot.as_bytes()).as_bytes());
            let word = U256::from_big_endian(value.as_bytes());
            (nibbles, rlp::encode(&word).to_vec())
        })
        .collect();
    items.sort();
    let encoded = encode_node(&items, 0);
    keccak256(&encoded)
}

fn to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Hex-prefix encoding of a nibble path.
fn hex_prefix(nibbles: &[u8], leaf: bool) -> Vec<u8> {
    let flag: u8 = if leaf { 2 } else { 0 };
    let mut out;
    if nibbles.len() % 2 == 0 {
        out = Vec::with_capacity(1 + nibbles.len() / 2);
        out.push(flag << 4);
        for pair in nibbles.chunks(2) {
            out.push((pair[0] << 4) | pair[1]);
        }
    } else {
        out = Vec::with_capacity(1 + nibbles.len() / 2);
        out.push(((flag | 1) << 4) | nibbles[0]);
        for pair in nibbles[1..].chunks(2) {
            out.push((pair[0] << 4) | pair[1]);
        }
    }
    out
}

/// Reference to a child node inside its parent: inline when shorter than a
/// hash, hashed otherwise.
fn child_ref(encoded: Vec<u8>) -> Vec<u8> {
    if encoded.len() < 32 {
        encoded
    } else {
        rlp::encode(&keccak256(&encoded).as_bytes().to_vec()).to_vec()
    }
}

/// RLP encoding of the node covering `items`, whose paths agree on the first
/// `depth` nibbles. `items` must be sorted and non-empty.
fn encode_node(items: &[(Vec<u8>, Vec<u8>)], depth: usize) -> Vec<u8> {
    if items.len() == 1 {
        let (path, value) = &items[0];
        let mut s = rlp::RlpStream::new_list(2);
        s.append(&hex_prefix(&path[depth..], true));
        s.append(value);
        return s.out().to_vec();
    }

    // longest shared extension below depth
    let first = &items[0].0;
    let last = &items[items.len() - 1].0;
    let mut shared = depth;
    while shared < first.len()
        && shared < last.len()
        && first[shared] == last[shared]
    {
        shared += 1;
    }
    if shared > depth {
        let child = encode_node(items, shared);
        let mut s = rlp::RlpStream::new_list(2);
        s.append(&hex_prefix(&first[depth..shared], false));
        s.append_raw(&child_ref(child), 1);
        return s.out().to_vec();
    }

    // branch node: 16 children plus the value slot
    let mut s = rlp::RlpStream::new_list(17);
    let mut index = 0;
    // a path exhausted exactly at this depth fills the value slot
    let mut branch_value: &[u8] = &[];
    if items[0].0.len() == depth {
        branch_value = &items[0].1;
        index = 1;
    }
    for nibble in 0..16u8 {
        let start = index;
        while index < items.len() && items[index].0[depth] == nibble {
            index += 1;
        }
        if start == index {
            s.append_empty_data();
        } else {
            let child = encode_node(&items[start..index], depth + 1);
            s.append_raw(&child_ref(child), 1);
        }
    }
    s.append(&branch_value.to_vec());
    s.out().to_vec()
}
