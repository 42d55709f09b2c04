//! # Summary Hashes
//!
//! Every stabilised unit gets a summary: a hash binding the unit to its
//! stabilisation context — predecessor summary, parent summaries, links,
//! skiplist summaries, status, stable index, timestamp and receipt. The
//! summary chain is what `last_summary_block` / `last_summary` on a unit
//! attest to, and what catch-up compares across peers.

use rlp::RlpStream;
use shared_types::{keccak256, BlockHash, BlockStatus, Receipt, SummaryHash, H256};

/// Compute the summary hash of a stabilised unit.
#[allow(clippy::too_many_arguments)]
pub fn gen_summary(
    block_hash: &BlockHash,
    previous_summary: &SummaryHash,
    parent_summaries: &[SummaryHash],
    links: &[H256],
    skiplist_summaries: &[SummaryHash],
    status: BlockStatus,
    stable_index: u64,
    mc_timestamp: u64,
    receipt: Option<&Receipt>,
) -> SummaryHash {
    let mut s = RlpStream::new_list(9);
    s.append(block_hash);
    s.append(previous_summary);
    s.append_list(parent_summaries);
    s.append_list(links);
    s.append_list(skiplist_summaries);
    s.append(&status_tag(status));
    s.append(&stable_index);
    s.append(&mc_timestamp);
    match receipt {
        Some(receipt) => s.append(&receipt.hash()),
        None => s.append_empty_data(),
    };
    keccak256(&s.out())
}

fn status_tag(status: BlockStatus) -> u8 {
    match status {
        BlockStatus::Ok => 0,
        BlockStatus::Fork => 1,
        BlockStatus::Invalid => 2,
        BlockStatus::Fail => 3,
        BlockStatus::Unknown => 255,
    }
}
