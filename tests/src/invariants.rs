//! Ledger-wide invariant sweeps over a grown DAG.

use crate::harness::TestNet;
use lc_07_block_processor::ProcessOutcome;
use shared_types::{BlockHash, BlockStatus, StateHash, UnitType};
use std::collections::HashSet;

/// Grow a three-witness DAG with merging tips and one executed transfer;
/// returns every non-genesis unit hash.
fn grow_dag(net: &TestNet) -> Vec<BlockHash> {
    let sender = shared_crypto::Keypair::from_bytes([0x73; 32]).unwrap();
    net.fund(sender.address(), 1_000_000);
    let transfer = net.make_transfer(&sender, 0, shared_types::Address::repeat_byte(0xC1), 25);
    let link = transfer.hash();
    net.processor.on_transactions(vec![transfer]).unwrap();

    let mut hashes = Vec::new();
    let mut previous = [BlockHash::zero(); 3];
    let mut tips: Vec<BlockHash> = vec![net.genesis];
    for i in 0..12u64 {
        let author = (i % 3) as usize;
        // merge up to two tips; carry the transfer on the fourth unit
        let links = if i == 3 { vec![link] } else { vec![] };
        let unit_type = if links.is_empty() {
            UnitType::Dag
        } else {
            UnitType::Light
        };
        let unit = net.make_unit(
            author,
            unit_type,
            previous[author],
            tips.clone(),
            links,
            vec![],
            1_700_000_001 + i,
        );
        let outcomes = net.submit(&unit);
        assert!(
            matches!(outcomes[0], ProcessOutcome::Admitted { .. }),
            "unit {i} failed: {outcomes:?}"
        );
        previous[author] = unit.hash();
        // every second unit leaves the old tip dangling so units merge later
        if i % 2 == 0 {
            tips = vec![unit.hash()];
        } else {
            tips.push(unit.hash());
            tips.truncate(2);
        }
        hashes.push(unit.hash());
    }
    hashes
}

#[test]
fn invariant_sweep_over_grown_dag() {
    let net = TestNet::without_elections(3, 2, 1_000);
    let hashes = grow_dag(&net);
    let txn = net.store.begin_transaction();

    // 1. level = 1 + max(parent.level); 5. parent relation is acyclic by
    //    strictly decreasing levels
    for hash in &hashes {
        let unit = net.store.block_get(&txn, hash).unwrap().unwrap();
        let state = net.store.block_state_get(&txn, hash).unwrap().unwrap();
        let max_parent_level = unit
            .parents
            .iter()
            .map(|parent| {
                net.store
                    .block_state_get(&txn, parent)
                    .unwrap()
                    .unwrap()
                    .level
            })
            .max()
            .unwrap();
        assert_eq!(state.level, max_parent_level + 1);
    }

    // 2. assigned MCIs are an initial segment of the naturals
    let last_mci = net.store.last_mci_get(&txn).unwrap();
    assert!(last_mci > 0);
    for mci in 0..=last_mci {
        assert!(
            net.store.main_chain_get(&txn, mci).unwrap().is_some(),
            "MCI {mci} unassigned"
        );
    }
    assert!(net.store.main_chain_get(&txn, last_mci + 1).unwrap().is_none());

    // 3. stable indices are dense; 8. receipts exactly on executed lights
    let stable_count = net.store.stable_block_count(&txn).unwrap();
    assert!(stable_count > 1);
    for index in 0..stable_count {
        let hash = net.store.stable_block_get(&txn, index).unwrap().unwrap();
        let state = net.store.block_state_get(&txn, &hash).unwrap().unwrap();
        assert!(state.is_stable);
        assert_eq!(state.stable_index, index);
        let expect_receipt = state.unit_type == UnitType::Light
            && matches!(state.status, BlockStatus::Ok | BlockStatus::Fail);
        assert_eq!(state.receipt.is_some(), expect_receipt);
        // every stable unit has a resolvable summary
        let summary = net.store.block_summary_get(&txn, &hash).unwrap().unwrap();
        assert_eq!(
            net.store.summary_block_get(&txn, &summary).unwrap(),
            Some(hash)
        );
    }

    // 4. best-parent edges form a tree rooted at genesis
    for hash in &hashes {
        let mut cursor = *hash;
        let mut hops = 0;
        loop {
            let state = net.store.block_state_get(&txn, &cursor).unwrap().unwrap();
            if state.best_parent.is_zero() {
                assert_eq!(cursor, net.genesis);
                break;
            }
            let parent_state = net
                .store
                .block_state_get(&txn, &state.best_parent)
                .unwrap()
                .unwrap();
            assert!(parent_state.level < state.level, "best-parent level inversion");
            cursor = state.best_parent;
            hops += 1;
            assert!(hops <= hashes.len() + 1, "best-parent cycle");
        }
    }

    // 6. a link appears in at most one stabilised unit
    let mut seen_links = HashSet::new();
    for index in 0..stable_count {
        let hash = net.store.stable_block_get(&txn, index).unwrap().unwrap();
        let unit = net.store.block_get(&txn, &hash).unwrap().unwrap();
        let state = net.store.block_state_get(&txn, &hash).unwrap().unwrap();
        if state.status != BlockStatus::Ok {
            continue;
        }
        for link in &unit.links {
            assert!(seen_links.insert(*link), "link executed twice");
            assert_eq!(net.store.link_get(&txn, link).unwrap(), Some(hash));
        }
    }
    assert!(!seen_links.is_empty(), "the transfer never stabilised");

    // 7. account-state chains terminate at a genesis-origin state
    let mut accounts = HashSet::new();
    for hash in &hashes {
        let state = net.store.block_state_get(&txn, hash).unwrap().unwrap();
        accounts.insert(state.author);
        if let Some(receipt) = &state.receipt {
            assert!(!receipt.from_state.is_zero());
        }
    }
    for account in accounts {
        let Some(mut cursor) = net.store.latest_account_state_get(&txn, &account).unwrap() else {
            continue;
        };
        let mut hops = 0;
        while !cursor.is_zero() {
            let snapshot = net.store.account_state_get(&txn, &cursor).unwrap().unwrap();
            assert_eq!(snapshot.hash(), cursor);
            cursor = snapshot.previous;
            hops += 1;
            assert!(hops < 1_000, "account-state chain does not terminate");
        }
        assert_eq!(cursor, StateHash::zero());
    }
}

#[test]
fn counters_track_row_counts() {
    let net = TestNet::without_elections(1, 0, 1_000);
    let u1 = net.make_unit(
        0,
        UnitType::Dag,
        net.genesis,
        vec![net.genesis],
        vec![],
        vec![],
        1_700_000_001,
    );
    net.submit(&u1);
    let txn = net.store.begin_transaction();
    // genesis + one admitted unit
    assert_eq!(net.store.block_count(&txn).unwrap(), 2);
    assert_eq!(net.store.stable_block_count(&txn).unwrap(), 2);
    // exactly one free tip remains
    assert_eq!(net.store.dag_free_count(&txn).unwrap(), 1);
}
