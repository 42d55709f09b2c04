//! Consensus boundary scenarios driven through the full write path.

use crate::harness::TestNet;
use lc_07_block_processor::ProcessOutcome;
use shared_crypto::{vrf_output, vrf_prove, Keypair};
use shared_types::{Approve, BlockHash, BlockStatus, SignatureRSV, UnitType, H256, U256};

#[test]
fn s1_deep_chain_admits_in_dependency_order() {
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
    let u2 = net.make_unit(
        0,
        UnitType::Dag,
        u1.hash(),
        vec![u1.hash()],
        vec![],
        vec![],
        1_700_000_002,
    );
    let u3 = net.make_unit(
        0,
        UnitType::Dag,
        u2.hash(),
        vec![u2.hash()],
        vec![],
        vec![],
        1_700_000_003,
    );

    // deepest first: each parks on its missing parent
    assert!(matches!(
        net.submit(&u3)[0],
        ProcessOutcome::Pending { missing_blocks: 1, .. }
    ));
    assert!(matches!(
        net.submit(&u2)[0],
        ProcessOutcome::Pending { missing_blocks: 1, .. }
    ));
    // only the root of the pending chain is genuinely missing
    let missing = net.processor.missing_for_request(50);
    assert_eq!(missing.blocks, vec![u1.hash()]);

    // the root arrives: the whole chain admits in order
    let outcomes = net.submit(&u1);
    assert_eq!(outcomes.len(), 3);
    let admitted: Vec<BlockHash> = outcomes
        .iter()
        .map(|o| match o {
            ProcessOutcome::Admitted { hash, .. } => *hash,
            other => panic!("expected admission, got {other:?}"),
        })
        .collect();
    assert_eq!(admitted, vec![u1.hash(), u2.hash(), u3.hash()]);

    let txn = net.store.begin_transaction();
    assert_eq!(net.store.last_mci_get(&txn).unwrap(), 3);
}

#[test]
fn s2_fork_rival_keeps_position_but_never_executes() {
    let net = TestNet::without_elections(1, 0, 1_000);
    let sender_one = Keypair::from_bytes([0x71; 32]).unwrap();
    let sender_two = Keypair::from_bytes([0x72; 32]).unwrap();
    net.fund(sender_one.address(), 1_000_000);
    net.fund(sender_two.address(), 1_000_000);

    let base = net.make_unit(
        0,
        UnitType::Dag,
        net.genesis,
        vec![net.genesis],
        vec![],
        vec![],
        1_700_000_001,
    );
    net.submit(&base);

    let tx_one = net.make_transfer(&sender_one, 0, shared_types::Address::repeat_byte(0xA1), 10);
    let tx_two = net.make_transfer(&sender_two, 0, shared_types::Address::repeat_byte(0xA2), 20);
    let link_one = tx_one.hash();
    let link_two = tx_two.hash();
    net.processor.on_transactions(vec![tx_one, tx_two]).unwrap();

    // two rivals share (author, previous)
    let canonical = net.make_unit(
        0,
        UnitType::Light,
        base.hash(),
        vec![base.hash()],
        vec![link_one],
        vec![],
        1_700_000_002,
    );
    let rival = net.make_unit(
        0,
        UnitType::Light,
        base.hash(),
        vec![canonical.hash()],
        vec![link_two],
        vec![],
        1_700_000_003,
    );
    net.submit(&canonical);
    let outcomes = net.submit(&rival);
    assert!(
        matches!(outcomes[0], ProcessOutcome::Admitted { status: BlockStatus::Fork, .. })
    );

    // extend so the rival stabilises too
    let tip = net.make_unit(
        0,
        UnitType::Dag,
        rival.hash(),
        vec![rival.hash()],
        vec![],
        vec![],
        1_700_000_004,
    );
    net.submit(&tip);

    let txn = net.store.begin_transaction();
    let canonical_state = net
        .store
        .block_state_get(&txn, &canonical.hash())
        .unwrap()
        .unwrap();
    assert_eq!(canonical_state.status, BlockStatus::Ok);
    assert!(canonical_state.is_stable);
    assert!(canonical_state.receipt.is_some());

    let rival_state = net.store.block_state_get(&txn, &rival.hash()).unwrap().unwrap();
    assert_eq!(rival_state.status, BlockStatus::Fork);
    assert!(rival_state.is_stable);
    assert!(rival_state.receipt.is_none());

    // the canonical link executed, the rival's never did
    assert_eq!(
        net.store.link_get(&txn, &link_one).unwrap(),
        Some(canonical.hash())
    );
    assert_eq!(net.store.link_get(&txn, &link_two).unwrap(), None);
    let mut state = lc_03_state::StateLedger::new(&net.store);
    assert_eq!(
        state
            .balance(&txn, &shared_types::Address::repeat_byte(0xA2))
            .unwrap(),
        U256::zero()
    );
}

#[test]
fn s3_witness_majority_drives_stability() {
    let net = TestNet::without_elections(3, 2, 1_000);
    let mut previous = [BlockHash::zero(); 3];
    let mut tip = net.genesis;
    let mut last_stable = 0;
    for i in 0..7u64 {
        let author = (i % 3) as usize;
        let unit = net.make_unit(
            author,
            UnitType::Dag,
            previous[author],
            vec![tip],
            vec![],
            vec![],
            1_700_000_001 + i,
        );
        let outcomes = net.submit(&unit);
        let ProcessOutcome::Admitted { last_stable_mci, .. } = outcomes[0] else {
            panic!("expected admission");
        };
        // stability is monotone
        assert!(last_stable_mci >= last_stable);
        last_stable = last_stable_mci;
        previous[author] = unit.hash();
        tip = unit.hash();
    }
    // with threshold 2 the tip at witnessed level 6 stabilises mci 4
    assert_eq!(last_stable, 4);

    // stable indices are dense and assigned exactly once
    let txn = net.store.begin_transaction();
    let count = net.store.stable_block_count(&txn).unwrap();
    assert_eq!(count, net.store.last_stable_index_get(&txn).unwrap() + 1);
    let mut seen = std::collections::HashSet::new();
    for index in 0..count {
        let hash = net
            .store
            .stable_block_get(&txn, index)
            .unwrap()
            .unwrap_or_else(|| panic!("stable index {index} unassigned"));
        assert!(seen.insert(hash), "stable index assigned twice");
        let state = net.store.block_state_get(&txn, &hash).unwrap().unwrap();
        assert!(state.is_stable);
        assert_eq!(state.stable_index, index);
    }
}

#[test]
fn s4_reorg_unassigns_indices_above_divergence() {
    let net = TestNet::without_elections(3, 100, 1_000);

    // branch A: two units by witness 0 alone (witnessed level stays 0)
    let a1 = net.make_unit(
        0,
        UnitType::Dag,
        BlockHash::zero(),
        vec![net.genesis],
        vec![],
        vec![],
        1_700_000_001,
    );
    let a2 = net.make_unit(
        0,
        UnitType::Dag,
        a1.hash(),
        vec![a1.hash()],
        vec![],
        vec![],
        1_700_000_002,
    );
    net.submit(&a1);
    net.submit(&a2);

    {
        let txn = net.store.begin_transaction();
        let a1_state = net.store.block_state_get(&txn, &a1.hash()).unwrap().unwrap();
        assert_eq!(a1_state.main_chain_index, Some(1));
        assert!(a1_state.is_on_main_chain);
        assert_eq!(net.store.last_mci_get(&txn).unwrap(), 2);
    }

    // branch B: witnesses 1 and 2 push the witnessed level past branch A
    let b1 = net.make_unit(
        1,
        UnitType::Dag,
        BlockHash::zero(),
        vec![net.genesis],
        vec![],
        vec![],
        1_700_000_003,
    );
    net.submit(&b1);
    {
        // a lone low-witnessed-level branch does not displace the chain
        let txn = net.store.begin_transaction();
        assert_eq!(net.store.main_chain_get(&txn, 1).unwrap(), Some(a1.hash()));
    }
    let b2 = net.make_unit(
        2,
        UnitType::Dag,
        BlockHash::zero(),
        vec![b1.hash()],
        vec![],
        vec![],
        1_700_000_004,
    );
    net.submit(&b2);

    let txn = net.store.begin_transaction();
    assert_eq!(net.store.main_chain_get(&txn, 1).unwrap(), Some(b1.hash()));
    assert_eq!(net.store.main_chain_get(&txn, 2).unwrap(), Some(b2.hash()));

    // the displaced units lose their assignment but keep their inclusion
    // bookkeeping; nothing stabilised is touched
    let a1_state = net.store.block_state_get(&txn, &a1.hash()).unwrap().unwrap();
    assert_eq!(a1_state.main_chain_index, None);
    assert!(!a1_state.is_on_main_chain);
    let a2_state = net.store.block_state_get(&txn, &a2.hash()).unwrap().unwrap();
    assert_eq!(a2_state.main_chain_index, None);
    assert_eq!(a2_state.earliest_included_mc_index, Some(1));

    let genesis_state = net.store.block_state_get(&txn, &net.genesis).unwrap().unwrap();
    assert!(genesis_state.is_stable);
    assert_eq!(genesis_state.stable_index, 0);
    assert_eq!(net.store.last_stable_mci_get(&txn).unwrap(), 0);
}

#[test]
fn s5_epoch_boundary_elects_top_candidates() {
    let net = TestNet::new(1, 0, 4);
    let seed = H256::repeat_byte(0x5E);
    let challenger = Keypair::from_bytes([0x66; 32]).unwrap();

    // two candidates stand for epoch 0
    let mut approves = Vec::new();
    for keypair in [&net.witnesses[0], &challenger] {
        let proof = vrf_prove(keypair, &seed).unwrap();
        let mut approve = Approve {
            epoch: 0,
            proof,
            signature: SignatureRSV::default(),
        };
        approve.signature = keypair.sign(&approve.hash()).unwrap();
        approves.push(approve);
    }
    let expected_winner = {
        let mut ranked: Vec<(H256, shared_types::Address)> = approves
            .iter()
            .map(|approve| {
                let sender = shared_crypto::recover(&approve.hash(), &approve.signature).unwrap();
                (vrf_output(&approve.proof), sender)
            })
            .collect();
        ranked.sort();
        ranked[0].1
    };
    let approve_hashes: Vec<H256> = approves.iter().map(|a| a.hash()).collect();
    for approve in approves {
        net.processor.on_approve(approve).unwrap();
    }

    // first unit carries the approves; then walk the chain across the boundary
    let mut previous = BlockHash::zero();
    let mut tip = net.genesis;
    for i in 0..4u64 {
        let approves = if i == 0 { approve_hashes.clone() } else { vec![] };
        let unit = net.make_unit(
            0,
            UnitType::Dag,
            previous,
            vec![tip],
            vec![],
            approves,
            1_700_000_001 + i,
        );
        let outcomes = net.submit(&unit);
        assert!(matches!(outcomes[0], ProcessOutcome::Admitted { .. }));
        previous = unit.hash();
        tip = unit.hash();
    }

    let txn = net.store.begin_transaction();
    assert_eq!(net.store.last_stable_mci_get(&txn).unwrap(), 4);
    let record = net.store.epoch_record_get(&txn, 1).unwrap().expect("epoch 1 elected");
    assert_eq!(record.witness_set, vec![expected_winner]);
    // the in-memory validator list follows the election
    assert!(net.cache.validator_list_contains(&expected_winner));

    // all three query stages are consistent
    let receipts = net.store.epoch_approve_receipts(&txn, 0).unwrap();
    assert_eq!(receipts.len(), 2);
}

#[test]
fn s6_missing_sampling_spreads_requests() {
    let net = TestNet::without_elections(1, 0, 1_000);
    let mut parked = Vec::new();
    for i in 0..20u8 {
        let phantom = BlockHash::repeat_byte(0xB0u8.wrapping_add(i));
        let unit = net.make_unit(
            0,
            UnitType::Dag,
            BlockHash::zero(),
            vec![phantom],
            vec![],
            vec![],
            1_700_000_001 + i as u64,
        );
        let outcomes = net.submit(&unit);
        assert!(matches!(outcomes[0], ProcessOutcome::Pending { .. }));
        parked.push(phantom);
    }
    let sample = net.processor.missing_for_request(10);
    assert_eq!(sample.blocks.len(), 10);
    let distinct: std::collections::HashSet<_> = sample.blocks.iter().collect();
    assert_eq!(distinct.len(), 10);
    for hash in &sample.blocks {
        assert!(parked.contains(hash));
    }
}

#[test]
fn node_runtime_builds_and_admits() {
    use node_runtime::{GenesisAccount, GenesisConfig, Node, NodeConfig};

    let dir = tempfile::TempDir::new().unwrap();
    let witness = Keypair::from_bytes([0x77; 32]).unwrap();
    let mut config = NodeConfig::with_defaults();
    config.storage.data_dir = dir.path().to_path_buf();
    config.storage.sync_writes = false;
    config.dag = lc_05_dag_engine::DagConfig::for_testing(1, 0, 1_000);
    let genesis = GenesisConfig {
        timestamp: 1_700_000_000,
        witnesses: vec![format!("0x{}", hex_address(&witness))],
        accounts: vec![GenesisAccount {
            address: format!("0x{}", "22".repeat(20)),
            balance: "9000".to_string(),
        }],
    };
    let node = Node::build(&config, &genesis).unwrap();

    let mut unit = shared_types::Unit {
        unit_type: UnitType::Dag,
        previous: node.genesis_hash(),
        parents: vec![node.genesis_hash()],
        witness_list_block: node.genesis_hash(),
        last_summary_block: BlockHash::zero(),
        last_summary: H256::zero(),
        links: vec![],
        approves: vec![],
        exec_timestamp: 1_700_000_001,
        data_hash: H256::zero(),
        signature: SignatureRSV::default(),
    };
    unit.signature = witness.sign(&unit.hash()).unwrap();
    let outcomes = node
        .processor()
        .process(lc_07_block_processor::ProcessItem::new(
            unit,
            lc_07_block_processor::ItemSource::Broadcast,
            1_700_000_002,
        ))
        .unwrap();
    assert!(matches!(outcomes[0], ProcessOutcome::Admitted { .. }));
    assert!(node.status().unwrap().contains("last_mci:1"));
}

fn hex_address(keypair: &Keypair) -> String {
    keypair
        .address()
        .as_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
