//! # Executive
//!
//! Drives one transaction: pre-execution contract checks, upfront gas
//! purchase, the outer call/create frame through [`OpcodeVm`], refund, trace
//! and receipt emission. Frame failures revert the frame only — the nonce
//! bump and gas purchase stand, mirroring the fail-path contract.

use crate::errors::{ExecutiveError, TransactionException};
use crate::gas::GasSchedule;
use crate::vm::{OpcodeVm, VmCall, VmOutput};
use lc_01_ledger_store::DbTransaction;
use lc_03_state::StateLedger;
use rlp::RlpStream;
use shared_types::{
    keccak256, Address, BlockHash, LogEntry, Receipt, StateHash, Trace, TraceAction, TraceResult,
    Transaction, U256,
};
use std::collections::BTreeSet;

/// What happens to state changes after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permanence {
    /// Flush to the store transaction.
    Committed,
    /// Discard; used by call-style queries and estimates.
    Uncommitted,
    /// Discard; the internal mirror of the fail path.
    Reverted,
}

/// Outcome of the code-deposit phase of a creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeDeposit {
    /// Not a creation.
    None,
    /// The deposit could not be paid for; no code was stored.
    Failed,
    Success,
}

/// Context of the stabilising main-chain unit.
#[derive(Debug, Clone, Copy)]
pub struct EnvInfo {
    /// Unit whose stabilisation executes this transaction.
    pub containing_block: BlockHash,
    /// Timestamp of the stabilising main-chain unit.
    pub mc_timestamp: u64,
}

/// Result of executing one transaction.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub gas_used: U256,
    pub excepted: TransactionException,
    /// Address created by a creation transaction.
    pub new_address: Option<Address>,
    pub output: Vec<u8>,
    pub code_deposit: CodeDeposit,
    /// Gas returned to the sender.
    pub gas_refunded: U256,
    /// Accounts modified by the transaction.
    pub modified_accounts: BTreeSet<Address>,
}

/// The execution driver for one transaction.
pub struct Executive<'a, 'b> {
    state: &'a mut StateLedger<'b>,
    env: EnvInfo,
    vm: &'a dyn OpcodeVm,
    schedule: GasSchedule,
    traces: Vec<Trace>,
}

/// The address a creation by `sender` at `nonce` lands on.
pub fn contract_address(sender: &Address, nonce: U256) -> Address {
    let mut s = RlpStream::new_list(2);
    s.append(sender);
    s.append(&nonce);
    let hash = keccak256(&s.out());
    Address::from_slice(&hash.as_bytes()[12..])
}

impl<'a, 'b> Executive<'a, 'b> {
    pub fn new(state: &'a mut StateLedger<'b>, env: EnvInfo, vm: &'a dyn OpcodeVm) -> Self {
        Self {
            state,
            env,
            vm,
            schedule: GasSchedule::default(),
            traces: Vec::new(),
        }
    }

    /// Ordered traces collected by the last `execute`.
    pub fn take_traces(&mut self) -> Vec<Trace> {
        std::mem::take(&mut self.traces)
    }

    /// Execute `tx` under `permanence`.
    ///
    /// Pre-execution failures (signature, intrinsic gas, nonce, balance)
    /// leave the state untouched. Frame failures consume the gas and keep the
    /// nonce bump; only the frame's own changes revert.
    pub fn execute(
        &mut self,
        txn: &mut DbTransaction<'_>,
        tx: &Transaction,
        permanence: Permanence,
    ) -> Result<(ExecutionResult, Receipt), ExecutiveError> {
        self.traces.clear();

        let sender = match shared_crypto::recover(&tx.hash(), &tx.signature) {
            Ok(sender) => sender,
            Err(_) => return Ok(rejected(TransactionException::InvalidSignature)),
        };

        let intrinsic = self.schedule.intrinsic_gas(&tx.data, tx.is_create());
        if tx.gas < intrinsic {
            return Ok(rejected(TransactionException::OutOfGasIntrinsic));
        }
        if self.state.nonce(txn, &sender)? != tx.nonce {
            return Ok(rejected(TransactionException::InvalidNonce));
        }
        let gas_cost = tx.gas * tx.gas_price;
        if self.state.balance(txn, &sender)? < gas_cost + tx.value {
            return Ok(rejected(TransactionException::NotEnoughCash));
        }

        // upfront purchase; survives frame failure
        self.state.inc_nonce(txn, &sender)?;
        if !self.state.sub_balance(txn, &sender, gas_cost)? {
            return Ok(rejected(TransactionException::NotEnoughCash));
        }

        self.state.checkpoint();
        let frame_gas = tx.gas - intrinsic;
        let frame = if tx.is_create() {
            self.run_create(txn, tx, &sender, frame_gas)
        } else {
            self.run_call(txn, tx, &sender, frame_gas)
        };

        let (excepted, gas_left, output, new_address, code_deposit, logs) = match frame {
            Ok(frame) => {
                self.state.discard_checkpoint()?;
                (
                    TransactionException::None,
                    frame.gas_left,
                    frame.output,
                    frame.new_address,
                    frame.code_deposit,
                    frame.logs,
                )
            }
            Err(excepted) => {
                self.state.revert_checkpoint()?;
                self.push_failed_trace(tx, &sender, frame_gas, excepted);
                (excepted, U256::zero(), Vec::new(), None, CodeDeposit::None, Vec::new())
            }
        };

        // refund the unused gas
        let refund = gas_left * tx.gas_price;
        if !refund.is_zero() {
            self.state.add_balance(txn, &sender, refund)?;
        }
        let gas_used = tx.gas - gas_left;

        let result = ExecutionResult {
            gas_used,
            excepted,
            new_address,
            output,
            code_deposit,
            gas_refunded: gas_left,
            modified_accounts: self.state.touched(),
        };

        let receipt = match permanence {
            Permanence::Committed => {
                let outcome = self.state.commit(txn, &self.env.containing_block)?;
                let from_state = outcome
                    .states
                    .get(&sender)
                    .copied()
                    .unwrap_or_else(StateHash::zero);
                let to_states = outcome
                    .states
                    .iter()
                    .filter(|(address, _)| **address != sender)
                    .map(|(_, hash)| *hash)
                    .collect();
                Receipt::new(from_state, to_states, gas_used, logs)
            }
            Permanence::Uncommitted | Permanence::Reverted => {
                self.state.rollback();
                Receipt::new(StateHash::zero(), Vec::new(), gas_used, logs)
            }
        };

        tracing::debug!(
            target: "lc::executive",
            mc_timestamp = self.env.mc_timestamp,
            gas_used = %result.gas_used,
            excepted = %result.excepted,
            "transaction executed"
        );
        Ok((result, receipt))
    }

    fn run_call(
        &mut self,
        txn: &mut DbTransaction<'_>,
        tx: &Transaction,
        sender: &Address,
        frame_gas: U256,
    ) -> Result<FrameOutcome, TransactionException> {
        let to = tx.to.ok_or(TransactionException::InvalidFormat)?;
        transfer(self.state, txn, sender, &to, tx.value)?;

        let code = self
            .state
            .code(txn, &to)
            .map_err(|_| TransactionException::Unknown)?;
        let vm_out = if code.is_empty() {
            VmOutput {
                gas_left: frame_gas,
                output: Vec::new(),
                logs: Vec::new(),
            }
        } else {
            self.vm.call(
                self.state,
                txn,
                VmCall {
                    sender: *sender,
                    origin: *sender,
                    address: to,
                    value: tx.value,
                    data: &tx.data,
                    code: &code,
                    gas: frame_gas,
                    depth: 0,
                },
            )?
        };

        self.traces.push(Trace {
            action: TraceAction::Call {
                call_type: "call".to_string(),
                from: *sender,
                to,
                gas: frame_gas,
                data: tx.data.clone(),
                amount: tx.value,
            },
            result: Some(TraceResult::Call {
                gas_used: frame_gas - vm_out.gas_left,
                output: vm_out.output.clone(),
            }),
            error_message: String::new(),
            depth: 0,
        });

        Ok(FrameOutcome {
            gas_left: vm_out.gas_left,
            output: vm_out.output,
            new_address: None,
            code_deposit: CodeDeposit::None,
            logs: vm_out.logs,
        })
    }

    fn run_create(
        &mut self,
        txn: &mut DbTransaction<'_>,
        tx: &Transaction,
        sender: &Address,
        frame_gas: U256,
    ) -> Result<FrameOutcome, TransactionException> {
        let new_address = contract_address(sender, tx.nonce);

        // an occupied address (nonce or code) cannot be created over
        let occupied = self
            .state
            .nonce(txn, &new_address)
            .map_err(|_| TransactionException::Unknown)?
            > U256::zero()
            || !self
                .state
                .code(txn, &new_address)
                .map_err(|_| TransactionException::Unknown)?
                .is_empty();
        if occupied {
            return Err(TransactionException::AddressAlreadyUsed);
        }

        transfer(self.state, txn, sender, &new_address, tx.value)?;

        let vm_out = self.vm.create(
            self.state,
            txn,
            VmCall {
                sender: *sender,
                origin: *sender,
                address: new_address,
                value: tx.value,
                data: &tx.data,
                code: &[],
                gas: frame_gas,
                depth: 0,
            },
        )?;

        // code-deposit phase
        let deposit = self.schedule.code_deposit_gas(vm_out.output.len());
        let (gas_left, code, code_deposit) = if vm_out.gas_left >= deposit {
            (vm_out.gas_left - deposit, vm_out.output.clone(), CodeDeposit::Success)
        } else {
            (vm_out.gas_left, Vec::new(), CodeDeposit::Failed)
        };
        if !code.is_empty() {
            self.state
                .set_code(txn, &new_address, code.clone())
                .map_err(|_| TransactionException::Unknown)?;
        }

        self.traces.push(Trace {
            action: TraceAction::Create {
                from: *sender,
                gas: frame_gas,
                init: tx.data.clone(),
                amount: tx.value,
            },
            result: Some(TraceResult::Create {
                gas_used: frame_gas - gas_left,
                contract: new_address,
                code: code.clone(),
            }),
            error_message: String::new(),
            depth: 0,
        });

        Ok(FrameOutcome {
            gas_left,
            output: code,
            new_address: Some(new_address),
            code_deposit,
            logs: vm_out.logs,
        })
    }

    fn push_failed_trace(
        &mut self,
        tx: &Transaction,
        sender: &Address,
        frame_gas: U256,
        excepted: TransactionException,
    ) {
        let action = match tx.to {
            Some(to) => TraceAction::Call {
                call_type: "call".to_string(),
                from: *sender,
                to,
                gas: frame_gas,
                data: tx.data.clone(),
                amount: tx.value,
            },
            None => TraceAction::Create {
                from: *sender,
                gas: frame_gas,
                init: tx.data.clone(),
                amount: tx.value,
            },
        };
        self.traces.push(Trace {
            action,
            result: None,
            error_message: excepted.to_string(),
            depth: 0,
        });
    }
}

struct FrameOutcome {
    gas_left: U256,
    output: Vec<u8>,
    new_address: Option<Address>,
    code_deposit: CodeDeposit,
    logs: Vec<LogEntry>,
}

fn transfer(
    state: &mut StateLedger<'_>,
    txn: &DbTransaction<'_>,
    from: &Address,
    to: &Address,
    value: U256,
) -> Result<(), TransactionException> {
    if value.is_zero() {
        return Ok(());
    }
    if !state
        .sub_balance(txn, from, value)
        .map_err(|_| TransactionException::Unknown)?
    {
        return Err(TransactionException::NotEnoughCash);
    }
    state
        .add_balance(txn, to, value)
        .map_err(|_| TransactionException::Unknown)?;
    Ok(())
}

/// A pre-execution rejection: nothing ran, nothing changed.
fn rejected(excepted: TransactionException) -> (ExecutionResult, Receipt) {
    (
        ExecutionResult {
            gas_used: U256::zero(),
            excepted,
            new_address: None,
            output: Vec::new(),
            code_deposit: CodeDeposit::None,
            gas_refunded: U256::zero(),
            modified_accounts: BTreeSet::new(),
        },
        Receipt::new(StateHash::zero(), Vec::new(), U256::zero(), Vec::new()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::NullVm;
    use lc_01_ledger_store::{DatabaseConfig, LedgerStore};
    use shared_crypto::Keypair;
    use tempfile::TempDir;

    fn env() -> EnvInfo {
        EnvInfo {
            containing_block: BlockHash::repeat_byte(0xE1),
            mc_timestamp: 1_700_000_000,
        }
    }

    fn signed_tx(keypair: &Keypair, nonce: u64, to: Option<Address>, value: u64, data: Vec<u8>) -> Transaction {
        let mut tx = Transaction {
            nonce: U256::from(nonce),
            gas_price: U256::one(),
            gas: U256::from(100_000u64),
            to,
            value: U256::from(value),
            data,
            signature: Default::default(),
        };
        tx.signature = keypair.sign(&tx.hash()).unwrap();
        tx
    }

    fn fund(store: &LedgerStore, address: &Address, amount: u64) {
        let mut state = StateLedger::new(store);
        let mut txn = store.begin_transaction();
        state.add_balance(&txn, address, U256::from(amount)).unwrap();
        state.commit(&mut txn, &BlockHash::zero()).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn test_plain_transfer() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let keypair = Keypair::from_bytes([0x11; 32]).unwrap();
        let sender = keypair.address();
        let recipient = Address::repeat_byte(0x99);
        fund(&store, &sender, 1_000_000);

        let mut state = StateLedger::new(&store);
        let mut txn = store.begin_transaction();
        let mut exec = Executive::new(&mut state, env(), &NullVm);
        let tx = signed_tx(&keypair, 0, Some(recipient), 500, vec![]);
        let (result, receipt) = exec.execute(&mut txn, &tx, Permanence::Committed).unwrap();

        assert!(result.excepted.is_none());
        assert_eq!(result.gas_used, U256::from(21_000u64));
        assert!(!receipt.from_state.is_zero());
        assert_eq!(receipt.to_states.len(), 1);
        assert_eq!(exec.take_traces().len(), 1);

        let mut check = StateLedger::new(&store);
        assert_eq!(
            check.balance(&txn, &recipient).unwrap(),
            U256::from(500u64)
        );
        assert_eq!(
            check.balance(&txn, &sender).unwrap(),
            U256::from(1_000_000u64 - 500 - 21_000)
        );
        assert_eq!(check.nonce(&txn, &sender).unwrap(), U256::one());
    }

    #[test]
    fn test_invalid_nonce_rejected_without_state_change() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let keypair = Keypair::from_bytes([0x12; 32]).unwrap();
        fund(&store, &keypair.address(), 1_000_000);

        let mut state = StateLedger::new(&store);
        let mut txn = store.begin_transaction();
        let mut exec = Executive::new(&mut state, env(), &NullVm);
        let tx = signed_tx(&keypair, 5, Some(Address::repeat_byte(0x01)), 1, vec![]);
        let (result, _) = exec.execute(&mut txn, &tx, Permanence::Committed).unwrap();

        assert_eq!(result.excepted, TransactionException::InvalidNonce);
        assert_eq!(result.gas_used, U256::zero());
        let mut check = StateLedger::new(&store);
        assert_eq!(check.nonce(&txn, &keypair.address()).unwrap(), U256::zero());
    }

    #[test]
    fn test_not_enough_cash() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let keypair = Keypair::from_bytes([0x13; 32]).unwrap();
        fund(&store, &keypair.address(), 10);

        let mut state = StateLedger::new(&store);
        let mut txn = store.begin_transaction();
        let mut exec = Executive::new(&mut state, env(), &NullVm);
        let tx = signed_tx(&keypair, 0, Some(Address::repeat_byte(0x01)), 1, vec![]);
        let (result, _) = exec.execute(&mut txn, &tx, Permanence::Committed).unwrap();
        assert_eq!(result.excepted, TransactionException::NotEnoughCash);
    }

    #[test]
    fn test_intrinsic_gas_floor() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let keypair = Keypair::from_bytes([0x14; 32]).unwrap();
        fund(&store, &keypair.address(), 1_000_000);

        let mut state = StateLedger::new(&store);
        let mut txn = store.begin_transaction();
        let mut exec = Executive::new(&mut state, env(), &NullVm);
        let mut tx = signed_tx(&keypair, 0, Some(Address::repeat_byte(0x01)), 1, vec![]);
        tx.gas = U256::from(20_999u64);
        tx.signature = keypair.sign(&tx.hash()).unwrap();
        let (result, _) = exec.execute(&mut txn, &tx, Permanence::Committed).unwrap();
        assert_eq!(result.excepted, TransactionException::OutOfGasIntrinsic);
    }

    #[test]
    fn test_create_deploys_code_at_derived_address() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let keypair = Keypair::from_bytes([0x15; 32]).unwrap();
        let sender = keypair.address();
        fund(&store, &sender, 10_000_000);

        let init = vec![0x60, 0x60, 0x60];
        let mut state = StateLedger::new(&store);
        let mut txn = store.begin_transaction();
        let mut exec = Executive::new(&mut state, env(), &NullVm);
        let tx = signed_tx(&keypair, 0, None, 0, init.clone());
        let (result, _) = exec.execute(&mut txn, &tx, Permanence::Committed).unwrap();

        assert!(result.excepted.is_none());
        let expected = contract_address(&sender, U256::zero());
        assert_eq!(result.new_address, Some(expected));
        assert_eq!(result.code_deposit, CodeDeposit::Success);

        let mut check = StateLedger::new(&store);
        assert_eq!(check.code(&txn, &expected).unwrap(), init);
    }

    #[test]
    fn test_uncommitted_leaves_no_state() {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path(), DatabaseConfig::for_testing()).unwrap();
        let keypair = Keypair::from_bytes([0x16; 32]).unwrap();
        fund(&store, &keypair.address(), 1_000_000);

        let mut state = StateLedger::new(&store);
        let mut txn = store.begin_transaction();
        let mut exec = Executive::new(&mut state, env(), &NullVm);
        let tx = signed_tx(&keypair, 0, Some(Address::repeat_byte(0x01)), 77, vec![]);
        let (result, receipt) = exec.execute(&mut txn, &tx, Permanence::Uncommitted).unwrap();

        assert!(result.excepted.is_none());
        assert!(receipt.from_state.is_zero());
        txn.commit().unwrap();
        let txn = store.begin_transaction();
        let mut check = StateLedger::new(&store);
        assert_eq!(
            check.balance(&txn, &Address::repeat_byte(0x01)).unwrap(),
            U256::zero()
        );
    }
}
