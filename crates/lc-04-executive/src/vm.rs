//! # Opcode Executor Seam
//!
//! The interpreter itself is an external collaborator. The executive drives
//! whatever implements [`OpcodeVm`]; [`NullVm`] is the built-in stand-in used
//! by nodes that carry no interpreter (and by tests): calls return empty
//! output, creations deploy the init bytes verbatim.

use crate::errors::TransactionException;
use lc_01_ledger_store::DbTransaction;
use lc_03_state::StateLedger;
use shared_types::{Address, LogEntry, U256};

/// One message frame handed to the executor.
#[derive(Debug, Clone)]
pub struct VmCall<'a> {
    /// Immediate caller of this frame.
    pub sender: Address,
    /// Transaction origin.
    pub origin: Address,
    /// Account being executed (callee, or the address under creation).
    pub address: Address,
    pub value: U256,
    /// Call data, or init code for a creation frame.
    pub data: &'a [u8],
    /// Code being executed; empty for a creation frame.
    pub code: &'a [u8],
    /// Gas available to the frame.
    pub gas: U256,
    pub depth: u32,
}

/// What a frame produced.
#[derive(Debug, Clone, Default)]
pub struct VmOutput {
    pub gas_left: U256,
    /// Return data; for a creation frame, the runtime code to deposit.
    pub output: Vec<u8>,
    pub logs: Vec<LogEntry>,
}

/// The opcode-level executor the executive drives.
pub trait OpcodeVm: Send + Sync {
    /// Execute a message call frame.
    fn call(
        &self,
        state: &mut StateLedger<'_>,
        txn: &DbTransaction<'_>,
        ctx: VmCall<'_>,
    ) -> Result<VmOutput, TransactionException>;

    /// Execute a creation frame; the output is the runtime code.
    fn create(
        &self,
        state: &mut StateLedger<'_>,
        txn: &DbTransaction<'_>,
        ctx: VmCall<'_>,
    ) -> Result<VmOutput, TransactionException>;
}

/// Executor stand-in that runs no opcodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVm;

impl OpcodeVm for NullVm {
    fn call(
        &self,
        _state: &mut StateLedger<'_>,
        _txn: &DbTransaction<'_>,
        ctx: VmCall<'_>,
    ) -> Result<VmOutput, TransactionException> {
        Ok(VmOutput {
            gas_left: ctx.gas,
            output: Vec::new(),
            logs: Vec::new(),
        })
    }

    fn create(
        &self,
        _state: &mut StateLedger<'_>,
        _txn: &DbTransaction<'_>,
        ctx: VmCall<'_>,
    ) -> Result<VmOutput, TransactionException> {
        Ok(VmOutput {
            gas_left: ctx.gas,
            output: ctx.data.to_vec(),
            logs: Vec::new(),
        })
    }
}
