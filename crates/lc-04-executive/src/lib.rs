//! # Executive Crate
//!
//! Transaction execution for stabilised light units. The [`Executive`]
//! enforces the pre-execution contract (intrinsic gas, nonce, balance),
//! moves value, drives the opcode-level executor behind [`OpcodeVm`], and
//! emits the receipt and ordered traces.
//!
//! Execution exceptions never abort the ledger: they are recorded in the
//! receipt (`excepted`) and the unit keeps its DAG position with
//! `status = Fail`.

pub mod errors;
pub mod executive;
pub mod gas;
pub mod vm;

pub use errors::{ExecutiveError, TransactionException};
pub use executive::{CodeDeposit, EnvInfo, ExecutionResult, Executive, Permanence};
pub use gas::GasSchedule;
pub use vm::{NullVm, OpcodeVm, VmCall, VmOutput};
