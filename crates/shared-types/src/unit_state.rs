//! # Unit State
//!
//! The mutable consensus record kept per unit, distinct from the immutable
//! [`Unit`](crate::Unit) itself: validation status, DAG position (level,
//! witnessed level, best parent), main-chain assignment, stability bookkeeping
//! and, for light units, the execution receipt.
//!
//! Once `is_stable` is set every field is frozen.

use crate::primitives::{Address, BlockHash};
use crate::receipt::Receipt;
use crate::unit::UnitType;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Validation status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStatus {
    /// Admitted and valid.
    Ok,
    /// Valid structure but loses a same-`(author, previous)` fork race;
    /// its links are never executed.
    Fork,
    /// Structural invariant broken; retained but never stabilised.
    Invalid,
    /// Execution of the linked transaction raised an exception.
    Fail,
    /// Not yet determined.
    Unknown,
}

impl BlockStatus {
    fn as_u8(self) -> u8 {
        match self {
            BlockStatus::Ok => 0,
            BlockStatus::Fork => 1,
            BlockStatus::Invalid => 2,
            BlockStatus::Fail => 3,
            BlockStatus::Unknown => 255,
        }
    }

    fn from_u8(v: u8) -> Result<Self, DecoderError> {
        match v {
            0 => Ok(BlockStatus::Ok),
            1 => Ok(BlockStatus::Fork),
            2 => Ok(BlockStatus::Invalid),
            3 => Ok(BlockStatus::Fail),
            255 => Ok(BlockStatus::Unknown),
            _ => Err(DecoderError::Custom("unknown block status")),
        }
    }
}

/// Consensus-side state of a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitState {
    pub unit_type: UnitType,
    /// Author recovered from the unit signature at admission.
    pub author: Address,
    pub status: BlockStatus,
    pub is_stable: bool,
    /// Dense id of stabilisation order; valid only when `is_stable`.
    pub stable_index: u64,
    /// Present iff the unit is included under some main-chain unit.
    pub main_chain_index: Option<u64>,
    /// `1 + max(parent.level)`; genesis is 0.
    pub level: u64,
    /// Level at which a witness majority backs this unit's best-parent chain.
    pub witnessed_level: u64,
    /// The deterministically chosen parent; zero for genesis.
    pub best_parent: BlockHash,
    /// Timestamp of the main-chain unit that stabilised this unit.
    pub mc_timestamp: u64,
    /// Local time at which stability was observed.
    pub stable_timestamp: u64,
    /// No child admitted yet.
    pub is_free: bool,
    pub is_on_main_chain: bool,
    pub earliest_included_mc_index: Option<u64>,
    pub latest_included_mc_index: Option<u64>,
    /// MCI of the best parent, when assigned.
    pub bp_included_mc_index: Option<u64>,
    pub earliest_bp_included_mc_index: Option<u64>,
    pub latest_bp_included_mc_index: Option<u64>,
    /// Execution receipt; present iff light, stable and status ∈ {Ok, Fail}.
    pub receipt: Option<Receipt>,
}

impl UnitState {
    /// State of a freshly admitted unit: `Ok`, free, nothing assigned yet.
    pub fn new_admitted(unit_type: UnitType, author: Address, level: u64) -> Self {
        UnitState {
            unit_type,
            author,
            status: BlockStatus::Ok,
            is_stable: false,
            stable_index: 0,
            main_chain_index: None,
            level,
            witnessed_level: 0,
            best_parent: BlockHash::zero(),
            mc_timestamp: 0,
            stable_timestamp: 0,
            is_free: true,
            is_on_main_chain: false,
            earliest_included_mc_index: None,
            latest_included_mc_index: None,
            bp_included_mc_index: None,
            earliest_bp_included_mc_index: None,
            latest_bp_included_mc_index: None,
            receipt: None,
        }
    }
}

fn append_opt_u64(s: &mut RlpStream, v: &Option<u64>) {
    match v {
        Some(x) => {
            s.begin_list(1);
            s.append(x);
        }
        None => {
            s.begin_list(0);
        }
    }
}

fn opt_u64_at(rlp: &Rlp, index: usize) -> Result<Option<u64>, DecoderError> {
    let item = rlp.at(index)?;
    match item.item_count()? {
        0 => Ok(None),
        1 => Ok(Some(item.val_at(0)?)),
        _ => Err(DecoderError::Custom("optional holds more than one value")),
    }
}

impl Encodable for UnitState {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(19);
        s.append(&match self.unit_type {
            UnitType::Dag => 0u8,
            UnitType::Light => 1u8,
        });
        s.append(&self.author);
        s.append(&self.status.as_u8());
        s.append(&self.is_stable);
        s.append(&self.stable_index);
        append_opt_u64(s, &self.main_chain_index);
        s.append(&self.level);
        s.append(&self.witnessed_level);
        s.append(&self.best_parent);
        s.append(&self.mc_timestamp);
        s.append(&self.stable_timestamp);
        s.append(&self.is_free);
        s.append(&self.is_on_main_chain);
        append_opt_u64(s, &self.earliest_included_mc_index);
        append_opt_u64(s, &self.latest_included_mc_index);
        append_opt_u64(s, &self.bp_included_mc_index);
        append_opt_u64(s, &self.earliest_bp_included_mc_index);
        append_opt_u64(s, &self.latest_bp_included_mc_index);
        match &self.receipt {
            Some(r) => {
                s.begin_list(1);
                s.append(r);
            }
            None => {
                s.begin_list(0);
            }
        }
    }
}

impl Decodable for UnitState {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 19 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let unit_type = match rlp.val_at::<u8>(0)? {
            0 => UnitType::Dag,
            1 => UnitType::Light,
            _ => return Err(DecoderError::Custom("unknown unit type")),
        };
        let receipt_item = rlp.at(18)?;
        let receipt = match receipt_item.item_count()? {
            0 => None,
            1 => Some(receipt_item.val_at(0)?),
            _ => return Err(DecoderError::Custom("optional holds more than one value")),
        };
        Ok(UnitState {
            unit_type,
            author: rlp.val_at(1)?,
            status: BlockStatus::from_u8(rlp.val_at(2)?)?,
            is_stable: rlp.val_at(3)?,
            stable_index: rlp.val_at(4)?,
            main_chain_index: opt_u64_at(rlp, 5)?,
            level: rlp.val_at(6)?,
            witnessed_level: rlp.val_at(7)?,
            best_parent: rlp.val_at(8)?,
            mc_timestamp: rlp.val_at(9)?,
            stable_timestamp: rlp.val_at(10)?,
            is_free: rlp.val_at(11)?,
            is_on_main_chain: rlp.val_at(12)?,
            earliest_included_mc_index: opt_u64_at(rlp, 13)?,
            latest_included_mc_index: opt_u64_at(rlp, 14)?,
            bp_included_mc_index: opt_u64_at(rlp, 15)?,
            earliest_bp_included_mc_index: opt_u64_at(rlp, 16)?,
            latest_bp_included_mc_index: opt_u64_at(rlp, 17)?,
            receipt,
        })
    }
}
