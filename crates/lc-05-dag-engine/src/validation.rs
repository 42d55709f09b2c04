//! # Structural Validation
//!
//! Shape checks on a unit whose dependencies are already present. Violations
//! here record the unit as `Invalid`; dependency absence never reaches this
//! module (the processor routes it to the unhandled cache first).

use crate::errors::DagError;
use lc_01_ledger_store::{DbTransaction, LedgerStore};
use shared_types::{Address, Unit};

/// Hard cap on parent citations.
pub const MAX_PARENTS: usize = 16;

/// Hard cap on links carried by one unit.
pub const MAX_LINKS: usize = 256;

/// Validate the shape of a non-genesis unit against its present parents.
pub fn validate_unit(
    store: &LedgerStore,
    txn: &DbTransaction<'_>,
    unit: &Unit,
    author: &Address,
) -> Result<(), DagError> {
    if unit.parents.is_empty() {
        return Err(DagError::Invalid("non-genesis unit without parents".into()));
    }
    if unit.parents.len() > MAX_PARENTS {
        return Err(DagError::Invalid(format!(
            "{} parents exceeds the cap of {MAX_PARENTS}",
            unit.parents.len()
        )));
    }
    // canonical form: parents strictly ascending (sorted, no duplicates)
    if !unit.parents.windows(2).all(|w| w[0] < w[1]) {
        return Err(DagError::Invalid("parents not strictly ascending".into()));
    }
    if unit.links.len() > MAX_LINKS {
        return Err(DagError::Invalid(format!(
            "{} links exceeds the cap of {MAX_LINKS}",
            unit.links.len()
        )));
    }
    let hash = unit.hash();
    if unit.parents.contains(&hash) || unit.previous == hash {
        return Err(DagError::Invalid("unit cites itself".into()));
    }

    // `previous` must be an earlier unit by the same author
    if !unit.previous.is_zero() {
        let previous_state = store
            .block_state_get(txn, &unit.previous)?
            .ok_or_else(|| DagError::UnknownUnit(format!("{:?}", unit.previous)))?;
        if previous_state.author != *author {
            return Err(DagError::Invalid(
                "previous unit belongs to a different author".into(),
            ));
        }
    }

    // the witness-list block must itself be known
    if !unit.witness_list_block.is_zero() && !store.block_exists(txn, &unit.witness_list_block)? {
        return Err(DagError::UnknownUnit(format!(
            "{:?}",
            unit.witness_list_block
        )));
    }
    Ok(())
}
