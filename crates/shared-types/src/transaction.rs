//! # Transactions
//!
//! The payload a light unit links to. Transactions travel separately from
//! units and are executed when the linking unit stabilises. Identity is
//! Keccak-256 over the RLP excluding the signature, exactly as for units.

use crate::primitives::{keccak256, Address, SignatureRSV, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// A value/contract transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: U256,
    pub gas_price: U256,
    /// Gas limit for the whole execution.
    pub gas: U256,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    /// 65-byte recoverable signature over [`Transaction::hash`].
    pub signature: SignatureRSV,
}

impl Transaction {
    /// True iff this transaction creates a contract.
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Identity hash: Keccak-256 over the RLP of all fields but the signature.
    pub fn hash(&self) -> H256 {
        let mut s = RlpStream::new_list(6);
        self.append_unsigned(&mut s);
        keccak256(&s.out())
    }

    fn append_unsigned(&self, s: &mut RlpStream) {
        s.append(&self.nonce);
        s.append(&self.gas_price);
        s.append(&self.gas);
        match &self.to {
            Some(to) => s.append(to),
            None => s.append_empty_data(),
        };
        s.append(&self.value);
        s.append(&self.data);
    }
}

impl Encodable for Transaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(7);
        self.append_unsigned(s);
        s.append(&self.signature);
    }
}

impl Decodable for Transaction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 7 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let to_item = rlp.at(3)?;
        let to = if to_item.is_empty() {
            None
        } else {
            Some(to_item.as_val()?)
        };
        Ok(Transaction {
            nonce: rlp.val_at(0)?,
            gas_price: rlp.val_at(1)?,
            gas: rlp.val_at(2)?,
            to,
            value: rlp.val_at(4)?,
            data: rlp.val_at(5)?,
            signature: rlp.val_at(6)?,
        })
    }
}
