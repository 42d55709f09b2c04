//! # Execution Traces
//!
//! One [`Trace`] per message frame executed for a transaction, in execution
//! order. The action and result are tagged variants dispatched at
//! serialisation time; `depth` is the call depth, from which subtrace counts
//! and trace-address vectors are reproducible post-hoc.

use crate::primitives::{Address, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// What a frame set out to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceAction {
    Call {
        call_type: String,
        from: Address,
        to: Address,
        gas: U256,
        data: Vec<u8>,
        amount: U256,
    },
    Create {
        from: Address,
        gas: U256,
        init: Vec<u8>,
        amount: U256,
    },
    Suicide {
        contract: Address,
        refund: Address,
        balance: U256,
    },
}

impl TraceAction {
    fn tag(&self) -> u8 {
        match self {
            TraceAction::Call { .. } => 0,
            TraceAction::Create { .. } => 1,
            TraceAction::Suicide { .. } => 2,
        }
    }
}

/// What a frame produced; absent when the frame errored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceResult {
    Call {
        gas_used: U256,
        output: Vec<u8>,
    },
    Create {
        gas_used: U256,
        contract: Address,
        code: Vec<u8>,
    },
    /// Suicide frames carry no result payload.
    None,
}

/// A single frame of an execution trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub action: TraceAction,
    pub result: Option<TraceResult>,
    /// Empty when the frame completed without exception.
    pub error_message: String,
    /// Call depth of the frame; the outermost frame is 0.
    pub depth: u32,
}

impl Encodable for Trace {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        match &self.action {
            TraceAction::Call {
                call_type,
                from,
                to,
                gas,
                data,
                amount,
            } => {
                s.begin_list(7);
                s.append(&self.action.tag());
                s.append(call_type);
                s.append(from);
                s.append(to);
                s.append(gas);
                s.append(data);
                s.append(amount);
            }
            TraceAction::Create {
                from,
                gas,
                init,
                amount,
            } => {
                s.begin_list(5);
                s.append(&self.action.tag());
                s.append(from);
                s.append(gas);
                s.append(init);
                s.append(amount);
            }
            TraceAction::Suicide {
                contract,
                refund,
                balance,
            } => {
                s.begin_list(4);
                s.append(&self.action.tag());
                s.append(contract);
                s.append(refund);
                s.append(balance);
            }
        }
        match &self.result {
            None => {
                s.begin_list(0);
            }
            Some(TraceResult::Call { gas_used, output }) => {
                s.begin_list(3);
                s.append(&0u8);
                s.append(gas_used);
                s.append(output);
            }
            Some(TraceResult::Create {
                gas_used,
                contract,
                code,
            }) => {
                s.begin_list(4);
                s.append(&1u8);
                s.append(gas_used);
                s.append(contract);
                s.append(code);
            }
            Some(TraceResult::None) => {
                s.begin_list(1);
                s.append(&2u8);
            }
        }
        s.append(&self.error_message);
        s.append(&self.depth);
    }
}

impl Decodable for Trace {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let action_item = rlp.at(0)?;
        let action = match action_item.val_at::<u8>(0)? {
            0 => TraceAction::Call {
                call_type: action_item.val_at(1)?,
                from: action_item.val_at(2)?,
                to: action_item.val_at(3)?,
                gas: action_item.val_at(4)?,
                data: action_item.val_at(5)?,
                amount: action_item.val_at(6)?,
            },
            1 => TraceAction::Create {
                from: action_item.val_at(1)?,
                gas: action_item.val_at(2)?,
                init: action_item.val_at(3)?,
                amount: action_item.val_at(4)?,
            },
            2 => TraceAction::Suicide {
                contract: action_item.val_at(1)?,
                refund: action_item.val_at(2)?,
                balance: action_item.val_at(3)?,
            },
            _ => return Err(DecoderError::Custom("unknown trace action")),
        };
        let result_item = rlp.at(1)?;
        let result = if result_item.item_count()? == 0 {
            None
        } else {
            Some(match result_item.val_at::<u8>(0)? {
                0 => TraceResult::Call {
                    gas_used: result_item.val_at(1)?,
                    output: result_item.val_at(2)?,
                },
                1 => TraceResult::Create {
                    gas_used: result_item.val_at(1)?,
                    contract: result_item.val_at(2)?,
                    code: result_item.val_at(3)?,
                },
                2 => TraceResult::None,
                _ => return Err(DecoderError::Custom("unknown trace result")),
            })
        };
        Ok(Trace {
            action,
            result,
            error_message: rlp.val_at(2)?,
            depth: rlp.val_at(3)?,
        })
    }
}

/// Ordered traces of one transaction, stored per link hash.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceList(pub Vec<Trace>);

impl Encodable for TraceList {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append_list(&self.0);
    }
}

impl Decodable for TraceList {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(TraceList(rlp.as_list()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_trace_roundtrip() {
        let trace = Trace {
            action: TraceAction::Call {
                call_type: "call".to_string(),
                from: Address::repeat_byte(0x01),
                to: Address::repeat_byte(0x02),
                gas: U256::from(90_000u64),
                data: vec![0xde, 0xad],
                amount: U256::from(7u64),
            },
            result: Some(TraceResult::Call {
                gas_used: U256::from(21_000u64),
                output: vec![],
            }),
            error_message: String::new(),
            depth: 0,
        };
        let decoded: Trace = rlp::decode(&rlp::encode(&trace)).unwrap();
        assert_eq!(decoded, trace);
    }

    #[test]
    fn test_errored_create_has_no_result() {
        let trace = Trace {
            action: TraceAction::Create {
                from: Address::repeat_byte(0x03),
                gas: U256::from(50_000u64),
                init: vec![0x60, 0x00],
                amount: U256::zero(),
            },
            result: None,
            error_message: "out of gas".to_string(),
            depth: 1,
        };
        let decoded: Trace = rlp::decode(&rlp::encode(&trace)).unwrap();
        assert_eq!(decoded, trace);
    }

    #[test]
    fn test_suicide_trace_roundtrip() {
        let trace = Trace {
            action: TraceAction::Suicide {
                contract: Address::repeat_byte(0x0A),
                refund: Address::repeat_byte(0x0B),
                balance: U256::from(123u64),
            },
            result: Some(TraceResult::None),
            error_message: String::new(),
            depth: 2,
        };
        let list = TraceList(vec![trace]);
        let decoded: TraceList = rlp::decode(&rlp::encode(&list)).unwrap();
        assert_eq!(decoded, list);
    }
}
