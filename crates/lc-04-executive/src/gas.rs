//! # Gas Schedule
//!
//! The cost constants the executive charges outside opcode execution.

use shared_types::U256;

/// Frame-level gas costs.
#[derive(Debug, Clone)]
pub struct GasSchedule {
    /// Baseline floor of every transaction.
    pub tx_gas: u64,
    /// Additional cost of a contract-creation transaction.
    pub tx_create_gas: u64,
    /// Per zero byte of call data.
    pub tx_data_zero_gas: u64,
    /// Per non-zero byte of call data.
    pub tx_data_non_zero_gas: u64,
    /// Per byte of deployed runtime code.
    pub create_data_gas: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            tx_gas: 21_000,
            tx_create_gas: 32_000,
            tx_data_zero_gas: 4,
            tx_data_non_zero_gas: 68,
            create_data_gas: 200,
        }
    }
}

impl GasSchedule {
    /// Intrinsic cost of a transaction before any opcode runs.
    pub fn intrinsic_gas(&self, data: &[u8], is_create: bool) -> U256 {
        let mut gas = self.tx_gas;
        if is_create {
            gas += self.tx_create_gas;
        }
        let data_gas: u64 = data
            .iter()
            .map(|byte| {
                if *byte == 0 {
                    self.tx_data_zero_gas
                } else {
                    self.tx_data_non_zero_gas
                }
            })
            .sum();
        U256::from(gas) + U256::from(data_gas)
    }

    /// Cost of depositing `len` bytes of runtime code.
    pub fn code_deposit_gas(&self, len: usize) -> U256 {
        U256::from(self.create_data_gas) * U256::from(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_transfer_floor() {
        let schedule = GasSchedule::default();
        assert_eq!(schedule.intrinsic_gas(&[], false), U256::from(21_000u64));
    }

    #[test]
    fn test_data_bytes_are_charged() {
        let schedule = GasSchedule::default();
        // one zero byte + one non-zero byte
        assert_eq!(
            schedule.intrinsic_gas(&[0x00, 0x01], false),
            U256::from(21_000u64 + 4 + 68)
        );
    }

    #[test]
    fn test_creation_surcharge() {
        let schedule = GasSchedule::default();
        assert_eq!(schedule.intrinsic_gas(&[], true), U256::from(53_000u64));
    }
}
