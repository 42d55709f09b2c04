//! # Column Layout
//!
//! Columns are named by three-digit strings. Keys are fixed width (20 or 32
//! bytes, or a fixed composite), which lets hash/address-keyed columns carry
//! a fixed-length prefix extractor for bloom filtering. The 1xx range holds
//! the iterator-heavy ordered indices.

/// A named column of the ledger store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    DagAccountInfo,
    AccountInfo,
    AccountState,
    LatestAccountState,
    Blocks,
    BlocksData,
    BlockState,
    Successor,
    MainChain,
    Skiplist,
    BlockSummary,
    SummaryBlock,
    StableBlock,
    ContractMain,
    Prop,
    CatchupChainSummaries,
    CatchupChainBlockSummary,
    CatchupChainSummaryBlock,
    HashTreeSummary,
    UnlinkBlock,
    Traces,
    NextUnlink,
    NextUnlinkIndex,
    ContractAux,
    Link,
    Approve,
    ApproveReceipt,
    EpochRecord,
    DagFree,
    BlockChild,
    UnlinkInfo,
    HeadUnlink,
}

impl Column {
    /// Every column, in creation order.
    pub const ALL: &'static [Column] = &[
        Column::DagAccountInfo,
        Column::AccountInfo,
        Column::AccountState,
        Column::LatestAccountState,
        Column::Blocks,
        Column::BlocksData,
        Column::BlockState,
        Column::Successor,
        Column::MainChain,
        Column::Skiplist,
        Column::BlockSummary,
        Column::SummaryBlock,
        Column::StableBlock,
        Column::ContractMain,
        Column::Prop,
        Column::CatchupChainSummaries,
        Column::CatchupChainBlockSummary,
        Column::CatchupChainSummaryBlock,
        Column::HashTreeSummary,
        Column::UnlinkBlock,
        Column::Traces,
        Column::NextUnlink,
        Column::NextUnlinkIndex,
        Column::ContractAux,
        Column::Link,
        Column::Approve,
        Column::ApproveReceipt,
        Column::EpochRecord,
        Column::DagFree,
        Column::BlockChild,
        Column::UnlinkInfo,
        Column::HeadUnlink,
    ];

    /// The column family name on disk.
    pub fn name(self) -> &'static str {
        match self {
            Column::DagAccountInfo => "001",
            Column::AccountInfo => "002",
            Column::AccountState => "003",
            Column::LatestAccountState => "004",
            Column::Blocks => "005",
            Column::BlocksData => "006",
            Column::BlockState => "007",
            Column::Successor => "008",
            Column::MainChain => "009",
            Column::Skiplist => "010",
            Column::BlockSummary => "011",
            Column::SummaryBlock => "012",
            Column::StableBlock => "013",
            Column::ContractMain => "014",
            Column::Prop => "015",
            Column::CatchupChainSummaries => "016",
            Column::CatchupChainBlockSummary => "017",
            Column::CatchupChainSummaryBlock => "018",
            Column::HashTreeSummary => "019",
            Column::UnlinkBlock => "020",
            Column::Traces => "021",
            Column::NextUnlink => "022",
            Column::NextUnlinkIndex => "023",
            Column::ContractAux => "024",
            Column::Link => "025",
            Column::Approve => "026",
            Column::ApproveReceipt => "027",
            Column::EpochRecord => "028",
            Column::DagFree => "101",
            Column::BlockChild => "102",
            Column::UnlinkInfo => "103",
            Column::HeadUnlink => "104",
        }
    }

    /// Fixed key-prefix width for bloom filtering, where keys start with an
    /// address or hash. Composite ordered indices scan by this prefix too.
    pub fn fixed_key_prefix(self) -> Option<usize> {
        match self {
            Column::DagAccountInfo
            | Column::AccountInfo
            | Column::LatestAccountState
            | Column::UnlinkInfo => Some(20),
            Column::AccountState
            | Column::Blocks
            | Column::BlocksData
            | Column::BlockState
            | Column::Successor
            | Column::Skiplist
            | Column::BlockSummary
            | Column::SummaryBlock
            | Column::HashTreeSummary
            | Column::UnlinkBlock
            | Column::Traces
            | Column::NextUnlink
            | Column::Link
            | Column::Approve
            | Column::BlockChild => Some(32),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_are_unique() {
        let mut names: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Column::ALL.len());
    }

    #[test]
    fn test_core_layout_is_stable() {
        // the on-disk numbering is a compatibility contract
        assert_eq!(Column::Blocks.name(), "005");
        assert_eq!(Column::BlockState.name(), "007");
        assert_eq!(Column::MainChain.name(), "009");
        assert_eq!(Column::Prop.name(), "015");
        assert_eq!(Column::DagFree.name(), "101");
        assert_eq!(Column::HeadUnlink.name(), "104");
    }
}
