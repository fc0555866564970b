pub mod ledger;

pub use ledger::MemoryGrantLedger;
