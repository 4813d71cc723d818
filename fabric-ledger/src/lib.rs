mod ledger;
mod persistence;

pub use ledger::Ledger;
