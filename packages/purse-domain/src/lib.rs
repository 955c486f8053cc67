pub mod format;
pub mod knowledge;
pub mod ledger;
pub mod retrieval;
pub mod snapshot;

mod id_string;
