pub mod apps;
pub mod ledger;
pub mod metrics;
pub mod read_model;
pub mod sync;
