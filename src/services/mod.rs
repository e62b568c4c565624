pub mod ledger;
pub mod reservation;
pub mod transfer;
