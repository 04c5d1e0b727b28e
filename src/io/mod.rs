/// CSV export of execution records.
pub mod export;
