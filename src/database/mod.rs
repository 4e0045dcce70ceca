/// Pool setup and migrations
pub mod connection;
/// Transactional booking/balance engine
pub mod ledger;
/// Entity models
pub mod models;
