pub mod alert_facts;

pub use alert_facts::{AlertFactSource, InMemoryAlertFacts, SeaOrmAlertFacts};
