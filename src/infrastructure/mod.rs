pub mod bettor_store;
pub mod data;
pub mod observability;
pub mod synthetic;

pub use bettor_store::FileBettorStore;
pub use data::CsvOddsLoader;
pub use observability::BacktestMetrics;
pub use synthetic::SyntheticMatchGenerator;
