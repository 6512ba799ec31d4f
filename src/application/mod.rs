pub mod use_cases;

pub use use_cases::dataset_cache::DatasetCache;
pub use use_cases::lookup::{LookupOutcome, LookupUseCase};
pub use use_cases::lookup_store::{LoadedTable, TabularLookupStore};
