pub mod dataset_cache;
pub mod lookup;
pub mod lookup_store;
