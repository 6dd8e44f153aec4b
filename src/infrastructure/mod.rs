pub mod in_memory;
pub mod paynl;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
