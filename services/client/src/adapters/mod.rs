pub mod file_store;
pub mod http;

pub use file_store::FileKeyValueStore;
pub use http::HttpSessionBridge;
