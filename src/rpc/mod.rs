pub mod transport;
pub mod parser;
pub mod client;

pub use transport::{Transport, HttpTransport};
pub use parser::{extract_field, extract_result, split_array, is_empty_array};
pub use client::{RpcClient, LogFilter};
