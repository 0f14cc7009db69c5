mod gateway;
mod http;

pub use gateway::{ChatBackend, ChatBackendError, ChatBackendFuture};
pub use http::{HttpChatBackend, HttpChatBackendConfig};
