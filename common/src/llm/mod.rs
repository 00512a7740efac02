pub mod client;
pub mod model;

pub use client::ChatClient;
pub use model::{Message, MessageRole};
