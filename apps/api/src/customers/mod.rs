// Customer identity and conversation history: the persistence boundary of the chat.

pub mod handlers;
pub mod repository;
