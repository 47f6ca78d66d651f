pub mod block;
pub mod chat;
pub mod pagination;
pub mod session;
