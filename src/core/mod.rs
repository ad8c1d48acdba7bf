pub mod assembler;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod driver;
pub mod event;
pub mod frame;
pub mod message;
pub mod persistence;
pub mod session_binder;
