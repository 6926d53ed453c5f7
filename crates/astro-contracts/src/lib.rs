pub mod catalog;
pub mod diagnostics;
pub mod events;
pub mod request;
pub mod result;
pub mod session;
pub mod shell;
pub mod summary;
