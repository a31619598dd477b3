//! Generic outbound HTTP.

pub mod dispatch;

pub use dispatch::ReqwestDispatcher;
