//! HTTP orchestration for the astronomy image enhancement service.
//!
//! The service does the enhancement; this crate builds requests, talks to it
//! through a [`transport::ServiceTransport`], and turns replies into
//! validated results.

pub mod catalog_client;
pub mod codec;
pub mod config;
pub mod dryrun;
pub mod enhance_client;
pub mod images;
pub mod transport;

pub use catalog_client::CatalogClient;
pub use config::ServiceConfig;
pub use dryrun::DryrunTransport;
pub use enhance_client::{EnhanceClient, EnhanceError};
pub use transport::{HttpTransport, ServiceTransport};
