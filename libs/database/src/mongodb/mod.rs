//! MongoDB connector
//!
//! A single [`Client`] is created per process and shared; the driver pools
//! connections internally.

mod config;
mod connector;

pub use config::MongoConfig;
pub use connector::{MongoError, connect, connect_with_retry, ping};

pub use mongodb::{Client, Collection, Database};
