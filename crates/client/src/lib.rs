//! IBM Planning Analytics (TM1) REST API client.
//!
//! This crate provides an async, type-safe client for the TM1 REST API
//! (v11 on-premise, IBM Cloud, Cloud Pak for Data and Planning Analytics 12).
//! It handles every authentication mode the server offers, keeps the session
//! alive across expiry and dropped connections, and follows the server's
//! asynchronous request protocol.
//!
//! On top of the HTTP engine sit the cellset engine (MDX execution and
//! parallel cell extraction), the bulk data loader, and thin façades for
//! cubes, dimensions, processes and the other model objects.

mod auth;
pub mod cancellation;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod mdx;
pub mod metrics;
pub mod models;
pub mod roots;
mod serde_helpers;
pub mod tabular;
pub mod version;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{AuthenticationMode, Privilege, Session, SessionManager};
pub use cancellation::CancellationToken;
pub use client::Tm1Client;
pub use client::builder::Tm1ClientBuilder;
pub use client::rest::{RequestOptions, RestService};
pub use client::{CellExtractOptions, DataLoadOptions, LoadValueKind};
pub use error::{ClientError, Result};
pub use mdx::{MdxAxis, MdxMember, MdxQuery, table_to_mdx};
pub use metrics::{ErrorCategory, MetricsCollector};
pub use models::{
    Cell, CellValue, Cellset, Cube, Dimension, Edge, Element, Hierarchy, Process, ProcessResult,
    Sandbox, Subset, View,
};
pub use tabular::{Table, cellset_to_table};
pub use version::Feature;
pub use tm1_config::Config;
