//! GA4 Data API client modules.
//!
//! - `auth`: service account key handling and access token acquisition
//! - `data`: the report client issuing `runReport` / `runRealtimeReport` calls

pub mod auth;
pub mod data;

pub use auth::{Credentials, ServiceAccountKey, TokenProvider};
pub use data::AnalyticsDataClient;
