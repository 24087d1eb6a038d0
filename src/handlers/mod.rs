//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `connection_details` - Participant token minting for voice-assistant rooms

pub mod api;
pub mod connection_details;

pub use connection_details::{ConnectionDetails, ConnectionDetailsRequest, connection_details};
