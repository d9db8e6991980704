pub mod client;
pub mod explorer;
pub mod rest;

pub use client::{endpoint, Endpoint, GraphDataService, GraphRequest, HttpGraphDataService, QueryParams, ServiceConfig};
pub use explorer::{ExpansionReport, Explorer, NewNode, Outcome, NO_DATA_NOTICE};
pub use rest::RestApi;
