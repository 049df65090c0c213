//! Beacon: client-side service discovery and registration
//!
//! Keeps a live view of a service's healthy endpoints, hands them out round-robin,
//! and keeps this instance's own registration alive with a heartbeat.

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod registry;
pub mod service;

// Re-exports
pub use client::{RequestBuilder, ServiceClient};
pub use config::{Config, DiscoveryConfig, LogFormat, LoggingConfig, RegistryConfig, ServiceConfig};
pub use error::{BeaconError, ErrorCode, InfraResult, InfraResultExt, Result};

pub use discovery::{
    Endpoint, EndpointCache, EndpointSet, LoadBalancer, PollingPublisher, Publisher,
    RefreshFailurePolicy, RoundRobin, StaticPublisher, SubscriptionId, round_robin,
};
pub use registry::{
    AdapterStatus, ConsulAdapter, HeartbeatPulse, RegistryAdapter, ServiceRegistration,
    create_adapter,
};
pub use service::Service;
