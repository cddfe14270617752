//! # nearlink-core
//!
//! Core logic for nearlink: medium negotiation and presence identities for
//! short-range device-to-device connections.
//!
//! This crate provides:
//! - Topology rules and medium normalization for advertising and discovery
//! - Ephemeral endpoint identities for presence devices
//! - An asynchronous credential store facade with in-memory and file backends
//! - Remote credential sync over a pluggable HTTP exchange
//! - Configuration management
//!
//! ## Architecture
//!
//! - [`strategy`] - Connection topologies and which mediums can carry them
//! - [`medium`] - Transport mediums and the per-medium selector
//! - [`options`] - Advertising/discovery options and `compatible_options`
//! - [`identity`] - Endpoint ids and the injected random source and clock
//! - [`presence`] - Presence devices, their metadata and connection infos
//! - [`credentials`] - Credential types, the store trait and its facade
//! - [`storage`] - JSON-file credential store
//! - [`http`] - Request/response exchange types and clients
//! - [`sync`] - Remote public credential sync
//! - [`config`] - Configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared value types

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod identity;
pub mod medium;
pub mod options;
pub mod presence;
pub mod storage;
pub mod strategy;
pub mod sync;
pub mod types;

// Re-export primary types for convenience
pub use config::{Config, ConfigError, ConfigResult, CredentialsConfig, DiscoveryConfig, SyncConfig};
pub use credentials::{
    CredentialSelector, CredentialStorage, CredentialStore, CredentialStoreError, IdentityType,
    InMemoryCredentialStore, PrivateCredential, PublicCredential, PublicCredentialType,
};
pub use error::{Error, NearlinkError, Result};
#[cfg(feature = "http-client")]
pub use http::{ReqwestHttpClient, ReqwestHttpClientFactory};
pub use http::{Headers, HttpClient, HttpClientFactory, HttpError, WebRequest, WebResponse};
pub use identity::{
    EndpointId, IdentityError, MonotonicClock, OsRandom, RandomSource, SystemClock,
    ENDPOINT_ID_LENGTH,
};
pub use medium::{BooleanMediumSelector, Medium, MediumSelector, ParseMediumError};
pub use options::{
    compatible_options, AdvertisingOptions, DiscoveryOptions, KeepAlive, MediumOptions,
    MediumResolution, OptionsBase,
};
pub use presence::{
    ConnectionInfo, DeviceMetadata, DeviceMotion, IdentityGenerator, MotionType, PresenceDevice,
};
pub use storage::{default_data_dir, FileCredentialStore};
pub use strategy::{InvalidStrategy, Strategy};
pub use sync::{CredentialSync, SyncError};
pub use types::{is_valid_mac_address, InvalidMacAddress, MacAddress};
