//! Clients for services the platform calls over the network.
pub mod embedding;
