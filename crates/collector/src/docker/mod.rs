//! Docker domain — the bollard-backed container host.

pub mod host;

pub use host::DockerHost;
