pub mod config;
pub mod manifest;
pub mod publish;
pub mod transform;
