//! CLI command implementations

pub mod call;
pub mod completions;
pub mod config;
pub mod data;
pub mod import;
pub mod init;
pub mod mat;
pub mod normalize;
pub mod params;
pub mod report;
pub mod status;
pub mod sup;
