pub mod alumni;
pub mod auth;
pub mod files;
pub mod jobs;
pub mod probes;
