pub mod adaptors;
pub mod alumni;
pub mod auth;
pub mod blob;
pub mod files;
pub mod lifecycle;
pub mod pagination;
pub mod policy;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod fixtures;
