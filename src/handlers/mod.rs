//! HTTP handlers for entity queries and mutations, authentication, and pictures.

pub mod assets;
pub mod auth;
pub mod entity;
