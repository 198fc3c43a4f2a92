//! HTTP request handlers, one module per resource.

pub mod assets;
pub mod assignments;
pub mod audit;
pub mod auth;
pub mod gate;
pub mod locations;
pub mod requests;
