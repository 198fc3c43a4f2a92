pub mod asset;
pub mod assignment;
pub mod audit;
pub mod gate;
pub mod location;
pub mod request;
pub mod role;
pub mod user;
