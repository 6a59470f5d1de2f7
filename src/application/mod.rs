//! Application services layer.

pub mod account;
pub mod compose;
pub mod error;
pub mod gateway;
pub mod home;
pub mod scope;
