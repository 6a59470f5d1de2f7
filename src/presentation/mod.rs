//! View models and askama templates.

pub mod views;
