//! Portico is a small server-rendered web application in front of a managed
//! posts backend. It renders one page: the list of published posts, plus a
//! sign-in gate and a creation form for signed-in collaborators.
//!
//! The crate is split into four layers. `domain` holds the entities the
//! backend schema defines, `application` holds the services and the gateway
//! contracts they call through, `infra` holds the HTTP surface and the
//! backend adapter, and `presentation` holds the view models and templates.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
