//! # dynamics-client
//!
//! Read access to a Dataverse / Dynamics 365 organisation.
//!
//! The sync loop depends only on the [`Service`] trait; [`WebApiService`]
//! implements it over the Web API with blocking HTTP.

pub mod entity;
pub mod error;
mod metadata;
pub mod query;
pub mod service;
pub mod webapi;

pub use entity::{Entity, EntityType, OptionSetMap, Property, PropertyKind, CREATED_ON, MODIFIED_ON};
pub use error::ClientError;
pub use query::{Direction, Query};
pub use service::{Rows, Service};
pub use webapi::WebApiService;
