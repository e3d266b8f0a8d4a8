//! tfcrud - schema-driven CRUD for REST-backed Terraform resources
//!
//! A resource type is described once as a [`ResourceSchema`]: its
//! attributes, their validation rules, and the REST endpoint it lives
//! behind. [`new_resource`] binds that schema to a [`Backend`] and yields a
//! [`Resource`] the host drives through validate, plan, create, read,
//! update, delete and import. No resource needs code of its own.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod state;
pub mod types;
pub mod validator;

// Mapping and lifecycle
pub mod client;
pub mod controller;
pub mod reconcile;
pub mod request;
pub mod response;

// Host-facing API
pub mod data_source;
pub mod provider;
pub mod resource;

// Re-exports for convenience
pub use client::{Auth, Backend, ClientConfig, HttpBackend};
pub use context::Context;
pub use controller::{Controller, Lifecycle};
pub use data_source::{new_data_source, DataSource, GenericDataSource};
pub use error::{BackendError, MappingError, Result, SchemaError, TfcrudError, ValidationError};
pub use provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider};
pub use reconcile::{Drift, PlanAction, Reconciliation};
pub use request::{ApiRequest, Operation};
pub use resource::{new_resource, GenericResource, Resource};
pub use response::ApiResponse;
pub use schema::{
    AttributeBuilder, AttributeMode, AttributeSpec, AttributeType, Endpoint, ResourceSchema,
    SchemaBuilder, UpdateMethod, ValidatedAttributes,
};
pub use state::ResourceState;
pub use types::{AttributePath, Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue};
pub use validator::ValidationRule;
