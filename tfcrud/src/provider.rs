//! Provider trait: configuration plus factories for resources and data sources

use crate::context::Context;
use crate::data_source::DataSource;
use crate::error::Result;
use crate::resource::Resource;
use crate::schema::ResourceSchema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix shared by every type name (e.g., "guardrail")
    fn type_name(&self) -> &str;

    /// Called once before any resource is created. Must leave the provider
    /// unconfigured when diagnostics contain errors.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    async fn create_resource(&self, name: &str) -> Result<Box<dyn Resource>>;

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSource>>;

    /// Available without configuration; implementations should cache these
    async fn resource_schemas(&self) -> Result<HashMap<String, ResourceSchema>>;

    async fn data_source_schemas(&self) -> Result<HashMap<String, ResourceSchema>>;
}

pub struct ConfigureProviderRequest {
    pub config: DynamicValue,
}

#[derive(Default)]
pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
}
