pub mod config;
pub mod data_sources;
pub mod logging;
pub mod resources;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tfcrud::data_source::lookup_schema;
use tfcrud::{
    new_data_source, ConfigureProviderRequest, ConfigureProviderResponse, Context, DataSource,
    Diagnostic, GenericResource, HttpBackend, Provider, Resource, ResourceSchema, SchemaError,
    TfcrudError,
};

use crate::config::ProviderConfig;

pub struct GuardrailProvider {
    backend: Option<HttpBackend>,
}

impl Default for GuardrailProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardrailProvider {
    pub fn new() -> Self {
        Self { backend: None }
    }

    fn backend(&self) -> tfcrud::Result<HttpBackend> {
        self.backend
            .clone()
            .ok_or(TfcrudError::ProviderNotConfigured)
    }
}

struct Catalog {
    resources: HashMap<String, Arc<ResourceSchema>>,
    data_sources: HashMap<String, ResourceSchema>,
}

impl Catalog {
    fn load() -> Result<Self, SchemaError> {
        let resources = resources::all()?
            .into_iter()
            .map(|schema| (schema.type_name.clone(), Arc::new(schema)))
            .collect();
        let data_sources = data_sources::all()?
            .into_iter()
            .map(|schema| (schema.type_name.clone(), schema))
            .collect();
        Ok(Self {
            resources,
            data_sources,
        })
    }
}

/// Built once, never mutated
fn catalog() -> tfcrud::Result<&'static Catalog> {
    static CATALOG: OnceLock<Result<Catalog, SchemaError>> = OnceLock::new();

    CATALOG
        .get_or_init(Catalog::load)
        .as_ref()
        .map_err(|e| TfcrudError::Schema(e.clone()))
}

#[async_trait]
impl Provider for GuardrailProvider {
    fn type_name(&self) -> &str {
        "guardrail"
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = match ProviderConfig::from_config(&request.config) {
            Ok(config) => config,
            Err(diagnostics) => return ConfigureProviderResponse { diagnostics },
        };

        match config.backend() {
            Ok(backend) => {
                tracing::info!(endpoint = %config.endpoint, "provider configured");
                self.backend = Some(backend);
                ConfigureProviderResponse::default()
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    format!("Failed to create API client: {}", e),
                    "",
                )],
            },
        }
    }

    async fn create_resource(&self, name: &str) -> tfcrud::Result<Box<dyn Resource>> {
        let backend = self.backend()?;
        let schema = catalog()?
            .resources
            .get(name)
            .ok_or_else(|| TfcrudError::ResourceNotFound(name.to_string()))?;

        Ok(Box::new(GenericResource::new(schema.clone(), backend)))
    }

    async fn create_data_source(&self, name: &str) -> tfcrud::Result<Box<dyn DataSource>> {
        let backend = self.backend()?;
        let schema = catalog()?
            .data_sources
            .get(name)
            .ok_or_else(|| TfcrudError::DataSourceNotFound(name.to_string()))?;

        Ok(Box::new(new_data_source(schema, backend)))
    }

    async fn resource_schemas(&self) -> tfcrud::Result<HashMap<String, ResourceSchema>> {
        Ok(catalog()?
            .resources
            .iter()
            .map(|(name, schema)| (name.clone(), schema.as_ref().clone()))
            .collect())
    }

    async fn data_source_schemas(&self) -> tfcrud::Result<HashMap<String, ResourceSchema>> {
        Ok(catalog()?
            .data_sources
            .iter()
            .map(|(name, schema)| (name.clone(), lookup_schema(schema)))
            .collect())
    }
}
