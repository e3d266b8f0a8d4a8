//! DataSource trait and the schema-driven lookup implementation
//!
//! A data source is the read-only view of a resource type: the user names an
//! existing object by `id` and every other attribute is filled from the
//! server.

use crate::client::Backend;
use crate::context::Context;
use crate::controller::Controller;
use crate::error::{TfcrudError, ValidationError};
use crate::schema::{AttributeMode, ResourceSchema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use async_trait::async_trait;
use std::sync::Arc;

/// Base trait for data sources - implement read operations
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name should be constant (e.g., "guardrail_user")
    fn type_name(&self) -> &str;

    fn schema(&self) -> &ResourceSchema;

    /// Called during plan to validate configuration
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse;

    /// Called to read data - this is the only operation for data sources
    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}

pub struct ValidateDataSourceConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateDataSourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadDataSourceRequest {
    pub config: DynamicValue,
}

pub struct ReadDataSourceResponse {
    pub state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

/// Looks up one object of a resource type by id
pub struct GenericDataSource<B: Backend> {
    schema: Arc<ResourceSchema>,
    backend: B,
}

/// Derive a data source from a resource schema
pub fn new_data_source<B: Backend>(schema: &ResourceSchema, backend: B) -> GenericDataSource<B> {
    GenericDataSource {
        schema: Arc::new(lookup_schema(schema)),
        backend,
    }
}

/// Every attribute becomes computed; nothing but `id` may be configured
pub fn lookup_schema(schema: &ResourceSchema) -> ResourceSchema {
    let mut lookup = schema.clone();
    for attribute in &mut lookup.attributes {
        attribute.mode = AttributeMode::Computed;
        attribute.forces_recreate = false;
        attribute.validation = None;
    }
    lookup
}

impl<B: Backend> GenericDataSource<B> {
    fn check(&self, config: &DynamicValue) -> Result<String, Vec<ValidationError>> {
        let mut errors = match self.schema.validate(config) {
            Ok(_) => Vec::new(),
            Err(errors) => errors,
        };

        let id = match config.attribute("id") {
            Some(Dynamic::String(id)) if !id.is_empty() => Some(id.clone()),
            // known at apply time
            Some(Dynamic::Unknown) => None,
            Some(Dynamic::String(_)) => {
                errors.push(ValidationError::RuleViolation {
                    attribute: AttributePath::new("id"),
                    message: "must not be empty".to_string(),
                });
                None
            }
            None | Some(Dynamic::Null) => {
                errors.push(ValidationError::MissingRequired {
                    attribute: AttributePath::new("id"),
                });
                None
            }
            Some(other) => {
                errors.push(ValidationError::TypeMismatch {
                    attribute: AttributePath::new("id"),
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                });
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(id.unwrap_or_default())
    }
}

#[async_trait]
impl<B: Backend> DataSource for GenericDataSource<B> {
    fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let diagnostics = match self.check(&request.config) {
            Ok(_) => Vec::new(),
            Err(errors) => TfcrudError::Validation(errors).diagnostics(),
        };
        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let id = match self.check(&request.config) {
            Ok(id) if !id.is_empty() => id,
            Ok(_) => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![Diagnostic::error(
                        "Unknown id",
                        "the id must be known before the data source can be read",
                    )
                    .with_attribute(AttributePath::new("id"))],
                }
            }
            Err(errors) => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: TfcrudError::Validation(errors).diagnostics(),
                }
            }
        };

        let mut controller = Controller::new(&self.schema, &self.backend, ctx);
        let found = controller.lookup(&id).await.map(|state| state.is_some());

        match found {
            Ok(true) => ReadDataSourceResponse {
                state: controller.state().to_dynamic_value(),
                diagnostics: Vec::new(),
            },
            Ok(false) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![Diagnostic::error(
                    "Object not found",
                    format!("{} with id {:?} does not exist", self.schema.type_name, id),
                )
                .with_attribute(AttributePath::new("id"))],
            },
            Err(e) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: e.diagnostics(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Auth, HttpBackend};
    use crate::schema::{AttributeBuilder, SchemaBuilder};

    fn user_schema() -> ResourceSchema {
        SchemaBuilder::new("guardrail_user", "/v1/users")
            .attribute(
                AttributeBuilder::string("email")
                    .required()
                    .forces_recreate()
                    .regex(".+@.+"),
            )
            .attribute(AttributeBuilder::string("role").optional())
            .build()
            .unwrap()
    }

    fn data_source(url: &str) -> GenericDataSource<HttpBackend> {
        let backend = HttpBackend::new(url, Auth::Bearer("t".into())).unwrap();
        new_data_source(&user_schema(), backend)
    }

    #[test]
    fn lookup_schema_is_all_computed() {
        let lookup = lookup_schema(&user_schema());
        assert!(lookup.attributes.iter().all(|a| a.is_computed()));
        assert!(lookup.attributes.iter().all(|a| a.validation.is_none()));
    }

    #[tokio::test]
    async fn validate_requires_id_and_rejects_other_attributes() {
        let ds = data_source("http://127.0.0.1:9");

        let response = ds
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    config: DynamicValue::from_pairs([("email", "a@b.io")]),
                },
            )
            .await;

        let paths: Vec<String> = response
            .diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_ref().map(|p| p.to_string()))
            .collect();
        assert_eq!(paths, vec!["email".to_string(), "id".to_string()]);
    }

    #[tokio::test]
    async fn read_fills_every_attribute() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/users/u-7")
            .with_status(200)
            .with_body(r#"{"id":"u-7","email":"ops@example.com","role":"admin"}"#)
            .create_async()
            .await;

        let ds = data_source(&server.url());
        let response = ds
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    config: DynamicValue::from_pairs([("id", "u-7")]),
                },
            )
            .await;

        mock.assert_async().await;
        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.state.attribute("email"),
            Some(&Dynamic::from("ops@example.com"))
        );
        assert_eq!(response.state.attribute("id"), Some(&Dynamic::from("u-7")));
    }

    #[tokio::test]
    async fn read_of_missing_object_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/users/u-404")
            .with_status(404)
            .with_body(r#"{"error":"not found"}"#)
            .create_async()
            .await;

        let ds = data_source(&server.url());
        let response = ds
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    config: DynamicValue::from_pairs([("id", "u-404")]),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Object not found");
    }
}
