use crate::client::Backend;
use crate::context::Context;
use crate::controller::Controller;
use crate::error::TfcrudError;
use crate::reconcile::{self, PlanAction};
use crate::schema::ResourceSchema;
use crate::state::ResourceState;
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use async_trait::async_trait;
use std::sync::Arc;

/// Resource is the host-facing contract of one resource type
/// Every method takes a [`Context`] first and reports problems as
/// diagnostics rather than errors
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name of the resource (e.g., "guardrail_access_list")
    fn type_name(&self) -> &str;

    fn schema(&self) -> &ResourceSchema;

    /// Check configuration without side effects
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse;

    /// Compute the expected state and whether the change needs replacement
    async fn plan(&self, ctx: Context, request: PlanResourceChangeRequest)
        -> PlanResourceChangeResponse;

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// `new_state` is `None` when the object no longer exists
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;

    async fn import(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse;
}

pub struct ValidateResourceConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateResourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct PlanResourceChangeRequest {
    /// Null when the resource does not exist yet
    pub prior_state: DynamicValue,
    /// Null when the resource is being destroyed
    pub config: DynamicValue,
}

pub struct PlanResourceChangeResponse {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct CreateResourceRequest {
    pub config: DynamicValue,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub current_state: DynamicValue,
}

pub struct ReadResourceResponse {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UpdateResourceRequest {
    pub prior_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DeleteResourceRequest {
    pub prior_state: DynamicValue,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportResourceStateRequest {
    pub id: String,
}

pub struct ImportResourceStateResponse {
    pub imported: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The one resource implementation: behaviour comes from its schema
pub struct GenericResource<B: Backend> {
    schema: Arc<ResourceSchema>,
    backend: B,
}

/// Bind a schema to a backend
pub fn new_resource<B: Backend>(schema: ResourceSchema, backend: B) -> GenericResource<B> {
    GenericResource::new(Arc::new(schema), backend)
}

impl<B: Backend> GenericResource<B> {
    pub fn new(schema: Arc<ResourceSchema>, backend: B) -> Self {
        Self { schema, backend }
    }

    fn decode_state(&self, value: &DynamicValue) -> Result<ResourceState, Vec<Diagnostic>> {
        ResourceState::from_dynamic_value(value).map_err(|e| {
            vec![Diagnostic::error(
                "Invalid resource state",
                format!("{}: {}", self.schema.type_name, e),
            )]
        })
    }
}

fn planned_value(state: &ResourceState, fresh: bool) -> DynamicValue {
    let mut value = state.to_dynamic_value();
    if fresh {
        if let Dynamic::Map(map) = &mut value.value {
            map.insert("id".to_string(), Dynamic::Unknown);
        }
    }
    value
}

#[async_trait]
impl<B: Backend> Resource for GenericResource<B> {
    fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let diagnostics = match self.schema.validate(&request.config) {
            Ok(_) => Vec::new(),
            Err(errors) => TfcrudError::Validation(errors).diagnostics(),
        };
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn plan(
        &self,
        _ctx: Context,
        request: PlanResourceChangeRequest,
    ) -> PlanResourceChangeResponse {
        let mut response = PlanResourceChangeResponse {
            planned_state: DynamicValue::null(),
            requires_replace: Vec::new(),
            diagnostics: Vec::new(),
        };

        if request.config.is_null() {
            return response;
        }

        let prior = match self.decode_state(&request.prior_state) {
            Ok(prior) => prior,
            Err(diags) => {
                response.diagnostics = diags;
                return response;
            }
        };

        let desired = match self.schema.validate(&request.config) {
            Ok(desired) => desired,
            Err(errors) => {
                response.diagnostics = TfcrudError::Validation(errors).diagnostics();
                response.planned_state = request.prior_state;
                return response;
            }
        };

        let reconciliation = reconcile::reconcile(&self.schema, &prior, &desired);
        let planned = reconcile::planned_state(&self.schema, &prior, &desired, &reconciliation);
        let fresh = matches!(
            reconciliation.action,
            PlanAction::Create | PlanAction::Replace
        );

        tracing::debug!(
            resource = %self.schema.type_name,
            action = %reconciliation.action,
            "planned"
        );

        response.planned_state = planned_value(&planned, fresh);
        response.requires_replace = reconciliation.requires_replace;
        response
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut controller = Controller::new(&self.schema, &self.backend, ctx);

        match controller.create(&request.config).await {
            Ok(state) => CreateResourceResponse {
                new_state: state.to_dynamic_value(),
                diagnostics: Vec::new(),
            },
            Err(e) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics: e.diagnostics(),
            },
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let current = match self.decode_state(&request.current_state) {
            Ok(current) => current,
            Err(diagnostics) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        };

        let mut controller = Controller::resume(&self.schema, &self.backend, ctx, current);
        let outcome = controller.refresh().await.map(|state| state.is_some());
        match outcome {
            Ok(true) => {
                let diagnostics = controller
                    .drift()
                    .iter()
                    .map(|drift| {
                        Diagnostic::warning("Resource changed outside of Terraform", drift.to_string())
                            .with_attribute(AttributePath::new(&drift.attribute))
                    })
                    .collect();
                ReadResourceResponse {
                    new_state: Some(controller.state().to_dynamic_value()),
                    diagnostics,
                }
            }
            Ok(false) => ReadResourceResponse {
                new_state: None,
                diagnostics: Vec::new(),
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: e.diagnostics(),
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let prior = match self.decode_state(&request.prior_state) {
            Ok(prior) => prior,
            Err(diagnostics) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
        };

        let mut controller = Controller::resume(&self.schema, &self.backend, ctx, prior);
        let diagnostics = match controller.update(&request.config).await {
            Ok(_) => Vec::new(),
            Err(e) => e.diagnostics(),
        };

        let state = controller.into_state();
        UpdateResourceResponse {
            new_state: if state.is_created() {
                state.to_dynamic_value()
            } else {
                DynamicValue::null()
            },
            diagnostics,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let prior = match self.decode_state(&request.prior_state) {
            Ok(prior) => prior,
            Err(diagnostics) => return DeleteResourceResponse { diagnostics },
        };

        if !prior.is_created() {
            return DeleteResourceResponse {
                diagnostics: Vec::new(),
            };
        }

        let mut controller = Controller::resume(&self.schema, &self.backend, ctx, prior);
        let diagnostics = match controller.destroy().await {
            Ok(()) => Vec::new(),
            Err(e) => e.diagnostics(),
        };
        DeleteResourceResponse { diagnostics }
    }

    async fn import(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        if request.id.is_empty() {
            return ImportResourceStateResponse {
                imported: None,
                diagnostics: vec![Diagnostic::error(
                    "Invalid import id",
                    "import requires a non-empty id",
                )],
            };
        }

        let mut controller = Controller::new(&self.schema, &self.backend, ctx);
        match controller.import(&request.id).await {
            Ok(state) => ImportResourceStateResponse {
                imported: Some(state.to_dynamic_value()),
                diagnostics: Vec::new(),
            },
            Err(e) => ImportResourceStateResponse {
                imported: None,
                diagnostics: e.diagnostics(),
            },
        }
    }
}
