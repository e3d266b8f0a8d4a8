//! Lifecycle controller driving CRUD calls for one resource instance
//!
//! ```text
//! Planned --create--> Creating --ok--> Created
//!                         \--err--> Rejected
//! Created --read--> Reading --ok--> Created | --404--> Destroyed
//! Created --update--> Updating --ok|err--> Created
//! Created --update(forced)--> Replacing --> Deleting --> Creating
//! Created --delete--> Deleting --ok--> Destroyed | --err--> Created
//! ```
//!
//! A failed transition leaves the state exactly as it was before the call.
//! The only exception is a replacement whose delete succeeded but whose
//! create failed: the old object is gone, so the state is cleared.

use crate::client::Backend;
use crate::context::Context;
use crate::error::{BackendError, Result, TfcrudError};
use crate::reconcile::{self, Drift, PlanAction};
use crate::request::{self, Operation};
use crate::response::{self, ApiResponse};
use crate::schema::{ResourceSchema, ValidatedAttributes};
use crate::state::ResourceState;
use crate::types::DynamicValue;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Where one resource instance is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Planned,
    Creating,
    Created,
    Reading,
    Updating,
    Replacing,
    Deleting,
    Destroyed,
    Rejected,
}

impl Lifecycle {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Lifecycle::Destroyed | Lifecycle::Rejected)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Planned => "planned",
            Lifecycle::Creating => "creating",
            Lifecycle::Created => "created",
            Lifecycle::Reading => "reading",
            Lifecycle::Updating => "updating",
            Lifecycle::Replacing => "replacing",
            Lifecycle::Deleting => "deleting",
            Lifecycle::Destroyed => "destroyed",
            Lifecycle::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Owns the state of one resource instance for the duration of a host call
pub struct Controller<'a, B: Backend + ?Sized> {
    schema: &'a ResourceSchema,
    backend: &'a B,
    ctx: Context,
    lifecycle: Lifecycle,
    state: ResourceState,
    drift: Vec<Drift>,
}

impl<'a, B: Backend + ?Sized> Controller<'a, B> {
    /// A controller for an instance that does not exist yet
    pub fn new(schema: &'a ResourceSchema, backend: &'a B, ctx: Context) -> Self {
        Self::resume(schema, backend, ctx, ResourceState::new())
    }

    /// Pick up an instance from host state. A state without an id is
    /// treated as not yet created.
    pub fn resume(
        schema: &'a ResourceSchema,
        backend: &'a B,
        ctx: Context,
        state: ResourceState,
    ) -> Self {
        let lifecycle = if state.is_created() {
            Lifecycle::Created
        } else {
            Lifecycle::Planned
        };
        Self {
            schema,
            backend,
            ctx,
            lifecycle,
            state,
            drift: Vec::new(),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    pub fn into_state(self) -> ResourceState {
        self.state
    }

    /// Attributes that moved on the server during the last refresh
    pub fn drift(&self) -> &[Drift] {
        &self.drift
    }

    /// Bring the instance in line with `config`, creating, updating or
    /// replacing it as needed
    #[tracing::instrument(skip_all, fields(resource = %self.schema.type_name, request_id = %self.ctx.request_id()))]
    pub async fn apply(&mut self, config: &DynamicValue) -> Result<&ResourceState> {
        match self.lifecycle {
            Lifecycle::Planned => self.create(config).await,
            Lifecycle::Created => self.apply_changes(config).await,
            other => Err(self.invalid(other, "apply")),
        }
    }

    #[tracing::instrument(skip_all, fields(resource = %self.schema.type_name, request_id = %self.ctx.request_id()))]
    pub async fn create(&mut self, config: &DynamicValue) -> Result<&ResourceState> {
        if self.lifecycle != Lifecycle::Planned {
            return Err(self.invalid(self.lifecycle, "create"));
        }

        let attrs = match self.schema.validate(config) {
            Ok(attrs) => attrs,
            Err(errors) => {
                self.transition(Lifecycle::Rejected);
                return Err(errors.into());
            }
        };

        match self.create_remote(&attrs).await {
            Ok(state) => {
                info!(
                    resource = %self.schema.type_name,
                    id = state.id.as_deref().unwrap_or_default(),
                    "created"
                );
                self.state = state;
                self.transition(Lifecycle::Created);
                Ok(&self.state)
            }
            Err(e) => {
                self.transition(Lifecycle::Rejected);
                Err(e)
            }
        }
    }

    /// Explicit in-place update. Resources where every configurable
    /// attribute forces recreation cannot be updated at all.
    #[tracing::instrument(skip_all, fields(resource = %self.schema.type_name, request_id = %self.ctx.request_id()))]
    pub async fn update(&mut self, config: &DynamicValue) -> Result<&ResourceState> {
        if self.lifecycle != Lifecycle::Created {
            return Err(self.invalid(self.lifecycle, "update"));
        }
        if !self.schema.supports_update() {
            return Err(TfcrudError::UnsupportedOperation {
                type_name: self.schema.type_name.clone(),
                operation: Operation::Update.to_string(),
                reason: "every configurable attribute forces replacement".to_string(),
            });
        }
        self.apply_changes(config).await
    }

    async fn apply_changes(&mut self, config: &DynamicValue) -> Result<&ResourceState> {
        let attrs = self.schema.validate(config)?;
        let plan = reconcile::reconcile(self.schema, &self.state, &attrs);

        debug!(
            resource = %self.schema.type_name,
            action = %plan.action,
            changed = ?plan.changed,
            "reconciled"
        );

        match plan.action {
            PlanAction::NoOp => Ok(&self.state),
            PlanAction::UpdateInPlace => self.update_in_place(&attrs).await,
            PlanAction::Replace | PlanAction::Create => self.replace(&attrs).await,
        }
    }

    async fn update_in_place(&mut self, attrs: &ValidatedAttributes) -> Result<&ResourceState> {
        self.transition(Lifecycle::Updating);

        let result = async {
            let request =
                request::build(Operation::Update, self.schema, self.state.id.as_deref(), attrs)?;
            let response = self.send(request).await?;
            let submitted = self.submitted(attrs, self.state.id.clone(), true);
            Ok::<_, TfcrudError>(response::apply(
                self.schema,
                Operation::Update,
                &response,
                &submitted,
            )?)
        }
        .await;

        self.transition(Lifecycle::Created);
        self.state = result?;
        Ok(&self.state)
    }

    async fn replace(&mut self, attrs: &ValidatedAttributes) -> Result<&ResourceState> {
        self.transition(Lifecycle::Replacing);
        info!(
            resource = %self.schema.type_name,
            id = self.state.id.as_deref().unwrap_or_default(),
            "replacing"
        );

        self.transition(Lifecycle::Deleting);
        if let Err(e) = self.delete_remote().await {
            self.transition(Lifecycle::Created);
            return Err(e);
        }

        self.transition(Lifecycle::Creating);
        match self.create_remote(attrs).await {
            Ok(state) => {
                self.state = state;
                self.transition(Lifecycle::Created);
                Ok(&self.state)
            }
            Err(e) => {
                warn!(
                    resource = %self.schema.type_name,
                    "previous object was deleted but its replacement could not be created"
                );
                self.state = ResourceState::new();
                self.transition(Lifecycle::Rejected);
                Err(e)
            }
        }
    }

    /// Re-read the instance. `Ok(None)` means the server no longer has it.
    #[tracing::instrument(skip_all, fields(resource = %self.schema.type_name, request_id = %self.ctx.request_id()))]
    pub async fn refresh(&mut self) -> Result<Option<&ResourceState>> {
        if self.lifecycle != Lifecycle::Created {
            return Err(self.invalid(self.lifecycle, "read"));
        }
        self.transition(Lifecycle::Reading);

        match self.read_remote(&self.state.clone()).await {
            Ok(Some(fresh)) => {
                self.drift = reconcile::detect_drift(self.schema, &self.state, &fresh);
                for drift in &self.drift {
                    warn!(resource = %self.schema.type_name, "drift detected: {}", drift);
                }
                self.state = fresh;
                self.transition(Lifecycle::Created);
                Ok(Some(&self.state))
            }
            Ok(None) => {
                info!(
                    resource = %self.schema.type_name,
                    id = self.state.id.as_deref().unwrap_or_default(),
                    "object no longer exists"
                );
                self.state = ResourceState::new();
                self.transition(Lifecycle::Destroyed);
                Ok(None)
            }
            Err(e) => {
                self.transition(Lifecycle::Created);
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(resource = %self.schema.type_name, request_id = %self.ctx.request_id()))]
    pub async fn destroy(&mut self) -> Result<()> {
        if self.lifecycle != Lifecycle::Created {
            return Err(self.invalid(self.lifecycle, "delete"));
        }
        self.transition(Lifecycle::Deleting);

        match self.delete_remote().await {
            Ok(()) => {
                self.state = ResourceState::new();
                self.transition(Lifecycle::Destroyed);
                Ok(())
            }
            Err(e) => {
                self.transition(Lifecycle::Created);
                Err(e)
            }
        }
    }

    /// Adopt an existing server object by id
    #[tracing::instrument(skip_all, fields(resource = %self.schema.type_name, request_id = %self.ctx.request_id()))]
    pub async fn import(&mut self, id: &str) -> Result<&ResourceState> {
        if self.lifecycle != Lifecycle::Planned {
            return Err(self.invalid(self.lifecycle, "import"));
        }
        if self.fetch(id).await? {
            Ok(&self.state)
        } else {
            Err(TfcrudError::Custom(format!(
                "cannot import non-existent remote object: {} {}",
                self.schema.type_name, id
            )))
        }
    }

    /// Read an object by id with nothing known about it beforehand.
    /// `Ok(None)` means the server has no such object. No drift is recorded.
    #[tracing::instrument(skip_all, fields(resource = %self.schema.type_name, request_id = %self.ctx.request_id()))]
    pub async fn lookup(&mut self, id: &str) -> Result<Option<&ResourceState>> {
        if self.lifecycle != Lifecycle::Planned {
            return Err(self.invalid(self.lifecycle, "lookup"));
        }
        if self.fetch(id).await? {
            Ok(Some(&self.state))
        } else {
            Ok(None)
        }
    }

    async fn fetch(&mut self, id: &str) -> Result<bool> {
        self.transition(Lifecycle::Reading);

        match self.read_remote(&ResourceState::with_id(id)).await {
            Ok(Some(state)) => {
                self.state = state;
                self.transition(Lifecycle::Created);
                Ok(true)
            }
            Ok(None) => {
                self.transition(Lifecycle::Planned);
                Ok(false)
            }
            Err(e) => {
                self.transition(Lifecycle::Planned);
                Err(e)
            }
        }
    }

    async fn create_remote(&self, attrs: &ValidatedAttributes) -> Result<ResourceState> {
        let request = request::build(Operation::Create, self.schema, None, attrs)?;
        let response = self.send(request).await?;
        let submitted = self.submitted(attrs, None, false);
        Ok(response::apply(
            self.schema,
            Operation::Create,
            &response,
            &submitted,
        )?)
    }

    async fn read_remote(&self, known: &ResourceState) -> Result<Option<ResourceState>> {
        let request = request::build(
            Operation::Read,
            self.schema,
            known.id.as_deref(),
            &ValidatedAttributes::default(),
        )?;
        match self.send(request).await {
            Ok(response) => Ok(Some(response::apply(
                self.schema,
                Operation::Read,
                &response,
                known,
            )?)),
            Err(TfcrudError::Backend(e)) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deleting something that is already gone counts as success
    async fn delete_remote(&self) -> Result<()> {
        let request = request::build(
            Operation::Delete,
            self.schema,
            self.state.id.as_deref(),
            &ValidatedAttributes::default(),
        )?;
        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(TfcrudError::Backend(e)) if e.is_not_found() => {
                debug!(resource = %self.schema.type_name, "object already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn send(&self, request: request::ApiRequest) -> Result<ApiResponse> {
        if self.ctx.is_cancelled() {
            return Err(BackendError::Cancelled.into());
        }

        debug!(
            request_id = %self.ctx.request_id(),
            resource = %self.schema.type_name,
            operation = %request.operation,
            "{} {}",
            request.method,
            request.path
        );

        let result = tokio::select! {
            biased;
            _ = self.ctx.cancelled() => Err(BackendError::Cancelled),
            result = self.backend.execute(&request) => result,
        };

        if let Some(e) = result.as_ref().err().filter(|e| !e.is_not_found()) {
            error!(
                request_id = %self.ctx.request_id(),
                resource = %self.schema.type_name,
                operation = %request.operation,
                "backend call failed: {}",
                e
            );
        }
        Ok(result?)
    }

    /// What we told the server, used where its answer is silent
    fn submitted(
        &self,
        attrs: &ValidatedAttributes,
        id: Option<String>,
        keep_computed: bool,
    ) -> ResourceState {
        let mut state = ResourceState {
            id,
            values: Default::default(),
        };
        for spec in &self.schema.attributes {
            let value = if spec.is_configurable() {
                attrs.get(&spec.name).clone()
            } else if keep_computed {
                self.state.get(&spec.name).clone()
            } else {
                continue;
            };
            state.values.insert(spec.name.clone(), value);
        }
        state
    }

    fn transition(&mut self, to: Lifecycle) {
        debug!(
            request_id = %self.ctx.request_id(),
            resource = %self.schema.type_name,
            from = %self.lifecycle,
            to = %to,
            "lifecycle transition"
        );
        self.lifecycle = to;
    }

    fn invalid(&self, from: Lifecycle, operation: &str) -> TfcrudError {
        TfcrudError::InvalidTransition {
            from: from.to_string(),
            operation: operation.to_string(),
        }
    }
}
