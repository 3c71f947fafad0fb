//! Per-tenant reconciliation.
//!
//! Each tenant's desired state is applied create-if-absent, in generation
//! order, on a bounded pool of worker tasks. A failed step skips the rest of
//! that tenant; other tenants are unaffected. A configuration or
//! authentication failure aborts the whole run.

use std::sync::Arc;

use chrono::Utc;
use lodestar_core::naming::{self, TenantName};
use lodestar_core::{
    BackendResult, Outcome, ResourceBackend, ResourceKind, ResourceOutcome, ResourceSpec,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::defaults::ProvisioningDefaults;
use crate::desired::{DesiredState, RoleNaming};
use crate::error::{ReconcileError, ReconcileResult};
use crate::grant::GrantMerger;
use crate::report::{GrantRecord, GrantStatus, RunReport, TenantReport};

/// Run options.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Maximum number of tenants processed at once (at least 1).
    pub concurrency: usize,
    /// Shared role that accumulates a read grant per tenant.
    pub aggregated_role: Option<String>,
    pub role_naming: RoleNaming,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            aggregated_role: Some("teamlead-viewer".to_string()),
            role_naming: RoleNaming::Dashed,
        }
    }
}

/// Everything a worker task needs; cheap to clone into a task.
#[derive(Clone)]
struct TenantWorker {
    backend: Arc<dyn ResourceBackend>,
    defaults: Arc<ProvisioningDefaults>,
    options: Arc<ReconcileOptions>,
    grants: Arc<GrantMerger>,
}

/// Applies every tenant's desired state to the search backend.
pub struct TenantReconciler {
    worker: TenantWorker,
    cancel: CancellationToken,
}

impl TenantReconciler {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        defaults: ProvisioningDefaults,
        options: ReconcileOptions,
    ) -> Self {
        let grants = Arc::new(GrantMerger::new(backend.clone()));
        Self {
            worker: TenantWorker {
                backend,
                defaults: Arc::new(defaults),
                options: Arc::new(options),
                grants,
            },
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token (e.g. tied to Ctrl-C).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run at the next tenant boundary.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Reconcile every tenant and report per-resource outcomes in input order.
    ///
    /// Tenants not started before cancellation are reported with every
    /// resource `Cancelled`.
    pub async fn reconcile(&self, tenants: &[TenantName]) -> ReconcileResult<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let concurrency = self.worker.options.concurrency.max(1);
        info!(
            run_id = %run_id,
            tenants = tenants.len(),
            concurrency,
            "Starting tenant reconciliation"
        );

        // Fatal failures stop new tenants without cancelling the caller's token.
        let run_token = self.cancel.child_token();
        let mut join_set = JoinSet::new();
        let mut slots: Vec<Option<TenantReport>> = tenants.iter().map(|_| None).collect();
        let mut failure: Option<ReconcileError> = None;

        for (idx, tenant) in tenants.iter().enumerate() {
            // A slot frees up only once its tenant's result has been absorbed.
            while join_set.len() >= concurrency {
                tokio::select! {
                    biased;
                    () = run_token.cancelled() => break,
                    Some(joined) = join_set.join_next() => {
                        absorb(joined, &mut slots, &mut failure, &run_token);
                    }
                }
            }
            while let Some(joined) = join_set.try_join_next() {
                absorb(joined, &mut slots, &mut failure, &run_token);
            }
            if failure.is_some() || run_token.is_cancelled() {
                break;
            }

            let worker = self.worker.clone();
            let tenant = tenant.clone();
            join_set.spawn(async move { (idx, worker.run(&tenant).await) });
        }

        while let Some(joined) = join_set.join_next().await {
            absorb(joined, &mut slots, &mut failure, &run_token);
        }

        if let Some(e) = failure {
            error!(run_id = %run_id, error = %e, "Tenant reconciliation aborted");
            return Err(e);
        }

        let mut reports = Vec::with_capacity(tenants.len());
        for (tenant, slot) in tenants.iter().zip(slots) {
            match slot {
                Some(report) => reports.push(report),
                None => reports.push(self.worker.cancelled(tenant)?),
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            tenants: reports,
        };
        let summary = report.summary();
        info!(
            run_id = %run_id,
            created = summary.created,
            already_present = summary.already_present,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "Tenant reconciliation finished"
        );
        Ok(report)
    }

    /// Reconcile a single tenant in the calling task.
    pub async fn reconcile_tenant(&self, tenant: &TenantName) -> ReconcileResult<TenantReport> {
        self.worker.run(tenant).await
    }
}

fn absorb(
    joined: Result<(usize, ReconcileResult<TenantReport>), tokio::task::JoinError>,
    slots: &mut [Option<TenantReport>],
    failure: &mut Option<ReconcileError>,
    run_token: &CancellationToken,
) {
    let error = match joined {
        Ok((idx, Ok(report))) => {
            slots[idx] = Some(report);
            return;
        }
        Ok((_, Err(e))) => e,
        Err(e) => {
            error!(error = %e, "Tenant task panicked");
            ReconcileError::from(e)
        }
    };
    run_token.cancel();
    if failure.is_none() {
        *failure = Some(error);
    }
}

impl TenantWorker {
    async fn run(&self, tenant: &TenantName) -> ReconcileResult<TenantReport> {
        info!(tenant = %tenant, "Reconciling tenant");
        let desired =
            DesiredState::generate(tenant, &self.defaults, &self.options.role_naming)?;

        let mut resources = Vec::with_capacity(desired.specs.len());
        let mut failed = false;
        for spec in &desired.specs {
            if failed {
                resources.push(ResourceOutcome::new(spec.kind, &spec.name, Outcome::Skipped));
                continue;
            }
            match self.ensure(spec).await {
                Ok(outcome) => {
                    info!(tenant = %tenant, kind = %spec.kind, name = %spec.name, outcome = %outcome, "Resource reconciled");
                    resources.push(ResourceOutcome::new(spec.kind, &spec.name, outcome));
                }
                Err(e) if e.is_fatal() => return Err(ReconcileError::Aborted(e)),
                Err(e) => {
                    warn!(tenant = %tenant, kind = %spec.kind, name = %spec.name, error = %e, "Resource failed, skipping remaining steps");
                    resources.push(ResourceOutcome::failed(spec.kind, &spec.name, &e));
                    failed = true;
                }
            }
        }

        let grant = match &self.options.aggregated_role {
            Some(role) => Some(self.grant(tenant, role, failed).await?),
            None => None,
        };

        Ok(TenantReport {
            tenant: tenant.clone(),
            resources,
            grant,
        })
    }

    /// Create the resource unless it already exists.
    ///
    /// An index create that lost a race (or whose earlier attempt landed
    /// before a retried timeout) is rejected as already existing; that
    /// counts as present.
    async fn ensure(&self, spec: &ResourceSpec) -> BackendResult<Outcome> {
        if self.backend.exists(spec.kind, &spec.name).await? {
            return Ok(Outcome::AlreadyPresent);
        }
        match self.backend.create(spec).await {
            Ok(ack) => ack.require("create", spec.kind, &spec.name)?,
            Err(e) if spec.kind == ResourceKind::Index && e.is_already_exists() => {
                debug!(name = %spec.name, "Index appeared between lookup and create");
                return Ok(Outcome::AlreadyPresent);
            }
            Err(e) => return Err(e),
        }
        Ok(Outcome::Created)
    }

    async fn grant(
        &self,
        tenant: &TenantName,
        role: &str,
        tenant_failed: bool,
    ) -> ReconcileResult<GrantRecord> {
        let pattern = naming::group_role_pattern(tenant);
        if tenant_failed {
            return Ok(GrantRecord::new(role, &pattern, GrantStatus::Skipped));
        }
        match self
            .grants
            .merge(role, &pattern, &self.defaults.aggregated_privileges)
            .await
        {
            Ok(outcome) => Ok(GrantRecord::new(role, &pattern, outcome.into())),
            Err(e) if e.is_fatal() => Err(ReconcileError::Aborted(e)),
            Err(e) => {
                warn!(tenant = %tenant, role = %role, error = %e, "Aggregated role grant failed");
                Ok(GrantRecord::failed(role, &pattern, &e))
            }
        }
    }

    fn cancelled(&self, tenant: &TenantName) -> ReconcileResult<TenantReport> {
        let desired =
            DesiredState::generate(tenant, &self.defaults, &self.options.role_naming)?;
        let resources = desired
            .names()
            .map(|(kind, name)| ResourceOutcome::new(kind, name, Outcome::Cancelled))
            .collect();
        let grant = self.options.aggregated_role.as_deref().map(|role| {
            GrantRecord::new(role, &naming::group_role_pattern(tenant), GrantStatus::Skipped)
        });
        Ok(TenantReport {
            tenant: tenant.clone(),
            resources,
            grant,
        })
    }
}
