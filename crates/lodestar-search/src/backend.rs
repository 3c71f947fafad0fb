//! [`ResourceBackend`] adapter over [`SearchClient`].

use async_trait::async_trait;
use lodestar_core::{Ack, BackendError, BackendResult, ResourceBackend, ResourceKind, ResourceSpec};
use serde_json::Value;

use crate::client::SearchClient;
use crate::models::AcknowledgedResponse;

fn unmanaged(kind: ResourceKind) -> BackendError {
    BackendError::configuration(format!("{kind} is not managed by the search backend"))
}

fn ack(response: AcknowledgedResponse) -> Ack {
    Ack {
        acknowledged: response.acknowledged,
    }
}

#[async_trait]
impl ResourceBackend for SearchClient {
    async fn get(&self, kind: ResourceKind, name: &str) -> BackendResult<Value> {
        let result = match kind {
            ResourceKind::LifecyclePolicy => self.get_lifecycle_policy(name).await,
            ResourceKind::IndexTemplate => self.get_index_template(name).await,
            ResourceKind::Index => self.get_index(name).await,
            ResourceKind::DataView => self.get_data_view(name).await,
            ResourceKind::Role => self.get_role(name).await,
            ResourceKind::RoleMapping => self.get_role_mapping(name).await,
            other => return Err(unmanaged(other)),
        };
        result.map_err(|e| e.into_backend(kind, name))
    }

    async fn exists(&self, kind: ResourceKind, name: &str) -> BackendResult<bool> {
        let probe = match kind {
            ResourceKind::IndexTemplate => self.index_template_exists(name).await,
            ResourceKind::Index => self.index_exists(name).await,
            _ => {
                return match self.get(kind, name).await {
                    Ok(_) => Ok(true),
                    Err(e) if e.is_not_found() => Ok(false),
                    Err(e) => Err(e),
                }
            }
        };
        probe.map_err(|e| e.into_backend(kind, name))
    }

    async fn create(&self, spec: &ResourceSpec) -> BackendResult<Ack> {
        let (kind, name, body) = (spec.kind, spec.name.as_str(), &spec.body);
        let result = match kind {
            ResourceKind::LifecyclePolicy => self.put_lifecycle_policy(name, body).await.map(ack),
            ResourceKind::IndexTemplate => self.put_index_template(name, body).await.map(ack),
            ResourceKind::Index => self.create_index(name, body).await.map(ack),
            ResourceKind::DataView => self.put_data_view(name, body).await.map(|()| Ack::accepted()),
            ResourceKind::Role => self.put_role(name, body).await.map(|()| Ack::accepted()),
            ResourceKind::RoleMapping => {
                self.put_role_mapping(name, body).await.map(|()| Ack::accepted())
            }
            other => return Err(unmanaged(other)),
        };
        result.map_err(|e| e.into_backend(kind, name))
    }

    async fn update(&self, kind: ResourceKind, name: &str, body: &Value) -> BackendResult<Ack> {
        if kind == ResourceKind::Index {
            return Err(BackendError::rejected(
                format!("update {kind} '{name}'"),
                None,
                "indices cannot be replaced in place",
            ));
        }
        self.create(&ResourceSpec::new(kind, name, body.clone())).await
    }
}
