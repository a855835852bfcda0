//! Typed service modules, one per entity kind.
//!
//! Every kind shares the same REST shape: `GET {path}`, `GET {path}/{id}`,
//! `POST {path}`, `PATCH {path}/{id}` and `DELETE {path}/{id}`.

use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::backend::RestBackend;
use crate::domain::Entity;
use crate::error::{ApiError, ApiResult};

pub struct ResourceService<T> {
    backend: Arc<dyn RestBackend>,
    _entity: PhantomData<fn() -> T>,
}


impl<T: Entity> ResourceService<T> {
    pub fn new(backend: Arc<dyn RestBackend>) -> Self {
        Self {
            backend,
            _entity: PhantomData,
        }
    }

    fn item_path(id: &str) -> String {
        format!("{}/{}", T::KIND.path(), id)
    }

    fn decode<V: serde::de::DeserializeOwned>(value: Value) -> ApiResult<V> {
        serde_json::from_value(value).map_err(|e| {
            tracing::error!(kind = %T::KIND, error = %e, "Failed to decode marketplace payload");
            ApiError::internal(format!("Invalid {} payload: {}", T::KIND, e))
        })
    }

    fn encode<B: Serialize>(body: &B) -> ApiResult<Value> {
        serde_json::to_value(body).map_err(ApiError::from)
    }

    pub async fn list(&self) -> ApiResult<Vec<T>> {
        let value = self.backend.get(T::KIND.path()).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Self::decode(value)
    }

    pub async fn get(&self, id: &str) -> ApiResult<T> {
        let value = self.backend.get(&Self::item_path(id)).await?;
        Self::decode(value)
    }

    pub async fn create<B: Serialize + Sync>(&self, body: &B) -> ApiResult<T> {
        let value = self.backend.post(T::KIND.path(), &Self::encode(body)?).await?;
        Self::decode(value)
    }

    pub async fn update<B: Serialize + Sync>(&self, id: &str, body: &B) -> ApiResult<T> {
        let value = self
            .backend
            .patch(&Self::item_path(id), &Self::encode(body)?)
            .await?;
        Self::decode(value)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.backend.delete(&Self::item_path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bid, BidStatus, Project, UpdateBidInput};
    use crate::testing::FakeBackend;
    use serde_json::json;

    #[tokio::test]
    async fn crud_round_trips_through_backend() {
        let backend = Arc::new(FakeBackend::new());
        let bids = ResourceService::<Bid>::new(backend.clone());

        let created = bids
            .create(&json!({ "project_id": "p1", "freelancer_id": "f1", "amount": "700" }))
            .await
            .unwrap();
        assert_eq!(created.amount, 700);
        assert_eq!(created.status, BidStatus::Pending);

        let updated = bids
            .update(&created.id, &UpdateBidInput::status(BidStatus::Shortlisted))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.status, BidStatus::Shortlisted);

        assert_eq!(bids.get(&created.id).await.unwrap(), updated);
        assert_eq!(bids.list().await.unwrap().len(), 1);

        bids.delete(&created.id).await.unwrap();
        assert!(bids.list().await.unwrap().is_empty());
        assert_eq!(backend.calls("DELETE", "/bids"), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_internal_error() {
        let backend = Arc::new(FakeBackend::new());
        backend.seed("/projects", vec![json!({ "id": "p1" })]);

        let result = ResourceService::<Project>::new(backend).list().await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }
}
