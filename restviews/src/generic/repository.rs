//! Repository capability the generic views delegate to
//!
//! Repositories receive validated [`Record`]s: `params` carries the primary-key fields
//! merged with any declared query parameters (absent values dropped), `entity` carries
//! the validated body.
//!
//! # Example
//!
//! ```rust,ignore
//! use restviews::generic::Repository;
//! use restviews::schema::Record;
//!
//! struct Items { pool: PgPool }
//!
//! impl Repository for Items {
//!     type Entity = Record;
//!
//!     async fn retrieve(&self, params: Record) -> anyhow::Result<Option<Record>> {
//!         // SELECT ... WHERE id = params["id"]
//!         todo!()
//!     }
//!     // ...
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::schema::Record;
use crate::view::Blocking;

/// Data access for one resource
pub trait Repository: Send + Sync + 'static {
    /// What the repository hands back; emitted through the view's response schema
    type Entity: Serialize + Send + 'static;

    fn list(&self, params: Record) -> impl Future<Output = anyhow::Result<Vec<Self::Entity>>> + Send;

    /// `Ok(None)` when nothing matches `params`
    fn retrieve(
        &self,
        params: Record,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Entity>>> + Send;

    fn create(
        &self,
        entity: Record,
        params: Record,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Entity>>> + Send;

    /// Replace the matching entity; `Ok(None)` when nothing matches
    fn update(
        &self,
        entity: Record,
        params: Record,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Entity>>> + Send;

    /// Merge `entity`, which holds only the fields the client sent
    ///
    /// Defaults to [`update`](Self::update) with that reduced record.
    fn partial_update(
        &self,
        entity: Record,
        params: Record,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Entity>>> + Send {
        self.update(entity, params)
    }

    fn delete(&self, params: Record) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Synchronous repository; wrap in [`Blocking`] to use it from a generic view
pub trait SyncRepository: Send + Sync + 'static {
    type Entity: Serialize + Send + 'static;

    fn list(&self, params: Record) -> anyhow::Result<Vec<Self::Entity>>;

    fn retrieve(&self, params: Record) -> anyhow::Result<Option<Self::Entity>>;

    fn create(&self, entity: Record, params: Record) -> anyhow::Result<Option<Self::Entity>>;

    fn update(&self, entity: Record, params: Record) -> anyhow::Result<Option<Self::Entity>>;

    fn partial_update(
        &self,
        entity: Record,
        params: Record,
    ) -> anyhow::Result<Option<Self::Entity>> {
        self.update(entity, params)
    }

    fn delete(&self, params: Record) -> anyhow::Result<()>;
}

async fn spawn_blocking<R, T, F>(repository: &Arc<R>, f: F) -> anyhow::Result<T>
where
    R: Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&R) -> anyhow::Result<T> + Send + 'static,
{
    let repository = Arc::clone(repository);
    tokio::task::spawn_blocking(move || f(&repository))
        .await
        .map_err(|e| anyhow::anyhow!("blocking repository call did not complete: {e}"))?
}

impl<R: SyncRepository> Repository for Blocking<R> {
    type Entity = R::Entity;

    async fn list(&self, params: Record) -> anyhow::Result<Vec<R::Entity>> {
        spawn_blocking(self.inner(), move |repo| repo.list(params)).await
    }

    async fn retrieve(&self, params: Record) -> anyhow::Result<Option<R::Entity>> {
        spawn_blocking(self.inner(), move |repo| repo.retrieve(params)).await
    }

    async fn create(&self, entity: Record, params: Record) -> anyhow::Result<Option<R::Entity>> {
        spawn_blocking(self.inner(), move |repo| repo.create(entity, params)).await
    }

    async fn update(&self, entity: Record, params: Record) -> anyhow::Result<Option<R::Entity>> {
        spawn_blocking(self.inner(), move |repo| repo.update(entity, params)).await
    }

    async fn partial_update(
        &self,
        entity: Record,
        params: Record,
    ) -> anyhow::Result<Option<R::Entity>> {
        spawn_blocking(self.inner(), move |repo| repo.partial_update(entity, params)).await
    }

    async fn delete(&self, params: Record) -> anyhow::Result<()> {
        spawn_blocking(self.inner(), move |repo| repo.delete(params)).await
    }
}

/// Where a generic view gets its repository for each request
pub enum RepositorySource<R> {
    /// One handle shared by every request; the repository serializes its own access
    Shared(Arc<R>),
    /// A fresh repository built for each request
    Factory(Arc<dyn Fn() -> R + Send + Sync>),
}

impl<R> RepositorySource<R> {
    pub fn shared(repository: R) -> Self {
        Self::Shared(Arc::new(repository))
    }

    pub fn factory(factory: impl Fn() -> R + Send + Sync + 'static) -> Self {
        Self::Factory(Arc::new(factory))
    }

    /// Repository for the current request
    #[must_use]
    pub fn get(&self) -> Arc<R> {
        match self {
            Self::Shared(repository) => Arc::clone(repository),
            Self::Factory(factory) => Arc::new(factory()),
        }
    }
}

impl<R> Clone for RepositorySource<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Shared(repository) => Self::Shared(Arc::clone(repository)),
            Self::Factory(factory) => Self::Factory(Arc::clone(factory)),
        }
    }
}

impl<R> fmt::Debug for RepositorySource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared(_) => f.write_str("RepositorySource::Shared"),
            Self::Factory(_) => f.write_str("RepositorySource::Factory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Notes {
        updates: Mutex<Vec<Record>>,
    }

    impl SyncRepository for Notes {
        type Entity = Value;

        fn list(&self, _params: Record) -> anyhow::Result<Vec<Value>> {
            Ok(vec![json!({"id": 1})])
        }

        fn retrieve(&self, _params: Record) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }

        fn create(&self, entity: Record, _params: Record) -> anyhow::Result<Option<Value>> {
            Ok(Some(Value::Object(entity)))
        }

        fn update(&self, entity: Record, _params: Record) -> anyhow::Result<Option<Value>> {
            self.updates
                .lock()
                .map_err(|_| anyhow::anyhow!("poisoned"))?
                .push(entity.clone());
            Ok(Some(Value::Object(entity)))
        }

        fn delete(&self, _params: Record) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_blocking_repository_delegates() {
        let repo = Blocking::new(Notes::default());
        assert_eq!(Repository::list(&repo, Record::new()).await.unwrap().len(), 1);
        assert!(Repository::retrieve(&repo, Record::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_update_defaults_to_update() {
        let repo = Blocking::new(Notes::default());
        let entity = json!({"title": "draft"}).as_object().cloned().unwrap();

        Repository::partial_update(&repo, entity.clone(), Record::new())
            .await
            .unwrap();
        assert_eq!(*repo.inner().updates.lock().unwrap(), vec![entity]);
    }

    #[test]
    fn test_factory_builds_per_call() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let source = RepositorySource::factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Notes::default()
        });

        let _ = source.get();
        let _ = source.get();
        assert_eq!(built.load(Ordering::SeqCst), 2);

        let shared = RepositorySource::shared(Notes::default());
        assert!(Arc::ptr_eq(&shared.get(), &shared.get()));
    }
}
