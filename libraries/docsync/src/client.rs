//! The remote document store, as seen by the sync layer.
//!
//! The transport itself lives outside this crate. Implementations only need to move JSON values around;
//! [`fetch`] and [`typed_listener`] take care of decoding into application types.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::data_model::{DocumentPath, PartialUpdate};

/// Called once per delivery, repeatedly, until the listener is torn down with [`DocumentClient::clear_all`].
pub type ListenerCallback = Arc<dyn Fn(Result<Value, ClientError>) + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestShape {
    Document,
    /// Delivered as a JSON array holding every document directly below the path.
    Collection,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentRequest {
    pub path: DocumentPath,
    pub shape: RequestShape,
}

impl DocumentRequest {
    pub fn document(path: DocumentPath) -> Self {
        Self {
            path,
            shape: RequestShape::Document,
        }
    }

    pub fn collection(path: DocumentPath) -> Self {
        Self {
            path,
            shape: RequestShape::Collection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("permission denied for {0}")]
    PermissionDenied(DocumentPath),
    #[error("{0} not found")]
    NotFound(DocumentPath),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request went through but there was nothing at the path.
    #[error("no data at {path}")]
    NoData { path: DocumentPath },
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("could not decode {path}: {source}")]
    Decode {
        path: DocumentPath,
        #[source]
        source: serde_json::Error,
    },
}

pub trait DocumentClient: Send + Sync {
    /// One-shot read. `Ok(None)` means the path exists in no form the store could return.
    fn get_data(&self, request: &DocumentRequest) -> BoxFuture<'_, Result<Option<Value>, ClientError>>;

    fn set_data(&self, path: &DocumentPath, value: Value) -> BoxFuture<'_, Result<(), ClientError>>;

    /// Merge-write of individual fields.
    fn update(
        &self,
        path: &DocumentPath,
        update: PartialUpdate,
    ) -> BoxFuture<'_, Result<(), ClientError>>;

    /// Invokes a named server-side function.
    fn call(&self, function: &str, payload: Value) -> BoxFuture<'_, Result<Value, ClientError>>;

    fn listen_document(&self, path: &DocumentPath, callback: ListenerCallback);

    fn listen_collection(&self, path: &DocumentPath, callback: ListenerCallback);

    /// Paths that currently have an active listener.
    fn listener_keys(&self) -> BTreeSet<DocumentPath>;

    /// Tears down every active listener.
    fn clear_all(&self);
}

pub fn decode<T: DeserializeOwned>(path: &DocumentPath, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|source| FetchError::Decode {
        path: path.clone(),
        source,
    })
}

pub async fn fetch<T: DeserializeOwned>(
    client: &dyn DocumentClient,
    request: &DocumentRequest,
) -> Result<T, FetchError> {
    let value = client
        .get_data(request)
        .await?
        .ok_or_else(|| FetchError::NoData {
            path: request.path.clone(),
        })?;
    decode(&request.path, value)
}

/// Registers a listener for `request` whose deliveries are decoded into `T` before reaching `on_delivery`.
pub fn typed_listener<T, F>(client: &dyn DocumentClient, request: &DocumentRequest, on_delivery: F)
where
    T: DeserializeOwned + 'static,
    F: Fn(Result<T, FetchError>) + Send + Sync + 'static,
{
    let path = request.path.clone();
    let callback: ListenerCallback = Arc::new(move |delivery: Result<Value, ClientError>| {
        let decoded = delivery
            .map_err(FetchError::from)
            .and_then(|value| decode(&path, value));
        on_delivery(decoded);
    });
    match request.shape {
        RequestShape::Document => client.listen_document(&request.path, callback),
        RequestShape::Collection => client.listen_collection(&request.path, callback),
    }
}
