//! A [`DocumentClient`] that keeps every document in memory.
//!
//! Used by tests and by the CLI to stand in for the real store. It records every request,
//! can be told to fail or stall requests for a given path, and pushes changes to listeners
//! the way a real-time store would: an initial snapshot on registration, then one delivery per write.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use crate::client::{ClientError, DocumentClient, DocumentRequest, ListenerCallback, RequestShape};
use crate::data_model::{DocumentPath, PartialUpdate, PathError};

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedRequest {
    Get(DocumentRequest),
    Set(DocumentPath),
    Update(DocumentPath, PartialUpdate),
    Call(String),
    Listen(DocumentRequest),
}

struct Registration {
    shape: RequestShape,
    callback: ListenerCallback,
}

#[derive(Default)]
struct Inner {
    documents: BTreeMap<DocumentPath, Value>,
    failures: HashMap<DocumentPath, ClientError>,
    holds: HashMap<DocumentPath, watch::Receiver<bool>>,
    listeners: BTreeMap<DocumentPath, Vec<Registration>>,
    functions: HashMap<String, Value>,
    requests: Vec<RecordedRequest>,
}

type Delivery = (ListenerCallback, Result<Value, ClientError>);

#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: Mutex<Inner>,
}

/// Keeps fetches for one path suspended until [`Hold::release`] is called or the hold is dropped.
pub struct Hold {
    released: watch::Sender<bool>,
}

impl Hold {
    pub fn release(self) {
        self.released.send_replace(true);
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a JSON object mapping document paths to documents.
    pub fn from_fixture(fixture: &Value) -> Result<Self, PathError> {
        let store = Self::new();
        if let Value::Object(documents) = fixture {
            for (path, document) in documents {
                store.insert(DocumentPath::parse(path)?, document.clone());
            }
        }
        Ok(store)
    }

    /// Seeds a document without notifying listeners.
    pub fn insert(&self, path: DocumentPath, document: Value) {
        self.inner.lock().documents.insert(path, document);
    }

    pub fn document(&self, path: &DocumentPath) -> Option<Value> {
        self.inner.lock().documents.get(path).cloned()
    }

    /// Writes a document as if another client changed it, notifying listeners.
    pub fn push(&self, path: DocumentPath, document: Value) {
        let deliveries = {
            let mut inner = self.inner.lock();
            inner.documents.insert(path.clone(), document);
            inner.deliveries_for_change(&path)
        };
        deliver(deliveries);
    }

    pub fn remove(&self, path: &DocumentPath) {
        let deliveries = {
            let mut inner = self.inner.lock();
            inner.documents.remove(path);
            inner.deliveries_for_change(path)
        };
        deliver(deliveries);
    }

    /// Every subsequent fetch of `path` fails with `error` until [`Self::clear_failure`].
    pub fn fail_path(&self, path: DocumentPath, error: ClientError) {
        self.inner.lock().failures.insert(path, error);
    }

    pub fn clear_failure(&self, path: &DocumentPath) {
        self.inner.lock().failures.remove(path);
    }

    /// Delivers `error` to every listener registered on `path`.
    pub fn emit_error(&self, path: &DocumentPath, error: ClientError) {
        let deliveries: Vec<Delivery> = {
            let inner = self.inner.lock();
            inner
                .listeners
                .get(path)
                .into_iter()
                .flatten()
                .map(|registration| (registration.callback.clone(), Err(error.clone())))
                .collect()
        };
        deliver(deliveries);
    }

    /// Fetches of `path` read their value when issued, then wait for the returned hold to be released before completing.
    pub fn hold(&self, path: DocumentPath) -> Hold {
        let (released, receiver) = watch::channel(false);
        self.inner.lock().holds.insert(path, receiver);
        Hold { released }
    }

    pub fn set_function_response(&self, function: impl Into<String>, response: Value) {
        self.inner.lock().functions.insert(function.into(), response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.inner.lock().requests.clear();
    }

    fn register(&self, request: DocumentRequest, callback: ListenerCallback) {
        let initial = {
            let mut inner = self.inner.lock();
            inner.requests.push(RecordedRequest::Listen(request.clone()));
            let initial = match inner.failures.get(&request.path) {
                Some(error) => Some(Err(error.clone())),
                None => inner.snapshot(&request).map(Ok),
            };
            inner
                .listeners
                .entry(request.path)
                .or_default()
                .push(Registration {
                    shape: request.shape,
                    callback: callback.clone(),
                });
            initial
        };
        if let Some(initial) = initial {
            callback(initial);
        }
    }
}

impl Inner {
    fn snapshot(&self, request: &DocumentRequest) -> Option<Value> {
        match request.shape {
            RequestShape::Document => self.documents.get(&request.path).cloned(),
            RequestShape::Collection => Some(self.collection(&request.path)),
        }
    }

    fn collection(&self, path: &DocumentPath) -> Value {
        let documents = self
            .documents
            .iter()
            .filter(|(child, _)| path.is_parent_of(child))
            .map(|(child, document)| with_id(child, document.clone()))
            .collect();
        Value::Array(documents)
    }

    fn deliveries_for_change(&self, path: &DocumentPath) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        for registration in self.listeners.get(path).into_iter().flatten() {
            if registration.shape == RequestShape::Document {
                if let Some(document) = self.documents.get(path) {
                    deliveries.push((registration.callback.clone(), Ok(document.clone())));
                }
            }
        }
        if let Some(parent) = path.parent() {
            for registration in self.listeners.get(&parent).into_iter().flatten() {
                if registration.shape == RequestShape::Collection {
                    deliveries.push((registration.callback.clone(), Ok(self.collection(&parent))));
                }
            }
        }
        deliveries
    }
}

/// Collection members carry their document id, unless they already have one.
fn with_id(path: &DocumentPath, mut document: Value) -> Value {
    if let Value::Object(map) = &mut document {
        map.entry("id")
            .or_insert_with(|| Value::String(path.last_segment().to_string()));
    }
    document
}

fn deliver(deliveries: Vec<Delivery>) {
    for (callback, delivery) in deliveries {
        callback(delivery);
    }
}

impl DocumentClient for InMemoryDocumentStore {
    fn get_data(&self, request: &DocumentRequest) -> BoxFuture<'_, Result<Option<Value>, ClientError>> {
        let (result, hold) = {
            let mut inner = self.inner.lock();
            inner.requests.push(RecordedRequest::Get(request.clone()));
            let result = match inner.failures.get(&request.path) {
                Some(error) => Err(error.clone()),
                None => Ok(inner.snapshot(request)),
            };
            (result, inner.holds.get(&request.path).cloned())
        };
        async move {
            // every request is a suspension point, like a real round trip
            tokio::task::yield_now().await;
            if let Some(mut hold) = hold {
                // a dropped hold counts as released
                let _ = hold.wait_for(|released| *released).await;
            }
            result
        }
        .boxed()
    }

    fn set_data(&self, path: &DocumentPath, value: Value) -> BoxFuture<'_, Result<(), ClientError>> {
        let path = path.clone();
        async move {
            tokio::task::yield_now().await;
            let deliveries = {
                let mut inner = self.inner.lock();
                inner.requests.push(RecordedRequest::Set(path.clone()));
                if let Some(error) = inner.failures.get(&path) {
                    return Err(error.clone());
                }
                inner.documents.insert(path.clone(), value);
                inner.deliveries_for_change(&path)
            };
            deliver(deliveries);
            Ok(())
        }
        .boxed()
    }

    fn update(
        &self,
        path: &DocumentPath,
        update: PartialUpdate,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        let path = path.clone();
        async move {
            tokio::task::yield_now().await;
            let deliveries = {
                let mut inner = self.inner.lock();
                inner
                    .requests
                    .push(RecordedRequest::Update(path.clone(), update.clone()));
                if let Some(error) = inner.failures.get(&path) {
                    return Err(error.clone());
                }
                let Some(document) = inner.documents.get_mut(&path) else {
                    return Err(ClientError::NotFound(path));
                };
                update.apply_to(document);
                inner.deliveries_for_change(&path)
            };
            deliver(deliveries);
            Ok(())
        }
        .boxed()
    }

    fn call(&self, function: &str, _payload: Value) -> BoxFuture<'_, Result<Value, ClientError>> {
        let function = function.to_string();
        async move {
            tokio::task::yield_now().await;
            let mut inner = self.inner.lock();
            inner.requests.push(RecordedRequest::Call(function.clone()));
            inner
                .functions
                .get(&function)
                .cloned()
                .ok_or_else(|| ClientError::InvalidArgument(format!("unknown function {function}")))
        }
        .boxed()
    }

    fn listen_document(&self, path: &DocumentPath, callback: ListenerCallback) {
        self.register(DocumentRequest::document(path.clone()), callback);
    }

    fn listen_collection(&self, path: &DocumentPath, callback: ListenerCallback) {
        self.register(DocumentRequest::collection(path.clone()), callback);
    }

    fn listener_keys(&self) -> BTreeSet<DocumentPath> {
        self.inner.lock().listeners.keys().cloned().collect()
    }

    fn clear_all(&self) {
        self.inner.lock().listeners.clear();
    }
}
