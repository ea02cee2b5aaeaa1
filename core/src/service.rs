//! Typed CRUD over one collection.
//!
//! A thin mapping from a domain operation to verb + path + payload. No
//! validation happens here; drafts are checked by the caller before they
//! get this far.

use std::marker::PhantomData;

use crate::authorized::AuthorizedClient;
use crate::error::ApiError;
use crate::resources::{RecordId, Resource};
use crate::types::Confirmation;

pub struct ResourceService<R> {
    client: AuthorizedClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceService<R> {
    pub fn new(client: AuthorizedClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    pub async fn get_all(&self) -> Result<Vec<R>, ApiError> {
        let request = self.client.api().build_list::<R>();
        let response = self.client.send(request).await?;
        self.client.api().parse_list(response)
    }

    pub async fn create(&self, draft: &R::Draft) -> Result<R, ApiError> {
        let request = self.client.api().build_create::<R>(draft)?;
        let response = self.client.send(request).await?;
        self.client.api().parse_record(response)
    }

    pub async fn update(&self, id: &RecordId, draft: &R::Draft) -> Result<R, ApiError> {
        let request = self.client.api().build_update::<R>(id, draft)?;
        let response = self.client.send(request).await?;
        self.client.api().parse_record(response)
    }

    pub async fn delete(&self, id: &RecordId) -> Result<Confirmation, ApiError> {
        let request = self.client.api().build_delete::<R>(id);
        let response = self.client.send(request).await?;
        self.client.api().parse_delete(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::ApiClient;
    use crate::http::HttpMethod;
    use crate::navigation::RouterHandle;
    use crate::resources::{Event, Note, NoteDraft, Priority, Status, Todo, TodoDraft};
    use crate::session::SessionStore;
    use crate::storage::MemoryTokenStorage;
    use crate::transport::testing::ScriptedTransport;

    fn service<R: Resource>() -> (ResourceService<R>, Arc<ScriptedTransport>) {
        let api = ApiClient::new("http://localhost:3000/api");
        let transport = Arc::new(ScriptedTransport::new());
        let storage = Arc::new(MemoryTokenStorage::with_token("T"));
        let session = SessionStore::new(api.clone(), transport.clone(), storage);
        let client = AuthorizedClient::new(
            api,
            transport.clone(),
            session,
            Arc::new(RouterHandle::default()),
        );
        (ResourceService::new(client), transport)
    }

    #[tokio::test]
    async fn get_all_decodes_sequence() {
        let (todos, transport) = service::<Todo>();
        transport.push(
            200,
            r#"[{"_id":"1","title":"a","priority":"low","status":"pending"},
                {"_id":"2","title":"b","priority":"high","status":"completed"}]"#,
        );
        let items = todos.get_all().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].status, Status::Completed);
        assert_eq!(transport.requests()[0].method, HttpMethod::Get);
    }

    #[tokio::test]
    async fn create_returns_server_record() {
        let (todos, transport) = service::<Todo>();
        transport.push(
            201,
            r#"{"_id":"srv-1","title":"Buy milk","priority":"low","status":"pending"}"#,
        );
        let draft = TodoDraft {
            priority: Priority::Low,
            ..TodoDraft::new("Buy milk")
        };
        let todo = todos.create(&draft).await.unwrap();
        assert_eq!(todo.id.as_str(), "srv-1");
        assert_eq!(transport.requests()[0].header("authorization"), Some("Bearer T"));
    }

    #[tokio::test]
    async fn update_puts_full_record() {
        let (notes, transport) = service::<Note>();
        transport.push(200, r#"{"_id":"n1","title":"t2","content":"c","tags":["a"]}"#);
        let mut draft = NoteDraft::new("t2", "c");
        draft.tags.add("a");
        let note = notes.update(&RecordId::new("n1"), &draft).await.unwrap();
        assert_eq!(note.title, "t2");

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Put);
        assert!(request.path.ends_with("/notes/n1"));
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["tags"], serde_json::json!(["a"]));
    }

    #[tokio::test]
    async fn delete_surfaces_not_found() {
        let (events, transport) = service::<Event>();
        transport.push(404, r#"{"message":"Event not found"}"#);
        let err = events.delete(&RecordId::new("gone")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
        assert_eq!(err.user_message("Failed to delete event"), "Event not found");
    }
}
