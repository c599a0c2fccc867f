use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub loading: bool,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Process-wide authentication state: a current snapshot plus change
/// notification. Set at sign-in, cleared at sign-out; every change is
/// published to subscribers.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<AuthSnapshot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AuthSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token.clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|state| state.loading = loading);
    }

    pub fn set_auth(&self, user: UserProfile, token: impl Into<String>) {
        self.tx.send_replace(AuthSnapshot {
            user: Some(user),
            token: Some(token.into()),
            loading: false,
        });
    }

    pub fn clear(&self) {
        self.tx.send_replace(AuthSnapshot::default());
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            email: "ana@example.com".into(),
            name: "Ana".into(),
            role: "CUSTOMER".into(),
        }
    }

    #[tokio::test]
    async fn test_changes_are_published() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(!store.snapshot().is_authenticated());

        store.set_loading(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().loading);

        store.set_auth(profile(), "jwt-1");
        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.is_authenticated());
        assert!(!snapshot.loading);
        assert_eq!(store.token().as_deref(), Some("jwt-1"));

        store.clear();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AuthSnapshot::default());
    }
}
