//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::DirectoryStore;
use crate::identity::IdentityVerifier;
use crate::services::{AccountService, AdminDirectory};

/// Application state shared across all handlers.
///
/// Built once at start-up; every handler receives a cheap clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn DirectoryStore>,
    directory: AdminDirectory,
    accounts: AccountService,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>, identity: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                directory: AdminDirectory::new(store.clone(), identity),
                accounts: AccountService::new(store.clone()),
                store,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn DirectoryStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn directory(&self) -> &AdminDirectory {
        &self.inner.directory
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.inner.store.backend())
            .finish_non_exhaustive()
    }
}
