use std::sync::{Arc, Mutex};

use crate::database::Database;
use crate::identity::{HeaderIdentity, IdentityResolver};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Database>>,
    pub auth: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(store: Database) -> Self {
        Self::with_resolver(store, Arc::new(HeaderIdentity))
    }

    pub fn with_resolver(store: Database, auth: Arc<dyn IdentityResolver>) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            auth,
        }
    }
}
