use std::collections::HashMap;
use std::sync::OnceLock;

use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

type Attributes = HashMap<String, Value>;

// Process-wide session store
static SESSIONS: OnceLock<DashMap<String, Attributes>> = OnceLock::new();

fn sessions() -> &'static DashMap<String, Attributes> {
    SESSIONS.get_or_init(DashMap::new)
}

/// Process-wide session store, bound to requests through the `SID` cookie.
pub struct SessionStore;

impl SessionStore {
    pub fn find(id: &str) -> bool {
        !id.is_empty() && sessions().contains_key(id)
    }

    /// Register a new session and return its id.
    pub fn create() -> String {
        let id = Uuid::new_v4().simple().to_string();
        sessions().insert(id.clone(), HashMap::new());
        id
    }

    pub fn remove(id: &str) {
        sessions().remove(id);
    }

    pub fn set_attribute(id: &str, name: &str, value: Value) {
        if let Some(mut attributes) = sessions().get_mut(id) {
            attributes.insert(name.to_owned(), value);
        }
    }

    pub fn get_attribute(id: &str, name: &str) -> Option<Value> {
        sessions().get(id)?.get(name).cloned()
    }

    pub fn attribute_names(id: &str) -> Vec<String> {
        sessions()
            .get(id)
            .map(|attributes| attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove_attribute(id: &str, name: &str) {
        if let Some(mut attributes) = sessions().get_mut(id) {
            attributes.remove(name);
        }
    }
}
