//! Push feed of deployment records on `/api/ws`

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::deployments::store::DeploymentStore;
use crate::models::deployment::DeploymentRecord;
use crate::workers::socket::PushHandler;

/// The server pushes either its list of active records or a single record
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedPayload {
    Many(Option<Vec<DeploymentRecord>>),
    One(Box<DeploymentRecord>),
}

/// Routes pushed records into [`DeploymentStore::reconcile_push`]
pub struct DeploymentFeed {
    store: Arc<DeploymentStore>,
}

impl DeploymentFeed {
    pub fn new(store: Arc<DeploymentStore>) -> Self {
        Self { store }
    }

    /// Apply one text frame, returning how many records it carried
    pub fn apply(&self, text: &str) -> usize {
        let records = match serde_json::from_str::<FeedPayload>(text) {
            Ok(FeedPayload::Many(records)) => records.unwrap_or_default(),
            Ok(FeedPayload::One(record)) => vec![*record],
            Err(e) => {
                warn!("Dropping malformed deployment push: {}", e);
                return 0;
            }
        };

        let count = records.len();
        for record in records {
            self.store.reconcile_push(record);
        }
        debug!("Applied {} pushed deployments", count);
        count
    }
}

impl PushHandler for DeploymentFeed {
    fn on_open(&self) {
        self.store.set_ws_connected(true);
    }

    fn on_text(&self, text: &str) {
        self.apply(text);
    }

    fn on_close(&self) {
        self.store.set_ws_connected(false);
    }
}
