//! Fast path router — urgent mentions alert immediately, outside cadence.
//!
//! Fully isolated: a broken alert handler is logged and forgotten. The
//! mention's primary outcome (accepted) stands regardless of what happens
//! here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use clipwatch_core::traits::{AlertHandler, EventSink};
use clipwatch_core::types::{Mention, Profile, RunEvent};

/// Routes urgent verdicts to the expedited alert handler.
pub struct FastPathRouter {
    handler: Arc<dyn AlertHandler>,
    sink: Arc<dyn EventSink>,
}

impl FastPathRouter {
    pub fn new(handler: Arc<dyn AlertHandler>, sink: Arc<dyn EventSink>) -> Self {
        Self { handler, sink }
    }

    /// Deliver one urgent alert synchronously. Never fails the caller.
    pub async fn route_urgent(&self, mention: &Mention, profile: &Profile) {
        match self.handler.handle(mention, profile).await {
            Ok(()) => {
                info!(
                    "🚨 Urgent mention {} alerted for profile '{}'",
                    mention.id, profile.name
                );
                let event = RunEvent::UrgentAlerted {
                    mention_id: mention.id.clone(),
                };
                if let Err(e) = self.sink.emit(event).await {
                    debug!("Event sink dropped UrgentAlerted: {e}");
                }
            }
            Err(e) => {
                warn!("⚠️ Fast path alert failed for mention {}: {}", mention.id, e);
            }
        }
    }
}
