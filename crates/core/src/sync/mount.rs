use std::sync::Arc;

use log::{debug, info};

use super::Synchronizer;
use crate::events::{ChangeEvent, EventHandler, NotificationSource, SubscriptionId};

/// A synchronizer attached to a notification source.
///
/// Dropping the mount (or calling [`unmount`]) releases every subscription it
/// made and tears the synchronizer down.
///
/// [`unmount`]: DashboardMount::unmount
pub struct DashboardMount {
    synchronizer: Arc<Synchronizer>,
    source: Arc<dyn NotificationSource>,
    subscriptions: Vec<(ChangeEvent, SubscriptionId)>,
}

impl Synchronizer {
    /// Subscribes to all four change events and issues the initial reload.
    ///
    /// Handlers hold only a weak reference to the synchronizer, so the
    /// source never keeps a torn-down dashboard alive.
    pub fn mount(self: &Arc<Self>, source: Arc<dyn NotificationSource>) -> DashboardMount {
        let subscriptions: Vec<_> = ChangeEvent::ALL
            .into_iter()
            .map(|event| {
                let weak = Arc::downgrade(self);
                let handler: EventHandler = Arc::new(move |event| {
                    if let Some(sync) = weak.upgrade() {
                        let outcome = sync.trigger();
                        debug!(
                            "Change event {} for {} received, reload {:?}",
                            event,
                            event.collection(),
                            outcome
                        );
                    }
                });
                (event, source.subscribe(event, handler))
            })
            .collect();

        info!(
            "Dashboard mounted, subscribed to {} change event(s)",
            subscriptions.len()
        );
        self.trigger();

        DashboardMount {
            synchronizer: Arc::clone(self),
            source,
            subscriptions,
        }
    }
}

impl DashboardMount {
    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.synchronizer
    }

    pub fn unmount(self) {
        drop(self);
    }

    fn release(&mut self) {
        for (event, id) in self.subscriptions.drain(..) {
            self.source.unsubscribe(event, id);
        }
        self.synchronizer.tear_down();
    }
}

impl Drop for DashboardMount {
    fn drop(&mut self) {
        self.release();
    }
}
