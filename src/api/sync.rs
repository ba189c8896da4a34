use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Identifies one chart subscribed to a [`SyncContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChartId(u64);

impl ChartId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Cross-chart notifications. Times are epoch milliseconds so charts on
/// different timeframes agree on what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    VisibleRangeChanged { from_time: i64, to_time: i64 },
    CrosshairMoved { time: i64, price: f64 },
    CrosshairLeft,
}

impl SyncEvent {
    fn is_range(self) -> bool {
        matches!(self, SyncEvent::VisibleRangeChanged { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub sync_range: bool,
    pub sync_crosshair: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_range: true,
            sync_crosshair: true,
        }
    }
}

/// Workspace-scoped publish/subscribe hub for range and crosshair sync.
///
/// Each chart gets an inbox. Publishing delivers to every other subscriber;
/// charts drain their inbox when they next update, so a chart applying a
/// synced range never re-enters the publisher.
#[derive(Debug, Default)]
pub struct SyncContext {
    settings: SyncSettings,
    next_id: u64,
    inboxes: IndexMap<ChartId, Vec<SyncEvent>>,
}

impl SyncContext {
    #[must_use]
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: SyncSettings) {
        self.settings = settings;
    }

    pub fn subscribe(&mut self) -> ChartId {
        let id = ChartId(self.next_id);
        self.next_id += 1;
        self.inboxes.insert(id, Vec::new());
        id
    }

    /// Removes `chart` and drops its undelivered events.
    pub fn unsubscribe(&mut self, chart: ChartId) -> bool {
        self.inboxes.shift_remove(&chart).is_some()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inboxes.len()
    }

    /// Queues `event` for every subscriber except `from`. Returns the number
    /// of charts it was delivered to.
    pub fn publish(&mut self, from: ChartId, event: SyncEvent) -> usize {
        let enabled = if event.is_range() {
            self.settings.sync_range
        } else {
            self.settings.sync_crosshair
        };
        if !enabled || !self.inboxes.contains_key(&from) {
            return 0;
        }
        let mut delivered = 0;
        for (id, inbox) in &mut self.inboxes {
            if *id == from {
                continue;
            }
            // Only the newest range matters.
            if event.is_range() {
                inbox.retain(|queued| !queued.is_range());
            }
            inbox.push(event);
            delivered += 1;
        }
        trace!(from = from.value(), delivered, ?event, "sync event published");
        delivered
    }

    /// Takes the pending events of `chart`, oldest first.
    pub fn drain(&mut self, chart: ChartId) -> Vec<SyncEvent> {
        self.inboxes
            .get_mut(&chart)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{SyncContext, SyncEvent, SyncSettings};

    #[test]
    fn publisher_does_not_receive_its_own_event() {
        let mut sync = SyncContext::default();
        let a = sync.subscribe();
        let b = sync.subscribe();
        let delivered = sync.publish(a, SyncEvent::CrosshairLeft);
        assert_eq!(delivered, 1);
        assert!(sync.drain(a).is_empty());
        assert_eq!(sync.drain(b), vec![SyncEvent::CrosshairLeft]);
        assert!(sync.drain(b).is_empty());
    }

    #[test]
    fn range_events_collapse_to_latest() {
        let mut sync = SyncContext::default();
        let a = sync.subscribe();
        let b = sync.subscribe();
        sync.publish(a, SyncEvent::VisibleRangeChanged { from_time: 0, to_time: 10 });
        sync.publish(a, SyncEvent::CrosshairMoved { time: 5, price: 1.0 });
        sync.publish(a, SyncEvent::VisibleRangeChanged { from_time: 5, to_time: 15 });
        assert_eq!(
            sync.drain(b),
            vec![
                SyncEvent::CrosshairMoved { time: 5, price: 1.0 },
                SyncEvent::VisibleRangeChanged { from_time: 5, to_time: 15 },
            ]
        );
    }

    #[test]
    fn disabled_channel_is_not_delivered() {
        let mut sync = SyncContext::new(SyncSettings {
            sync_range: false,
            sync_crosshair: true,
        });
        let a = sync.subscribe();
        let _b = sync.subscribe();
        assert_eq!(
            sync.publish(a, SyncEvent::VisibleRangeChanged { from_time: 0, to_time: 1 }),
            0
        );
        assert!(sync.unsubscribe(a));
        assert_eq!(sync.publish(a, SyncEvent::CrosshairLeft), 0);
    }
}
