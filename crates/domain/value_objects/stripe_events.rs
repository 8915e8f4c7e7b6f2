/// Result of trying to take ownership of an event in the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClaim {
    /// First sighting; the record was inserted unprocessed.
    Claimed,
    /// Seen before, never completed, and the previous claim's lease expired.
    Reclaimed { attempts: i32 },
    /// Already completed; nothing to do.
    AlreadyProcessed,
    /// Another delivery holds a live claim.
    InFlight,
}

impl EventClaim {
    pub fn should_process(&self) -> bool {
        matches!(self, EventClaim::Claimed | EventClaim::Reclaimed { .. })
    }
}
