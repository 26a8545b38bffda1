//! Provider event kinds.

/// Event kinds the relay processes.
///
/// Parsing is total: an unrecognized event-type string yields `None`, so a
/// newly enabled provider event is an explicit decision at the dispatch
/// site rather than a silently dropped string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `customer.subscription.created`
    SubscriptionCreated,
    /// `customer.subscription.updated`
    SubscriptionUpdated,
    /// `customer.subscription.deleted`
    SubscriptionDeleted,
    /// `invoice.paid`
    InvoicePaid,
}

impl EventKind {
    /// Every kind the relay handles.
    pub const ALL: [Self; 4] = [
        Self::SubscriptionCreated,
        Self::SubscriptionUpdated,
        Self::SubscriptionDeleted,
        Self::InvoicePaid,
    ];

    /// Parse a provider event-type string.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "customer.subscription.created" => Some(Self::SubscriptionCreated),
            "customer.subscription.updated" => Some(Self::SubscriptionUpdated),
            "customer.subscription.deleted" => Some(Self::SubscriptionDeleted),
            "invoice.paid" => Some(Self::InvoicePaid),
            _ => None,
        }
    }

    /// The provider's wire name for this kind.
    #[must_use]
    pub const fn as_event_type(self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaid => "invoice.paid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_event_type(kind.as_event_type()), Some(kind));
        }
    }

    #[test]
    fn unknown_event_types_parse_to_none() {
        assert_eq!(EventKind::from_event_type("charge.refunded"), None);
        assert_eq!(EventKind::from_event_type(""), None);
    }
}
