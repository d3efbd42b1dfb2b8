extern crate self as chronicle;

#[path = "../common.rs"]
mod support;

pub use support::{command, event};

use chrono::{DateTime, TimeZone, Utc};
use chronicle_macros::Event;
use event::{DomainEvent, Event as _};

#[derive(Debug, Event)]
pub struct ItemAdded {
    id: String,
    version: u64,
    at: DateTime<Utc>,
    sku: String,
}

#[derive(Debug, Event)]
pub struct ItemRemoved {
    aggregate_id: String,
    version: u64,
    occurred_at: DateTime<Utc>,
}

fn main() {
    let at = Utc.timestamp_opt(10, 0).unwrap();
    let added = ItemAdded {
        id: "cart-1".to_string(),
        version: 3,
        at,
        sku: "SKU-1".to_string(),
    };
    assert_eq!(added.aggregate_id(), "cart-1");
    assert_eq!(added.event_version(), 3);
    assert_eq!(added.event_at(), at);
    assert_eq!(added.sku, "SKU-1");
    assert_eq!(ItemAdded::type_tag(), "ItemAdded");

    let removed = ItemRemoved {
        aggregate_id: "cart-1".to_string(),
        version: 4,
        occurred_at: at,
    };
    assert_eq!(removed.aggregate_id(), "cart-1");
    assert_eq!(removed.event_version(), 4);
}
