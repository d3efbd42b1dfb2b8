extern crate self as chronicle;

#[path = "../common.rs"]
mod support;

pub use support::{command, event};

use chrono::{TimeZone, Utc};
use chronicle_macros::Event;
use event::{DomainEvent, Event as _, EventModel};

#[derive(Debug, Event)]
#[event(type_tag = "order.shipped")]
pub struct OrderShipped {
    #[event(model)]
    model: EventModel,
    carrier: String,
}

#[derive(Debug, Event)]
pub struct OrderRenamed {
    #[event(model)]
    model: EventModel,
    // Marked fields win over the model.
    #[event(version)]
    revision: u64,
}

fn main() {
    let model = EventModel {
        id: "order-1".to_string(),
        version: 2,
        at: Utc.timestamp_opt(20, 0).unwrap(),
    };
    let shipped = OrderShipped {
        model: model.clone(),
        carrier: "post".to_string(),
    };
    assert_eq!(OrderShipped::type_tag(), "order.shipped");
    assert_eq!(shipped.aggregate_id(), "order-1");
    assert_eq!(shipped.event_version(), 2);
    assert_eq!(shipped.event_at(), model.at);
    assert_eq!(shipped.carrier, "post");

    let renamed = OrderRenamed { model, revision: 9 };
    assert_eq!(renamed.event_version(), 9);
    assert_eq!(renamed.aggregate_id(), "order-1");
}
