extern crate self as chronicle;

#[path = "../common.rs"]
mod support;

pub use support::{command, event};

use chrono::{DateTime, Utc};
use chronicle_macros::Event;
use event::Event as _;

#[derive(Debug, Event)]
pub struct Tagged<T: Clone + 'static> {
    #[event(id)]
    stream: String,
    version: u64,
    at: DateTime<Utc>,
    payload: T,
}

fn main() {
    let event = Tagged {
        stream: "s".to_string(),
        version: 1,
        at: Utc::now(),
        payload: 5_u8,
    };
    assert_eq!(event.aggregate_id(), "s");
    assert_eq!(event.event_version(), 1);
    assert_eq!(event.payload, 5);
}
