extern crate self as chronicle;

#[path = "../common.rs"]
mod support;

pub use support::{command, event};

use chronicle_macros::Command;
use command::{Command as _, CommandModel};

#[derive(Debug, Command)]
pub struct CreateOrder {
    id: String,
}

#[derive(Debug, Command)]
pub struct ShipOrder {
    #[command(id)]
    order_id: String,
    carrier: String,
}

#[derive(Debug, Command)]
pub struct CancelOrder {
    #[command(model)]
    model: CommandModel,
}

fn main() {
    let create = CreateOrder {
        id: "order-1".to_string(),
    };
    assert_eq!(create.aggregate_id(), "order-1");

    let ship = ShipOrder {
        order_id: "order-2".to_string(),
        carrier: "post".to_string(),
    };
    assert_eq!(ship.aggregate_id(), "order-2");
    assert_eq!(ship.carrier, "post");

    let cancel = CancelOrder {
        model: CommandModel {
            id: "order-3".to_string(),
        },
    };
    assert_eq!(cancel.aggregate_id(), "order-3");
}
