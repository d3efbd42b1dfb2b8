//! A small order lifecycle showing commands, events, observers and
//! point-in-time loads.
//!
//! Run with: `cargo run --example shopping`
//! Set `RUST_LOG=chronicle_core=debug` to see the repository's tracing output.

// ANCHOR: full_example
use chrono::Utc;
use chronicle::{
    Aggregate, Command, Event, EventModel, Handle, JsonSerializer, Repository, store::inmemory,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// ANCHOR: events
#[derive(Clone, Debug, Serialize, Deserialize, Event)]
#[event(type_tag = "order.created")]
pub struct OrderCreated {
    #[serde(flatten)]
    #[event(model)]
    pub model: EventModel,
    pub customer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Event)]
#[event(type_tag = "order.item_added")]
pub struct ItemAdded {
    #[serde(flatten)]
    #[event(model)]
    pub model: EventModel,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Event)]
#[event(type_tag = "order.shipped")]
pub struct OrderShipped {
    #[serde(flatten)]
    #[event(model)]
    pub model: EventModel,
}
// ANCHOR_END: events

// ANCHOR: commands
#[derive(Debug, Command)]
pub struct CreateOrder {
    pub id: String,
    pub customer: String,
}

#[derive(Debug, Command)]
pub struct AddItem {
    pub id: String,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Debug, Command)]
pub struct ShipOrder {
    pub id: String,
}
// ANCHOR_END: commands

// ANCHOR: aggregate
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order already exists")]
    AlreadyCreated,
    #[error("order does not exist")]
    NotCreated,
    #[error("order already shipped")]
    AlreadyShipped,
    #[error("cannot ship an empty order")]
    Empty,
}

#[derive(Debug, Default)]
pub struct Order {
    version: u64,
    customer: Option<String>,
    items: u32,
    shipped: bool,
}

impl Order {
    fn next(&self, id: &str) -> EventModel {
        EventModel::new(id, self.version + 1, Utc::now())
    }
}

impl Aggregate for Order {
    type Error = OrderError;

    fn on(&mut self, event: &dyn Event) -> Result<(), Self::Error> {
        if let Some(e) = event.downcast_ref::<OrderCreated>() {
            self.customer = Some(e.customer.clone());
        } else if let Some(e) = event.downcast_ref::<ItemAdded>() {
            self.items += e.quantity;
        } else if event.is::<OrderShipped>() {
            self.shipped = true;
        }
        self.version = event.event_version();
        Ok(())
    }
}

impl Handle<CreateOrder> for Order {
    fn handle(&self, cmd: &CreateOrder) -> Result<Vec<Box<dyn Event>>, Self::Error> {
        if self.customer.is_some() {
            return Err(OrderError::AlreadyCreated);
        }
        Ok(vec![Box::new(OrderCreated {
            model: self.next(&cmd.id),
            customer: cmd.customer.clone(),
        })])
    }
}

impl Handle<AddItem> for Order {
    fn handle(&self, cmd: &AddItem) -> Result<Vec<Box<dyn Event>>, Self::Error> {
        if self.customer.is_none() {
            return Err(OrderError::NotCreated);
        }
        if self.shipped {
            return Err(OrderError::AlreadyShipped);
        }
        Ok(vec![Box::new(ItemAdded {
            model: self.next(&cmd.id),
            sku: cmd.sku.clone(),
            quantity: cmd.quantity,
        })])
    }
}

impl Handle<ShipOrder> for Order {
    fn handle(&self, cmd: &ShipOrder) -> Result<Vec<Box<dyn Event>>, Self::Error> {
        if self.shipped {
            return Err(OrderError::AlreadyShipped);
        }
        if self.items == 0 {
            return Err(OrderError::Empty);
        }
        Ok(vec![Box::new(OrderShipped {
            model: self.next(&cmd.id),
        })])
    }
}
// ANCHOR_END: aggregate

// ANCHOR: main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let serializer = JsonSerializer::new();
    serializer
        .bind::<OrderCreated>()
        .bind::<ItemAdded>()
        .bind::<OrderShipped>();

    let repository: Repository<Order, _> = Repository::new(inmemory::Store::new(), serializer)
        .with_observer(|event| {
            tracing::info!(
                aggregate_id = event.aggregate_id(),
                version = event.event_version(),
                "published {}",
                event.event_type()
            );
        });

    let id = "ORD-001".to_string();
    repository
        .apply(&CreateOrder {
            id: id.clone(),
            customer: "ada".to_string(),
        })
        .await?;
    repository
        .apply(&AddItem {
            id: id.clone(),
            sku: "keyboard".to_string(),
            quantity: 1,
        })
        .await?;
    repository
        .apply(&AddItem {
            id: id.clone(),
            sku: "cable".to_string(),
            quantity: 2,
        })
        .await?;
    let version = repository.apply(&ShipOrder { id: id.clone() }).await?;
    println!("Order {id} shipped at version {version}");

    // Shipping twice is rejected by the aggregate.
    if let Err(err) = repository.apply(&ShipOrder { id: id.clone() }).await {
        println!("Second shipment rejected: {err}");
    }

    let order = repository.load(&id).await?;
    println!("Current state: {order:?}");

    let before_shipping = repository.load_version(&id, 3).await?;
    println!("At version 3: {before_shipping:?}");
    assert_eq!(before_shipping.items, 3);
    assert!(!before_shipping.shipped);

    Ok(())
}
// ANCHOR_END: main
// ANCHOR_END: full_example
