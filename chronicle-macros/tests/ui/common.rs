// Re-export at root for macro-generated code
pub mod event {
    pub type Timestamp = chrono::DateTime<chrono::Utc>;

    pub trait DomainEvent {
        fn type_tag() -> &'static str {
            let full = std::any::type_name::<Self>();
            full.rsplit("::").next().unwrap_or(full)
        }
    }

    pub trait Event {
        fn aggregate_id(&self) -> &str;

        fn event_version(&self) -> u64;

        fn event_at(&self) -> Timestamp;
    }

    #[derive(Clone, Debug)]
    pub struct EventModel {
        pub id: String,
        pub version: u64,
        pub at: Timestamp,
    }

    impl EventModel {
        pub fn aggregate_id(&self) -> &str {
            &self.id
        }

        pub fn event_version(&self) -> u64 {
            self.version
        }

        pub fn event_at(&self) -> Timestamp {
            self.at
        }
    }
}

pub mod command {
    pub trait Command {
        fn aggregate_id(&self) -> &str;
    }

    #[derive(Clone, Debug, Default)]
    pub struct CommandModel {
        pub id: String,
    }

    impl Command for CommandModel {
        fn aggregate_id(&self) -> &str {
            &self.id
        }
    }
}
