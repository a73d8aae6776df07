//! Domain-level command types.
//! The REST layer maps the public DTOs from the `shared` crate to these.

pub mod events {
    #[derive(Debug, Clone)]
    pub struct CreateEventCommand {
        pub client_name: String,
        pub phones: Vec<String>,
        pub amount: f64,
        pub amount_money: bool,
        pub comment: Option<String>,
    }
}

pub mod advance {
    use shared::ChangeType;

    /// Input for applying one advance movement
    #[derive(Debug, Clone)]
    pub struct UpdateAdvanceCommand {
        pub event_id: i64,
        pub amount: f64,
        pub change_type: ChangeType,
        pub advance_money: bool,
        pub expected_version: Option<i64>,
        pub idempotency_key: Option<String>,
    }
}

pub mod notifications {
    #[derive(Debug, Clone)]
    pub struct SendNotificationCommand {
        pub event_id: i64,
        pub phone: String,
    }
}
