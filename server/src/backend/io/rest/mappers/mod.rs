pub mod event_mapper;
pub mod notification_mapper;
