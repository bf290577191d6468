pub mod composite_publisher;
pub mod mqtt_client;
pub mod mqtt_publisher;

pub use composite_publisher::CompositeEventPublisher;
