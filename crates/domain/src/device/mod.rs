mod entity;
mod repository;

pub use entity::{
    Comparator, DeviceStatus, TimeUnit, TopicCommandEntry, TopicEntry, TopicSchema,
    TopicValueType,
};
pub use entity::{Device, DeviceModel};
pub use repository::{DeviceModelRepository, DeviceRepository};
