pub mod actions;
pub mod camera_streams;
pub mod cameras;
pub mod device_models;
pub mod devices;
