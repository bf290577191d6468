pub mod action_repository;
pub mod camera_repository;
pub mod device_repository;
pub mod entities;

pub use action_repository::SeaOrmActionRepository;
pub use camera_repository::SeaOrmCameraRepository;
pub use device_repository::{SeaOrmDeviceModelRepository, SeaOrmDeviceRepository};
