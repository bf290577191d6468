mod entity;
mod repository;

pub use entity::{Camera, CameraStream, ImageSource, StreamKind};
pub use repository::CameraRepository;
