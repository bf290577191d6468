//! Application layer - Use cases and business workflows

pub mod action_engine;
pub mod camera_manager;
pub mod ingress;
pub mod storage_manager;
pub mod worker_pool;

pub use action_engine::ActionEngine;
pub use camera_manager::CameraManager;
pub use ingress::MqttIngress;
pub use storage_manager::StorageManager;
pub use worker_pool::{spawn_consumer, BoundedQueue, QueueItem};
