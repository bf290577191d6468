//! Domain layer - Pure business logic with no external dependencies
//!
//! This crate contains:
//! - Entities (Device, DeviceModel, Action, Camera)
//! - Value objects (ActionState, StorageBackendKind, TopicSchema)
//! - Domain events
//! - Repository interfaces (traits)
//!
//! Principles:
//! - No dependencies on infrastructure, no async runtime
//! - Business rules enforced at domain level
//! - Rich domain models with behavior
//! - Testable in isolation

pub mod action;
pub mod camera;
pub mod device;
pub mod error;
pub mod event;
pub mod storage;

pub use action::{Action, ActionChain, ActionRepository, ActionRuntime, ActionState};
pub use camera::{Camera, CameraRepository};
pub use device::{Device, DeviceModel, DeviceRepository, DeviceStatus};
pub use error::DomainError;
pub use event::{DomainEvent, EventPublisher};
pub use storage::{StorageBackendKind, StorageFolder};
