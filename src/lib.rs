//! Running and cycling workouts pinned to map coordinates, kept in step with
//! map markers and a durable local record.

pub mod cli;
pub mod controller;
pub mod error;
pub mod headless;
pub mod markers;
pub mod persistence;
pub mod store;
pub mod surface;
pub mod types;
pub mod utils;

pub use controller::{FormIntent, Intent, Submission, WorkoutController};
pub use error::{Error, Result};
pub use markers::MarkerRegistry;
pub use persistence::{DurableSlot, MemorySlot, PersistenceGateway, SqliteSlot};
pub use store::{SortCriterion, WorkoutStore};
pub use surface::{FormFields, MapSurface, WorkoutUi};
pub use types::{Activity, Coords, Workout, WorkoutKind};
