//! Capabilities the controller consumes from its surroundings: the map that
//! draws markers and the form/list UI.

use crate::types::{Activity, Coords, Workout, WorkoutKind};

/// Value of the form's id field when the form creates a new workout.
pub const NEW_WORKOUT_ID: &str = "0";

/// Default zoom used when centering the map.
pub const DEFAULT_ZOOM: u8 = 13;

/// A map that can show workout markers.
pub trait MapSurface {
    /// Handle for a marker drawn on this surface.
    type Marker;

    fn set_view(&mut self, center: Coords, zoom: u8);
    fn add_marker(&mut self, coords: Coords, popup: &str, style_class: &str) -> Self::Marker;
    fn remove_marker(&mut self, marker: Self::Marker);
    fn pan_to(&mut self, coords: Coords, animated: bool);
}

/// The form and the side list of workouts.
pub trait WorkoutUi {
    fn show_form(&mut self, fields: &FormFields);
    fn hide_form(&mut self);

    /// Shows `workout` in the list, replacing the entry with the same id or
    /// appending a new one.
    fn render_workout(&mut self, workout: &Workout);
    fn remove_workout(&mut self, id: &str);
    fn clear_workouts(&mut self);

    fn confirm(&mut self, prompt: &str) -> bool;
    fn notify(&mut self, message: &str);
}

/// Values the form is populated with when it is revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct FormFields {
    pub id: String,
    pub kind: WorkoutKind,
    pub distance: Option<f64>,
    pub duration: Option<f64>,
    pub cadence: Option<u32>,
    pub elevation_gain: Option<f64>,
}

impl FormFields {
    /// Empty fields for a new workout.
    pub fn blank() -> Self {
        Self {
            id: NEW_WORKOUT_ID.to_string(),
            kind: WorkoutKind::Running,
            distance: None,
            duration: None,
            cadence: None,
            elevation_gain: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == NEW_WORKOUT_ID
    }
}

impl From<&Workout> for FormFields {
    fn from(w: &Workout) -> Self {
        let (cadence, elevation_gain) = match w.activity() {
            Activity::Running { cadence } => (Some(cadence), None),
            Activity::Cycling { elevation_gain } => (None, Some(elevation_gain)),
        };
        Self {
            id: w.id().to_string(),
            kind: w.kind(),
            distance: Some(w.distance()),
            duration: Some(w.duration()),
            cadence,
            elevation_gain,
        }
    }
}
