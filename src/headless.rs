//! Collaborators for running without a graphical map: a map surface that only
//! records markers and a side list rendered as text.

use crate::dlog;
use crate::surface::{FormFields, MapSurface, WorkoutUi};
use crate::types::{Coords, Workout};
use crate::utils::format_workout;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub coords: Coords,
    pub popup: String,
    pub style_class: String,
}

#[derive(Debug, Default)]
pub struct HeadlessMap {
    next_id: u64,
    markers: BTreeMap<MarkerId, PlacedMarker>,
    center: Option<Coords>,
    zoom: u8,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> impl Iterator<Item = &PlacedMarker> {
        self.markers.values()
    }

    pub const fn center(&self) -> Option<Coords> {
        self.center
    }

    pub const fn zoom(&self) -> u8 {
        self.zoom
    }
}

impl MapSurface for HeadlessMap {
    type Marker = MarkerId;

    fn set_view(&mut self, center: Coords, zoom: u8) {
        dlog!("map_set_view center={center} zoom={zoom}");
        self.center = Some(center);
        self.zoom = zoom;
    }

    fn add_marker(&mut self, coords: Coords, popup: &str, style_class: &str) -> MarkerId {
        self.next_id += 1;
        let id = MarkerId(self.next_id);
        dlog!("map_add_marker id={} coords={coords} popup={popup:?}", self.next_id);
        self.markers.insert(
            id,
            PlacedMarker {
                coords,
                popup: popup.to_string(),
                style_class: style_class.to_string(),
            },
        );
        id
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        if self.markers.remove(&marker).is_none() {
            tracing::warn!(marker = marker.0, "removing unknown marker");
        }
    }

    fn pan_to(&mut self, coords: Coords, animated: bool) {
        dlog!("map_pan_to coords={coords} animated={animated}");
        self.center = Some(coords);
    }
}

/// Keeps the side list as text lines and asks confirmations on stdin.
#[derive(Debug, Default)]
pub struct TerminalUi {
    entries: Vec<(String, String)>,
    form: Option<FormFields>,
    assume_yes: bool,
}

impl TerminalUi {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            ..Self::default()
        }
    }

    /// Rendered list lines, top to bottom.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, line)| line.as_str())
    }

    /// Fields of the open form, if any.
    pub const fn form(&self) -> Option<&FormFields> {
        self.form.as_ref()
    }
}

impl WorkoutUi for TerminalUi {
    fn show_form(&mut self, fields: &FormFields) {
        self.form = Some(fields.clone());
    }

    fn hide_form(&mut self) {
        self.form = None;
    }

    fn render_workout(&mut self, workout: &Workout) {
        let line = format_workout(workout);
        if let Some(pos) = self.entries.iter().position(|(id, _)| id == workout.id()) {
            self.entries[pos].1 = line;
        } else {
            self.entries.push((workout.id().to_string(), line));
        }
    }

    fn remove_workout(&mut self, id: &str) {
        self.entries.retain(|(eid, _)| eid != id);
    }

    fn clear_workouts(&mut self) {
        self.entries.clear();
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!("{prompt} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn list_replaces_in_place() {
        let date = Utc.with_ymd_and_hms(2024, 4, 14, 7, 0, 0).unwrap();
        let a = Workout::running("a", date, Coords::new(0.0, 0.0), 5.0, 25.0, 180).unwrap();
        let mut b = Workout::running("b", date, Coords::new(0.0, 0.0), 3.0, 20.0, 170).unwrap();

        let mut ui = TerminalUi::new(true);
        ui.render_workout(&a);
        ui.render_workout(&b);
        b.update(6.0, 20.0, b.activity()).unwrap();
        ui.render_workout(&b);

        let lines: Vec<&str> = ui.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a "));
        assert!(lines[1].contains("6 km"));

        ui.remove_workout("a");
        assert_eq!(ui.lines().count(), 1);
        assert!(ui.confirm("sure?"));
    }

    #[test]
    fn map_tracks_markers() {
        let mut map = HeadlessMap::new();
        map.set_view(Coords::new(0.5, 0.5), 13);
        assert_eq!(map.zoom(), 13);
        let m = map.add_marker(Coords::new(1.0, 2.0), "pop", "running-popup");
        assert_eq!(map.markers().count(), 1);
        map.remove_marker(m);
        assert_eq!(map.markers().count(), 0);
        map.pan_to(Coords::new(3.0, 4.0), true);
        assert_eq!(map.center(), Some(Coords::new(3.0, 4.0)));
    }
}
