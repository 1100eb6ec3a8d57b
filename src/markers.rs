use crate::dlog;
use crate::surface::MapSurface;

/// Associates workout ids with the markers drawn for them.
#[derive(Debug)]
pub struct MarkerRegistry<H> {
    markers: Vec<(String, H)>,
}

impl<H> Default for MarkerRegistry<H> {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
        }
    }
}

impl<H> MarkerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `marker` as the marker of `workout_id`. One marker per workout
    /// is the caller's responsibility.
    pub fn attach(&mut self, workout_id: impl Into<String>, marker: H) {
        let workout_id = workout_id.into();
        dlog!("marker_attach workout_id={workout_id}");
        self.markers.push((workout_id, marker));
    }

    /// Removes the marker of `workout_id` from `map`. Returns whether there was one.
    pub fn detach<M>(&mut self, workout_id: &str, map: &mut M) -> bool
    where
        M: MapSurface<Marker = H>,
    {
        let before = self.markers.len();
        let mut kept = Vec::with_capacity(before);
        for (id, marker) in self.markers.drain(..) {
            if id == workout_id {
                map.remove_marker(marker);
            } else {
                kept.push((id, marker));
            }
        }
        self.markers = kept;

        let removed = self.markers.len() != before;
        dlog!("marker_detach workout_id={workout_id} removed={removed}");
        removed
    }

    pub fn clear_all<M>(&mut self, map: &mut M)
    where
        M: MapSurface<Marker = H>,
    {
        let n = self.markers.len();
        for (_, marker) in self.markers.drain(..) {
            map.remove_marker(marker);
        }
        dlog!("marker_clear_all removed={n}");
    }

    /// Forgets every association without touching a map.
    pub fn forget_all(&mut self) {
        self.markers.clear();
    }

    pub fn get(&self, workout_id: &str) -> Option<&H> {
        self.markers
            .iter()
            .find(|(id, _)| id == workout_id)
            .map(|(_, m)| m)
    }

    pub fn contains(&self, workout_id: &str) -> bool {
        self.get(workout_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
