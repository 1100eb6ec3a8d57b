//! Orchestrates user intents against the store, the marker registry and the
//! durable slot, keeping the three in step.
//!
//! Every mutating path runs validate, then store, then markers, then
//! persistence, so a failure in an early step leaves nothing half applied.

use crate::dlog;
use crate::error::{Error, Result};
use crate::markers::MarkerRegistry;
use crate::persistence::{DurableSlot, PersistenceGateway};
use crate::store::{SortCriterion, WorkoutStore};
use crate::surface::{DEFAULT_ZOOM, FormFields, MapSurface, WorkoutUi};
use crate::types::{Activity, Coords, Workout, WorkoutKind};
use chrono::{DateTime, Utc};

const INVALID_INPUT_MESSAGE: &str = "Inputs have to be positive numbers!";
const CONFIRM_PROMPT: &str = "Are you sure?";

/// What the next form submission will do.
#[derive(Debug, Clone, PartialEq)]
pub enum FormIntent {
    Idle,
    /// Armed by a click on the map.
    AwaitingNew { coords: Coords },
    /// Armed by the edit button of a list entry.
    AwaitingEdit { id: String },
}

/// Raw numbers read from the form.
///
/// `metric` is the cadence for running and the elevation gain for cycling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submission {
    pub kind: WorkoutKind,
    pub distance: f64,
    pub duration: f64,
    pub metric: f64,
}

impl Submission {
    pub const fn new(kind: WorkoutKind, distance: f64, duration: f64, metric: f64) -> Self {
        Self {
            kind,
            distance,
            duration,
            metric,
        }
    }

    /// Builds a submission from form text. Text that is not a number becomes
    /// NaN and fails validation later.
    pub fn from_form(kind: &str, distance: &str, duration: &str, metric: &str) -> Result<Self> {
        let num = |s: &str| s.trim().parse::<f64>().unwrap_or(f64::NAN);
        Ok(Self {
            kind: kind.parse()?,
            distance: num(distance),
            duration: num(duration),
            metric: num(metric),
        })
    }

    /// Checks every number and returns the kind-specific payload.
    pub fn validate(&self) -> Result<Activity> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.distance) || !positive(self.duration) {
            return Err(Error::InvalidInput(INVALID_INPUT_MESSAGE.to_string()));
        }

        match self.kind {
            WorkoutKind::Running => {
                let c = self.metric;
                if !positive(c) || c.fract() != 0.0 || c > f64::from(u32::MAX) {
                    return Err(Error::InvalidInput(
                        "Cadence has to be a positive whole number!".to_string(),
                    ));
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let cadence = c as u32;
                Ok(Activity::Running { cadence })
            }
            WorkoutKind::Cycling => {
                if !self.metric.is_finite() {
                    return Err(Error::InvalidInput("Elevation has to be a number!".to_string()));
                }
                Ok(Activity::Cycling {
                    elevation_gain: self.metric,
                })
            }
        }
    }
}

/// A typed user intent raised by the UI or the map.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    MapClicked(Coords),
    Edit(String),
    Submit(Submission),
    Cancel,
    Delete(String),
    DeleteAll,
    Sort(SortCriterion),
    Focus(String),
}

type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Owns the workouts, their markers and the form intent for the lifetime of
/// the app. State is only reset through delete-all.
pub struct WorkoutController<M: MapSurface, U, S> {
    store: WorkoutStore,
    markers: MarkerRegistry<M::Marker>,
    gateway: PersistenceGateway<S>,
    map: Option<M>,
    ui: U,
    intent: FormIntent,
    zoom: u8,
    clock: Clock,
}

impl<M, U, S> WorkoutController<M, U, S>
where
    M: MapSurface,
    U: WorkoutUi,
    S: DurableSlot,
{
    /// Loads saved workouts and renders them. The map is attached later via
    /// [`Self::map_ready`].
    pub fn new(gateway: PersistenceGateway<S>, ui: U) -> Result<Self> {
        let mut this = Self {
            store: WorkoutStore::new(),
            markers: MarkerRegistry::new(),
            gateway,
            map: None,
            ui,
            intent: FormIntent::Idle,
            zoom: DEFAULT_ZOOM,
            clock: Box::new(Utc::now),
        };
        this.reload()?;
        Ok(this)
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    pub const fn store(&self) -> &WorkoutStore {
        &self.store
    }

    pub const fn markers(&self) -> &MarkerRegistry<M::Marker> {
        &self.markers
    }

    pub const fn map(&self) -> Option<&M> {
        self.map.as_ref()
    }

    pub const fn ui(&self) -> &U {
        &self.ui
    }

    pub const fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub const fn intent(&self) -> &FormIntent {
        &self.intent
    }

    pub const fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    /// Handles one intent, recovering locally from errors the user can act on.
    /// Only storage failures reach the caller.
    pub fn dispatch(&mut self, intent: Intent) -> Result<()> {
        dlog!("dispatch intent={intent:?} state={:?}", self.intent);
        let res = match intent {
            Intent::MapClicked(coords) => {
                self.map_clicked(coords);
                Ok(())
            }
            Intent::Edit(id) => self.edit_clicked(&id),
            Intent::Submit(sub) => self.submit(sub),
            Intent::Cancel => {
                self.cancel();
                Ok(())
            }
            Intent::Delete(id) => self.delete_clicked(&id).map(drop),
            Intent::DeleteAll => self.delete_all_clicked().map(drop),
            Intent::Sort(criterion) => {
                self.sort_clicked(criterion);
                Ok(())
            }
            Intent::Focus(id) => self.focus(&id),
        };

        match res {
            Err(e) if e.is_recoverable() => {
                self.recover(&e);
                Ok(())
            }
            other => other,
        }
    }

    fn recover(&mut self, e: &Error) {
        match e {
            Error::InvalidInput(msg) => {
                tracing::warn!(err = %e, "rejected submission");
                self.ui.notify(msg);
            }
            Error::NotFound(_) => tracing::warn!(err = %e, "intent aborted"),
            _ => {
                tracing::warn!(err = %e, "intent failed");
                self.ui.notify(&e.to_string());
            }
        }
    }

    /// The map finished loading: center it and draw a marker per workout.
    pub fn map_ready(&mut self, mut map: M, position: Coords) {
        if let Some(mut old) = self.map.take() {
            self.markers.clear_all(&mut old);
        }
        map.set_view(position, self.zoom);
        for w in &self.store {
            show_marker(&mut map, &mut self.markers, w);
        }
        tracing::info!(%position, markers = self.markers.len(), "map ready");
        self.map = Some(map);
    }

    /// The current position could not be determined; list operations keep working.
    pub fn geolocation_failed(&mut self) {
        let e = Error::GeolocationUnavailable;
        tracing::warn!(err = %e, "map not loaded");
        self.ui.notify(&e.to_string());
    }

    /// Opens a blank form for a workout at `coords`. A pending edit is
    /// dropped: the click replaces whatever the form was waiting for.
    pub fn map_clicked(&mut self, coords: Coords) {
        if let FormIntent::AwaitingEdit { id } = &self.intent {
            dlog!("form_edit_replaced id={id} coords={coords}");
        }
        dlog!("form_open_new coords={coords}");
        self.intent = FormIntent::AwaitingNew { coords };
        self.ui.show_form(&FormFields::blank());
    }

    pub fn edit_clicked(&mut self, id: &str) -> Result<()> {
        let fields = FormFields::from(self.store.find_by_id(id)?);
        dlog!("form_open_edit id={id}");
        self.intent = FormIntent::AwaitingEdit { id: id.to_string() };
        self.ui.show_form(&fields);
        Ok(())
    }

    pub fn submit(&mut self, sub: Submission) -> Result<()> {
        match self.intent.clone() {
            FormIntent::Idle => Err(Error::NoActiveForm),
            FormIntent::AwaitingNew { coords } => self.create(coords, sub),
            FormIntent::AwaitingEdit { id } => self.edit(&id, sub),
        }
    }

    fn create(&mut self, coords: Coords, sub: Submission) -> Result<()> {
        let activity = sub.validate()?;
        let (id, date) = self.next_identity();
        let workout = Workout::new(id.clone(), date, coords, sub.distance, sub.duration, activity)?;
        self.store.add(workout);

        let workout = self.store.find_by_id(&id)?;
        if let Some(map) = self.map.as_mut() {
            show_marker(map, &mut self.markers, workout);
        }
        self.ui.render_workout(workout);

        if let Err(e) = self.persist() {
            tracing::error!(id = %id, err = %e, "save failed, dropping new workout");
            self.store.remove_by_id(&id)?;
            if let Some(map) = self.map.as_mut() {
                self.markers.detach(&id, map);
            }
            self.ui.remove_workout(&id);
            return Err(e);
        }
        tracing::info!(id = %id, kind = %sub.kind, "workout created");
        self.close_form();
        Ok(())
    }

    fn edit(&mut self, id: &str, sub: Submission) -> Result<()> {
        let activity = sub.validate()?;

        let original = match self.store.find_by_id(id) {
            Ok(w) => w.clone(),
            Err(e) => {
                self.close_form();
                return Err(e);
            }
        };
        let mut workout = original.clone();
        workout.update(sub.distance, sub.duration, activity)?;
        self.store.replace(workout)?;
        self.redraw(id)?;

        if let Err(e) = self.persist() {
            tracing::error!(id = %id, err = %e, "save failed, reverting edit");
            self.store.replace(original)?;
            self.redraw(id)?;
            return Err(e);
        }
        tracing::info!(id = %id, kind = %sub.kind, "workout edited");
        self.close_form();
        Ok(())
    }

    /// Swaps the marker and list row of `id` for its current store entry.
    fn redraw(&mut self, id: &str) -> Result<()> {
        let workout = self.store.find_by_id(id)?;
        if let Some(map) = self.map.as_mut() {
            self.markers.detach(id, map);
            show_marker(map, &mut self.markers, workout);
        }
        self.ui.render_workout(workout);
        Ok(())
    }

    /// Dismisses the form without submitting.
    pub fn cancel(&mut self) {
        dlog!("form_cancel state={:?}", self.intent);
        self.close_form();
    }

    /// Returns `false` if the user did not confirm.
    pub fn delete_clicked(&mut self, id: &str) -> Result<bool> {
        self.store.find_by_id(id)?;
        if !self.ui.confirm(CONFIRM_PROMPT) {
            dlog!("delete_declined id={id}");
            return Ok(false);
        }

        let pos = self.store.position(id).unwrap_or(self.store.len());
        let removed = self.store.remove_by_id(id)?;
        if let Some(map) = self.map.as_mut() {
            self.markers.detach(id, map);
        }
        self.ui.remove_workout(id);

        if let Err(e) = self.persist() {
            tracing::error!(id = %id, err = %e, "save failed, restoring workout");
            if let Some(map) = self.map.as_mut() {
                show_marker(map, &mut self.markers, &removed);
            }
            self.store.insert(pos, removed);
            self.render_list();
            return Err(e);
        }
        tracing::info!(id = %id, "workout deleted");
        Ok(true)
    }

    /// Wipes every workout and the durable slot, then reloads from the now
    /// empty slot. Returns `false` if the user did not confirm.
    pub fn delete_all_clicked(&mut self) -> Result<bool> {
        if !self.ui.confirm(CONFIRM_PROMPT) {
            dlog!("delete_all_declined");
            return Ok(false);
        }

        let n = self.store.len();
        self.gateway.clear()?;
        self.store.clear();
        self.close_form();
        self.reload()?;
        tracing::info!(deleted = n, "all workouts deleted");
        Ok(true)
    }

    /// Reorders the side list. Markers are unaffected.
    pub fn sort_clicked(&mut self, criterion: SortCriterion) -> bool {
        let sorted = self.store.sort_by(|a, b| criterion.compare(a, b));
        dlog!("sort criterion={criterion} sorted={sorted}");
        self.render_list();
        sorted
    }

    /// Pans the map to a workout and counts the click.
    pub fn focus(&mut self, id: &str) -> Result<()> {
        let workout = self.store.find_by_id_mut(id)?;
        workout.record_click();
        let coords = workout.coords();
        dlog!("focus id={id} clicks={}", workout.clicks());

        if let Some(map) = self.map.as_mut() {
            map.pan_to(coords, true);
        }
        Ok(())
    }

    /// Rebuilds the store, the list and the markers from the durable slot.
    pub fn reload(&mut self) -> Result<()> {
        let workouts = match self.gateway.load() {
            Ok(ws) => ws,
            Err(e @ Error::CorruptRecord(_)) => {
                tracing::warn!(err = %e, "discarding unreadable saved workouts");
                self.ui.notify(&e.to_string());
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        match self.map.as_mut() {
            Some(map) => self.markers.clear_all(map),
            None => self.markers.forget_all(),
        }
        self.store = WorkoutStore::from_workouts(workouts);
        if let Some(map) = self.map.as_mut() {
            for w in &self.store {
                show_marker(map, &mut self.markers, w);
            }
        }
        self.render_list();
        Ok(())
    }

    fn render_list(&mut self) {
        self.ui.clear_workouts();
        for w in &self.store {
            self.ui.render_workout(w);
        }
    }

    fn close_form(&mut self) {
        self.intent = FormIntent::Idle;
        self.ui.hide_form();
    }

    fn persist(&mut self) -> Result<()> {
        self.gateway.save(self.store.as_slice())
    }

    /// Id and date for a new workout. The id is the last ten digits of the
    /// creation time in ms; the time is bumped until both are unique.
    fn next_identity(&self) -> (String, DateTime<Utc>) {
        let one_ms = chrono::Duration::milliseconds(1);
        let mut date = (self.clock)();

        if let Some(last) = self.store.iter().map(Workout::created_at).max() {
            let behind = last - date.timestamp_millis();
            if behind >= 0 {
                date += chrono::Duration::milliseconds(behind + 1);
            }
        }

        loop {
            let id = id_from_millis(date.timestamp_millis());
            if !self.store.contains(&id) {
                return (id, date);
            }
            date += one_ms;
        }
    }
}

fn show_marker<M: MapSurface>(map: &mut M, markers: &mut MarkerRegistry<M::Marker>, w: &Workout) {
    let marker = map.add_marker(w.coords(), &w.popup_content(), w.kind().popup_class());
    markers.attach(w.id(), marker);
}

fn id_from_millis(ms: i64) -> String {
    let s = ms.to_string();
    s[s.len().saturating_sub(10)..].to_string()
}
