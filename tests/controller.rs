use chrono::{DateTime, TimeZone, Utc};
use mapty::persistence::WORKOUTS_KEY;
use mapty::{
    Coords, DurableSlot, Error, FormFields, FormIntent, Intent, MapSurface, MemorySlot,
    PersistenceGateway, SortCriterion, Submission, Workout, WorkoutController, WorkoutKind,
    WorkoutUi,
};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct FakeMap {
    next: u32,
    live: Vec<(u32, Coords, String)>,
    removed: Vec<u32>,
    pans: Vec<Coords>,
    view: Option<(Coords, u8)>,
}

impl MapSurface for FakeMap {
    type Marker = u32;

    fn set_view(&mut self, center: Coords, zoom: u8) {
        self.view = Some((center, zoom));
    }

    fn add_marker(&mut self, coords: Coords, popup: &str, _style_class: &str) -> u32 {
        self.next += 1;
        self.live.push((self.next, coords, popup.to_string()));
        self.next
    }

    fn remove_marker(&mut self, marker: u32) {
        self.live.retain(|(m, _, _)| *m != marker);
        self.removed.push(marker);
    }

    fn pan_to(&mut self, coords: Coords, _animated: bool) {
        self.pans.push(coords);
    }
}

#[derive(Debug, Default)]
struct FakeUi {
    form: Option<FormFields>,
    list: Vec<String>,
    answer: bool,
    notices: Vec<String>,
}

impl WorkoutUi for FakeUi {
    fn show_form(&mut self, fields: &FormFields) {
        self.form = Some(fields.clone());
    }

    fn hide_form(&mut self) {
        self.form = None;
    }

    fn render_workout(&mut self, workout: &Workout) {
        if !self.list.iter().any(|id| id == workout.id()) {
            self.list.push(workout.id().to_string());
        }
    }

    fn remove_workout(&mut self, id: &str) {
        self.list.retain(|x| x != id);
    }

    fn clear_workouts(&mut self) {
        self.list.clear();
    }

    fn confirm(&mut self, _prompt: &str) -> bool {
        self.answer
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

/// Memory slot whose writes fail while `broken` is set, like a full disk.
#[derive(Debug, Default)]
struct FlakySlot {
    inner: MemorySlot,
    broken: Rc<Cell<bool>>,
}

impl DurableSlot for FlakySlot {
    fn read(&self, key: &str) -> mapty::Result<Option<String>> {
        self.inner.read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> mapty::Result<()> {
        if self.broken.get() {
            let full = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL);
            return Err(Error::Storage(rusqlite::Error::SqliteFailure(full, None)));
        }
        self.inner.write(key, value)
    }

    fn remove(&mut self, key: &str) -> mapty::Result<()> {
        self.inner.remove(key)
    }
}

type Ctl = WorkoutController<FakeMap, FakeUi, MemorySlot>;
type FlakyCtl = WorkoutController<FakeMap, FakeUi, FlakySlot>;

const HOME: Coords = Coords::new(42.0, 23.0);

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
}

fn controller(slot: MemorySlot) -> Ctl {
    let ui = FakeUi {
        answer: true,
        ..FakeUi::default()
    };
    let mut ctl = Ctl::new(PersistenceGateway::new(slot), ui)
        .unwrap()
        .with_clock(now);
    ctl.map_ready(FakeMap::default(), HOME);
    ctl
}

fn run(distance: f64, duration: f64, cadence: f64) -> Submission {
    Submission::new(WorkoutKind::Running, distance, duration, cadence)
}

fn create(ctl: &mut Ctl, at: Coords, sub: Submission) -> String {
    ctl.map_clicked(at);
    ctl.submit(sub).unwrap();
    ctl.store().as_slice().last().unwrap().id().to_string()
}

fn map(ctl: &Ctl) -> &FakeMap {
    ctl.map().unwrap()
}

fn flaky_controller() -> (FlakyCtl, Rc<Cell<bool>>) {
    let broken = Rc::new(Cell::new(false));
    let slot = FlakySlot {
        inner: MemorySlot::new(),
        broken: Rc::clone(&broken),
    };
    let ui = FakeUi {
        answer: true,
        ..FakeUi::default()
    };
    let mut ctl = FlakyCtl::new(PersistenceGateway::new(slot), ui)
        .unwrap()
        .with_clock(now);
    ctl.map_ready(FakeMap::default(), HOME);
    (ctl, broken)
}

#[test]
fn create_running_workout() {
    let mut ctl = controller(MemorySlot::new());
    let id = create(&mut ctl, HOME, run(5.0, 25.0, 180.0));

    let w = ctl.store().find_by_id(&id).unwrap();
    assert!((w.pace().unwrap() - 5.0).abs() < 1e-12);
    assert!(w.description().contains("Running"));
    assert!(w.description().ends_with("October 16"));
    assert_eq!(w.coords(), HOME);

    assert_eq!(ctl.markers().len(), 1);
    assert_eq!(map(&ctl).live.len(), 1);
    assert_eq!(map(&ctl).live[0].1, HOME);
    assert_eq!(ctl.intent(), &FormIntent::Idle);
    assert!(ctl.ui().form.is_none());
    assert_eq!(ctl.ui().list, [id]);
    assert!(ctl.gateway().slot().contains(WORKOUTS_KEY));
}

#[test]
fn edit_recomputes_and_reattaches_marker() {
    let mut ctl = controller(MemorySlot::new());
    let id = create(&mut ctl, HOME, run(5.0, 25.0, 180.0));
    let first_marker = map(&ctl).live[0].0;

    ctl.edit_clicked(&id).unwrap();
    let form = ctl.ui().form.clone().unwrap();
    assert!(!form.is_new());
    assert_eq!(form.id, id);
    assert_eq!(form.distance, Some(5.0));
    assert_eq!(form.cadence, Some(180));

    ctl.submit(run(10.0, 25.0, 180.0)).unwrap();

    let w = ctl.store().find_by_id(&id).unwrap();
    assert!((w.pace().unwrap() - 2.5).abs() < 1e-12);
    assert_eq!(ctl.store().len(), 1);
    assert_eq!(map(&ctl).removed, [first_marker]);
    assert_eq!(map(&ctl).live.len(), 1);
    assert_eq!(map(&ctl).live[0].1, HOME);
    assert_eq!(ctl.intent(), &FormIntent::Idle);

    let saved = ctl.gateway().load().unwrap();
    assert!((saved[0].distance() - 10.0).abs() < f64::EPSILON);
}

#[test]
fn edit_can_change_kind() {
    let mut ctl = controller(MemorySlot::new());
    let id = create(&mut ctl, HOME, run(5.0, 25.0, 180.0));

    ctl.edit_clicked(&id).unwrap();
    ctl.submit(Submission::new(WorkoutKind::Cycling, 20.0, 60.0, -15.0))
        .unwrap();

    let w = ctl.store().find_by_id(&id).unwrap();
    assert_eq!(w.kind(), WorkoutKind::Cycling);
    assert!(w.description().starts_with("Cycling"));
    assert!((w.speed().unwrap() - 20.0).abs() < 1e-12);
    assert!(map(&ctl).live[0].2.contains("Cycling"));
}

#[test]
fn invalid_new_submission_keeps_form_open() {
    let mut ctl = controller(MemorySlot::new());
    ctl.map_clicked(HOME);

    let err = ctl.submit(run(-1.0, 25.0, 180.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(ctl.store().len(), 0);
    assert!(ctl.ui().form.is_some());
    assert_eq!(ctl.intent(), &FormIntent::AwaitingNew { coords: HOME });
    assert!(map(&ctl).live.is_empty());
    assert!(!ctl.gateway().slot().contains(WORKOUTS_KEY));
}

#[test]
fn dispatch_notifies_on_invalid_input() {
    let mut ctl = controller(MemorySlot::new());
    ctl.dispatch(Intent::MapClicked(HOME)).unwrap();
    ctl.dispatch(Intent::Submit(run(5.0, 0.0, 180.0))).unwrap();

    assert_eq!(ctl.ui().notices.len(), 1);
    assert!(ctl.ui().form.is_some());
    assert!(ctl.store().is_empty());

    ctl.dispatch(Intent::Cancel).unwrap();
    assert_eq!(ctl.intent(), &FormIntent::Idle);
    assert!(ctl.ui().form.is_none());
}

#[test]
fn submit_without_form_is_rejected() {
    let mut ctl = controller(MemorySlot::new());
    assert!(matches!(
        ctl.submit(run(5.0, 25.0, 180.0)),
        Err(Error::NoActiveForm)
    ));
    assert!(ctl.store().is_empty());
}

#[test]
fn edit_of_unknown_workout_changes_nothing() {
    let mut ctl = controller(MemorySlot::new());
    ctl.map_clicked(HOME);
    assert!(matches!(ctl.edit_clicked("nope"), Err(Error::NotFound(_))));
    assert_eq!(ctl.intent(), &FormIntent::AwaitingNew { coords: HOME });
}

#[test]
fn edit_target_deleted_before_submit() {
    let mut ctl = controller(MemorySlot::new());
    let id = create(&mut ctl, HOME, run(5.0, 25.0, 180.0));

    ctl.edit_clicked(&id).unwrap();
    assert!(ctl.delete_clicked(&id).unwrap());

    let err = ctl.submit(run(10.0, 25.0, 180.0)).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(ctl.intent(), &FormIntent::Idle);
    assert!(ctl.store().is_empty());
    assert!(map(&ctl).live.is_empty());
}

#[test]
fn delete_requires_confirmation() {
    let mut ctl = controller(MemorySlot::new());
    let id = create(&mut ctl, HOME, run(5.0, 25.0, 180.0));

    ctl.ui_mut().answer = false;
    assert!(!ctl.delete_clicked(&id).unwrap());
    assert_eq!(ctl.store().len(), 1);
    assert_eq!(map(&ctl).live.len(), 1);

    ctl.ui_mut().answer = true;
    assert!(ctl.delete_clicked(&id).unwrap());
    assert!(matches!(ctl.store().find_by_id(&id), Err(Error::NotFound(_))));
    assert!(map(&ctl).live.is_empty());
    assert!(ctl.ui().list.is_empty());
    assert!(ctl.gateway().load().unwrap().is_empty());
}

#[test]
fn delete_all_wipes_everything() {
    let mut ctl = controller(MemorySlot::new());
    for i in 0..3 {
        let at = Coords::new(42.0 + f64::from(i), 23.0);
        create(&mut ctl, at, run(5.0, 25.0, 180.0));
    }
    assert_eq!(map(&ctl).live.len(), 3);

    assert!(ctl.delete_all_clicked().unwrap());
    assert!(ctl.store().is_empty());
    assert!(!ctl.gateway().slot().contains(WORKOUTS_KEY));
    assert!(ctl.markers().is_empty());
    assert!(map(&ctl).live.is_empty());
    assert_eq!(map(&ctl).removed.len(), 3);
    assert!(ctl.ui().list.is_empty());
}

#[test]
fn ids_are_unique_with_a_frozen_clock() {
    let mut ctl = controller(MemorySlot::new());
    let a = create(&mut ctl, HOME, run(5.0, 25.0, 180.0));
    let b = create(&mut ctl, HOME, run(6.0, 25.0, 180.0));
    assert_ne!(a, b);

    let ws = ctl.store().as_slice();
    assert!(ws[0].created_at() < ws[1].created_at());
}

#[test]
fn sort_reorders_list_but_not_markers() {
    let mut ctl = controller(MemorySlot::new());
    let long = create(&mut ctl, HOME, run(10.0, 50.0, 180.0));
    let short = create(&mut ctl, Coords::new(1.0, 1.0), run(3.0, 15.0, 170.0));
    let markers_before = map(&ctl).live.clone();

    assert!(ctl.sort_clicked(SortCriterion::DistanceAsc));
    assert_eq!(ctl.ui().list, [short.clone(), long.clone()]);
    assert_eq!(map(&ctl).live, markers_before);

    assert!(!ctl.sort_clicked(SortCriterion::DistanceAsc));
    assert_eq!(ctl.ui().list, [long, short]);
}

#[test]
fn focus_pans_and_counts_clicks() {
    let mut ctl = controller(MemorySlot::new());
    let at = Coords::new(10.0, 20.0);
    let id = create(&mut ctl, at, run(5.0, 25.0, 180.0));

    ctl.dispatch(Intent::Focus(id.clone())).unwrap();
    ctl.dispatch(Intent::Focus(id.clone())).unwrap();
    assert_eq!(map(&ctl).pans, [at, at]);
    assert_eq!(ctl.store().find_by_id(&id).unwrap().clicks(), 2);

    // Unknown ids are swallowed by dispatch.
    ctl.dispatch(Intent::Focus("missing".into())).unwrap();
    assert_eq!(map(&ctl).pans.len(), 2);
}

#[test]
fn restart_restores_workouts_and_markers() {
    let mut ctl = controller(MemorySlot::new());
    create(&mut ctl, HOME, run(5.0, 25.0, 180.0));
    create(
        &mut ctl,
        Coords::new(41.0, 22.0),
        Submission::new(WorkoutKind::Cycling, 40.0, 120.0, 300.0),
    );
    let before = ctl.store().as_slice().to_vec();
    let slot = ctl.gateway().slot().clone();

    let ui = FakeUi::default();
    let mut again = Ctl::new(PersistenceGateway::new(slot), ui).unwrap();
    assert_eq!(again.store().as_slice(), before.as_slice());
    assert_eq!(again.ui().list.len(), 2);
    assert!(again.markers().is_empty());

    again.map_ready(FakeMap::default(), HOME);
    assert_eq!(again.markers().len(), 2);
    assert_eq!(map(&again).view, Some((HOME, 13)));
    assert!((again.store().as_slice()[1].speed().unwrap() - 20.0).abs() < 1e-12);
}

#[test]
fn list_operations_work_without_a_map() {
    let ui = FakeUi {
        answer: true,
        ..FakeUi::default()
    };
    let mut ctl = Ctl::new(PersistenceGateway::new(MemorySlot::new()), ui)
        .unwrap()
        .with_clock(now);
    ctl.geolocation_failed();
    assert_eq!(ctl.ui().notices.len(), 1);

    ctl.map_clicked(HOME);
    ctl.submit(run(5.0, 25.0, 180.0)).unwrap();
    let id = ctl.store().as_slice()[0].id().to_string();
    ctl.focus(&id).unwrap();
    ctl.sort_clicked(SortCriterion::DurationDesc);
    assert!(ctl.delete_clicked(&id).unwrap());
    assert!(ctl.store().is_empty());
    assert!(ctl.markers().is_empty());
}

#[test]
fn map_click_replaces_pending_edit() {
    let mut ctl = controller(MemorySlot::new());
    let id = create(&mut ctl, HOME, run(5.0, 25.0, 180.0));
    let elsewhere = Coords::new(41.0, 22.0);

    ctl.edit_clicked(&id).unwrap();
    ctl.map_clicked(elsewhere);
    assert_eq!(ctl.intent(), &FormIntent::AwaitingNew { coords: elsewhere });
    assert!(ctl.ui().form.as_ref().unwrap().is_new());

    ctl.submit(run(8.0, 40.0, 170.0)).unwrap();
    assert_eq!(ctl.store().len(), 2);
    let first = ctl.store().find_by_id(&id).unwrap();
    assert!((first.distance() - 5.0).abs() < f64::EPSILON);
    assert_eq!(ctl.store().as_slice()[1].coords(), elsewhere);
}

#[test]
fn failed_save_drops_new_workout() {
    let (mut ctl, broken) = flaky_controller();
    broken.set(true);

    ctl.map_clicked(HOME);
    let err = ctl.submit(run(5.0, 25.0, 180.0)).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert!(ctl.dispatch(Intent::Submit(run(5.0, 25.0, 180.0))).is_err());

    assert!(ctl.store().is_empty());
    assert!(ctl.markers().is_empty());
    assert!(ctl.map().unwrap().live.is_empty());
    assert!(ctl.ui().list.is_empty());
    // The form stays open so the user can retry.
    assert_eq!(ctl.intent(), &FormIntent::AwaitingNew { coords: HOME });

    broken.set(false);
    ctl.submit(run(5.0, 25.0, 180.0)).unwrap();
    assert_eq!(ctl.store().len(), 1);
    assert_eq!(ctl.markers().len(), 1);
    assert_eq!(ctl.map().unwrap().live.len(), 1);
    assert_eq!(ctl.gateway().load().unwrap().len(), 1);
}

#[test]
fn failed_save_reverts_edit() {
    let (mut ctl, broken) = flaky_controller();
    ctl.map_clicked(HOME);
    ctl.submit(run(5.0, 25.0, 180.0)).unwrap();
    let id = ctl.store().as_slice()[0].id().to_string();

    broken.set(true);
    ctl.edit_clicked(&id).unwrap();
    let err = ctl
        .submit(Submission::new(WorkoutKind::Cycling, 20.0, 60.0, 300.0))
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    let w = ctl.store().find_by_id(&id).unwrap();
    assert_eq!(w.kind(), WorkoutKind::Running);
    assert!((w.distance() - 5.0).abs() < f64::EPSILON);
    let live = &ctl.map().unwrap().live;
    assert_eq!(live.len(), 1);
    assert!(live[0].2.contains("Running"));
    assert_eq!(ctl.markers().len(), 1);
    assert_eq!(ctl.intent(), &FormIntent::AwaitingEdit { id: id.clone() });

    broken.set(false);
    let saved = ctl.gateway().load().unwrap();
    assert_eq!(saved[0].kind(), WorkoutKind::Running);
}

#[test]
fn failed_save_restores_deleted_workout() {
    let (mut ctl, broken) = flaky_controller();
    for km in [5.0, 7.0, 9.0] {
        ctl.map_clicked(HOME);
        ctl.submit(run(km, 30.0, 175.0)).unwrap();
    }
    let before: Vec<String> = ctl.store().iter().map(|w| w.id().to_string()).collect();
    let middle = before[1].clone();

    broken.set(true);
    let err = ctl.delete_clicked(&middle).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    let after: Vec<String> = ctl.store().iter().map(|w| w.id().to_string()).collect();
    assert_eq!(after, before);
    assert_eq!(ctl.ui().list, before);
    assert!(ctl.markers().contains(&middle));
    assert_eq!(ctl.markers().len(), 3);
    assert_eq!(ctl.map().unwrap().live.len(), 3);
    assert_eq!(ctl.gateway().load().unwrap().len(), 3);
}
