use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point on the map, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(c: Coords) -> Self {
        [c.lat, c.lng]
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

/// Parses `"LAT,LNG"`.
impl FromStr for Coords {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::InvalidInput(format!("expected LAT,LNG, got {s:?}"));
        let (lat, lng) = s.split_once(',').ok_or_else(bad)?;
        let lat: f64 = lat.trim().parse().map_err(|_| bad())?;
        let lng: f64 = lng.trim().parse().map_err(|_| bad())?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(bad());
        }
        Ok(Self { lat, lng })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutKind {
    Running,
    Cycling,
}

impl WorkoutKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Running => "🏃‍♂️",
            Self::Cycling => "🚴‍♂️",
        }
    }

    /// CSS-like style class the map surface uses for the marker popup.
    pub const fn popup_class(self) -> &'static str {
        match self {
            Self::Running => "running-popup",
            Self::Cycling => "cycling-popup",
        }
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "cycling" => Ok(Self::Cycling),
            other => Err(Error::InvalidInput(format!("unknown workout kind: {other:?}"))),
        }
    }
}

/// Kind-specific payload of a workout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activity {
    /// Steps per minute.
    Running { cadence: u32 },
    /// Net elevation in meters; may be zero or negative.
    Cycling { elevation_gain: f64 },
}

impl Activity {
    pub const fn kind(&self) -> WorkoutKind {
        match self {
            Self::Running { .. } => WorkoutKind::Running,
            Self::Cycling { .. } => WorkoutKind::Cycling,
        }
    }

    fn check(&self) -> Result<()> {
        match *self {
            Self::Running { cadence } if cadence == 0 => Err(Error::InvalidMeasurement {
                field: "cadence",
                value: f64::from(cadence),
            }),
            Self::Cycling { elevation_gain } if !elevation_gain.is_finite() => {
                Err(Error::InvalidMeasurement {
                    field: "elevation_gain",
                    value: elevation_gain,
                })
            }
            _ => Ok(()),
        }
    }
}

/// A logged exercise session.
///
/// Fields are private so a `Workout` can only exist with a positive, finite
/// distance and duration and a description matching its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    id: String,
    created_at: i64,
    date: DateTime<Utc>,
    coords: Coords,
    distance: f64,
    duration: f64,
    clicks: u32,
    description: String,
    activity: Activity,
}

impl Workout {
    /// `distance` in km, `duration` in minutes. `created_at` is taken from `date`.
    pub fn new(
        id: impl Into<String>,
        date: DateTime<Utc>,
        coords: Coords,
        distance: f64,
        duration: f64,
        activity: Activity,
    ) -> Result<Self> {
        check_positive("distance", distance)?;
        check_positive("duration", duration)?;
        activity.check()?;

        Ok(Self {
            id: id.into(),
            created_at: date.timestamp_millis(),
            date,
            coords,
            distance,
            duration,
            clicks: 0,
            description: describe(activity.kind(), date),
            activity,
        })
    }

    pub fn running(
        id: impl Into<String>,
        date: DateTime<Utc>,
        coords: Coords,
        distance: f64,
        duration: f64,
        cadence: u32,
    ) -> Result<Self> {
        Self::new(id, date, coords, distance, duration, Activity::Running { cadence })
    }

    pub fn cycling(
        id: impl Into<String>,
        date: DateTime<Utc>,
        coords: Coords,
        distance: f64,
        duration: f64,
        elevation_gain: f64,
    ) -> Result<Self> {
        Self::new(
            id,
            date,
            coords,
            distance,
            duration,
            Activity::Cycling { elevation_gain },
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn created_at(&self) -> i64 {
        self.created_at
    }

    pub const fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub const fn coords(&self) -> Coords {
        self.coords
    }

    pub const fn distance(&self) -> f64 {
        self.distance
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub const fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn activity(&self) -> Activity {
        self.activity
    }

    pub const fn kind(&self) -> WorkoutKind {
        self.activity.kind()
    }

    pub const fn cadence(&self) -> Option<u32> {
        match self.activity {
            Activity::Running { cadence } => Some(cadence),
            Activity::Cycling { .. } => None,
        }
    }

    pub const fn elevation_gain(&self) -> Option<f64> {
        match self.activity {
            Activity::Cycling { elevation_gain } => Some(elevation_gain),
            Activity::Running { .. } => None,
        }
    }

    /// Minutes per km, for running workouts.
    pub fn pace(&self) -> Option<f64> {
        matches!(self.activity, Activity::Running { .. }).then(|| self.duration / self.distance)
    }

    /// km/h, for cycling workouts.
    pub fn speed(&self) -> Option<f64> {
        matches!(self.activity, Activity::Cycling { .. })
            .then(|| self.distance / (self.duration / 60.0))
    }

    /// Text shown in the marker popup.
    pub fn popup_content(&self) -> String {
        format!("{}{}", self.kind().emoji(), self.description)
    }

    /// Applies an edit. Identity, coordinates and creation date are kept; the
    /// description is recomputed since the kind may have changed.
    pub fn update(&mut self, distance: f64, duration: f64, activity: Activity) -> Result<()> {
        check_positive("distance", distance)?;
        check_positive("duration", duration)?;
        activity.check()?;

        self.distance = distance;
        self.duration = duration;
        self.activity = activity;
        self.description = describe(activity.kind(), self.date);
        Ok(())
    }

    pub const fn record_click(&mut self) {
        self.clicks = self.clicks.saturating_add(1);
    }

    /// Restores bookkeeping fields that are not part of construction.
    pub(crate) const fn restore(&mut self, created_at: i64, clicks: u32) {
        self.created_at = created_at;
        self.clicks = clicks;
    }
}

/// e.g. `Running on April 14`
pub fn describe(kind: WorkoutKind, date: DateTime<Utc>) -> String {
    format!("{} on {}", kind.label(), date.format("%B %-d"))
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidMeasurement { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn april_14() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn running_pace_and_description() {
        let w = Workout::running("1", april_14(), Coords::new(42.0, 23.0), 5.0, 25.0, 180).unwrap();
        assert!((w.pace().unwrap() - 5.0).abs() < 1e-12);
        assert_eq!(w.speed(), None);
        assert_eq!(w.description(), "Running on April 14");
        assert_eq!(w.created_at(), april_14().timestamp_millis());
    }

    #[test]
    fn cycling_speed_allows_negative_elevation() {
        let w = Workout::cycling("2", april_14(), Coords::new(0.0, 0.0), 30.0, 90.0, -120.0).unwrap();
        assert!((w.speed().unwrap() - 20.0).abs() < 1e-12);
        assert_eq!(w.elevation_gain(), Some(-120.0));
        assert!(w.description().starts_with("Cycling"));
    }

    #[test]
    fn rejects_illegal_measurements() {
        let at = Coords::new(0.0, 0.0);
        for (d, t) in [(0.0, 10.0), (-1.0, 10.0), (5.0, f64::NAN), (f64::INFINITY, 1.0)] {
            let err = Workout::running("x", april_14(), at, d, t, 170).unwrap_err();
            assert!(matches!(err, Error::InvalidMeasurement { .. }), "{d} {t}");
        }
        assert!(Workout::running("x", april_14(), at, 5.0, 20.0, 0).is_err());
        assert!(Workout::cycling("x", april_14(), at, 5.0, 20.0, f64::NAN).is_err());
    }

    #[test]
    fn update_switches_kind_and_keeps_identity() {
        let mut w = Workout::running("7", april_14(), Coords::new(1.0, 2.0), 5.0, 25.0, 180).unwrap();
        w.update(10.0, 30.0, Activity::Cycling { elevation_gain: 0.0 }).unwrap();
        assert_eq!(w.id(), "7");
        assert_eq!(w.kind(), WorkoutKind::Cycling);
        assert_eq!(w.description(), "Cycling on April 14");
        assert!((w.speed().unwrap() - 20.0).abs() < 1e-12);

        let before = w.clone();
        assert!(w.update(-1.0, 30.0, Activity::Running { cadence: 1 }).is_err());
        assert_eq!(w, before);
    }

    #[test]
    fn parses_coords() {
        let c: Coords = "42.5, 23.25".parse().unwrap();
        assert_eq!(c, Coords::new(42.5, 23.25));
        assert!("42.5".parse::<Coords>().is_err());
        assert!("100,0".parse::<Coords>().is_err());
    }
}
