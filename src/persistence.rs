use crate::dlog;
use crate::error::{Error, Result};
use crate::types::{Activity, Coords, Workout, WorkoutKind};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;

/// Name of the slot holding the workout collection.
pub const WORKOUTS_KEY: &str = "workouts";

/// A named key-value location that survives restarts.
pub trait DurableSlot {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Slot kept in process memory, for tests and throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemorySlot {
    entries: HashMap<String, String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl DurableSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Slot stored in a SQLite file.
pub struct SqliteSlot {
    conn: Connection,
}

impl SqliteSlot {
    pub fn open(path: &Path) -> Result<Self> {
        tracing::info!(db = %path.display(), "opening workout database");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS slots (
              key    TEXT PRIMARY KEY,
              value  TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }
}

impl DurableSlot for SqliteSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO slots (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM slots WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// Flat, self-describing form of a workout as stored in the slot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkoutRecord {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    id: String,
    created_at: i64,
    date: DateTime<Utc>,
    coords: Coords,
    distance: f64,
    duration: f64,
    #[serde(default)]
    clicks: u32,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cadence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pace: Option<f64>,
    #[serde(default, alias = "elevation", skip_serializing_if = "Option::is_none")]
    elevation_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
}

impl From<&Workout> for WorkoutRecord {
    fn from(w: &Workout) -> Self {
        Self {
            kind: Some(w.kind().as_str().to_string()),
            id: w.id().to_string(),
            created_at: w.created_at(),
            date: w.date(),
            coords: w.coords(),
            distance: w.distance(),
            duration: w.duration(),
            clicks: w.clicks(),
            description: w.description().to_string(),
            cadence: w.cadence(),
            pace: w.pace(),
            elevation_gain: w.elevation_gain(),
            speed: w.speed(),
        }
    }
}

impl WorkoutRecord {
    /// Rebuilds the typed workout, dispatching on the kind tag. Derived
    /// fields are recomputed rather than trusted.
    fn into_workout(self) -> Result<Workout> {
        let corrupt = |why: String| Error::CorruptRecord(format!("id={}: {why}", self.id));

        let activity = match self.kind.as_deref().map(str::parse::<WorkoutKind>) {
            Some(Ok(WorkoutKind::Running)) => Activity::Running {
                cadence: self
                    .cadence
                    .ok_or_else(|| corrupt("running record without cadence".into()))?,
            },
            Some(Ok(WorkoutKind::Cycling)) => Activity::Cycling {
                elevation_gain: self
                    .elevation_gain
                    .ok_or_else(|| corrupt("cycling record without elevationGain".into()))?,
            },
            Some(Err(_)) => {
                return Err(corrupt(format!("unknown type {:?}", self.kind)));
            }
            None => return Err(corrupt("missing type".into())),
        };

        let mut workout = Workout::new(
            self.id.clone(),
            self.date,
            self.coords,
            self.distance,
            self.duration,
            activity,
        )
        .map_err(|e| corrupt(e.to_string()))?;
        workout.restore(self.created_at, self.clicks);
        Ok(workout)
    }
}

/// Serializes one workout to its stored JSON form.
pub fn encode_record(workout: &Workout) -> Result<JsonValue> {
    Ok(serde_json::to_value(WorkoutRecord::from(workout))?)
}

/// Rebuilds one workout from its stored JSON form.
pub fn decode_record(value: JsonValue) -> Result<Workout> {
    let record: WorkoutRecord =
        serde_json::from_value(value).map_err(|e| Error::CorruptRecord(e.to_string()))?;
    record.into_workout()
}

/// Saves and restores the workout collection through a [`DurableSlot`].
///
/// On load, a payload that is not a JSON array aborts with
/// [`Error::CorruptRecord`]; single records that cannot be rebuilt are
/// skipped with a warning.
pub struct PersistenceGateway<S> {
    slot: S,
}

impl<S: DurableSlot> PersistenceGateway<S> {
    pub const fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn save(&mut self, workouts: &[Workout]) -> Result<()> {
        let records: Vec<WorkoutRecord> = workouts.iter().map(WorkoutRecord::from).collect();
        let payload = serde_json::to_string(&records)?;
        self.slot.write(WORKOUTS_KEY, &payload)?;
        dlog!("saved workouts={} bytes={}", records.len(), payload.len());
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<Workout>> {
        let Some(payload) = self.slot.read(WORKOUTS_KEY)? else {
            dlog!("no saved workouts");
            return Ok(Vec::new());
        };

        let values: Vec<JsonValue> = serde_json::from_str(&payload)
            .map_err(|e| Error::CorruptRecord(format!("workout collection: {e}")))?;

        let total = values.len();
        let mut out = Vec::with_capacity(total);
        for value in values {
            match decode_record(value) {
                Ok(w) => out.push(w),
                Err(e) => tracing::warn!(err = %e, "skipping saved workout"),
            }
        }

        tracing::info!(loaded = out.len(), skipped = total - out.len(), "workouts loaded");
        Ok(out)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.slot.remove(WORKOUTS_KEY)?;
        dlog!("cleared saved workouts");
        Ok(())
    }

    pub const fn slot(&self) -> &S {
        &self.slot
    }
}
