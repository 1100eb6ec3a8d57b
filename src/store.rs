use crate::error::{Error, Result};
use crate::types::Workout;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Ordering offered by the sort buttons of the side list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCriterion {
    DistanceAsc,
    DistanceDesc,
    DurationAsc,
    DurationDesc,
    DateAsc,
}

impl SortCriterion {
    pub fn compare(self, a: &Workout, b: &Workout) -> Ordering {
        match self {
            Self::DistanceAsc => a.distance().total_cmp(&b.distance()),
            Self::DistanceDesc => b.distance().total_cmp(&a.distance()),
            Self::DurationAsc => a.duration().total_cmp(&b.duration()),
            Self::DurationDesc => b.duration().total_cmp(&a.duration()),
            Self::DateAsc => a.created_at().cmp(&b.created_at()),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DistanceAsc => "distance-asc",
            Self::DistanceDesc => "distance-desc",
            Self::DurationAsc => "duration-asc",
            Self::DurationDesc => "duration-desc",
            Self::DateAsc => "date-asc",
        }
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCriterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "distance-asc" => Ok(Self::DistanceAsc),
            "distance-desc" => Ok(Self::DistanceDesc),
            "duration-asc" => Ok(Self::DurationAsc),
            "duration-desc" => Ok(Self::DurationDesc),
            "date-asc" => Ok(Self::DateAsc),
            other => Err(Error::InvalidInput(format!("unknown sort criterion: {other:?}"))),
        }
    }
}

/// The authoritative ordered collection of workouts.
#[derive(Debug, Default)]
pub struct WorkoutStore {
    workouts: Vec<Workout>,
    sorted: bool,
}

impl WorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_workouts(workouts: Vec<Workout>) -> Self {
        Self {
            workouts,
            sorted: false,
        }
    }

    /// Appends without checking ids; callers hand out unique ids.
    pub fn add(&mut self, workout: Workout) {
        self.workouts.push(workout);
    }

    pub fn find_by_id(&self, id: &str) -> Result<&Workout> {
        self.workouts
            .iter()
            .find(|w| w.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Result<&mut Workout> {
        self.workouts
            .iter_mut()
            .find(|w| w.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.workouts.iter().any(|w| w.id() == id)
    }

    /// Overwrites the record with the same id, keeping its position.
    pub fn replace(&mut self, workout: Workout) -> Result<()> {
        let slot = self.find_by_id_mut(workout.id())?;
        *slot = workout;
        Ok(())
    }

    pub fn remove_by_id(&mut self, id: &str) -> Result<Workout> {
        let pos = self
            .position(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok(self.workouts.remove(pos))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.workouts.iter().position(|w| w.id() == id)
    }

    /// Puts `workout` at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, workout: Workout) {
        let index = index.min(self.workouts.len());
        self.workouts.insert(index, workout);
    }

    /// Sorts with `cmp` if the list is in creation order, otherwise restores
    /// creation order. The toggle is shared by every criterion.
    ///
    /// Returns whether the store is sorted afterwards.
    pub fn sort_by<F>(&mut self, cmp: F) -> bool
    where
        F: FnMut(&Workout, &Workout) -> Ordering,
    {
        if self.sorted {
            self.workouts.sort_by_key(Workout::created_at);
        } else {
            self.workouts.sort_by(cmp);
        }
        self.sorted = !self.sorted;
        self.sorted
    }

    pub fn clear(&mut self) {
        self.workouts.clear();
        self.sorted = false;
    }

    pub const fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Workout> {
        self.workouts.iter()
    }

    pub fn as_slice(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}

impl<'a> IntoIterator for &'a WorkoutStore {
    type Item = &'a Workout;
    type IntoIter = std::slice::Iter<'a, Workout>;

    fn into_iter(self) -> Self::IntoIter {
        self.workouts.iter()
    }
}
