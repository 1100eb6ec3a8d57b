use crate::store::SortCriterion;
use crate::surface::DEFAULT_ZOOM;
use crate::types::{Coords, WorkoutKind};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_DB: &str = "mapty.sqlite3";

#[derive(Parser, Debug)]
#[command(
    name = "mapty",
    about = "Log running and cycling workouts pinned to map coordinates"
)]
pub struct Cli {
    /// SQLite file holding the saved workouts.
    #[arg(long, env = "MAPTY_DB", default_value = DEFAULT_DB, global = true)]
    pub db: PathBuf,

    /// Current location. Without it the map is not loaded and no markers are drawn.
    #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true, global = true)]
    pub position: Option<Coords>,

    /// Zoom level used when centering the map.
    #[arg(long, default_value_t = DEFAULT_ZOOM, global = true)]
    pub zoom: u8,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Print saved workouts (the default).
    List {
        /// distance-asc, distance-desc, duration-asc, duration-desc or date-asc.
        #[arg(long)]
        sort: Option<SortCriterion>,

        /// Also print coordinates, duration as hh:mm:ss and click counts.
        #[arg(long)]
        details: bool,
    },

    /// Log a new workout at a map position.
    Add {
        #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true)]
        at: Coords,

        /// running or cycling
        #[arg(long, default_value = "running")]
        kind: WorkoutKind,

        /// Kilometers.
        #[arg(long, allow_negative_numbers = true)]
        distance: f64,

        /// Minutes.
        #[arg(long, allow_negative_numbers = true)]
        duration: f64,

        /// Steps per minute (running).
        #[arg(long, allow_negative_numbers = true)]
        cadence: Option<f64>,

        /// Meters (cycling). May be negative.
        #[arg(long, allow_negative_numbers = true)]
        elevation: Option<f64>,
    },

    /// Change a saved workout. Omitted values stay as they are.
    Edit {
        id: String,

        #[arg(long)]
        kind: Option<WorkoutKind>,

        #[arg(long, allow_negative_numbers = true)]
        distance: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        duration: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        cadence: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        elevation: Option<f64>,
    },

    /// Delete one workout.
    Delete {
        id: String,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete every workout and the saved data.
    DeleteAll {
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Center the map on a workout.
    Focus { id: String },
}

impl Cmd {
    pub const fn assume_yes(&self) -> bool {
        matches!(self, Self::Delete { yes: true, .. } | Self::DeleteAll { yes: true })
    }
}
