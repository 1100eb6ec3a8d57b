use crate::types::{Activity, Workout};
use tracing_subscriber::{EnvFilter, fmt};

#[macro_export]
macro_rules! dlog {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*);
    };
}

/// Initialize colorful logging.
///
/// Default level is INFO.
/// - `-v` => DEBUG
/// - `-vv` => TRACE
/// - `-q` => WARN
/// - `-qq` => ERROR
///
/// `RUST_LOG` overrides everything (e.g. `RUST_LOG=trace`).
pub fn init_logging(verbose: u8, quiet: u8) {
    let net = i16::from(verbose) - i16::from(quiet);
    let level = match net {
        i16::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        2..=i16::MAX => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,mapty={level}")));

    let show_src = matches!(level, "debug" | "trace");

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_file(show_src)
        .with_line_number(show_src)
        .compact()
        .init();
}

/// Minutes as `hh:mm:ss`.
pub fn format_duration(minutes: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = (minutes.abs() * 60.0).round() as u64;
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// One line of the side list.
pub fn format_workout(w: &Workout) -> String {
    let (rate, metric) = match w.activity() {
        Activity::Running { cadence } => (
            format!("⚡️{:.1} min/km", w.pace().unwrap_or_default()),
            format!("🦶🏼{cadence} spm"),
        ),
        Activity::Cycling { elevation_gain } => (
            format!("⚡️{:.1} km/h", w.speed().unwrap_or_default()),
            format!("⛰{elevation_gain} m"),
        ),
    };
    format!(
        "{}  {}{}  {} km  ⏱{} min  {rate}  {metric}",
        w.id(),
        w.kind().emoji(),
        w.description(),
        w.distance(),
        w.duration(),
    )
}
