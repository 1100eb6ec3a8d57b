#![deny(warnings, clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use mapty::headless::{HeadlessMap, TerminalUi};
use mapty::{
    Intent, PersistenceGateway, SqliteSlot, Submission, WorkoutController, WorkoutKind, cli, utils,
};

#[macro_use]
extern crate mapty;

type App = WorkoutController<HeadlessMap, TerminalUi, SqliteSlot>;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let slot = SqliteSlot::open(&cli.db)
        .with_context(|| format!("opening workout database: {}", cli.db.display()))?;
    let assume_yes = cli.cmd.as_ref().is_some_and(cli::Cmd::assume_yes);
    let mut app = App::new(PersistenceGateway::new(slot), TerminalUi::new(assume_yes))
        .context("loading saved workouts")?
        .with_zoom(cli.zoom);

    // A new workout is placed where the map is clicked, so the map has to be up.
    let position = match &cli.cmd {
        Some(cli::Cmd::Add { at, .. }) => Some(cli.position.unwrap_or(*at)),
        _ => cli.position,
    };
    match position {
        Some(p) => app.map_ready(HeadlessMap::new(), p),
        None => app.geolocation_failed(),
    }
    dlog!(
        "db={} workouts={} map={}",
        cli.db.display(),
        app.store().len(),
        app.map().is_some()
    );

    match cli.cmd {
        None => print_list(&app, false),
        Some(cli::Cmd::List { sort, details }) => {
            if let Some(criterion) = sort {
                app.dispatch(Intent::Sort(criterion))?;
            }
            print_list(&app, details);
        }
        Some(cli::Cmd::Add {
            at,
            kind,
            distance,
            duration,
            cadence,
            elevation,
        }) => {
            let metric = match kind {
                WorkoutKind::Running => cadence,
                WorkoutKind::Cycling => elevation,
            };
            app.dispatch(Intent::MapClicked(at))?;
            submit(
                &mut app,
                Submission::new(kind, distance, duration, metric.unwrap_or(f64::NAN)),
            )?;
            print_list(&app, false);
        }
        Some(cli::Cmd::Edit {
            id,
            kind,
            distance,
            duration,
            cadence,
            elevation,
        }) => {
            app.dispatch(Intent::Edit(id.clone()))?;
            let Some(form) = app.ui().form().cloned() else {
                bail!("No workout with id {id}");
            };

            let kind = kind.unwrap_or(form.kind);
            let metric = match kind {
                WorkoutKind::Running => cadence.or_else(|| form.cadence.map(f64::from)),
                WorkoutKind::Cycling => elevation.or(form.elevation_gain),
            };
            let sub = Submission::new(
                kind,
                distance.or(form.distance).unwrap_or(f64::NAN),
                duration.or(form.duration).unwrap_or(f64::NAN),
                metric.unwrap_or(f64::NAN),
            );
            submit(&mut app, sub)?;
            print_list(&app, false);
        }
        Some(cli::Cmd::Delete { id, .. }) => {
            if app.store().find_by_id(&id).is_err() {
                bail!("No workout with id {id}");
            }
            app.dispatch(Intent::Delete(id))?;
            print_list(&app, false);
        }
        Some(cli::Cmd::DeleteAll { .. }) => {
            app.dispatch(Intent::DeleteAll)?;
            print_list(&app, false);
        }
        Some(cli::Cmd::Focus { id }) => {
            app.dispatch(Intent::Focus(id.clone()))?;
            let Ok(w) = app.store().find_by_id(&id) else {
                bail!("No workout with id {id}");
            };
            println!("{}\t{}\tclicks={}", w.description(), w.coords(), w.clicks());
        }
    }

    Ok(())
}

/// Submits the open form; a rejected submission leaves it open.
fn submit(app: &mut App, sub: Submission) -> Result<()> {
    app.dispatch(Intent::Submit(sub))?;
    if app.ui().form().is_some() {
        app.dispatch(Intent::Cancel)?;
        bail!("Workout not saved: inputs have to be positive numbers");
    }
    Ok(())
}

fn print_list(app: &App, details: bool) {
    if !details {
        for line in app.ui().lines() {
            println!("{line}");
        }
        return;
    }

    for (line, w) in app.ui().lines().zip(app.store().iter()) {
        println!(
            "{line}\t{}\t{}\tclicks={}",
            w.coords(),
            utils::format_duration(w.duration()),
            w.clicks()
        );
    }
}
