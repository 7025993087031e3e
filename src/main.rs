#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use waymark::cli::{self, AddWorkout, Cmd};
use waymark::position::FixedPosition;
use waymark::session::{Session, VariantInput, WorkoutForm};
use waymark::store::SqliteStore;
use waymark::workout::WorkoutId;
use waymark::{dlog, render, utils};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let store = SqliteStore::open(&cli.store)?;
    dlog!("store={} home={:?}", cli.store.display(), cli.home);
    let mut session = Session::start(store, &FixedPosition(cli.home))?;

    match cli.cmd {
        Cmd::Add { workout } => {
            let (common, variant) = match workout {
                AddWorkout::Running { common, cadence } => {
                    (common, VariantInput::Cadence(cadence))
                }
                AddWorkout::Cycling { common, elevation } => {
                    (common, VariantInput::Elevation(elevation))
                }
            };

            if let Some(center) = session.view().center {
                session.select_point(center);
            }

            let workout = session.new_workout(WorkoutForm {
                distance_km: common.distance,
                duration_min: common.duration,
                variant,
                at: common.at,
            })?;
            println!("{}", render::popup_text(workout));
            println!("{}", render::list_entry(workout));
        }
        Cmd::List { details } => {
            if session.log().is_empty() {
                tracing::info!(store = %cli.store.display(), "no workouts saved yet");
            }
            for w in render::newest_first(session.log().all()) {
                if details {
                    println!("{}", render::detail_row(w));
                } else {
                    println!("{}", render::list_entry(w));
                }
            }
        }
        Cmd::Show { id } => {
            let id = WorkoutId::from(id);
            let view = session.move_to(&id)?;
            let workout = session.log().find_by_id(&id)?;
            println!("{}", render::popup_text(workout));
            if let Some(center) = view.center {
                println!("map center {center} zoom {}", view.zoom);
            }
        }
        Cmd::ExportGpx { out } => {
            let file = File::create(&out)
                .with_context(|| format!("creating file: {}", out.display()))?;
            let mut writer = BufWriter::new(file);
            render::write_gpx_waypoints(&mut writer, session.log().all())
                .with_context(|| format!("writing GPX: {}", out.display()))?;
            writer.flush()?;
            tracing::info!(
                path = %out.display(),
                workouts = session.log().len(),
                "exported waypoints"
            );
        }
        Cmd::Reset => session.reset()?,
    }

    Ok(())
}
