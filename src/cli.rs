use crate::utils::parse_coordinates;
use crate::workout::Coordinates;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_STORE: &str = "waymark.sqlite";

#[derive(Parser, Debug)]
#[command(
    name = "waymark",
    about = "Log running and cycling workouts on the map, with pace and speed"
)]
pub struct Cli {
    /// SQLite file holding the saved workouts.
    #[arg(long, env = "WAYMARK_STORE", default_value = DEFAULT_STORE, global = true)]
    pub store: PathBuf,

    /// Current position as LAT,LNG. The map centers here and new workouts
    /// default to it when `--at` is not given.
    #[arg(
        long,
        env = "WAYMARK_HOME",
        value_name = "LAT,LNG",
        value_parser = parse_coordinates,
        allow_hyphen_values = true,
        global = true
    )]
    pub home: Option<Coordinates>,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Log a new workout.
    Add {
        #[command(subcommand)]
        workout: AddWorkout,
    },
    /// List saved workouts, newest first.
    List {
        /// Tab-separated rows with every field.
        #[arg(long)]
        details: bool,
    },
    /// Center the map on one workout.
    Show { id: String },
    /// Write all workouts as GPX waypoints.
    ExportGpx {
        #[arg(value_name = "OUT")]
        out: PathBuf,
    },
    /// Delete every saved workout.
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum AddWorkout {
    Running {
        #[command(flatten)]
        common: WorkoutArgs,
        /// Steps per minute.
        #[arg(long)]
        cadence: f64,
    },
    Cycling {
        #[command(flatten)]
        common: WorkoutArgs,
        /// Elevation gain in meters.
        #[arg(long)]
        elevation: f64,
    },
}

#[derive(Args, Debug)]
pub struct WorkoutArgs {
    /// Distance in km.
    #[arg(long)]
    pub distance: f64,

    /// Duration in minutes.
    #[arg(long)]
    pub duration: f64,

    /// Where the workout happened, as LAT,LNG.
    #[arg(
        long,
        value_name = "LAT,LNG",
        value_parser = parse_coordinates,
        allow_hyphen_values = true
    )]
    pub at: Option<Coordinates>,
}
