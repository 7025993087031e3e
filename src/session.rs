use crate::position::PositionSource;
use crate::store::{self, KeyValueStore, WORKOUTS_KEY};
use crate::dlog;
use crate::workout::{Coordinates, Workout, WorkoutId};
use crate::workout_log::WorkoutLog;
use anyhow::{Result, bail};

pub const DEFAULT_ZOOM: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: Option<Coordinates>,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: None,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// The variant field shown by the form for the selected type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariantInput {
    Cadence(f64),
    Elevation(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkoutForm {
    pub distance_km: f64,
    pub duration_min: f64,
    pub variant: VariantInput,
    /// Overrides the selected map point.
    pub at: Option<Coordinates>,
}

/// Everything one tracker session owns. All log changes go through here.
pub struct Session<S: KeyValueStore> {
    store: S,
    log: WorkoutLog,
    view: MapView,
    selected: Option<Coordinates>,
}

impl<S: KeyValueStore> Session<S> {
    /// Hydrates the log once and centers the map on the current position.
    pub fn start(store: S, position: &dyn PositionSource) -> Result<Self> {
        let mut log = WorkoutLog::new();
        store::restore(&store, &mut log)?;

        let mut view = MapView::default();
        match position.locate() {
            Ok(c) => view.center = Some(c),
            Err(e) => tracing::warn!(err = %e, "position unavailable; map has no center"),
        }

        Ok(Self {
            store,
            log,
            view,
            selected: None,
        })
    }

    pub const fn log(&self) -> &WorkoutLog {
        &self.log
    }

    pub const fn view(&self) -> MapView {
        self.view
    }

    pub const fn selected(&self) -> Option<Coordinates> {
        self.selected
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Records where the user clicked on the map.
    pub const fn select_point(&mut self, coords: Coordinates) {
        self.selected = Some(coords);
    }

    /// Builds a workout from the form, appends it and persists the log.
    ///
    /// Nothing changes if the inputs are invalid or the store write fails.
    pub fn new_workout(&mut self, form: WorkoutForm) -> Result<&Workout> {
        let Some(coords) = form.at.or(self.selected) else {
            bail!("No point selected for the workout");
        };

        let workout = match form.variant {
            VariantInput::Cadence(cadence) => {
                Workout::running(coords, form.distance_km, form.duration_min, cadence)?
            }
            VariantInput::Elevation(elevation) => {
                Workout::cycling(coords, form.distance_km, form.duration_min, elevation)?
            }
        };

        tracing::info!(
            id = %workout.id(),
            kind = %workout.workout_type(),
            at = %coords,
            "new workout"
        );

        let id = workout.id().clone();
        let mut next = self.log.clone();
        next.append(workout);
        store::persist(&mut self.store, &next)?;

        self.log = next;
        self.selected = None;

        Ok(self.log.find_by_id(&id)?)
    }

    /// Recenters the map on a workout's marker.
    pub fn move_to(&mut self, id: &WorkoutId) -> Result<MapView> {
        let coords = self.log.find_by_id(id)?.coords();
        self.view.center = Some(coords);
        dlog!("move_to id={id} center={coords} zoom={}", self.view.zoom);
        Ok(self.view)
    }

    /// Wipes the stored entry and empties the log.
    pub fn reset(&mut self) -> Result<()> {
        self.store.remove(WORKOUTS_KEY)?;
        let cleared = self.log.len();
        self.log.clear();
        self.selected = None;
        tracing::info!(cleared, "reset workouts");
        Ok(())
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
