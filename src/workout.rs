use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkoutError {
    #[error("invalid {field}: {value} (inputs have to be positive numbers)")]
    InvalidInput { field: &'static str, value: f64 },
    #[error("no workout with id {0}")]
    NotFound(WorkoutId),
}

/// Opaque workout identifier; the only lookup key in a log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkoutId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkoutId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static LAST_ID_MS: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp, bumped past the previous id so ids never repeat
/// within the process even when several workouts share a millisecond.
fn next_id(now: DateTime<Utc>) -> WorkoutId {
    let ms = now.timestamp_millis();
    let prev = LAST_ID_MS
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
            Some(ms.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    WorkoutId(ms.max(prev + 1).to_string())
}

/// Keeps later ids above a numeric id issued elsewhere (e.g. restored from
/// storage). Non-numeric ids can't collide with generated ones.
pub(crate) fn observe_id(id: &WorkoutId) {
    if let Ok(ms) = id.0.parse::<i64>() {
        LAST_ID_MS.fetch_max(ms, Ordering::Relaxed);
    }
}

/// `[latitude, longitude]` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lat, c.lng]
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    Running,
    Cycling,
}

impl WorkoutType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::Running => "🏃‍♂️",
            Self::Cycling => "🚴‍♀️",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific input and the derived metric cached at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkoutKind {
    Running {
        cadence_steps_per_min: f64,
        pace_min_per_km: f64,
    },
    Cycling {
        elevation_gain_m: f64,
        speed_km_per_hr: f64,
    },
}

impl WorkoutKind {
    pub const fn workout_type(&self) -> WorkoutType {
        match self {
            Self::Running { .. } => WorkoutType::Running,
            Self::Cycling { .. } => WorkoutType::Cycling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    /// min/km
    Pace(f64),
    /// km/h
    Speed(f64),
}

impl Metric {
    pub const fn value(self) -> f64 {
        match self {
            Self::Pace(v) | Self::Speed(v) => v,
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Pace(_) => "min/km",
            Self::Speed(_) => "km/h",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    id: WorkoutId,
    created_at: DateTime<Utc>,
    coords: Coordinates,
    distance_km: f64,
    duration_min: f64,
    kind: WorkoutKind,
}

impl Workout {
    pub fn running(
        coords: Coordinates,
        distance_km: f64,
        duration_min: f64,
        cadence_steps_per_min: f64,
    ) -> Result<Self, WorkoutError> {
        Self::running_at(
            Utc::now(),
            coords,
            distance_km,
            duration_min,
            cadence_steps_per_min,
        )
    }

    pub fn cycling(
        coords: Coordinates,
        distance_km: f64,
        duration_min: f64,
        elevation_gain_m: f64,
    ) -> Result<Self, WorkoutError> {
        Self::cycling_at(
            Utc::now(),
            coords,
            distance_km,
            duration_min,
            elevation_gain_m,
        )
    }

    pub(crate) fn running_at(
        created_at: DateTime<Utc>,
        coords: Coordinates,
        distance_km: f64,
        duration_min: f64,
        cadence_steps_per_min: f64,
    ) -> Result<Self, WorkoutError> {
        ensure_positive("distance", distance_km)?;
        ensure_positive("duration", duration_min)?;
        ensure_positive("cadence", cadence_steps_per_min)?;

        let kind = WorkoutKind::Running {
            cadence_steps_per_min,
            pace_min_per_km: duration_min / distance_km,
        };
        Ok(Self {
            id: next_id(created_at),
            created_at,
            coords,
            distance_km,
            duration_min,
            kind,
        })
    }

    pub(crate) fn cycling_at(
        created_at: DateTime<Utc>,
        coords: Coordinates,
        distance_km: f64,
        duration_min: f64,
        elevation_gain_m: f64,
    ) -> Result<Self, WorkoutError> {
        ensure_positive("distance", distance_km)?;
        ensure_positive("duration", duration_min)?;
        if !elevation_gain_m.is_finite() || elevation_gain_m < 0.0 {
            return Err(WorkoutError::InvalidInput {
                field: "elevation",
                value: elevation_gain_m,
            });
        }

        let kind = WorkoutKind::Cycling {
            elevation_gain_m,
            speed_km_per_hr: distance_km / (duration_min / 60.0),
        };
        Ok(Self {
            id: next_id(created_at),
            created_at,
            coords,
            distance_km,
            duration_min,
            kind,
        })
    }

    /// Reassembles a stored workout as-is. No validation, no recomputation.
    pub(crate) const fn from_parts(
        id: WorkoutId,
        created_at: DateTime<Utc>,
        coords: Coordinates,
        distance_km: f64,
        duration_min: f64,
        kind: WorkoutKind,
    ) -> Self {
        Self {
            id,
            created_at,
            coords,
            distance_km,
            duration_min,
            kind,
        }
    }

    pub const fn id(&self) -> &WorkoutId {
        &self.id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn coords(&self) -> Coordinates {
        self.coords
    }

    pub const fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub const fn duration_min(&self) -> f64 {
        self.duration_min
    }

    pub const fn kind(&self) -> &WorkoutKind {
        &self.kind
    }

    pub const fn workout_type(&self) -> WorkoutType {
        self.kind.workout_type()
    }

    pub const fn metric(&self) -> Metric {
        match self.kind {
            WorkoutKind::Running {
                pace_min_per_km, ..
            } => Metric::Pace(pace_min_per_km),
            WorkoutKind::Cycling {
                speed_km_per_hr, ..
            } => Metric::Speed(speed_km_per_hr),
        }
    }

    /// Cadence (spm) or elevation gain (m), with its unit.
    pub const fn variant_value(&self) -> (f64, &'static str) {
        match self.kind {
            WorkoutKind::Running {
                cadence_steps_per_min,
                ..
            } => (cadence_steps_per_min, "spm"),
            WorkoutKind::Cycling {
                elevation_gain_m, ..
            } => (elevation_gain_m, "m"),
        }
    }

    /// "Running on April 14", from the UTC date of creation.
    pub fn label(&self) -> String {
        format!(
            "{} on {}",
            self.workout_type().title(),
            self.created_at.format("%B %-d")
        )
    }
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), WorkoutError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(WorkoutError::InvalidInput { field, value })
    }
}
