use crate::dlog;
use crate::workout::{Coordinates, Workout, WorkoutId, WorkoutKind, WorkoutType, observe_id};
use crate::workout_log::WorkoutLog;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the single entry holding the serialized log.
pub const WORKOUTS_KEY: &str = "workouts";

/// Named blobs, read and written whole.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, blob: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating dir: {}", parent.display()))?;
        }

        let display = path.display();
        let conn =
            Connection::open(path).with_context(|| format!("Opening SQLite store: {display}"))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Opening in-memory SQLite store")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS kv (
              key    TEXT PRIMARY KEY,
              value  TEXT NOT NULL
            );
            ",
        )
        .context("Ensuring SQLite store schema")?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Loading store entry {key:?}"))
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        self.conn
            .execute(
                r"
                INSERT INTO kv (key, value) VALUES (?1, ?2)
                ON CONFLICT (key) DO UPDATE SET value = excluded.value
                ",
                [key, blob],
            )
            .with_context(|| format!("Saving store entry {key:?}"))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .with_context(|| format!("Removing store entry {key:?}"))?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One workout as stored: a flat record, variant fields present only for
/// their own type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    pub id: WorkoutId,
    pub created_at: DateTime<Utc>,
    pub coordinates: Coordinates,
    pub distance_km: f64,
    pub duration_min: f64,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence_steps_per_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_gain_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace_min_per_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_km_per_hr: Option<f64>,
    #[serde(default)]
    pub label: String,
}

impl From<&Workout> for WorkoutRecord {
    fn from(w: &Workout) -> Self {
        let (cadence, elevation, pace, speed) = match *w.kind() {
            WorkoutKind::Running {
                cadence_steps_per_min,
                pace_min_per_km,
            } => (
                Some(cadence_steps_per_min),
                None,
                Some(pace_min_per_km),
                None,
            ),
            WorkoutKind::Cycling {
                elevation_gain_m,
                speed_km_per_hr,
            } => (None, Some(elevation_gain_m), None, Some(speed_km_per_hr)),
        };

        Self {
            id: w.id().clone(),
            created_at: w.created_at(),
            coordinates: w.coords(),
            distance_km: w.distance_km(),
            duration_min: w.duration_min(),
            workout_type: w.workout_type(),
            cadence_steps_per_min: cadence,
            elevation_gain_m: elevation,
            pace_min_per_km: pace,
            speed_km_per_hr: speed,
            label: w.label(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{workout_type} workout {id} has no usable {field}")]
pub struct MalformedRecord {
    pub id: WorkoutId,
    pub workout_type: WorkoutType,
    pub field: &'static str,
}

impl TryFrom<WorkoutRecord> for Workout {
    type Error = MalformedRecord;

    /// Stored values are taken as ground truth: no validation. A missing
    /// derived metric is recomputed, but only from a positive distance and
    /// duration.
    fn try_from(r: WorkoutRecord) -> Result<Self, Self::Error> {
        let missing = |field| MalformedRecord {
            id: r.id.clone(),
            workout_type: r.workout_type,
            field,
        };
        let computable = r.distance_km > 0.0 && r.duration_min > 0.0;

        let kind = match r.workout_type {
            WorkoutType::Running => WorkoutKind::Running {
                cadence_steps_per_min: r
                    .cadence_steps_per_min
                    .ok_or_else(|| missing("cadenceStepsPerMin"))?,
                pace_min_per_km: r
                    .pace_min_per_km
                    .or_else(|| computable.then(|| r.duration_min / r.distance_km))
                    .ok_or_else(|| missing("paceMinPerKm"))?,
            },
            WorkoutType::Cycling => WorkoutKind::Cycling {
                elevation_gain_m: r
                    .elevation_gain_m
                    .ok_or_else(|| missing("elevationGainM"))?,
                speed_km_per_hr: r
                    .speed_km_per_hr
                    .or_else(|| computable.then(|| r.distance_km / (r.duration_min / 60.0)))
                    .ok_or_else(|| missing("speedKmPerHr"))?,
            },
        };

        Ok(Self::from_parts(
            r.id,
            r.created_at,
            r.coordinates,
            r.distance_km,
            r.duration_min,
            kind,
        ))
    }
}

pub fn serialize_workouts(workouts: &[Workout]) -> Result<String> {
    let records: Vec<WorkoutRecord> = workouts.iter().map(WorkoutRecord::from).collect();
    serde_json::to_string(&records).context("Serializing workouts")
}

#[derive(Debug, Default)]
pub struct Hydration {
    pub workouts: Vec<Workout>,
    pub skipped: usize,
}

/// Rebuilds typed workouts from a stored blob.
///
/// The blob must be a JSON array; entries that don't describe a workout are
/// skipped with a warning. Restored ids are fed to the id generator so new
/// workouts never reuse them.
pub fn hydrate(blob: &str) -> Result<Hydration> {
    let entries: Vec<JsonValue> =
        serde_json::from_str(blob).context("Stored workouts are not a JSON array")?;

    let mut out = Hydration {
        workouts: Vec::with_capacity(entries.len()),
        skipped: 0,
    };

    for (idx, entry) in entries.into_iter().enumerate() {
        let record = match serde_json::from_value::<WorkoutRecord>(entry) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(idx, err = %e, "skipping unreadable stored workout");
                out.skipped += 1;
                continue;
            }
        };

        match Workout::try_from(record) {
            Ok(w) => {
                observe_id(w.id());
                out.workouts.push(w);
            }
            Err(e) => {
                tracing::warn!(idx, err = %e, "skipping malformed stored workout");
                out.skipped += 1;
            }
        }
    }

    Ok(out)
}

/// Writes the whole log under [`WORKOUTS_KEY`].
pub fn persist<S: KeyValueStore + ?Sized>(store: &mut S, log: &WorkoutLog) -> Result<()> {
    let blob = serialize_workouts(log.all())?;
    store.save(WORKOUTS_KEY, &blob)?;
    dlog!("persisted workouts={} bytes={}", log.len(), blob.len());
    Ok(())
}

/// Replaces the log with the stored workouts, if any. Returns how many were
/// restored.
pub fn restore<S: KeyValueStore + ?Sized>(store: &S, log: &mut WorkoutLog) -> Result<usize> {
    let Some(blob) = store.load(WORKOUTS_KEY)? else {
        dlog!("no stored workouts");
        return Ok(0);
    };

    let Hydration { workouts, skipped } = hydrate(&blob)?;
    let restored = workouts.len();
    log.replace_all(workouts);
    tracing::info!(restored, skipped, "restored workouts");
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_log() -> WorkoutLog {
        let mut log = WorkoutLog::new();
        let at = Utc.with_ymd_and_hms(2024, 4, 14, 7, 5, 0).unwrap();
        log.append(
            Workout::running_at(at, Coordinates::new(51.5, -0.12), 5.2, 24.0, 178.0).unwrap(),
        );
        log.append(
            Workout::cycling_at(at, Coordinates::new(45.9, 6.87), 20.0, 95.0, 524.0).unwrap(),
        );
        log
    }

    #[test]
    fn serialized_layout_has_only_variant_fields() {
        let log = sample_log();
        let blob = serialize_workouts(log.all()).unwrap();
        let v: JsonValue = serde_json::from_str(&blob).unwrap();

        let run = &v[0];
        assert_eq!(run["type"], "running");
        assert_eq!(run["coordinates"], serde_json::json!([51.5, -0.12]));
        assert_eq!(run["distanceKm"], 5.2);
        assert_eq!(run["cadenceStepsPerMin"], 178.0);
        assert_eq!(run["paceMinPerKm"], 24.0 / 5.2);
        assert_eq!(run["label"], "Running on April 14");
        assert_eq!(run["createdAt"], "2024-04-14T07:05:00Z");
        assert!(run.get("elevationGainM").is_none());
        assert!(run.get("speedKmPerHr").is_none());

        let ride = &v[1];
        assert_eq!(ride["type"], "cycling");
        assert_eq!(ride["elevationGainM"], 524.0);
        assert!(ride.get("cadenceStepsPerMin").is_none());
    }

    #[test]
    fn hydration_rebuilds_typed_workouts() {
        let log = sample_log();
        let blob = serialize_workouts(log.all()).unwrap();

        let h = hydrate(&blob).unwrap();
        assert_eq!(h.skipped, 0);
        assert_eq!(h.workouts, log.all());
        assert_eq!(serialize_workouts(&h.workouts).unwrap(), blob);
    }

    #[test]
    fn hydration_adopts_stored_metric_verbatim() {
        let blob = r#"[{
            "id": "1713078300000",
            "createdAt": "2024-04-14T07:05:00Z",
            "coordinates": [51.5, -0.12],
            "distanceKm": 5.0,
            "durationMin": 25.0,
            "type": "running",
            "cadenceStepsPerMin": 170,
            "paceMinPerKm": 4.9,
            "label": "Running on April 14"
        }]"#;

        let h = hydrate(blob).unwrap();
        assert_eq!(h.workouts.len(), 1);
        assert_eq!(h.workouts[0].metric().value(), 4.9);
    }

    #[test]
    fn hydration_recomputes_missing_metric() {
        let blob = r#"[{
            "id": "1",
            "createdAt": "2024-04-14T07:05:00Z",
            "coordinates": [0.0, 0.0],
            "distanceKm": 30.0,
            "durationMin": 60.0,
            "type": "cycling",
            "elevationGainM": 0
        }]"#;

        let h = hydrate(blob).unwrap();
        assert_eq!(h.workouts[0].metric().value(), 30.0);
    }

    #[test]
    fn inexact_metric_survives_round_trip() {
        let w = Workout::cycling(Coordinates::new(45.9, 6.87), 20.0, 95.0, 524.0).unwrap();
        let before = w.metric();
        let blob = serialize_workouts(std::slice::from_ref(&w)).unwrap();

        let h = hydrate(&blob).unwrap();
        assert_eq!(h.workouts[0].metric(), before);
        assert_eq!(before.value(), 20.0 / (95.0 / 60.0));
    }

    #[test]
    fn metric_is_not_recomputed_from_non_positive_inputs() {
        let blob = r#"[
            {"id": "1", "createdAt": "2024-04-14T07:05:00Z", "coordinates": [0, 0],
             "distanceKm": 0, "durationMin": 20, "type": "running", "cadenceStepsPerMin": 160},
            {"id": "2", "createdAt": "2024-04-14T07:05:00Z", "coordinates": [0, 0],
             "distanceKm": 12, "durationMin": -5, "type": "cycling", "elevationGainM": 40},
            {"id": "3", "createdAt": "2024-04-14T07:05:00Z", "coordinates": [0, 0],
             "distanceKm": 0, "durationMin": 20, "type": "running", "cadenceStepsPerMin": 160,
             "paceMinPerKm": 4.5}
        ]"#;

        let h = hydrate(blob).unwrap();
        assert_eq!(h.skipped, 2);
        assert_eq!(h.workouts.len(), 1);
        assert_eq!(h.workouts[0].metric().value(), 4.5);

        let reserialized = serialize_workouts(&h.workouts).unwrap();
        assert!(!reserialized.contains("null"));
    }

    #[test]
    fn new_ids_never_reuse_restored_ones() {
        let blob = r#"[{
            "id": "1713078300000",
            "createdAt": "2024-04-14T07:05:00Z",
            "coordinates": [0.0, 0.0],
            "distanceKm": 5.0,
            "durationMin": 25.0,
            "type": "running",
            "cadenceStepsPerMin": 170
        }]"#;
        let mut store = MemoryStore::new();
        store.save(WORKOUTS_KEY, blob).unwrap();

        let mut log = WorkoutLog::new();
        restore(&store, &mut log).unwrap();

        let at = Utc.with_ymd_and_hms(2024, 4, 14, 7, 5, 0).unwrap();
        let home = Coordinates::new(51.5, -0.12);
        let fresh = Workout::running_at(at, home, 3.0, 18.0, 175.0).unwrap();
        assert_ne!(fresh.id().as_str(), "1713078300000");

        let id = fresh.id().clone();
        log.append(fresh);
        assert_eq!(log.iter().filter(|w| w.id() == &id).count(), 1);
        assert_eq!(log.find_by_id(&id).unwrap().coords(), home);
    }

    #[test]
    fn hydration_skips_malformed_entries() {
        let blob = r#"[
            42,
            {"id": "1", "createdAt": "2024-04-14T07:05:00Z", "coordinates": [0, 0],
             "distanceKm": 3, "durationMin": 20, "type": "swimming"},
            {"id": "2", "createdAt": "2024-04-14T07:05:00Z", "coordinates": [0, 0],
             "distanceKm": 3, "durationMin": 20, "type": "running"},
            {"id": "3", "createdAt": "2024-04-14T07:05:00Z", "coordinates": [0, 0],
             "distanceKm": 3, "durationMin": 20, "type": "running", "cadenceStepsPerMin": 160}
        ]"#;

        let h = hydrate(blob).unwrap();
        assert_eq!(h.skipped, 3);
        assert_eq!(h.workouts.len(), 1);
        assert_eq!(h.workouts[0].id().as_str(), "3");
    }

    #[test]
    fn non_array_blob_is_an_error() {
        assert!(hydrate(r#"{"workouts": []}"#).is_err());
        assert!(hydrate("not json").is_err());
    }

    #[test]
    fn persist_then_restore_through_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("waymark.sqlite");
        let log = sample_log();

        {
            let mut store = SqliteStore::open(&path).unwrap();
            persist(&mut store, &log).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let mut restored = WorkoutLog::new();
        assert_eq!(restore(&store, &mut restored).unwrap(), 2);
        assert_eq!(restored.all(), log.all());
    }

    #[test]
    fn sqlite_save_overwrites_and_remove_deletes() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.load("k").unwrap(), None);

        store.save("k", "one").unwrap();
        store.save("k", "two").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("two"));

        store.remove("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn restore_without_entry_leaves_log_untouched() {
        let store = MemoryStore::new();
        let mut log = sample_log();
        assert_eq!(restore(&store, &mut log).unwrap(), 0);
        assert_eq!(log.len(), 2);
    }
}
