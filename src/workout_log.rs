use crate::workout::{Workout, WorkoutError, WorkoutId};

/// Workouts of one session, in insertion order (most recent last).
///
/// Pure in-memory: persisting after a mutation is up to the caller.
#[derive(Debug, Default, Clone)]
pub struct WorkoutLog {
    workouts: Vec<Workout>,
}

impl WorkoutLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, workout: Workout) {
        self.workouts.push(workout);
    }

    pub fn find_by_id(&self, id: &WorkoutId) -> Result<&Workout, WorkoutError> {
        self.workouts
            .iter()
            .find(|w| w.id() == id)
            .ok_or_else(|| WorkoutError::NotFound(id.clone()))
    }

    pub fn all(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workout> {
        self.workouts.iter()
    }

    /// Adopts `workouts` verbatim, dropping whatever was there.
    pub fn replace_all(&mut self, workouts: Vec<Workout>) {
        self.workouts = workouts;
    }

    pub fn clear(&mut self) {
        self.workouts.clear();
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}
