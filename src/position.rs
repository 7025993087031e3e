use crate::workout::Coordinates;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    #[error("no position source is configured")]
    Unsupported,
    #[error("position access was denied")]
    Denied,
}

/// Single-shot position lookup: a coordinate, or the reason there is none.
pub trait PositionSource {
    fn locate(&self) -> Result<Coordinates, PositionError>;
}

/// A position known up front (e.g. `--home`), or none at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPosition(pub Option<Coordinates>);

impl PositionSource for FixedPosition {
    fn locate(&self) -> Result<Coordinates, PositionError> {
        self.0.ok_or(PositionError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_position_reports_its_coordinate() {
        let c = Coordinates::new(47.37, 8.54);
        assert_eq!(FixedPosition(Some(c)).locate(), Ok(c));
        assert_eq!(
            FixedPosition::default().locate(),
            Err(PositionError::Unsupported)
        );
    }
}
