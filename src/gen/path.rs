//! Hierarchy Coordinates
//!
//! A [`CoordinatePath`] names one node of the universe by descending
//! from the root: sector -> star system -> planet -> moon -> a chain of
//! trixel subdivision indices for a surface patch. The path's shape
//! determines the object's [`ObjectKind`].

use serde::{Deserialize, Serialize};

/// Deepest supported trixel subdivision (27 three-bit levels).
pub const MAX_TRIXEL_DEPTH: usize = 27;

/// Moon-field sentinel meaning "land on the planet body itself".
pub const MOON_SENTINEL: u16 = 0xFFFF;

/// Largest legal trixel index at any level (3-bit fields).
pub const MAX_TRIXEL: u8 = 7;

/// The kind of object a path or token id names.
///
/// Wire codes: 0 sector, 1 system, 2 planet, 3 moon, 4..=30 land at
/// subdivision depth `code - 3`. Code 31 is reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A 3D grid cell of the universe.
    Sector,
    /// A star system within a sector.
    System,
    /// A planet orbiting a system's star.
    Planet,
    /// A moon orbiting a planet.
    Moon,
    /// A surface patch at the given subdivision depth (1..=27).
    Land(u8),
}

impl ObjectKind {
    /// The 5-bit wire code for this kind.
    pub fn code(self) -> u8 {
        match self {
            ObjectKind::Sector => 0,
            ObjectKind::System => 1,
            ObjectKind::Planet => 2,
            ObjectKind::Moon => 3,
            ObjectKind::Land(depth) => 3 + depth,
        }
    }

    /// Decode a 5-bit wire code. Returns `None` for the reserved code 31
    /// and anything above it.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ObjectKind::Sector),
            1 => Some(ObjectKind::System),
            2 => Some(ObjectKind::Planet),
            3 => Some(ObjectKind::Moon),
            c if (4..=(3 + MAX_TRIXEL_DEPTH as u8)).contains(&c) => {
                Some(ObjectKind::Land(c - 3))
            }
            _ => None,
        }
    }
}

/// A node address in the generation hierarchy.
///
/// Variants carry every index on the way down from the root. Fields are
/// plain data; [`CoordinatePath::validate`] checks shape invariants
/// before a path is encoded or described.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinatePath {
    /// A sector cell.
    Sector {
        /// Sector x coordinate.
        x: u16,
        /// Sector y coordinate.
        y: u16,
        /// Sector z coordinate.
        z: u16,
    },
    /// A star system.
    System {
        /// Sector x coordinate.
        x: u16,
        /// Sector y coordinate.
        y: u16,
        /// Sector z coordinate.
        z: u16,
        /// Star system index within the sector.
        system: u16,
    },
    /// A planet.
    Planet {
        /// Sector x coordinate.
        x: u16,
        /// Sector y coordinate.
        y: u16,
        /// Sector z coordinate.
        z: u16,
        /// Star system index within the sector.
        system: u16,
        /// Planet index within the system.
        planet: u16,
    },
    /// A moon.
    Moon {
        /// Sector x coordinate.
        x: u16,
        /// Sector y coordinate.
        y: u16,
        /// Sector z coordinate.
        z: u16,
        /// Star system index within the sector.
        system: u16,
        /// Planet index within the system.
        planet: u16,
        /// Moon index within the planet.
        moon: u16,
    },
    /// A surface patch on a planet or moon.
    Land {
        /// Sector x coordinate.
        x: u16,
        /// Sector y coordinate.
        y: u16,
        /// Sector z coordinate.
        z: u16,
        /// Star system index within the sector.
        system: u16,
        /// Planet index within the system.
        planet: u16,
        /// Moon carrying the patch; `None` means the planet body itself.
        moon: Option<u16>,
        /// Trixel subdivision chain, outermost first. 1..=27 entries,
        /// each in 0..=7.
        trixels: Vec<u8>,
    },
}

/// Shape violations in a [`CoordinatePath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A land path has no trixel levels or more than [`MAX_TRIXEL_DEPTH`].
    #[error("trixel depth {0} outside 1..={max}", max = MAX_TRIXEL_DEPTH)]
    BadTrixelDepth(usize),

    /// A trixel index does not fit its 3-bit field.
    #[error("trixel index {0} outside 0..=7")]
    BadTrixelIndex(u8),

    /// A literal moon index collides with the land sentinel.
    #[error("moon index 0xFFFF is reserved as the on-planet sentinel")]
    ReservedMoonIndex,
}

impl CoordinatePath {
    /// The kind this path names.
    pub fn kind(&self) -> ObjectKind {
        match self {
            CoordinatePath::Sector { .. } => ObjectKind::Sector,
            CoordinatePath::System { .. } => ObjectKind::System,
            CoordinatePath::Planet { .. } => ObjectKind::Planet,
            CoordinatePath::Moon { .. } => ObjectKind::Moon,
            CoordinatePath::Land { trixels, .. } => ObjectKind::Land(trixels.len() as u8),
        }
    }

    /// Sector coordinates, common to every variant.
    pub fn sector(&self) -> (u16, u16, u16) {
        match *self {
            CoordinatePath::Sector { x, y, z }
            | CoordinatePath::System { x, y, z, .. }
            | CoordinatePath::Planet { x, y, z, .. }
            | CoordinatePath::Moon { x, y, z, .. }
            | CoordinatePath::Land { x, y, z, .. } => (x, y, z),
        }
    }

    /// Check shape invariants: trixel depth within 1..=27, trixel
    /// indices within 3 bits, literal moon indices distinct from the
    /// on-planet sentinel.
    pub fn validate(&self) -> Result<(), PathError> {
        match self {
            CoordinatePath::Moon { moon, .. } if *moon == MOON_SENTINEL => {
                Err(PathError::ReservedMoonIndex)
            }
            CoordinatePath::Land { moon, trixels, .. } => {
                if let Some(m) = moon {
                    if *m == MOON_SENTINEL {
                        return Err(PathError::ReservedMoonIndex);
                    }
                }
                if trixels.is_empty() || trixels.len() > MAX_TRIXEL_DEPTH {
                    return Err(PathError::BadTrixelDepth(trixels.len()));
                }
                if let Some(&bad) = trixels.iter().find(|&&t| t > MAX_TRIXEL) {
                    return Err(PathError::BadTrixelIndex(bad));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_roundtrip() {
        let kinds = [
            ObjectKind::Sector,
            ObjectKind::System,
            ObjectKind::Planet,
            ObjectKind::Moon,
            ObjectKind::Land(1),
            ObjectKind::Land(13),
            ObjectKind::Land(27),
        ];
        for kind in kinds {
            assert_eq!(ObjectKind::from_code(kind.code()), Some(kind));
        }
    }

    #[test]
    fn test_reserved_codes_rejected() {
        assert_eq!(ObjectKind::from_code(31), None);
        assert_eq!(ObjectKind::from_code(32), None);
        assert_eq!(ObjectKind::from_code(255), None);
        // Deepest land kind uses code 30.
        assert_eq!(ObjectKind::from_code(30), Some(ObjectKind::Land(27)));
    }

    #[test]
    fn test_path_kinds() {
        let land = CoordinatePath::Land {
            x: 1,
            y: 2,
            z: 3,
            system: 0,
            planet: 0,
            moon: None,
            trixels: vec![5, 2, 7],
        };
        assert_eq!(land.kind(), ObjectKind::Land(3));
        assert_eq!(land.kind().code(), 6);
        assert_eq!(land.sector(), (1, 2, 3));
    }

    #[test]
    fn test_validate() {
        let good = CoordinatePath::Land {
            x: 0,
            y: 0,
            z: 0,
            system: 1,
            planet: 1,
            moon: Some(2),
            trixels: vec![7; 27],
        };
        assert!(good.validate().is_ok());

        let too_deep = CoordinatePath::Land {
            x: 0,
            y: 0,
            z: 0,
            system: 1,
            planet: 1,
            moon: None,
            trixels: vec![0; 28],
        };
        assert_eq!(too_deep.validate(), Err(PathError::BadTrixelDepth(28)));

        let empty = CoordinatePath::Land {
            x: 0,
            y: 0,
            z: 0,
            system: 1,
            planet: 1,
            moon: None,
            trixels: vec![],
        };
        assert_eq!(empty.validate(), Err(PathError::BadTrixelDepth(0)));

        let overflow = CoordinatePath::Land {
            x: 0,
            y: 0,
            z: 0,
            system: 1,
            planet: 1,
            moon: None,
            trixels: vec![8],
        };
        assert_eq!(overflow.validate(), Err(PathError::BadTrixelIndex(8)));

        let sentinel_moon = CoordinatePath::Moon {
            x: 0,
            y: 0,
            z: 0,
            system: 0,
            planet: 0,
            moon: MOON_SENTINEL,
        };
        assert_eq!(sentinel_moon.validate(), Err(PathError::ReservedMoonIndex));
    }
}
