//! Token Identifiers
//!
//! Bit-packs a [`CoordinatePath`] into one 256-bit integer so any object
//! in the hierarchy can be named, owned, and transferred as a single id.
//!
//! ## Field layout (bit offset, low to high)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  [0..5)    kind code (5 bits)                               │
//! │  [5..21)   sector.x           kind >= sector                │
//! │  [21..37)  sector.y                                         │
//! │  [37..53)  sector.z                                         │
//! │  [53..69)  system index       kind >= system                │
//! │  [69..85)  planet index       kind >= planet                │
//! │  [85..101) moon index or      kind >= moon                  │
//! │            0xFFFF sentinel (land on the planet itself)      │
//! │  [101..)   trixel chain, one 3-bit field per level,         │
//! │            land kinds only, up to 27 fields (bit 182)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every bit above the fields implied by the kind must be zero; decode
//! rejects anything else, which catches malformed or adversarially
//! crafted ids.

use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::path::{CoordinatePath, ObjectKind, PathError, MOON_SENTINEL};

/// Bit offsets of the packed fields.
const KIND_OFFSET: u32 = 0;
const KIND_WIDTH: u32 = 5;
const X_OFFSET: u32 = 5;
const Y_OFFSET: u32 = 21;
const Z_OFFSET: u32 = 37;
const SYSTEM_OFFSET: u32 = 53;
const PLANET_OFFSET: u32 = 69;
const MOON_OFFSET: u32 = 85;
const TRIXEL_OFFSET: u32 = 101;
const TRIXEL_WIDTH: u32 = 3;
const FIELD_WIDTH: u32 = 16;

/// A packed object identifier: 256 bits as four little-endian 64-bit
/// limbs. Nobody owns a token id inherently; it is a pure function of
/// the coordinate path it encodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenId([u64; 4]);

/// Decoding failures. Encoding fails only on paths whose shape is
/// already illegal ([`PathError`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    /// The kind discriminator, field contents, or high bits violate the
    /// packing invariants.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// The coordinate path handed to `encode` has an illegal shape.
    #[error(transparent)]
    BadPath(#[from] PathError),
}

impl TokenId {
    /// Raw limbs, low to high.
    pub const fn limbs(self) -> [u64; 4] {
        self.0
    }

    /// Rebuild from raw limbs.
    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    /// Read `width` bits starting at `offset`.
    fn get_bits(self, offset: u32, width: u32) -> u64 {
        let mut value = 0u64;
        for i in 0..width {
            let bit = offset + i;
            let limb = (bit / 64) as usize;
            let pos = bit % 64;
            value |= ((self.0[limb] >> pos) & 1) << i;
        }
        value
    }

    /// Write `width` bits starting at `offset`. `value` must fit.
    fn set_bits(&mut self, offset: u32, width: u32, value: u64) {
        debug_assert!(width == 64 || value < (1 << width));
        for i in 0..width {
            let bit = offset + i;
            let limb = (bit / 64) as usize;
            let pos = bit % 64;
            self.0[limb] |= ((value >> i) & 1) << pos;
        }
    }

    /// True if any bit at or above `offset` is set.
    fn has_bits_from(self, offset: u32) -> bool {
        for (index, &limb) in self.0.iter().enumerate() {
            let limb_start = index as u32 * 64;
            let limb_end = limb_start + 64;
            if limb_end <= offset {
                continue;
            }
            let mask = if offset <= limb_start {
                u64::MAX
            } else {
                u64::MAX << (offset - limb_start)
            };
            if limb & mask != 0 {
                return true;
            }
        }
        false
    }

    /// First bit above the fields implied by `kind`.
    fn used_bits(kind: ObjectKind) -> u32 {
        match kind {
            ObjectKind::Sector => SYSTEM_OFFSET,
            ObjectKind::System => PLANET_OFFSET,
            ObjectKind::Planet => MOON_OFFSET,
            ObjectKind::Moon => TRIXEL_OFFSET,
            ObjectKind::Land(depth) => TRIXEL_OFFSET + TRIXEL_WIDTH * depth as u32,
        }
    }

    /// Pack a coordinate path.
    ///
    /// Total for every legal-shape path; the only failure mode is a path
    /// that violates its own shape invariants (checked up front).
    pub fn encode(path: &CoordinatePath) -> Result<Self, IdentError> {
        path.validate()?;

        let mut id = TokenId::default();
        id.set_bits(KIND_OFFSET, KIND_WIDTH, path.kind().code() as u64);
        let (x, y, z) = path.sector();
        id.set_bits(X_OFFSET, FIELD_WIDTH, x as u64);
        id.set_bits(Y_OFFSET, FIELD_WIDTH, y as u64);
        id.set_bits(Z_OFFSET, FIELD_WIDTH, z as u64);

        match path {
            CoordinatePath::Sector { .. } => {}
            CoordinatePath::System { system, .. } => {
                id.set_bits(SYSTEM_OFFSET, FIELD_WIDTH, *system as u64);
            }
            CoordinatePath::Planet { system, planet, .. } => {
                id.set_bits(SYSTEM_OFFSET, FIELD_WIDTH, *system as u64);
                id.set_bits(PLANET_OFFSET, FIELD_WIDTH, *planet as u64);
            }
            CoordinatePath::Moon {
                system,
                planet,
                moon,
                ..
            } => {
                id.set_bits(SYSTEM_OFFSET, FIELD_WIDTH, *system as u64);
                id.set_bits(PLANET_OFFSET, FIELD_WIDTH, *planet as u64);
                id.set_bits(MOON_OFFSET, FIELD_WIDTH, *moon as u64);
            }
            CoordinatePath::Land {
                system,
                planet,
                moon,
                trixels,
                ..
            } => {
                id.set_bits(SYSTEM_OFFSET, FIELD_WIDTH, *system as u64);
                id.set_bits(PLANET_OFFSET, FIELD_WIDTH, *planet as u64);
                let moon_field = moon.unwrap_or(MOON_SENTINEL);
                id.set_bits(MOON_OFFSET, FIELD_WIDTH, moon_field as u64);
                for (level, &trixel) in trixels.iter().enumerate() {
                    id.set_bits(
                        TRIXEL_OFFSET + TRIXEL_WIDTH * level as u32,
                        TRIXEL_WIDTH,
                        trixel as u64,
                    );
                }
            }
        }
        Ok(id)
    }

    /// Unpack a token id back into its coordinate path.
    ///
    /// Exact inverse of [`TokenId::encode`] for well-formed ids. Fails
    /// with `MalformedIdentifier` when the kind code is undefined, when
    /// any bit above the implied fields is set, or when field contents
    /// violate the path invariants (a literal moon index equal to the
    /// on-planet sentinel, for example).
    pub fn decode(self) -> Result<CoordinatePath, IdentError> {
        let code = self.get_bits(KIND_OFFSET, KIND_WIDTH) as u8;
        let kind = ObjectKind::from_code(code).ok_or_else(|| {
            IdentError::MalformedIdentifier(format!("undefined kind code {}", code))
        })?;

        if self.has_bits_from(Self::used_bits(kind)) {
            return Err(IdentError::MalformedIdentifier(format!(
                "nonzero bits beyond the fields implied by kind {:?}",
                kind
            )));
        }

        let x = self.get_bits(X_OFFSET, FIELD_WIDTH) as u16;
        let y = self.get_bits(Y_OFFSET, FIELD_WIDTH) as u16;
        let z = self.get_bits(Z_OFFSET, FIELD_WIDTH) as u16;
        let system = self.get_bits(SYSTEM_OFFSET, FIELD_WIDTH) as u16;
        let planet = self.get_bits(PLANET_OFFSET, FIELD_WIDTH) as u16;
        let moon = self.get_bits(MOON_OFFSET, FIELD_WIDTH) as u16;

        let path = match kind {
            ObjectKind::Sector => CoordinatePath::Sector { x, y, z },
            ObjectKind::System => CoordinatePath::System { x, y, z, system },
            ObjectKind::Planet => CoordinatePath::Planet {
                x,
                y,
                z,
                system,
                planet,
            },
            ObjectKind::Moon => CoordinatePath::Moon {
                x,
                y,
                z,
                system,
                planet,
                moon,
            },
            ObjectKind::Land(depth) => {
                let trixels: Vec<u8> = (0..depth as u32)
                    .map(|level| {
                        self.get_bits(TRIXEL_OFFSET + TRIXEL_WIDTH * level, TRIXEL_WIDTH)
                            as u8
                    })
                    .collect();
                CoordinatePath::Land {
                    x,
                    y,
                    z,
                    system,
                    planet,
                    moon: if moon == MOON_SENTINEL { None } else { Some(moon) },
                    trixels,
                }
            }
        };

        // A Moon id carrying the sentinel has no meaning.
        if let CoordinatePath::Moon { moon, .. } = &path {
            if *moon == MOON_SENTINEL {
                return Err(IdentError::MalformedIdentifier(
                    "moon kind with sentinel moon index".into(),
                ));
            }
        }

        Ok(path)
    }

    /// The kind encoded in the low bits, without a full decode. The
    /// reserved code 31 yields `None`.
    pub fn kind(self) -> Option<ObjectKind> {
        ObjectKind::from_code(self.get_bits(KIND_OFFSET, KIND_WIDTH) as u8)
    }

    /// Canonical 64-character lowercase hex, most significant limb first.
    pub fn to_hex(self) -> String {
        let mut bytes = [0u8; 32];
        for (index, limb) in self.0.iter().rev().enumerate() {
            bytes[index * 8..(index + 1) * 8].copy_from_slice(&limb.to_be_bytes());
        }
        hex::encode(bytes)
    }

    /// Parse the canonical hex form.
    pub fn from_hex(text: &str) -> Result<Self, IdentError> {
        let bytes = hex::decode(text)
            .map_err(|e| IdentError::MalformedIdentifier(format!("bad hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(IdentError::MalformedIdentifier(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut limbs = [0u64; 4];
        for (index, chunk) in bytes.chunks_exact(8).enumerate() {
            limbs[3 - index] = u64::from_be_bytes(chunk.try_into().expect("8 bytes"));
        }
        Ok(Self(limbs))
    }

    /// The packed value as 32 little-endian bytes, for hashing into a
    /// claim commitment.
    pub fn to_le_bytes(self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (index, limb) in self.0.iter().enumerate() {
            bytes[index * 8..(index + 1) * 8].copy_from_slice(&limb.to_le_bytes());
        }
        bytes
    }
}

// Numeric ordering: most significant limb decides first.
impl Ord for TokenId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for index in (0..4).rev() {
            match self.0[index].cmp(&other.0[index]) {
                std::cmp::Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl PartialOrd for TokenId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.to_hex())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Hex-string serde so token ids can key JSON maps.
impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TokenId::from_hex(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(path: CoordinatePath) {
        let id = TokenId::encode(&path).unwrap();
        let back = id.decode().unwrap();
        assert_eq!(back, path, "via {}", id);
    }

    #[test]
    fn test_roundtrip_every_kind() {
        roundtrip(CoordinatePath::Sector { x: 0, y: 0, z: 0 });
        roundtrip(CoordinatePath::Sector {
            x: u16::MAX,
            y: u16::MAX,
            z: u16::MAX,
        });
        roundtrip(CoordinatePath::System {
            x: 17,
            y: 0,
            z: 65535,
            system: 42,
        });
        roundtrip(CoordinatePath::Planet {
            x: 1,
            y: 2,
            z: 3,
            system: 4,
            planet: 5,
        });
        roundtrip(CoordinatePath::Moon {
            x: 1,
            y: 2,
            z: 3,
            system: 4,
            planet: 5,
            moon: 6,
        });
        // Boundary land kinds: depth 1 and depth 27.
        roundtrip(CoordinatePath::Land {
            x: 1,
            y: 2,
            z: 3,
            system: 4,
            planet: 5,
            moon: Some(0),
            trixels: vec![7],
        });
        roundtrip(CoordinatePath::Land {
            x: 1,
            y: 2,
            z: 3,
            system: 4,
            planet: 5,
            moon: None,
            trixels: vec![5; 27],
        });
    }

    #[test]
    fn test_land_trixel_fields_roundtrip() {
        let trixels = vec![0, 7, 3, 1, 6, 2, 4, 5, 7, 0, 1];
        let path = CoordinatePath::Land {
            x: 100,
            y: 200,
            z: 300,
            system: 9,
            planet: 2,
            moon: Some(1),
            trixels: trixels.clone(),
        };
        let id = TokenId::encode(&path).unwrap();
        assert_eq!(id.kind(), Some(ObjectKind::Land(trixels.len() as u8)));
        match id.decode().unwrap() {
            CoordinatePath::Land { trixels: back, .. } => assert_eq!(back, trixels),
            other => panic!("decoded wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_moon_sentinel() {
        let on_planet = CoordinatePath::Land {
            x: 0,
            y: 0,
            z: 0,
            system: 0,
            planet: 0,
            moon: None,
            trixels: vec![3, 3],
        };
        let id = TokenId::encode(&on_planet).unwrap();
        // The sentinel occupies the moon field on the wire.
        assert_eq!(id.get_bits(MOON_OFFSET, FIELD_WIDTH), MOON_SENTINEL as u64);
        assert_eq!(id.decode().unwrap(), on_planet);
    }

    #[test]
    fn test_decode_rejects_undefined_kind() {
        let mut id = TokenId::default();
        id.set_bits(KIND_OFFSET, KIND_WIDTH, 31);
        assert!(matches!(
            id.decode(),
            Err(IdentError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_stray_high_bits() {
        // A sector id with a populated system field.
        let sector = CoordinatePath::Sector { x: 1, y: 2, z: 3 };
        let mut id = TokenId::encode(&sector).unwrap();
        id.set_bits(SYSTEM_OFFSET, FIELD_WIDTH, 9);
        assert!(matches!(
            id.decode(),
            Err(IdentError::MalformedIdentifier(_))
        ));

        // A depth-2 land id with a populated third trixel field.
        let land = CoordinatePath::Land {
            x: 0,
            y: 0,
            z: 0,
            system: 0,
            planet: 0,
            moon: None,
            trixels: vec![1, 2],
        };
        let mut id = TokenId::encode(&land).unwrap();
        id.set_bits(TRIXEL_OFFSET + 2 * TRIXEL_WIDTH, TRIXEL_WIDTH, 5);
        assert!(matches!(
            id.decode(),
            Err(IdentError::MalformedIdentifier(_))
        ));

        // The topmost limb is out of reach of every kind.
        let mut id = TokenId::encode(&sector).unwrap();
        id.set_bits(250, 1, 1);
        assert!(matches!(
            id.decode(),
            Err(IdentError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_moon_sentinel_on_moon_kind() {
        let mut id = TokenId::default();
        id.set_bits(KIND_OFFSET, KIND_WIDTH, ObjectKind::Moon.code() as u64);
        id.set_bits(MOON_OFFSET, FIELD_WIDTH, MOON_SENTINEL as u64);
        assert!(matches!(
            id.decode(),
            Err(IdentError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_encode_rejects_illegal_shape() {
        let bad = CoordinatePath::Land {
            x: 0,
            y: 0,
            z: 0,
            system: 0,
            planet: 0,
            moon: None,
            trixels: vec![9],
        };
        assert!(matches!(TokenId::encode(&bad), Err(IdentError::BadPath(_))));
    }

    #[test]
    fn test_hex_roundtrip() {
        let path = CoordinatePath::Moon {
            x: 12,
            y: 34,
            z: 56,
            system: 78,
            planet: 90,
            moon: 11,
        };
        let id = TokenId::encode(&path).unwrap();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(TokenId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn test_serde_json_map_key() {
        use std::collections::BTreeMap;
        let id = TokenId::encode(&CoordinatePath::Sector { x: 1, y: 2, z: 3 }).unwrap();
        let mut map = BTreeMap::new();
        map.insert(id, 7u32);
        let json = serde_json::to_string(&map).unwrap();
        let back: BTreeMap<TokenId, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[&id], 7);
    }

    #[test]
    fn test_ordering_is_numeric() {
        let low = TokenId::from_limbs([5, 0, 0, 0]);
        let high = TokenId::from_limbs([0, 0, 0, 1]);
        assert!(low < high);
    }

    proptest! {
        #[test]
        fn prop_sector_roundtrip(x: u16, y: u16, z: u16) {
            roundtrip(CoordinatePath::Sector { x, y, z });
        }

        #[test]
        fn prop_land_roundtrip(
            x: u16, y: u16, z: u16, system: u16, planet: u16,
            moon in proptest::option::of(0u16..0xFFFF),
            trixels in proptest::collection::vec(0u8..8, 1..=27),
        ) {
            roundtrip(CoordinatePath::Land { x, y, z, system, planet, moon, trixels });
        }
    }
}
