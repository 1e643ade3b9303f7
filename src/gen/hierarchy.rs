//! Hierarchy Generation
//!
//! Turns a root seed plus a [`CoordinatePath`] into the description of
//! the object at that node. Each level derives a fresh seed from its
//! parent's seed and the child index, then spends pure draws on the
//! level's attributes, so any node can be described without touching
//! its siblings and the result never depends on call order or caching.
//!
//! Descent is gated by deterministic counts: asking for planet 7 of a
//! system that generated 4 planets fails with `InvalidCoordinate`
//! instead of fabricating an object. Callers read the parent's count
//! first.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::fixed::Real;
use crate::core::rng::{draw_discrete, draw_int, draw_range, draw_unit, Seed};
use crate::core::NumericError;

use super::path::{CoordinatePath, PathError};

/// Most stars a single sector can hold.
pub const MAX_STARS_PER_SECTOR: i64 = 64;

/// Most planets a single system can hold.
pub const MAX_PLANETS_PER_SYSTEM: i64 = 16;

/// Most moons a single planet can hold.
pub const MAX_MOONS_PER_PLANET: i64 = 8;

// Orbit band geometry, as raw Q87.40 integer literals. Planet i draws
// its semimajor axis from [0.4 + 0.8*i, 0.8 + 0.8*i) AU, so sibling
// bands never overlap.

/// 0.4 in Q87.40.
const ORBIT_BAND_BASE: Real = Real::from_raw(439_804_651_110);

/// 0.8 in Q87.40.
const ORBIT_BAND_STEP: Real = Real::from_raw(879_609_302_221);

/// Planet eccentricity ceiling: 0.25 in Q87.40 (exact).
const MAX_ECCENTRICITY: Real = Real::from_raw(274_877_906_944);

/// Moon eccentricity ceiling: 0.1 in Q87.40.
const MOON_MAX_ECCENTRICITY: Real = Real::from_raw(109_951_162_778);

/// Generation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenError {
    /// An index at some level is outside the parent's generated bounds.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// An ill-shaped path (bad trixel depth or index).
    #[error(transparent)]
    BadPath(#[from] PathError),

    /// Fixed-point arithmetic left the representable range.
    #[error(transparent)]
    Numeric(#[from] NumericError),
}

/// Spectral classification of a system's primary star.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpectralClass {
    /// Hottest, rarest main-sequence stars.
    O,
    /// Blue-white giants.
    B,
    /// White main-sequence stars.
    A,
    /// Yellow-white.
    F,
    /// Sun-like.
    G,
    /// Orange dwarfs.
    K,
    /// Red dwarfs, the bulk of the population.
    M,
    /// Stellar remnant: white dwarf.
    WhiteDwarf,
    /// Stellar remnant: neutron star.
    NeutronStar,
    /// Stellar remnant: black hole.
    BlackHole,
}

/// Draw order of spectral classes with their population weights.
/// First match wins on the cumulative comparison, so this order is part
/// of the generated universe and never changes.
const SPECTRAL_TABLE: [(SpectralClass, u32); 10] = [
    (SpectralClass::M, 700),
    (SpectralClass::K, 120),
    (SpectralClass::G, 75),
    (SpectralClass::F, 30),
    (SpectralClass::A, 6),
    (SpectralClass::B, 1),
    (SpectralClass::O, 1),
    (SpectralClass::WhiteDwarf, 50),
    (SpectralClass::NeutronStar, 5),
    (SpectralClass::BlackHole, 2),
];

impl SpectralClass {
    /// Mass range in solar masses, as parts per thousand to stay in
    /// integer literals: (lo, hi) scaled by 1000.
    fn mass_range_milli(self) -> (i64, i64) {
        match self {
            SpectralClass::O => (16_000, 50_000),
            SpectralClass::B => (2_100, 16_000),
            SpectralClass::A => (1_400, 2_100),
            SpectralClass::F => (1_040, 1_400),
            SpectralClass::G => (800, 1_040),
            SpectralClass::K => (450, 800),
            SpectralClass::M => (80, 450),
            SpectralClass::WhiteDwarf => (500, 1_400),
            SpectralClass::NeutronStar => (1_400, 2_100),
            SpectralClass::BlackHole => (5_000, 50_000),
        }
    }

    /// Planet count ceiling (exclusive upper bound for the draw).
    fn max_planets(self) -> i64 {
        match self {
            SpectralClass::O | SpectralClass::B => 4,
            SpectralClass::WhiteDwarf | SpectralClass::NeutronStar | SpectralClass::BlackHole => 3,
            _ => MAX_PLANETS_PER_SYSTEM + 1,
        }
    }
}

/// Classification of a planet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BodyClass {
    /// Airless rock comparable to the Moon.
    Lunar,
    /// Rocky world with meaningful gravity.
    Terrestrial,
    /// Ice giant.
    Uranian,
    /// Gas giant.
    Jovian,
    /// Loose rubble, dwarf-planet scale.
    Asteroidal,
}

const PLANET_CLASS_TABLE: [(BodyClass, u32); 5] = [
    (BodyClass::Lunar, 20),
    (BodyClass::Terrestrial, 25),
    (BodyClass::Uranian, 20),
    (BodyClass::Jovian, 25),
    (BodyClass::Asteroidal, 10),
];

const MOON_CLASS_TABLE: [(BodyClass, u32); 2] = [
    (BodyClass::Lunar, 60),
    (BodyClass::Asteroidal, 40),
];

impl BodyClass {
    /// Mass range in thousandths of an Earth mass.
    fn mass_range_milli(self) -> (i64, i64) {
        match self {
            BodyClass::Lunar => (10, 200),
            BodyClass::Terrestrial => (200, 10_000),
            BodyClass::Uranian => (10_000, 50_000),
            BodyClass::Jovian => (50_000, 5_000_000),
            BodyClass::Asteroidal => (1, 10),
        }
    }

    /// Moon count ceiling (exclusive upper bound for the draw).
    fn max_moons(self) -> i64 {
        match self {
            BodyClass::Jovian => MAX_MOONS_PER_PLANET + 1,
            BodyClass::Uranian => 7,
            BodyClass::Terrestrial => 3,
            BodyClass::Lunar | BodyClass::Asteroidal => 1,
        }
    }
}

/// Description of a sector cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorDescription {
    /// The sector's derived seed.
    pub seed: Seed,
    /// Number of star systems generated in this cell.
    pub star_count: u16,
}

/// Description of a star system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDescription {
    /// The system's derived seed.
    pub seed: Seed,
    /// Spectral class of the primary.
    pub class: SpectralClass,
    /// Stellar mass in solar masses.
    pub mass: Real,
    /// Luminosity relative to the sun, from the mass-luminosity fit
    /// L = M^3.5 (main-sequence approximation applied uniformly).
    pub luminosity: Real,
    /// Inner edge of the habitable zone in AU.
    pub habitable_inner: Real,
    /// Outer edge of the habitable zone in AU.
    pub habitable_outer: Real,
    /// Number of planets generated around the primary.
    pub planet_count: u16,
}

/// Orbital parameters shared by planets and moons.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orbit {
    /// Semimajor axis. AU for planets, planetary radii for moons.
    pub semimajor: Real,
    /// Eccentricity in [0, 0.25).
    pub eccentricity: Real,
    /// Period. Years for planets, days for moons.
    pub period: Real,
}

/// Description of a planet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetDescription {
    /// The planet's derived seed.
    pub seed: Seed,
    /// Body classification.
    pub class: BodyClass,
    /// Mass in Earth masses.
    pub mass: Real,
    /// Heliocentric orbit.
    pub orbit: Orbit,
    /// Number of moons generated around the planet.
    pub moon_count: u16,
}

/// Description of a moon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoonDescription {
    /// The moon's derived seed.
    pub seed: Seed,
    /// Body classification (lunar or asteroidal).
    pub class: BodyClass,
    /// Mass in Earth masses.
    pub mass: Real,
    /// Planetocentric orbit.
    pub orbit: Orbit,
}

/// Description of a surface patch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandDescription {
    /// The patch's derived seed, one derivation per trixel level.
    pub seed: Seed,
    /// Subdivision depth of the patch (1..=27).
    pub depth: u8,
    /// Normalized terrain elevation in [0, 1). Mesh generation is out of
    /// scope; one height value is enough for external metadata.
    pub elevation: Real,
}

/// Description of the object a path names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectDescription {
    /// A sector cell.
    Sector(SectorDescription),
    /// A star system.
    System(SystemDescription),
    /// A planet.
    Planet(PlanetDescription),
    /// A moon.
    Moon(MoonDescription),
    /// A surface patch.
    Land(LandDescription),
}

/// Deterministic hierarchy generator.
///
/// Holds only the root seed; `describe` is a pure function of the
/// generator and the coordinate path.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Generator {
    root: Seed,
}

impl Generator {
    /// Create a generator over a shared root seed.
    pub const fn new(root: Seed) -> Self {
        Self { root }
    }

    /// Describe the object at `path`.
    ///
    /// Walks the derivation chain level by level, checking each index
    /// against its parent's deterministic count. Identical output for
    /// identical (root seed, path) regardless of what else was ever
    /// computed.
    pub fn describe(&self, path: &CoordinatePath) -> Result<ObjectDescription, GenError> {
        path.validate()?;
        trace!(?path, "describe");

        let (x, y, z) = path.sector();
        let sector = self.sector(x, y, z);
        match path {
            CoordinatePath::Sector { .. } => Ok(ObjectDescription::Sector(sector)),
            _ => self.describe_below_sector(path, sector),
        }
    }

    fn describe_below_sector(
        &self,
        path: &CoordinatePath,
        sector: SectorDescription,
    ) -> Result<ObjectDescription, GenError> {
        let system_index = match *path {
            CoordinatePath::System { system, .. }
            | CoordinatePath::Planet { system, .. }
            | CoordinatePath::Moon { system, .. }
            | CoordinatePath::Land { system, .. } => system,
            CoordinatePath::Sector { .. } => unreachable!("handled by describe"),
        };
        if system_index >= sector.star_count {
            return Err(GenError::InvalidCoordinate(format!(
                "system {} out of range: sector holds {} systems",
                system_index, sector.star_count
            )));
        }
        let system = self.system(&sector, system_index)?;
        if let CoordinatePath::System { .. } = path {
            return Ok(ObjectDescription::System(system));
        }

        let planet_index = match *path {
            CoordinatePath::Planet { planet, .. }
            | CoordinatePath::Moon { planet, .. }
            | CoordinatePath::Land { planet, .. } => planet,
            _ => unreachable!("remaining variants carry a planet index"),
        };
        if planet_index >= system.planet_count {
            return Err(GenError::InvalidCoordinate(format!(
                "planet {} out of range: system holds {} planets",
                planet_index, system.planet_count
            )));
        }
        let planet = self.planet(&system, planet_index)?;

        match path {
            CoordinatePath::Planet { .. } => Ok(ObjectDescription::Planet(planet)),
            CoordinatePath::Moon { moon, .. } => {
                let moon = self.moon(&planet, *moon)?;
                Ok(ObjectDescription::Moon(moon))
            }
            CoordinatePath::Land { moon, trixels, .. } => {
                // Land sits either on a moon or, with the sentinel, on
                // the planet body itself.
                let surface_seed = match moon {
                    Some(index) => self.moon(&planet, *index)?.seed,
                    None => planet.seed,
                };
                Ok(ObjectDescription::Land(land(surface_seed, trixels)))
            }
            _ => unreachable!("sector and system variants already returned"),
        }
    }

    /// Describe a sector cell directly.
    pub fn sector(&self, x: u16, y: u16, z: u16) -> SectorDescription {
        let seed = self
            .root
            .derive_tag("sector")
            .derive(x as u64)
            .derive(y as u64)
            .derive(z as u64);
        let star_count = draw_int(
            seed.derive_tag("star_count"),
            0,
            MAX_STARS_PER_SECTOR + 1,
        ) as u16;
        SectorDescription { seed, star_count }
    }

    fn system(
        &self,
        sector: &SectorDescription,
        index: u16,
    ) -> Result<SystemDescription, GenError> {
        let seed = sector.seed.derive_tag("system").derive(index as u64);

        let weights: Vec<u32> = SPECTRAL_TABLE.iter().map(|&(_, w)| w).collect();
        let class = SPECTRAL_TABLE[draw_discrete(seed.derive_tag("class"), &weights)].0;

        let (lo, hi) = class.mass_range_milli();
        let thousandth = Real::ONE.checked_div(Real::from_int(1000))?;
        let mass = draw_range(
            seed.derive_tag("mass"),
            Real::from_int(lo).checked_mul(thousandth)?,
            Real::from_int(hi).checked_mul(thousandth)?,
        )?;

        // L = M^3.5 = M^3 * sqrt(M)
        let mass_cubed = mass.checked_mul(mass)?.checked_mul(mass)?;
        let luminosity = mass_cubed.checked_mul(mass.sqrt()?)?;

        // Habitable zone scales with sqrt(L).
        let sqrt_lum = luminosity.sqrt()?;
        let habitable_inner =
            sqrt_lum.checked_mul(Real::from_int(3).checked_div(Real::from_int(4))?)?;
        let habitable_outer =
            sqrt_lum.checked_mul(Real::from_int(9).checked_div(Real::from_int(5))?)?;

        let planet_count =
            draw_int(seed.derive_tag("planet_count"), 0, class.max_planets()) as u16;

        Ok(SystemDescription {
            seed,
            class,
            mass,
            luminosity,
            habitable_inner,
            habitable_outer,
            planet_count,
        })
    }

    fn planet(
        &self,
        system: &SystemDescription,
        index: u16,
    ) -> Result<PlanetDescription, GenError> {
        let seed = system.seed.derive_tag("planet").derive(index as u64);

        let weights: Vec<u32> = PLANET_CLASS_TABLE.iter().map(|&(_, w)| w).collect();
        let class = PLANET_CLASS_TABLE[draw_discrete(seed.derive_tag("class"), &weights)].0;

        let (lo, hi) = class.mass_range_milli();
        let thousandth = Real::ONE.checked_div(Real::from_int(1000))?;
        let mass = draw_range(
            seed.derive_tag("mass"),
            Real::from_int(lo).checked_mul(thousandth)?,
            Real::from_int(hi).checked_mul(thousandth)?,
        )?;

        // Orbits widen with the planet index; bands are disjoint so
        // sibling semimajor axes never cross.
        let band_lo = Real::from_int(index as i64)
            .checked_mul(ORBIT_BAND_STEP)?
            .checked_add(ORBIT_BAND_BASE)?;
        let band_hi = band_lo.checked_add(ORBIT_BAND_BASE)?;
        let semimajor = draw_range(seed.derive_tag("semimajor"), band_lo, band_hi)?;
        let eccentricity =
            draw_range(seed.derive_tag("eccentricity"), Real::ZERO, MAX_ECCENTRICITY)?;
        // Kepler: T = sqrt(a^3 / M), years when a is AU and M solar.
        let semimajor_cubed = semimajor
            .checked_mul(semimajor)?
            .checked_mul(semimajor)?;
        let period = semimajor_cubed.checked_div(system.mass)?.sqrt()?;

        let moon_count = draw_int(seed.derive_tag("moon_count"), 0, class.max_moons()) as u16;

        Ok(PlanetDescription {
            seed,
            class,
            mass,
            orbit: Orbit {
                semimajor,
                eccentricity,
                period,
            },
            moon_count,
        })
    }

    fn moon(&self, planet: &PlanetDescription, index: u16) -> Result<MoonDescription, GenError> {
        if index >= planet.moon_count {
            return Err(GenError::InvalidCoordinate(format!(
                "moon {} out of range: planet holds {} moons",
                index, planet.moon_count
            )));
        }
        let seed = planet.seed.derive_tag("moon").derive(index as u64);

        let weights: Vec<u32> = MOON_CLASS_TABLE.iter().map(|&(_, w)| w).collect();
        let class = MOON_CLASS_TABLE[draw_discrete(seed.derive_tag("class"), &weights)].0;

        let (lo, hi) = class.mass_range_milli();
        // Moons cap at a hundredth of their primary's class range.
        let scale = Real::ONE.checked_div(Real::from_int(100_000))?;
        let mass = draw_range(
            seed.derive_tag("mass"),
            Real::from_int(lo).checked_mul(scale)?,
            Real::from_int(hi).checked_mul(scale)?,
        )?;

        // Planetocentric bands in planetary radii: moon i draws from
        // [5 + 4*i, 8 + 4*i), likewise disjoint.
        let band_lo = Real::from_int(5 + 4 * index as i64);
        let band_hi = band_lo.checked_add(Real::from_int(3))?;
        let semimajor = draw_range(seed.derive_tag("semimajor"), band_lo, band_hi)?;
        let eccentricity = draw_range(
            seed.derive_tag("eccentricity"),
            Real::ZERO,
            MOON_MAX_ECCENTRICITY,
        )?;
        let semimajor_cubed = semimajor
            .checked_mul(semimajor)?
            .checked_mul(semimajor)?;
        let period = semimajor_cubed.checked_div(planet.mass)?.sqrt()?;

        Ok(MoonDescription {
            seed,
            class,
            mass,
            orbit: Orbit {
                semimajor,
                eccentricity,
                period,
            },
        })
    }
}

/// Resolve a trixel chain into a patch description. One derivation per
/// level keeps neighboring patches at every depth independent.
fn land(surface_seed: Seed, trixels: &[u8]) -> LandDescription {
    let mut seed = surface_seed.derive_tag("land");
    for &trixel in trixels {
        seed = seed.derive(trixel as u64);
    }
    LandDescription {
        seed,
        depth: trixels.len() as u8,
        elevation: draw_unit(seed.derive_tag("elevation")),
    }
}
