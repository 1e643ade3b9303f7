//! Seedverse demo binary.
//!
//! Walks one derivation chain from a root seed down to a surface patch,
//! then runs a full commit-reveal-stake lifecycle against an in-memory
//! registry.

use anyhow::{anyhow, Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use seedverse::registry::{AllowAll, Clock, ManualClock, MemoryStore, Nonce};
use seedverse::{
    ClaimRegistry, CommitmentId, CoordinatePath, Generator, HolderId, ObjectDescription,
    RegistryParams, Seed, TokenId, VERSION,
};

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Seedverse v{}", VERSION);

    let root = Seed(0x5EED_CAFE_F00D_0001);
    info!("Root seed: {:#018x}", root.0);

    let token = demo_generation(root)?;
    demo_registry(token)?;

    Ok(())
}

/// Walk the hierarchy from a sector down to a surface patch and return
/// the patch's canonical token.
fn demo_generation(root: Seed) -> Result<TokenId> {
    info!("=== Generating ===");
    let generator = Generator::new(root);

    let sector = generator.sector(100, 200, 300);
    info!("Sector (100, 200, 300): {} star systems", sector.star_count);

    // Find a system with at least one planet. Counts are deterministic,
    // so this scan always lands on the same system.
    let (system_index, system) = (0..sector.star_count)
        .find_map(|i| {
            match generator.describe(&CoordinatePath::System {
                x: 100,
                y: 200,
                z: 300,
                system: i,
            }) {
                Ok(ObjectDescription::System(s)) if s.planet_count > 0 => Some((i, s)),
                _ => None,
            }
        })
        .ok_or_else(|| anyhow!("sector holds no populated system"))?;
    info!(
        "System {}: class {:?}, mass {:.3} Msun, {} planets, habitable zone [{:.3}, {:.3}] AU",
        system_index,
        system.class,
        system.mass.to_f64(),
        system.planet_count,
        system.habitable_inner.to_f64(),
        system.habitable_outer.to_f64(),
    );

    let planet_path = CoordinatePath::Planet {
        x: 100,
        y: 200,
        z: 300,
        system: system_index,
        planet: 0,
    };
    let planet = match generator.describe(&planet_path)? {
        ObjectDescription::Planet(p) => p,
        other => return Err(anyhow!("expected a planet, got {:?}", other)),
    };
    info!(
        "Planet 0: {:?}, {:.3} Mearth, a = {:.3} AU, e = {:.3}, period {:.3} yr, {} moons",
        planet.class,
        planet.mass.to_f64(),
        planet.orbit.semimajor.to_f64(),
        planet.orbit.eccentricity.to_f64(),
        planet.orbit.period.to_f64(),
        planet.moon_count,
    );

    // A patch on the planet's own surface, three subdivision levels deep.
    let land_path = CoordinatePath::Land {
        x: 100,
        y: 200,
        z: 300,
        system: system_index,
        planet: 0,
        moon: None,
        trixels: vec![3, 1, 4],
    };
    let land = match generator.describe(&land_path)? {
        ObjectDescription::Land(l) => l,
        other => return Err(anyhow!("expected a land patch, got {:?}", other)),
    };
    info!(
        "Land [3, 1, 4]: depth {}, elevation {:.6}",
        land.depth,
        land.elevation.to_f64(),
    );

    let token = TokenId::encode(&land_path)?;
    info!("Canonical token: {}", token);
    Ok(token)
}

/// Run the claim lifecycle: commit, fail an early reveal, mature,
/// reveal, release.
fn demo_registry(token: TokenId) -> Result<()> {
    info!("=== Claiming ===");

    let clock = std::sync::Arc::new(ManualClock::new(1_700_000_000));

    struct SharedClock(std::sync::Arc<ManualClock>);
    impl Clock for SharedClock {
        fn now(&self) -> u64 {
            self.0.now()
        }
    }

    let params = RegistryParams::from_env();
    let authority = HolderId([0u8; 16]);
    let registry = ClaimRegistry::open(
        params,
        authority,
        Box::new(SharedClock(clock.clone())),
        Box::new(AllowAll),
        Box::new(MemoryStore::new()),
    )?;
    info!(
        "Registry open: min deposit {}, maturation {} s, forfeiture {} s",
        params.minimum_deposit, params.maturation_window, params.forfeiture_window,
    );

    let holder = HolderId([0x42; 16]);
    let nonce: Nonce = [0x77; 32];
    let commitment = CommitmentId::compute(&token, &nonce);
    info!("Commitment: {}", commitment);

    registry.commit(holder, commitment, params.minimum_deposit * 10)?;
    info!("Committed; total staked: {}", registry.total_staked());

    // Revealing immediately must fail: the maturation window hides the
    // target long enough to make front-running pointless.
    match registry.reveal(holder, commitment, token, &nonce) {
        Err(e) => info!("Early reveal rejected as expected: {}", e),
        Ok(()) => return Err(anyhow!("early reveal unexpectedly succeeded")),
    }

    clock.advance(params.maturation_window + 1);
    registry.reveal(holder, commitment, token, &nonce)?;
    info!(
        "Revealed; owner is {}",
        registry
            .owner_of(&token)
            .map(|h| h.short_hex())
            .unwrap_or_default(),
    );

    let refund = registry.release(holder, token)?;
    info!("Released; {} refunded, total staked: {}", refund, registry.total_staked());

    Ok(())
}
