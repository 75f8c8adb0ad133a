//! Gridwalk Demo
//!
//! Builds a small walled map with a bridge layer and lets a few characters
//! wander it at random. Set `RUST_LOG=gridwalk=debug` for blocked moves.

use std::collections::BTreeMap;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gridwalk::{
    grid::{
        events::CharacterEvent,
        position::TilePos,
        tilemap::{TileData, TileLayerData},
    },
    CharacterConfig, DeterministicRng, GridConfig, GridWorld, LayerPosition, TilemapData,
    FRAME_MS, VERSION,
};

const MAP_SIZE: u32 = 12;
const FRAMES: u32 = 60 * 30;
const WALKERS: [&str; 4] = ["ada", "bo", "cy", "dee"];

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Gridwalk v{}", VERSION);

    demo_walk(12345)
}

/// Ground layer walled on all sides with a pillar in the middle, plus an
/// upper bridge layer reachable through a transition tile.
fn demo_map() -> TilemapData {
    let mut map = TilemapData::new(MAP_SIZE, MAP_SIZE, 16.0, 16.0)
        .with_layer(TileLayerData::filled("ground", MAP_SIZE, MAP_SIZE).with_property("ge_charLayer", "ground"))
        .with_layer(TileLayerData::empty("bridge", MAP_SIZE, MAP_SIZE).with_property("ge_charLayer", "bridge"));

    let wall = || Some(TileData::new().with("ge_collide", true));
    let last = MAP_SIZE as i32 - 1;
    for i in 0..MAP_SIZE as i32 {
        for (x, y) in [(i, 0), (i, last), (0, i), (last, i)] {
            map.set_tile(0, x, y, wall());
        }
    }
    for (x, y) in [(5, 5), (6, 5), (5, 6), (6, 6)] {
        map.set_tile(0, x, y, wall());
    }
    for x in 2..=9 {
        map.set_tile(1, x, 3, Some(TileData::new()));
    }
    map
}

fn demo_walk(seed: u64) -> anyhow::Result<()> {
    info!("=== Starting Demo Walk ===");

    let world_config = GridConfig::default();
    let mut world = GridWorld::new(demo_map(), world_config).context("failed to build world")?;
    world.set_transition(TilePos::new(2, 3), "ground", "bridge");
    world.set_transition(TilePos::new(9, 3), "bridge", "ground");

    for (i, id) in WALKERS.iter().enumerate() {
        let start = LayerPosition::unlayered(2 + 2 * i as i32, 8);
        world
            .add_character(CharacterConfig::new(*id).at(start).with_speed(4.0))
            .with_context(|| format!("failed to add {id}"))?;
    }

    let mut rng = DeterministicRng::new(seed);
    let mut steps: BTreeMap<String, u32> = BTreeMap::new();
    let mut turns = 0u32;

    for frame in 0..FRAMES {
        for id in WALKERS {
            if rng.next_int(4) > 0 {
                let direction = rng.choose_direction(world.tilemap().config().number_of_directions.directions());
                world.move_char(id, direction)?;
            }
        }

        let result = world.update(FRAME_MS);
        for event in &result.events {
            match &event.event {
                CharacterEvent::PositionChangeFinished(change) => {
                    *steps.entry(event.char_id.clone()).or_default() += 1;
                    if change.exit_tile.layer != change.enter_tile.layer {
                        info!(
                            char_id = %event.char_id,
                            from = %change.exit_tile,
                            to = %change.enter_tile,
                            "changed layer"
                        );
                    }
                }
                CharacterEvent::DirectionChanged(_) => turns += 1,
                _ => {}
            }
        }

        if frame % 600 == 0 {
            let positions: Vec<String> = WALKERS
                .iter()
                .filter_map(|id| world.position(id).ok().map(|p| format!("{id}={p}")))
                .collect();
            info!("Frame {}: {}", frame, positions.join(" "));
        }
    }

    info!("=== Walk Results ===");
    for id in WALKERS {
        let character = world.character(id)?;
        info!(
            "{}: {} steps, at {}, facing {}, depth {:.7}",
            id,
            steps.get(id).copied().unwrap_or(0),
            character.tile_pos(),
            character.facing_direction(),
            character.depth()
        );
    }
    info!("Blocked turns: {}", turns);
    info!(
        "Occupied tiles: {}",
        world.tilemap().block_cache().occupied_tile_count()
    );

    Ok(())
}
