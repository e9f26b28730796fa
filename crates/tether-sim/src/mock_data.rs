//! Fixed fixtures for the simulated world.
//!
//! Everything here is fictional: a small plot with one container, its loot
//! table, and a reference dataset bundle.

use std::sync::Arc;
use std::time::Duration;

use tether_contracts::{
    entity::{Entity, EntityKind},
    geometry::{OrientedBox, Vec3},
};
use tether_core::{traits::NodeId, Clock};

use crate::{
    channel::SimChannel,
    host::SimHost,
    server::{LootDrop, SimServer},
    world::SimWorld,
};

/// Reference datasets served by the simulated host.
pub const DATASETS_TOML: &str = r#"
[ranks]
Common = 1
Uncommon = 2
Rare = 3
Epic = 4
Legendary = 5

[items.ember_shard]
rarity = "Rare"
display_name = "Ember Shard"

[items.old_boot]
rarity = "Common"
display_name = "Old Boot"

[items.star_core]
rarity = "Legendary"
display_name = "Star Core"

[rarities]
Uncommon = ["copper_key"]
Epic = ["void_lens"]

[[containers]]
id = "crate_basic"
display_name = "Basic Crate"
price = 100

[[containers]]
id = "crate_gilded"
display_name = "Gilded Crate"
price = 750
"#;

/// Center of the demo container inside the plot.
pub const CONTAINER_POSITION: Vec3 = Vec3::new(12.0, 0.0, -4.0);

pub fn container(uuid: &str) -> Entity {
    Entity::new(EntityKind::Container.typed_name(uuid), EntityKind::Container, CONTAINER_POSITION)
        .with_size(Vec3::new(4.0, 3.0, 4.0))
        .with_volume(OrientedBox::with_yaw(
            CONTAINER_POSITION,
            Vec3::new(2.0, 1.5, 2.0),
            std::f64::consts::FRAC_PI_6,
        ))
}

fn drop_item(uuid: &str, item_id: &str, offset: Vec3, delay_ms: u64) -> LootDrop {
    LootDrop {
        entity: Entity::new(EntityKind::Item.typed_name(uuid), EntityKind::Item, offset)
            .with_item_id(item_id),
        delay: Duration::from_millis(delay_ms),
    }
}

/// What opening the demo container drops. Arrival is staggered so the
/// scheduler finds the loot over several polls.
pub fn loot_table() -> Vec<LootDrop> {
    vec![
        drop_item("a1", "ember_shard", Vec3::new(0.5, 0.2, 0.0), 0),
        drop_item("a2", "old_boot", Vec3::new(-1.0, 0.0, 0.5), 300),
        drop_item("a3", "star_core", Vec3::new(0.0, 1.0, -1.0), 900),
        drop_item("a4", "copper_key", Vec3::new(1.0, -0.5, 1.0), 1500),
        LootDrop {
            entity: Entity::new(EntityKind::Orb.typed_name("o1"), EntityKind::Orb, Vec3::new(0.0, 0.5, 0.0)),
            delay: Duration::from_millis(600),
        },
    ]
}

/// A ready-made simulated game.
pub struct SimGame {
    pub world: Arc<SimWorld>,
    pub server: Arc<SimServer>,
    pub host: Arc<SimHost>,
    pub plot: NodeId,
    pub shared: NodeId,
}

impl SimGame {
    /// An empty world with a `Shared` folder and a `Plots/Plot_7` region, and
    /// no channels yet.
    pub fn empty(clock: Arc<dyn Clock>) -> Self {
        let world = SimWorld::new(clock);
        let server = SimServer::new(&world);
        let shared = world.folder_path(&["Shared"]);
        let plot = world.folder_path(&["Plots", "Plot_7"]);
        let host = Arc::new(SimHost::new(world.clone(), Some(plot)).with_datasets(DATASETS_TOML));
        Self { world, server, host, plot, shared }
    }

    /// The standard game: a direct `Shared/Remote` channel and one container
    /// with its loot registered.
    pub fn standard(clock: Arc<dyn Clock>, container_uuid: &str) -> Self {
        let game = Self::empty(clock);
        game.world.add_channel(game.shared, SimChannel::new("Remote", Some(game.server.clone())));
        game.place_container(container_uuid);
        game
    }

    pub fn place_container(&self, uuid: &str) -> NodeId {
        let entity = container(uuid);
        self.server.set_loot(&entity.name, loot_table());
        self.world.add_entity(self.plot, entity)
    }
}
