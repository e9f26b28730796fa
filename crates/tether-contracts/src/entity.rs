//! World entity types and the typed naming scheme.
//!
//! Entities are owned by the external world snapshot. The tether crates only
//! read them; a fresh `Entity` value is produced on every poll.

use serde::{Deserialize, Serialize};

use crate::geometry::{OrientedBox, ReferenceVolume, Vec3};

/// Planar extent assumed for a container whose size is unknown (zero).
pub const FALLBACK_PLANAR_EXTENT: f64 = 2.0;

/// The entity families the command layer acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Container,
    Item,
    Orb,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Container, EntityKind::Item, EntityKind::Orb];

    /// The name prefix used in typed names, e.g. `ITEM`.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Container => "CONTAINER",
            EntityKind::Item => "ITEM",
            EntityKind::Orb => "ORB",
        }
    }

    /// Build the typed name `<PREFIX>_<uuid>`.
    pub fn typed_name(self, uuid: &str) -> String {
        format!("{}_{}", self.prefix(), uuid)
    }
}

/// A parsed `<TYPE>_<uuid>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedName {
    pub kind: EntityKind,
    pub uuid: String,
}

impl TypedName {
    /// Split a typed name into kind and uuid. The prefix is matched
    /// case-insensitively; the uuid is kept verbatim.
    pub fn parse(name: &str) -> Option<TypedName> {
        let (prefix, uuid) = name.split_once('_')?;
        if uuid.is_empty() {
            return None;
        }
        let kind = EntityKind::ALL
            .into_iter()
            .find(|k| k.prefix().eq_ignore_ascii_case(prefix))?;
        Some(TypedName { kind, uuid: uuid.to_string() })
    }
}

impl std::fmt::Display for TypedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.uuid)
    }
}

/// A snapshot of one world object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Typed name, e.g. `ITEM_3f2c...`.
    pub name: String,
    pub kind: EntityKind,
    /// Representative point.
    pub position: Vec3,
    /// Full size along the world axes. Zero when unknown.
    #[serde(default)]
    pub size: Vec3,
    /// Precise oriented volume, when the world exposes one.
    #[serde(default)]
    pub bounding_volume: Option<OrientedBox>,
    /// Catalog identifier of the item definition this entity instantiates.
    #[serde(default)]
    pub item_id: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind, position: Vec3) -> Self {
        Self {
            name: name.into(),
            kind,
            position,
            size: Vec3::ZERO,
            bounding_volume: None,
            item_id: None,
        }
    }

    pub fn with_size(mut self, size: Vec3) -> Self {
        self.size = size;
        self
    }

    pub fn with_volume(mut self, volume: OrientedBox) -> Self {
        self.bounding_volume = Some(volume);
        self
    }

    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// The name used for whitelist and rarity lookups: the item definition id
    /// when known, the entity name otherwise.
    pub fn base_name(&self) -> &str {
        self.item_id.as_deref().unwrap_or(&self.name)
    }

    /// The volume to test candidates against when this entity is a container.
    ///
    /// Uses the oriented box when present. Otherwise falls back to a sphere of
    /// `radius_multiplier` times the largest planar extent around `position`,
    /// taking `FALLBACK_PLANAR_EXTENT` when the size is unknown.
    pub fn reference_volume(&self, radius_multiplier: f64) -> ReferenceVolume {
        match self.bounding_volume {
            Some(obb) => ReferenceVolume::Oriented(obb),
            None => {
                let extent = if self.has_known_extent() {
                    self.size.planar_max()
                } else {
                    FALLBACK_PLANAR_EXTENT
                };
                ReferenceVolume::Radius { center: self.position, radius: radius_multiplier * extent }
            }
        }
    }

    /// False when the entity carries neither a bounding volume nor a planar size.
    pub fn has_known_extent(&self) -> bool {
        self.bounding_volume.is_some() || self.size.planar_max() > 0.0
    }
}
