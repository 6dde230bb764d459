//! Static and dynamic decal storage
//!
//! Static decals come from the level and stay until unloaded. Dynamic
//! decals (blood, impacts) are capped: the oldest one is evicted when a new
//! one arrives at the cap. A new decal landing on top of a blood splat from
//! the same definition file grows the existing splat instead of being added;
//! every other decal is always appended.

use std::collections::VecDeque;

use super::decal::{Decal, BLOOD_SPLAT_COLOR_MAP};
use super::SceneError;

/// Hard cap on simultaneous decals (static + dynamic)
pub const MAX_DECALS: usize = 20000;

/// Cap on dynamic decals
pub const MAX_DYNAMIC_DECALS: usize = 1000;

/// Share of the cap available to static decals
pub const MAX_STATIC_DECALS: usize = MAX_DECALS - MAX_DYNAMIC_DECALS;

/// Outcome of [`DecalStore::add_dynamic_decal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecalInsert {
    /// The decal was appended
    Added,
    /// The decal overlapped a blood splat of the same file, which grew instead
    Merged,
}

/// Owner of every decal in the scene
#[derive(Debug, Default)]
pub struct DecalStore {
    static_decals: Vec<Decal>,
    dynamic_decals: VecDeque<Decal>,
}

impl DecalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a level decal
    pub fn add_static_decal(&mut self, decal: Decal) -> Result<usize, SceneError> {
        if self.static_decals.len() >= MAX_STATIC_DECALS {
            return Err(SceneError::DecalCapacity { max: MAX_STATIC_DECALS });
        }
        self.static_decals.push(decal);
        Ok(self.static_decals.len() - 1)
    }

    /// Remove a level decal by index
    pub fn remove_static_decal(&mut self, index: usize) -> Option<Decal> {
        (index < self.static_decals.len()).then(|| self.static_decals.remove(index))
    }

    /// Add a gameplay decal, evicting the oldest at the cap and merging blood clumps
    pub fn add_dynamic_decal(&mut self, decal: Decal) -> DecalInsert {
        if self.dynamic_decals.len() >= MAX_DYNAMIC_DECALS {
            self.dynamic_decals.pop_front();
        }

        let my_pos = decal.position();
        let nearest = self
            .dynamic_decals
            .iter_mut()
            .filter(|other| {
                other.kind.color_map == BLOOD_SPLAT_COLOR_MAP && other.kind.source_file == decal.kind.source_file
            })
            .map(|other| ((other.position() - my_pos).norm_squared(), other))
            .min_by(|(a, _), (b, _)| a.total_cmp(b));

        let my_radius_sq = decal.radius() * decal.radius();
        match nearest {
            Some((dist_sq, other)) if dist_sq <= my_radius_sq || dist_sq <= other.radius() * other.radius() => {
                grow_to_cover(other, &decal);
                DecalInsert::Merged
            }
            _ => {
                self.dynamic_decals.push_back(decal);
                DecalInsert::Added
            }
        }
    }

    /// Drop decals whose special-type lifetime has ended; returns how many were removed
    pub fn expire_transient_decals(&mut self, now: f32) -> usize {
        let before = self.len();
        self.static_decals.retain(|d| !d.is_expired(now));
        self.dynamic_decals.retain(|d| !d.is_expired(now));
        before - self.len()
    }

    /// Level decals
    pub fn static_decals(&self) -> &[Decal] {
        &self.static_decals
    }

    /// Mutable access to level decals
    pub fn static_decals_mut(&mut self) -> &mut [Decal] {
        &mut self.static_decals
    }

    /// Gameplay decals, oldest first
    pub fn dynamic_decals(&self) -> &VecDeque<Decal> {
        &self.dynamic_decals
    }

    /// Every decal, static first
    pub fn iter(&self) -> impl Iterator<Item = &Decal> {
        self.static_decals.iter().chain(self.dynamic_decals.iter())
    }

    /// Total decal count
    pub fn len(&self) -> usize {
        self.static_decals.len() + self.dynamic_decals.len()
    }

    /// Whether there are no decals
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every decal
    pub fn clear(&mut self) {
        self.static_decals.clear();
        self.dynamic_decals.clear();
    }
}

/// Grow `existing` so its x/y footprint gains the area of `added`.
///
/// The shorter side is squared up first; whatever area is left over scales
/// the whole decal uniformly.
fn grow_to_cover(existing: &mut Decal, added: &Decal) {
    let mut cur = existing.scale();
    let add = added.scale();
    let cur_area = cur.x * cur.y;
    if cur_area <= 0.0 {
        return;
    }
    let mut add_area = add.x * add.y;

    if cur.x < cur.y {
        let square_area = cur.y * cur.y;
        if cur_area + add_area > square_area {
            cur.x = cur.y;
            add_area += cur_area - square_area;
        } else {
            cur.x *= (cur_area + add_area) / cur_area;
            add_area = 0.0;
        }
    } else if cur.x > cur.y {
        let square_area = cur.x * cur.x;
        if cur_area + add_area > square_area {
            cur.y = cur.x;
            add_area += cur_area - square_area;
        } else {
            cur.y *= (cur_area + add_area) / cur_area;
            add_area = 0.0;
        }
    }

    // the uniform factor applies to the original scale, not the squared-up one
    let increase = (cur_area + add_area) / cur_area;
    existing.transform.scale *= increase;
}
