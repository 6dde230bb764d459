//! Specialized collection types

pub use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Stable handle to a dynamic light
    pub struct LightId;

    /// Stable handle to a model in the model library
    pub struct ModelId;

    /// Stable handle to a static mesh in the scene graph
    pub struct StaticMeshId;
}

/// Handle-based map keyed by a typed slotmap key
pub type HandleMap<K, T> = SlotMap<K, T>;
