//! Signals delivered to the controller and the filters deciding which
//! structural changes are worth a re-render

use crate::overlay::{CONTAINER_CLASS, CONTENT_CLASS};

/// What the controller asks the host to watch
#[derive(Clone, Debug, PartialEq)]
pub enum Reaction<R> {
    /// The surface became manipulable (fires once)
    Ready,
    /// The viewport was resized
    Resize,
    /// Attribute changes on a region
    RegionChange(R),
    /// Attribute, child-list and text changes anywhere below a region
    TamperGuard(R),
}

/// A single structural change reported by the host
#[derive(Clone, Debug, PartialEq)]
pub enum MutationRecord {
    Attributes {
        name: String,
        /// Class attribute of the mutated element
        target_class: String,
        old_value: Option<String>,
    },
    ChildList {
        /// Class attributes of the removed nodes
        removed_classes: Vec<String>,
    },
    CharacterData,
}

/// External events, each carrying the time it arrived at
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    Ready,
    Resize,
    RegionChanged(Vec<MutationRecord>),
    Tampered(Vec<MutationRecord>),
    /// A throttled re-render may be due
    Poll,
}

fn is_overlay_class(class: &str) -> bool {
    class.contains(CONTAINER_CLASS) || class.contains(CONTENT_CLASS)
}

/// Did the observed region's size or inline style change?
pub fn affects_region_geometry(record: &MutationRecord) -> bool {
    match record {
        MutationRecord::Attributes { name, .. } => {
            matches!(name.as_str(), "clientWidth" | "clientHeight" | "style")
        }
        _ => false,
    }
}

/// Did someone restyle, unclass or remove part of the overlay?
pub fn touches_overlay(record: &MutationRecord) -> bool {
    match record {
        MutationRecord::Attributes {
            name,
            target_class,
            old_value,
        } => match name.as_str() {
            "style" => is_overlay_class(target_class),
            "class" => old_value.as_deref().is_some_and(is_overlay_class),
            _ => false,
        },
        MutationRecord::ChildList { removed_classes } => {
            removed_classes.iter().any(|class| is_overlay_class(class))
        }
        MutationRecord::CharacterData => false,
    }
}
