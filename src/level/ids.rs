//! Id allocation shared by the saver and the scene

use crate::entity::EntityTag;

pub const PLAYER_ID: &str = "player";

/// `"{prefix} {n}"` for the first free `n` counting up from `index`
fn numbered(prefix: &str, index: usize, is_taken: impl Fn(&str) -> bool) -> String {
    let mut n = index;
    loop {
        let candidate = format!("{} {}", prefix, n);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Id for an entity at position `index` that has none.
/// A player gets `"player"` while that id is free.
pub fn entity_id(tag: EntityTag, index: usize, is_taken: impl Fn(&str) -> bool) -> String {
    if tag == EntityTag::Player && !is_taken(PLAYER_ID) {
        return PLAYER_ID.to_string();
    }
    numbered("entity", index, is_taken)
}

pub fn brush_id(index: usize, is_taken: impl Fn(&str) -> bool) -> String {
    numbered("brush", index, is_taken)
}
