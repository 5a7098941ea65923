//! Group membership store.
//!
//! Every face belongs to at most one group. The store keeps a forward index
//! (group -> member faces) and an inverse index (face -> owning group) and
//! updates both in the same mutation, so ownership never needs to be
//! recovered by scanning groups.
//!
//! Groups are created with increasing ids starting at 0 and are never
//! removed; clearing a group only empties it.

use std::collections::BTreeSet;

use tracing::debug;

use super::color::{Color, DEFAULT_PALETTE};
use crate::error::{CarveError, Result};
use crate::mesh::{FaceId, GroupId};

/// A named, colored set of faces.
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    color: Color,
    faces: BTreeSet<FaceId>,
}

impl Group {
    /// The group id.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The display color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Member faces in ascending order.
    pub fn faces(&self) -> &BTreeSet<FaceId> {
        &self.faces
    }

    /// Number of member faces.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Result of [`GroupStore::toggle_face`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The face joined the group, leaving `previous` if it had an owner.
    Added {
        /// Group the face was taken from.
        previous: Option<GroupId>,
    },
    /// The face was a member and is now unassigned.
    Removed,
}

/// The set of selection groups for one mesh.
#[derive(Debug, Clone)]
pub struct GroupStore {
    groups: Vec<Group>,
    /// Owning group per face, `None` when unassigned.
    owner: Vec<Option<GroupId>>,
    current: GroupId,
    palette: Vec<Color>,
    selected: usize,
}

impl GroupStore {
    /// Create a store for a mesh with `face_count` faces, using the default palette.
    ///
    /// The store starts with one empty group, id 0, which is current.
    pub fn new(face_count: usize) -> Self {
        Self::with_palette(face_count, DEFAULT_PALETTE.to_vec())
    }

    /// Create a store with a custom palette. An empty palette falls back to
    /// the default one.
    pub fn with_palette(face_count: usize, palette: Vec<Color>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.to_vec()
        } else {
            palette
        };
        let mut store = Self {
            groups: Vec::new(),
            owner: vec![None; face_count],
            current: GroupId::new(0),
            palette,
            selected: 0,
        };
        store.create_group();
        store
    }

    /// Number of faces the store covers.
    pub fn face_count(&self) -> usize {
        self.owner.len()
    }

    /// Number of groups, including empty ones.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The group new picks go into.
    pub fn current_group(&self) -> GroupId {
        self.current
    }

    /// All groups in id order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Look up a group.
    pub fn group(&self, id: GroupId) -> Result<&Group> {
        self.groups.get(id.index()).ok_or(CarveError::InvalidGroup {
            group: id,
            group_count: self.groups.len(),
        })
    }

    fn check_group(&self, id: GroupId) -> Result<()> {
        self.group(id).map(|_| ())
    }

    fn check_face(&self, face: FaceId) -> Result<()> {
        if face.index() < self.owner.len() {
            Ok(())
        } else {
            Err(CarveError::InvalidFace {
                face: face.index(),
                face_count: self.owner.len(),
            })
        }
    }

    /// Append a new empty group and make it current.
    ///
    /// Colors cycle through the palette in creation order.
    pub fn create_group(&mut self) -> GroupId {
        let id = GroupId::new(self.groups.len());
        let color = self.palette[id.index() % self.palette.len()];
        self.groups.push(Group {
            id,
            color,
            faces: BTreeSet::new(),
        });
        self.current = id;
        debug!(group = id.index(), %color, "created group");
        id
    }

    /// Make `id` the current group.
    pub fn set_current_group(&mut self, id: GroupId) -> Result<()> {
        self.check_group(id)?;
        self.current = id;
        Ok(())
    }

    /// Advance the current group to the next id, wrapping to 0.
    ///
    /// With a single group this does nothing.
    pub fn next_group(&mut self) -> GroupId {
        if self.groups.len() > 1 {
            self.current = GroupId::new((self.current.index() + 1) % self.groups.len());
        }
        self.current
    }

    /// Group owning `face`, if any.
    pub fn group_of(&self, face: FaceId) -> Option<GroupId> {
        self.owner.get(face.index()).copied().flatten()
    }

    /// Display color of `face`: its group's color, or `None` when unassigned.
    pub fn face_color(&self, face: FaceId) -> Option<Color> {
        self.group_of(face).map(|g| self.groups[g.index()].color)
    }

    /// Move `face` into `group`, detaching it from its previous owner.
    fn assign(&mut self, face: FaceId, group: GroupId) -> Option<GroupId> {
        let previous = self.owner[face.index()].replace(group);
        match previous {
            Some(prev) => {
                self.groups[prev.index()].faces.remove(&face);
            }
            None => self.selected += 1,
        }
        self.groups[group.index()].faces.insert(face);
        previous
    }

    /// Toggle membership of `face` in `group`.
    ///
    /// A member is removed and becomes unassigned; any other face is moved
    /// into `group`, leaving whatever group held it.
    pub fn toggle_face(&mut self, group: GroupId, face: FaceId) -> Result<Toggle> {
        self.check_group(group)?;
        self.check_face(face)?;

        if self.owner[face.index()] == Some(group) {
            self.owner[face.index()] = None;
            self.groups[group.index()].faces.remove(&face);
            self.selected -= 1;
            Ok(Toggle::Removed)
        } else {
            let previous = self.assign(face, group);
            Ok(Toggle::Added { previous })
        }
    }

    /// Add every face in `faces` to `group`, taking them from other groups.
    ///
    /// All ids are validated before anything changes. Returns the faces whose
    /// owner actually changed, in ascending order.
    pub fn add_faces<'a, I>(&mut self, group: GroupId, faces: I) -> Result<Vec<FaceId>>
    where
        I: IntoIterator<Item = &'a FaceId>,
        I::IntoIter: Clone,
    {
        self.check_group(group)?;
        let faces = faces.into_iter();
        for &face in faces.clone() {
            self.check_face(face)?;
        }

        let mut changed: Vec<FaceId> = faces
            .filter(|&&face| self.owner[face.index()] != Some(group))
            .copied()
            .collect();
        changed.sort_unstable();
        changed.dedup();

        for &face in &changed {
            self.assign(face, group);
        }
        Ok(changed)
    }

    /// Empty `group`, keeping its id and color. Returns the released faces.
    pub fn clear_group(&mut self, group: GroupId) -> Result<Vec<FaceId>> {
        self.check_group(group)?;
        let released = std::mem::take(&mut self.groups[group.index()].faces);
        for &face in &released {
            self.owner[face.index()] = None;
        }
        self.selected -= released.len();
        Ok(released.into_iter().collect())
    }

    /// Number of faces in `group`.
    pub fn face_count_of(&self, group: GroupId) -> Result<usize> {
        self.group(group).map(Group::len)
    }

    /// Number of faces in any group.
    pub fn total_selected_count(&self) -> usize {
        self.selected
    }

    /// Faces in no group, ascending.
    pub fn unassigned_faces(&self) -> Vec<FaceId> {
        self.owner
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_none())
            .map(|(i, _)| FaceId::new(i))
            .collect()
    }

    /// Check that both indices agree: groups are disjoint, every member
    /// points back at its group, and the selected count matches.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0;
        for g in &self.groups {
            for &face in &g.faces {
                if self.owner.get(face.index()).copied().flatten() != Some(g.id) {
                    return false;
                }
            }
            seen += g.faces.len();
        }
        let owned = self.owner.iter().filter(|o| o.is_some()).count();
        seen == owned && owned == self.selected
    }
}
