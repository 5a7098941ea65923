//! Interaction mode state machine.
//!
//! The controller is the only writer of the [`GroupStore`]. The viewer calls
//! into it synchronously, one event at a time, and is told which faces to
//! recolor through a [`RecolorHook`].

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use super::color::Color;
use super::command::Command;
use super::store::{GroupStore, Toggle};
use crate::algo::adjacency::AdjacencyIndex;
use crate::algo::grow::{clamp_tolerance, grow};
use crate::error::{CarveError, Result};
use crate::mesh::{FaceId, GroupId};

/// Default region-growing tolerance in degrees.
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 30.0;

/// Interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Camera interaction; picks are ignored.
    #[default]
    Navigate,
    /// A pick toggles the face in the current group.
    Select,
    /// A pick grows a region from the face into the current group.
    RegionGrow,
}

impl Mode {
    /// The mode after this one, cycling Navigate -> Select -> RegionGrow.
    pub fn next(self) -> Self {
        match self {
            Mode::Navigate => Mode::Select,
            Mode::Select => Mode::RegionGrow,
            Mode::RegionGrow => Mode::Navigate,
        }
    }

    /// Status line shown by the viewer.
    pub fn status(self) -> &'static str {
        match self {
            Mode::Navigate => "MOVEMENT MODE: Navigate the model",
            Mode::Select => "SELECTION MODE: Click faces to select them",
            Mode::RegionGrow => "REGION MODE: Click a face to select its surface patch",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Navigate => "navigate",
            Mode::Select => "select",
            Mode::RegionGrow => "grow",
        })
    }
}

impl FromStr for Mode {
    type Err = CarveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "navigate" | "nav" | "move" => Ok(Mode::Navigate),
            "select" | "pick" => Ok(Mode::Select),
            "grow" | "region" | "region-grow" => Ok(Mode::RegionGrow),
            other => Err(CarveError::invalid_command(0, format!("unknown mode `{}`", other))),
        }
    }
}

/// A batch of faces whose display color changed.
#[derive(Debug, Clone, Copy)]
pub struct Recolor<'a> {
    /// Faces to repaint.
    pub faces: &'a [FaceId],
    /// New color, or `None` to restore the base mesh color.
    pub color: Option<Color>,
    /// Selected face count after the change, for the on-screen counter.
    pub total_selected: usize,
}

/// Callback that receives every [`Recolor`] produced by the controller.
pub struct RecolorHook {
    callback: Box<dyn Fn(&Recolor<'_>) + Send + Sync>,
}

impl RecolorHook {
    /// Create a hook from a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Recolor<'_>) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// A hook that discards all updates.
    pub fn none() -> Self {
        Self::new(|_| {})
    }

    #[inline]
    fn notify(&self, faces: &[FaceId], color: Option<Color>, total_selected: usize) {
        if !faces.is_empty() {
            (self.callback)(&Recolor {
                faces,
                color,
                total_selected,
            });
        }
    }
}

impl Default for RecolorHook {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for RecolorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecolorHook").finish_non_exhaustive()
    }
}

/// What a pick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// Navigate mode: the pick was passed through untouched.
    Ignored,
    /// Select mode: the face was toggled in the current group.
    Toggled {
        /// The picked face.
        face: FaceId,
        /// Whether it was added or removed.
        toggle: Toggle,
    },
    /// Region-grow mode: a region was added to the current group.
    Grown {
        /// Size of the grown region, seed included.
        region: usize,
        /// Faces that changed owner.
        changed: Vec<FaceId>,
    },
}

/// What a [`Command`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Result of a pick.
    Pick(PickOutcome),
    /// The mode now active.
    Mode(Mode),
    /// The group now current.
    Group(GroupId),
    /// Faces released by clearing the current group.
    Cleared(Vec<FaceId>),
    /// The angle tolerance now in effect.
    Tolerance(f64),
}

/// Routes pick events to toggling or region growing and owns the groups.
#[derive(Debug)]
pub struct SelectionController<'a> {
    adjacency: &'a AdjacencyIndex,
    store: GroupStore,
    mode: Mode,
    tolerance_deg: f64,
    hook: RecolorHook,
}

impl<'a> SelectionController<'a> {
    /// Start a session over `adjacency` with one empty group in Navigate mode.
    pub fn new(adjacency: &'a AdjacencyIndex) -> Self {
        Self {
            adjacency,
            store: GroupStore::new(adjacency.face_count()),
            mode: Mode::Navigate,
            tolerance_deg: DEFAULT_ANGLE_TOLERANCE,
            hook: RecolorHook::none(),
        }
    }

    /// Start a session with an existing store.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if the store was made for a mesh
    /// with a different face count.
    pub fn with_store(adjacency: &'a AdjacencyIndex, store: GroupStore) -> Result<Self> {
        if store.face_count() != adjacency.face_count() {
            return Err(CarveError::invalid_param(
                "store",
                store.face_count(),
                "face count does not match the mesh",
            ));
        }
        Ok(Self {
            store,
            ..Self::new(adjacency)
        })
    }

    /// Set the region-growing tolerance in degrees.
    pub fn with_tolerance(mut self, degrees: f64) -> Self {
        self.set_tolerance(degrees);
        self
    }

    /// Install a recolor hook.
    pub fn with_hook(mut self, hook: RecolorHook) -> Self {
        self.hook = hook;
        self
    }

    /// Active mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch mode. Existing selections are untouched.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            debug!(from = %self.mode, to = %mode, "mode change");
            self.mode = mode;
        }
    }

    /// Advance to the next mode and return it.
    pub fn cycle_mode(&mut self) -> Mode {
        self.set_mode(self.mode.next());
        self.mode
    }

    /// Region-growing tolerance in degrees.
    pub fn tolerance(&self) -> f64 {
        self.tolerance_deg
    }

    /// Set the region-growing tolerance, clamped to `[0, 180]` degrees.
    pub fn set_tolerance(&mut self, degrees: f64) -> f64 {
        self.tolerance_deg = clamp_tolerance(degrees);
        self.tolerance_deg
    }

    /// Read access to the groups.
    pub fn store(&self) -> &GroupStore {
        &self.store
    }

    /// End the session, keeping the groups.
    pub fn into_store(self) -> GroupStore {
        self.store
    }

    /// Handle a face pick according to the active mode.
    ///
    /// # Errors
    ///
    /// Returns an invalid face error for out-of-range faces in Select and
    /// RegionGrow modes. The store is unchanged on error.
    pub fn handle_pick(&mut self, face: FaceId) -> Result<PickOutcome> {
        let group = self.store.current_group();
        match self.mode {
            Mode::Navigate => Ok(PickOutcome::Ignored),
            Mode::Select => {
                let toggle = self.store.toggle_face(group, face)?;
                let color = match toggle {
                    Toggle::Added { .. } => self.store.face_color(face),
                    Toggle::Removed => None,
                };
                self.hook.notify(&[face], color, self.store.total_selected_count());
                debug!(face = face.index(), group = group.index(), ?toggle, "toggled face");
                Ok(PickOutcome::Toggled { face, toggle })
            }
            Mode::RegionGrow => {
                let region = grow(self.adjacency, face, self.tolerance_deg)?;
                let changed = self.store.add_faces(group, &region)?;
                let color = self.store.group(group)?.color();
                self.hook.notify(&changed, Some(color), self.store.total_selected_count());
                info!(
                    seed = face.index(),
                    group = group.index(),
                    region = region.len(),
                    added = changed.len(),
                    "region added to group"
                );
                Ok(PickOutcome::Grown {
                    region: region.len(),
                    changed,
                })
            }
        }
    }

    /// Create a group and make it current.
    pub fn new_group(&mut self) -> GroupId {
        self.store.create_group()
    }

    /// Make the next group current, wrapping around.
    pub fn next_group(&mut self) -> GroupId {
        self.store.next_group()
    }

    /// Make `group` current.
    pub fn select_group(&mut self, group: GroupId) -> Result<GroupId> {
        self.store.set_current_group(group)?;
        Ok(group)
    }

    /// Empty the current group and return the released faces.
    pub fn clear_current_group(&mut self) -> Result<Vec<FaceId>> {
        let released = self.store.clear_group(self.store.current_group())?;
        self.hook.notify(&released, None, self.store.total_selected_count());
        Ok(released)
    }

    /// Dispatch one input event.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome> {
        Ok(match command {
            Command::Pick(face) => CommandOutcome::Pick(self.handle_pick(face)?),
            Command::SetMode(mode) => {
                self.set_mode(mode);
                CommandOutcome::Mode(mode)
            }
            Command::CycleMode => CommandOutcome::Mode(self.cycle_mode()),
            Command::NextGroup => CommandOutcome::Group(self.next_group()),
            Command::NewGroup => CommandOutcome::Group(self.new_group()),
            Command::SelectGroup(group) => CommandOutcome::Group(self.select_group(group)?),
            Command::ClearGroup => CommandOutcome::Cleared(self.clear_current_group()?),
            Command::SetTolerance(degrees) => CommandOutcome::Tolerance(self.set_tolerance(degrees)),
        })
    }
}
