use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::drawing::types::{
    Drawing, DrawingId, DrawingKind, DrawingPoint, DrawingProperties, Folder, FolderId,
};
use crate::error::ChartResult;

/// Durable drawings and folders as one value, used for history and
/// persistence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawingSnapshot {
    pub drawings: Vec<Drawing>,
    pub folders: Vec<Folder>,
}

/// One line of the object panel, topmost drawing first.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelRow {
    Folder {
        id: FolderId,
        name: String,
        is_expanded: bool,
    },
    Drawing {
        id: DrawingId,
        kind: DrawingKind,
        folder_id: Option<FolderId>,
        visible: bool,
        locked: bool,
        /// Position in the flat panel order accepted by
        /// [`DrawingSet::reorder_panel`].
        panel_position: usize,
    },
}

/// Ordered drawing collection.
///
/// Insertion order is the z-order: index 0 is painted first (bottom). The
/// object panel lists the topmost drawing first; that inversion happens only
/// in [`DrawingSet::panel_rows`] and [`DrawingSet::reorder_panel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawingSet {
    drawings: IndexMap<DrawingId, Drawing>,
    folders: IndexMap<FolderId, Folder>,
}

impl DrawingSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a set from persisted parts. Drawings with an arity mismatch
    /// are rejected; references to unknown folders fall back to the root.
    pub fn from_snapshot(snapshot: DrawingSnapshot) -> ChartResult<Self> {
        let mut set = Self::new();
        for folder in snapshot.folders {
            set.folders.insert(folder.id.clone(), folder);
        }
        for mut drawing in snapshot.drawings {
            drawing.validate()?;
            if drawing
                .folder_id
                .as_ref()
                .is_some_and(|folder_id| !set.folders.contains_key(folder_id))
            {
                warn!(drawing = drawing.id.as_str(), "dropping unknown folder reference");
                drawing.folder_id = None;
            }
            set.drawings.insert(drawing.id.clone(), drawing);
        }
        Ok(set)
    }

    #[must_use]
    pub fn snapshot(&self) -> DrawingSnapshot {
        DrawingSnapshot {
            drawings: self.drawings.values().cloned().collect(),
            folders: self.folders.values().cloned().collect(),
        }
    }

    /// Replaces the contents with `snapshot` without validation. Snapshots
    /// come from this set's own history.
    pub fn restore(&mut self, snapshot: DrawingSnapshot) {
        self.drawings = snapshot
            .drawings
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        self.folders = snapshot
            .folders
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    /// Drawings bottom-to-top.
    pub fn iter(&self) -> indexmap::map::Values<'_, DrawingId, Drawing> {
        self.drawings.values()
    }

    #[must_use]
    pub fn get(&self, id: &DrawingId) -> Option<&Drawing> {
        self.drawings.get(id)
    }

    #[must_use]
    pub fn z_index(&self, id: &DrawingId) -> Option<usize> {
        self.drawings.get_index_of(id)
    }

    /// Adds `drawing` on top.
    pub fn insert(&mut self, drawing: Drawing) {
        debug!(id = drawing.id.as_str(), kind = ?drawing.kind, "drawing added");
        self.drawings.insert(drawing.id.clone(), drawing);
    }

    pub fn remove(&mut self, id: &DrawingId) -> Option<Drawing> {
        let removed = self.drawings.shift_remove(id);
        if removed.is_some() {
            debug!(id = id.as_str(), "drawing removed");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.drawings.clear();
        self.folders.clear();
    }

    pub fn set_points(&mut self, id: &DrawingId, points: Vec<DrawingPoint>) -> bool {
        self.update(id, |d| d.points = points)
    }

    pub fn set_visible(&mut self, id: &DrawingId, visible: bool) -> bool {
        self.update(id, |d| d.properties.visible = visible)
    }

    pub fn set_locked(&mut self, id: &DrawingId, locked: bool) -> bool {
        self.update(id, |d| d.properties.locked = locked)
    }

    pub fn set_properties(&mut self, id: &DrawingId, properties: DrawingProperties) -> bool {
        self.update(id, |d| d.properties = properties)
    }

    /// Moves a drawing into `folder` (`None` = root). Unknown folders are
    /// rejected.
    pub fn move_to_folder(&mut self, id: &DrawingId, folder: Option<FolderId>) -> bool {
        if folder
            .as_ref()
            .is_some_and(|folder_id| !self.folders.contains_key(folder_id))
        {
            return false;
        }
        self.update(id, |d| d.folder_id = folder)
    }

    fn update(&mut self, id: &DrawingId, apply: impl FnOnce(&mut Drawing)) -> bool {
        match self.drawings.get_mut(id) {
            Some(drawing) => {
                apply(drawing);
                true
            }
            None => false,
        }
    }

    /// Moves a drawing to canonical z-index `to`.
    pub fn move_to_z(&mut self, id: &DrawingId, to: usize) -> bool {
        let Some(from) = self.drawings.get_index_of(id) else {
            return false;
        };
        if to >= self.drawings.len() {
            return false;
        }
        self.drawings.move_index(from, to);
        true
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    #[must_use]
    pub fn folder(&self, id: &FolderId) -> Option<&Folder> {
        self.folders.get(id)
    }

    pub fn create_folder(&mut self, name: impl Into<String>) -> FolderId {
        let folder = Folder::new(name);
        let id = folder.id.clone();
        self.folders.insert(id.clone(), folder);
        id
    }

    pub fn rename_folder(&mut self, id: &FolderId, name: impl Into<String>) -> bool {
        match self.folders.get_mut(id) {
            Some(folder) => {
                folder.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn toggle_folder(&mut self, id: &FolderId) -> bool {
        match self.folders.get_mut(id) {
            Some(folder) => {
                folder.is_expanded = !folder.is_expanded;
                true
            }
            None => false,
        }
    }

    /// Deletes a folder; its drawings move to the root.
    pub fn delete_folder(&mut self, id: &FolderId) -> bool {
        if self.folders.shift_remove(id).is_none() {
            return false;
        }
        for drawing in self.drawings.values_mut() {
            if drawing.folder_id.as_ref() == Some(id) {
                drawing.folder_id = None;
            }
        }
        true
    }

    fn panel_to_z(&self, panel_position: usize) -> Option<usize> {
        self.drawings.len().checked_sub(panel_position + 1)
    }

    /// Reorders using panel positions (0 = topmost).
    pub fn reorder_panel(&mut self, from: usize, to: usize) -> bool {
        match (self.panel_to_z(from), self.panel_to_z(to)) {
            (Some(from_z), Some(to_z)) => {
                self.drawings.move_index(from_z, to_z);
                true
            }
            _ => false,
        }
    }

    /// Panel listing: each folder followed by its drawings (when expanded),
    /// then root drawings. Drawings within a group are topmost first.
    #[must_use]
    pub fn panel_rows(&self) -> Vec<PanelRow> {
        let ordered: Vec<(usize, &Drawing)> = self.drawings.values().rev().enumerate().collect();
        let drawing_row = |position: usize, d: &Drawing| PanelRow::Drawing {
            id: d.id.clone(),
            kind: d.kind,
            folder_id: d.folder_id.clone(),
            visible: d.properties.visible,
            locked: d.properties.locked,
            panel_position: position,
        };

        let mut rows = Vec::with_capacity(self.folders.len() + ordered.len());
        for folder in self.folders.values() {
            rows.push(PanelRow::Folder {
                id: folder.id.clone(),
                name: folder.name.clone(),
                is_expanded: folder.is_expanded,
            });
            if folder.is_expanded {
                rows.extend(
                    ordered
                        .iter()
                        .filter(|(_, d)| d.folder_id.as_ref() == Some(&folder.id))
                        .map(|(pos, d)| drawing_row(*pos, d)),
                );
            }
        }
        rows.extend(
            ordered
                .iter()
                .filter(|(_, d)| d.folder_id.is_none())
                .map(|(pos, d)| drawing_row(*pos, d)),
        );
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::{DrawingSet, PanelRow};
    use crate::drawing::types::{Drawing, DrawingKind, DrawingPoint, DrawingProperties};

    fn line(price: f64) -> Drawing {
        Drawing::new(
            DrawingKind::HorizontalLine,
            vec![DrawingPoint::new(1_000, price)],
            DrawingProperties::default(),
        )
        .expect("drawing")
    }

    fn panel_ids(set: &DrawingSet) -> Vec<f64> {
        set.panel_rows()
            .into_iter()
            .filter_map(|row| match row {
                PanelRow::Drawing { id, .. } => set.get(&id).map(|d| d.points[0].price),
                PanelRow::Folder { .. } => None,
            })
            .collect()
    }

    #[test]
    fn panel_lists_topmost_first() {
        let mut set = DrawingSet::new();
        for price in [1.0, 2.0, 3.0] {
            set.insert(line(price));
        }
        assert_eq!(panel_ids(&set), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn panel_reorder_maps_to_z_order() {
        let mut set = DrawingSet::new();
        for price in [1.0, 2.0, 3.0] {
            set.insert(line(price));
        }
        // Drag the bottom row (price 1) to the top of the panel.
        assert!(set.reorder_panel(2, 0));
        assert_eq!(panel_ids(&set), vec![1.0, 3.0, 2.0]);
        let prices: Vec<f64> = set.iter().map(|d| d.points[0].price).collect();
        assert_eq!(prices, vec![2.0, 3.0, 1.0]);
        assert!(!set.reorder_panel(3, 0));
    }

    #[test]
    fn deleting_folder_reassigns_children_to_root() {
        let mut set = DrawingSet::new();
        let drawing = line(1.0);
        let id = drawing.id.clone();
        set.insert(drawing);
        let folder = set.create_folder("levels");
        assert!(set.move_to_folder(&id, Some(folder.clone())));
        assert!(set.delete_folder(&folder));
        assert_eq!(set.get(&id).and_then(|d| d.folder_id.clone()), None);
        assert_eq!(set.folders().count(), 0);
    }

    #[test]
    fn collapsed_folder_hides_children() {
        let mut set = DrawingSet::new();
        let drawing = line(1.0);
        let id = drawing.id.clone();
        set.insert(drawing);
        let folder = set.create_folder("levels");
        set.move_to_folder(&id, Some(folder.clone()));
        set.toggle_folder(&folder);
        let rows = set.panel_rows();
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], PanelRow::Folder { is_expanded: false, .. }));
    }

    #[test]
    fn snapshot_round_trips_order() {
        let mut set = DrawingSet::new();
        set.insert(line(1.0));
        set.insert(line(2.0));
        let rebuilt = DrawingSet::from_snapshot(set.snapshot()).expect("rebuild");
        assert_eq!(rebuilt, set);
    }
}
