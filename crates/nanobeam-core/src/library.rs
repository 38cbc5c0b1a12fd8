use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cell::{Cell, CellId};
use crate::layer::LayerStack;

/// A flattened cell hierarchy ready for export: every distinct cell once,
/// children before parents, each under a unique structure name.
#[derive(Debug, Clone)]
pub struct Library {
    /// Library name.
    pub name: String,
    /// Process layers.
    pub layer_stack: LayerStack,
    cells: Vec<Arc<Cell>>,
    names: HashMap<CellId, String>,
    /// Top-level cell (entry point for hierarchy).
    pub top_cell: Option<CellId>,
    /// Database unit in micrometers.
    pub db_unit_um: f64,
}

impl Library {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layer_stack: LayerStack::nanobeam(),
            cells: Vec::new(),
            names: HashMap::new(),
            top_cell: None,
            db_unit_um: 0.001,
        }
    }

    /// Collect the hierarchy under `top`.
    pub fn from_top(name: &str, top: &Arc<Cell>) -> Self {
        let mut lib = Self::new(name);
        lib.add_hierarchy(top);
        lib.top_cell = Some(top.id);
        log::debug!(
            "Library '{}' holds {} cells under '{}'",
            lib.name,
            lib.cell_count(),
            top.name
        );
        lib
    }

    /// Add `cell` and everything it references, skipping cells already present.
    pub fn add_hierarchy(&mut self, cell: &Arc<Cell>) {
        let mut visiting = HashSet::new();
        self.visit(cell, &mut visiting);
    }

    fn visit(&mut self, cell: &Arc<Cell>, visiting: &mut HashSet<CellId>) {
        if self.names.contains_key(&cell.id) || !visiting.insert(cell.id) {
            return;
        }
        for inst in &cell.instances {
            self.visit(&inst.cell, visiting);
        }
        self.add_cell(Arc::clone(cell));
    }

    /// Add a single cell. Its children must already be present for a valid export.
    pub fn add_cell(&mut self, cell: Arc<Cell>) -> CellId {
        let id = cell.id;
        if self.names.contains_key(&id) {
            return id;
        }
        let name = self.unique_name(&cell.name);
        self.names.insert(id, name);
        self.cells.push(cell);
        id
    }

    fn unique_name(&self, base: &str) -> String {
        let base: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
            .collect();
        let taken: HashSet<&str> = self.names.values().map(|s| s.as_str()).collect();
        if !taken.contains(base.as_str()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}${}", base, n);
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn get_cell(&self, id: &CellId) -> Option<&Arc<Cell>> {
        self.cells.iter().find(|c| c.id == *id)
    }

    /// The exported structure name of a cell.
    pub fn cell_name(&self, id: &CellId) -> Option<&str> {
        self.names.get(id).map(|s| s.as_str())
    }

    pub fn find_cell_by_name(&self, name: &str) -> Option<&Arc<Cell>> {
        self.cells
            .iter()
            .find(|c| self.cell_name(&c.id) == Some(name))
    }

    pub fn top(&self) -> Option<&Arc<Cell>> {
        self.top_cell.as_ref().and_then(|id| self.get_cell(id))
    }

    pub fn cell_names(&self) -> Vec<&str> {
        self.cells
            .iter()
            .filter_map(|c| self.cell_name(&c.id))
            .collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cells in export order (children first).
    pub fn all_cells(&self) -> impl Iterator<Item = &Arc<Cell>> {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::straight;

    #[test]
    fn test_library_create() {
        let lib = Library::new("test_project");
        assert_eq!(lib.name, "test_project");
        assert_eq!(lib.cell_count(), 0);
        assert!(lib.top_cell.is_none());
    }

    #[test]
    fn test_shared_cells_are_written_once() {
        let bar = straight(1.0, 2.0, 8);
        let mut top = Cell::new("top");
        top.add_ref(&bar);
        top.add_ref(&bar);
        let top = Arc::new(top);

        let lib = Library::from_top("lib", &top);
        assert_eq!(lib.cell_count(), 2);
        assert_eq!(lib.cell_names(), vec!["straight", "top"]);
        assert_eq!(lib.top().unwrap().id, top.id);
    }

    #[test]
    fn test_name_collisions_are_renamed() {
        let mut top = Cell::new("photonic crystal");
        top.add_ref(&straight(1.0, 2.0, 8));
        top.add_ref(&straight(3.0, 2.0, 8));
        let lib = Library::from_top("lib", &Arc::new(top));
        assert_eq!(lib.cell_names(), vec!["straight", "straight$1", "photonic_crystal"]);
        assert!(lib.find_cell_by_name("straight$1").is_some());
    }
}
