// src/commands/navigation/mod.rs
//! cd, tree and selection

use tracing::{debug, info};

use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::DebugLevel;
use crate::paths::{path_is_layer, path_remove_layer};

impl InterpreterContext<'_> {
    pub(crate) fn cd(&mut self, path: &str) -> Result<(), OcliError> {
        debug!(path, "cd");
        if path_is_layer(path) {
            return Err(OcliError::resolution("it is not possible to cd into a layer"));
        }
        self.tree(path, 0)?;
        self.state.prev_path = std::mem::take(&mut self.state.curr_path);
        self.state.curr_path = path_remove_layer(path);
        Ok(())
    }

    pub(crate) fn tree_command(&mut self, path: &str, depth: usize) -> Result<(), OcliError> {
        let root = self.tree(path, depth)?;
        self.emit(path)?;
        let rendered = root.render(depth);
        if !rendered.is_empty() {
            self.emit(rendered)?;
        }
        Ok(())
    }

    /// `=path`: select the objects matching `path`, the only one also
    /// becoming the current path. An empty path clears the selection.
    pub(crate) fn select_object(&mut self, path: &str) -> Result<(), OcliError> {
        let selection = if path.is_empty() {
            Vec::new()
        } else if path.contains('*') {
            self.unfold_path(path)?
        } else {
            self.cd(path)?;
            vec![path.to_string()]
        };
        self.set_clipboard(selection)
    }

    /// `={a, b}`
    pub(crate) fn select_children(&mut self, paths: Vec<String>) -> Result<(), OcliError> {
        let empty = paths.is_empty();
        self.set_clipboard(paths)?;
        if !empty && self.state.debug_level > DebugLevel::None {
            self.emit("Selection made")?;
        }
        Ok(())
    }

    fn set_clipboard(&mut self, selection: Vec<String>) -> Result<(), OcliError> {
        info!(count = selection.len(), "selection changed");
        self.state.clipboard = selection;
        if self.state.clipboard.is_empty() {
            self.emit("Selection is now empty")?;
        }
        Ok(())
    }
}
