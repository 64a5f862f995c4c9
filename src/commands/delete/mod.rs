// src/commands/delete/mod.rs
//! `-path`, `-selection` and `-path:attribute`.

use std::io::Write;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::network::HttpMethod;
use crate::paths::{
    object_url_generic, parse_wildcard_response, translate_path, FilterMap, Namespace,
};

const VIRTUAL_CONFIG: &str = "virtual_config";

impl InterpreterContext<'_> {
    pub(crate) fn delete_command(&mut self, path: &str) -> Result<(), OcliError> {
        let deleted = self.delete_objects(path)?;
        if deleted.is_empty() {
            return self.emit("Nothing got deleted");
        }
        self.emit("Objects deleted :")?;
        for path in &deleted {
            self.emit(path)?;
        }
        Ok(())
    }

    /// Delete every object designated by `path`, returning their paths.
    ///
    /// Layer paths go through the layer filter, sent as the request body.
    pub(crate) fn delete_objects(&mut self, path: &str) -> Result<Vec<String>, OcliError> {
        let split = self.split_path(path)?;
        let query = object_url_generic(&split, 0, &FilterMap::new());
        let body = query.complex_filter.as_ref().map(|filter| json!({ "filter": filter }));

        let response = self.request(HttpMethod::Delete, &query.endpoint, body.as_ref(), 200)?;
        let route = format!("{} {}", HttpMethod::Delete, query.endpoint);
        let (_, paths) = parse_wildcard_response(response.data(), split.prefix, &route)
            .map_err(OcliError::Runtime)?;
        info!(path, count = paths.len(), "objects deleted");

        if split.prefix == Namespace::Layers {
            self.state.hierarchy.invalidate_layers();
        }
        if path == self.state.curr_path {
            let parent = translate_path("..", false, &self.state.curr_path, &self.state.prev_path);
            self.cd(&parent)?;
        }
        Ok(paths)
    }

    /// Delete the selected objects one by one, reporting those that failed.
    pub(crate) fn delete_selection(&mut self) -> Result<(), OcliError> {
        let selection = self.state.clipboard.clone();
        let mut failures = String::new();
        let mut deleted = 0;
        for path in &selection {
            match self.delete_objects(path) {
                Ok(_) => deleted += 1,
                Err(e) => {
                    warn!(path = %path, error = %e, "selected object not deleted");
                    failures.push_str(&format!("    {}: {}\n", path, e));
                }
            }
        }
        self.emit(format!("{} objects deleted", deleted))?;
        let not_deleted = selection.len() - deleted;
        if not_deleted > 0 {
            write!(self.out, "{} objects could not be deleted :\n{}", not_deleted, failures)?;
        }
        Ok(())
    }

    /// Remove one attribute, `virtual_config.x` removing an entry of the
    /// virtual configuration. The whole object is sent back with PUT.
    pub(crate) fn unset_attribute_command(&mut self, path: &str, attribute: &str) -> Result<(), OcliError> {
        let mut obj = self.get_object(path)?;
        for key in ["id", "lastUpdated", "createdDate"] {
            obj.remove(key);
        }
        let attributes = match obj.get_mut("attributes") {
            Some(JsonValue::Object(attributes)) => attributes,
            _ => return Err(OcliError::runtime("object has no attributes")),
        };

        match attribute.strip_prefix("virtual_config.") {
            Some("") => return Err(OcliError::runtime("invalid attribute name")),
            Some(entry) => match attributes.get_mut(VIRTUAL_CONFIG) {
                Some(JsonValue::Object(config)) => {
                    config.remove(entry);
                }
                _ => {
                    return Err(OcliError::runtime(format!("object has no {}", VIRTUAL_CONFIG)))
                }
            },
            None => {
                attributes.remove(attribute);
            }
        }

        let endpoint = self.object_endpoint(path)?;
        debug!(path, attribute, "unset attribute");
        self.request(HttpMethod::Put, &endpoint, Some(&JsonValue::Object(obj)), 200)?;
        Ok(())
    }
}
