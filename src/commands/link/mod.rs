// src/commands/link/mod.rs
//! `link source@destination` attaches a stray object to the hierarchy,
//! `unlink path` sends it back to the stray objects.

use serde_json::json;
use tracing::info;

use crate::ast::types::LinkNode;
use crate::commands::utils::{expand_str_vector, Object};
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::Value;
use crate::network::HttpMethod;
use crate::paths::Namespace;

impl InterpreterContext<'_> {
    pub(crate) fn link_command(&mut self, link: &LinkNode) -> Result<Value, OcliError> {
        let source = self.eval_path(&link.source)?;
        let destination = self.eval_path(&link.destination)?;
        let mut values = Vec::with_capacity(link.values.len());
        for node in &link.values {
            values.push(self.execute(node)?);
        }
        let slots = match &link.slots {
            Some(nodes) => {
                let mut slots = Vec::with_capacity(nodes.len());
                for node in nodes {
                    slots.push(self.eval_string(node, "slots")?);
                }
                Some(slots)
            }
            None => None,
        };
        if self.skip_effect("link") {
            return Ok(Value::Unit);
        }
        self.link_object(&source, &destination, &link.attributes, &values, slots.as_deref())?;
        Ok(Value::Unit)
    }

    /// PATCH `<source>/link` with the new parent, the slots and any extra
    /// attribute given on the command line.
    pub(crate) fn link_object(
        &mut self,
        source: &str,
        destination: &str,
        attributes: &[String],
        values: &[Value],
        slots: Option<&[String]>,
    ) -> Result<(), OcliError> {
        let source_url = self.object_endpoint(source)?;
        let destination_id = self.split_path(destination)?.object_id;
        let stray = format!("{}/", Namespace::Stray.object_endpoint());
        if !source_url.starts_with(&stray) {
            return Err(OcliError::runtime("only stray objects can be linked"));
        }

        let mut payload = Object::new();
        payload.insert("parentId".to_string(), json!(destination_id));
        for (attribute, value) in attributes.iter().zip(values) {
            payload.insert(attribute.clone(), value.to_json());
        }
        if let Some(slots) = slots {
            payload.insert("slot".to_string(), json!(expand_str_vector(slots)?));
        }

        let endpoint = format!("{}/link", source_url);
        self.request(HttpMethod::Patch, &endpoint, Some(&payload.into()), 200)?;
        info!(source, destination, "object linked");
        Ok(())
    }

    pub(crate) fn unlink_object(&mut self, path: &str) -> Result<(), OcliError> {
        let endpoint = format!("{}/unlink", self.object_endpoint(path)?);
        self.request(HttpMethod::Patch, &endpoint, None, 200)?;
        info!(path, "object unlinked");
        Ok(())
    }
}
