//! Interpreter - AST Execution Engine
//!
//! `InterpreterContext` bundles the shell state with the collaborators a node
//! may need while executing: the inventory API, the clock used by the
//! hierarchy cache and the output stream. Every node goes through
//! `InterpreterContext::execute`, one match over the closed node set.
//!
//! Delegates to specialized modules for:
//! - Expression operators (arithmetic.rs)
//! - printf-style formatting (format.rs)
//! - Control flow (control_flow.rs)
//! - User functions (functions.rs)
//! - Script files (script.rs)
//! - Effect-producing commands (crate::commands)

use std::io::Write;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::ast::types::{Filters, Node, PathNode, RecursiveArgs};
use crate::commands::resolve::RecursiveParams;
use crate::commands::get::RackQuery;
use crate::hierarchy::Clock;
use crate::interpreter::arithmetic::{apply_arith, compare, equality, logical, negate};
use crate::interpreter::errors::OcliError;
use crate::interpreter::format::sprintf;
use crate::interpreter::types::{
    to_bool, to_float, to_int, to_string, to_vec, DebugLevel, ShellState, Value,
};
use crate::network::{ApiPort, ApiResponse, HttpMethod};
use crate::paths::{translate_path, FilterMap};

/// Interpreter context passed to execution functions.
pub struct InterpreterContext<'a> {
    /// Mutable shell state
    pub state: &'a mut ShellState,
    /// Inventory API
    pub api: &'a dyn ApiPort,
    /// Time source of the hierarchy cache
    pub clock: &'a dyn Clock,
    /// Where command output is printed
    pub out: &'a mut dyn Write,
    /// Nesting of user function calls
    pub(crate) call_depth: usize,
}

impl<'a> InterpreterContext<'a> {
    pub fn new(
        state: &'a mut ShellState,
        api: &'a dyn ApiPort,
        clock: &'a dyn Clock,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            state,
            api,
            clock,
            out,
            call_depth: 0,
        }
    }

    /// Print one line of output.
    pub(crate) fn emit(&mut self, text: impl std::fmt::Display) -> Result<(), OcliError> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    /// Whether the effect of `command` must be skipped.
    pub(crate) fn skip_effect(&self, command: &str) -> bool {
        if self.state.dry_run {
            debug!(command, "dry-run, effect skipped");
        }
        self.state.dry_run
    }

    /// Request the API, prefixing errors with the route at DEBUG level.
    pub(crate) fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&JsonValue>,
        expected_status: u16,
    ) -> Result<ApiResponse, OcliError> {
        self.api
            .request(method, endpoint, body, expected_status)
            .map_err(|e| {
                let mut err = OcliError::from(e);
                if self.state.debug_level >= DebugLevel::Debug {
                    if let OcliError::Collaborator { message, .. } = &mut err {
                        *message = format!("{} {}\n{}", method, endpoint, message);
                    }
                }
                err
            })
    }

    // ========================================================================
    // Argument evaluation
    // ========================================================================

    pub(crate) fn eval_string(&mut self, node: &Node, name: &str) -> Result<String, OcliError> {
        let value = self.execute(node)?;
        to_string(&value, name)
    }

    pub(crate) fn eval_float(&mut self, node: &Node, name: &str) -> Result<f64, OcliError> {
        let value = self.execute(node)?;
        to_float(&value, name)
    }

    pub(crate) fn eval_int(&mut self, node: &Node, name: &str) -> Result<i64, OcliError> {
        let value = self.execute(node)?;
        to_int(&value, name)
    }

    pub(crate) fn eval_bool(&mut self, node: &Node, name: &str) -> Result<bool, OcliError> {
        let value = self.execute(node)?;
        to_bool(&value, name)
    }

    pub(crate) fn eval_vec(
        &mut self,
        node: &Node,
        size: Option<usize>,
        name: &str,
    ) -> Result<Vec<f64>, OcliError> {
        let value = self.execute(node)?;
        to_vec(&value, size, name)
    }

    /// Absolute path of a path argument.
    pub(crate) fn eval_path(&mut self, path: &PathNode) -> Result<String, OcliError> {
        let raw = self.eval_string(&path.path, "path")?;
        Ok(translate_path(
            &raw,
            path.accept_selection,
            &self.state.curr_path,
            &self.state.prev_path,
        ))
    }

    pub(crate) fn eval_filters(&mut self, filters: &Filters) -> Result<FilterMap, OcliError> {
        let mut evaluated = FilterMap::new();
        for (key, node) in filters {
            let value = self.eval_string(node, key)?;
            evaluated.insert(key.clone(), value);
        }
        Ok(evaluated)
    }

    pub(crate) fn eval_recursive(
        &self,
        args: &RecursiveArgs,
    ) -> Result<Option<RecursiveParams>, OcliError> {
        if !args.is_recursive {
            return Ok(None);
        }
        let depth = |raw: &Option<String>, name: &str| -> Result<Option<usize>, OcliError> {
            raw.as_deref()
                .map(|s| {
                    s.parse::<usize>().map_err(|_| {
                        OcliError::type_coercion(format!("{} should be a positive integer", name))
                    })
                })
                .transpose()
        };
        Ok(Some(RecursiveParams {
            min_depth: depth(&args.min_depth, "min depth")?.unwrap_or(0),
            max_depth: depth(&args.max_depth, "max depth")?,
        }))
    }

    // ========================================================================
    // Execution
    // ========================================================================

    pub fn execute(&mut self, node: &Node) -> Result<Value, OcliError> {
        match node {
            Node::Value(value) => Ok(value.clone()),
            Node::SymbolReference(name) => self
                .state
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| OcliError::runtime(format!("undefined variable {}", name))),
            Node::ArrayReference { variable, index } => self.execute_array_reference(variable, index),
            Node::Array(items) => {
                let mut vector = Vec::with_capacity(items.len());
                for item in items {
                    vector.push(self.eval_float(item, "array element")?);
                }
                Ok(Value::FloatVector(vector))
            }
            Node::Arith { op, left, right } => {
                let l = self.execute(left)?;
                let r = self.execute(right)?;
                apply_arith(*op, &l, &r)
            }
            Node::Logical { op, left, right } => {
                let l = self.execute(left)?;
                let r = self.execute(right)?;
                logical(*op, &l, &r)
            }
            Node::Equality { op, left, right } => {
                let l = self.execute(left)?;
                let r = self.execute(right)?;
                Ok(equality(*op, &l, &r))
            }
            Node::Comparator { op, left, right } => {
                let l = self.execute(left)?;
                let r = self.execute(right)?;
                compare(*op, &l, &r)
            }
            Node::Negate(expr) => {
                let value = self.execute(expr)?;
                negate(&value)
            }
            Node::NegateBool(expr) => Ok(Value::Bool(!self.eval_bool(expr, "expression")?)),
            Node::FormatString { format, args } => self.execute_format(format, args),
            Node::Path(path) => Ok(Value::String(self.eval_path(path)?)),

            Node::Sequence(nodes) => {
                for node in nodes {
                    self.execute(node)?;
                    if self.state.exit_requested {
                        break;
                    }
                }
                Ok(Value::Unit)
            }
            Node::Assign { variable, value } => self.execute_assign(variable, value),
            Node::If {
                condition,
                body,
                else_body,
            } => self.execute_if(condition, body, else_body.as_deref()),
            Node::While { condition, body } => self.execute_while(condition, body),
            Node::ForRange {
                variable,
                start,
                end,
                body,
            } => self.execute_for_range(variable, start, end, body),
            Node::ForArray {
                variable,
                array,
                body,
            } => self.execute_for_array(variable, array, body),
            Node::FuncDef { name, body } => self.define_function(name, body),
            Node::FuncCall(name) => self.call_function(name),

            Node::Len(variable) => {
                let value = self
                    .state
                    .variables
                    .get(variable)
                    .ok_or_else(|| OcliError::runtime(format!("Undefined variable {}", variable)))?;
                let vector = to_vec(value, None, &format!("Variable {}", variable))?;
                Ok(Value::Int(vector.len() as i64))
            }
            Node::Print(expr) => {
                let value = self.execute(expr)?;
                self.emit(&value)?;
                Ok(Value::Unit)
            }
            Node::Pwd => {
                writeln!(self.out, "{}", self.state.curr_path)?;
                Ok(Value::String(self.state.curr_path.clone()))
            }
            Node::Exit => {
                self.state.exit_requested = true;
                Ok(Value::Unit)
            }
            Node::Env => self.print_env(),
            Node::SetEnv { name, value } => self.set_env(name, value),
            Node::UnsetFunc(name) => {
                self.state.functions.shift_remove(name);
                Ok(Value::Unit)
            }
            Node::UnsetVar(name) => {
                self.state.variables.shift_remove(name);
                Ok(Value::Unit)
            }
            Node::ShowSelection => {
                for path in &self.state.clipboard {
                    writeln!(self.out, "{}", path)?;
                }
                Ok(Value::Unit)
            }
            Node::Load(file) => {
                let path = self.eval_string(file, "file path")?;
                self.load_file(&path)?;
                Ok(Value::Unit)
            }
            Node::DryLoad(file) => {
                let path = self.eval_string(file, "file path")?;
                self.dry_load_file(&path)?;
                Ok(Value::Unit)
            }

            Node::Cd(path) => {
                let path = self.eval_path(path)?;
                if self.skip_effect("cd") {
                    return Ok(Value::Unit);
                }
                self.cd(&path)?;
                Ok(Value::Unit)
            }
            Node::Tree { path, depth } => {
                let path = self.eval_path(path)?;
                let depth = usize::try_from(*depth)
                    .map_err(|_| OcliError::type_coercion("depth should be a positive integer"))?;
                if self.skip_effect("tree") {
                    return Ok(Value::Unit);
                }
                self.tree_command(&path, depth)?;
                Ok(Value::Unit)
            }
            Node::Ls(ls) => {
                let path = self.eval_path(&ls.path)?;
                let filters = self.eval_filters(&ls.filters)?;
                let recursive = self.eval_recursive(&ls.recursive)?;
                if self.skip_effect("ls") {
                    return Ok(Value::Unit);
                }
                self.ls_command(
                    &path,
                    &filters,
                    ls.sort_attr.as_deref(),
                    &ls.attributes,
                    recursive.as_ref(),
                )?;
                Ok(Value::Unit)
            }
            Node::Get(get) => {
                let path = self.eval_path(&get.path)?;
                let filters = self.eval_filters(&get.filters)?;
                let recursive = self.eval_recursive(&get.recursive)?;
                if self.skip_effect("get") {
                    return Ok(Value::Unit);
                }
                self.get_command(&path, &filters, &get.attributes, recursive.as_ref())
            }
            Node::GetU { path, u } => {
                let path = self.eval_path(path)?;
                let u = self.eval_int(u, "u")?;
                if u < 0 {
                    return Err(OcliError::type_coercion("the U value must be positive"));
                }
                if self.skip_effect("getu") {
                    return Ok(Value::Unit);
                }
                self.get_in_rack(&path, RackQuery::U(u))
            }
            Node::GetSlot { path, slot } => {
                let path = self.eval_path(path)?;
                let slot = self.eval_string(slot, "slot")?;
                if self.skip_effect("getslot") {
                    return Ok(Value::Unit);
                }
                self.get_in_rack(&path, RackQuery::Slot(slot))
            }
            Node::SelectObject(path) => {
                let path = self.eval_string(path, "path")?;
                if self.skip_effect("select") {
                    return Ok(Value::Unit);
                }
                self.select_object(&path)?;
                Ok(Value::Unit)
            }
            Node::SelectChildren(paths) => {
                let mut evaluated = Vec::with_capacity(paths.len());
                for path in paths {
                    evaluated.push(self.eval_path(path)?);
                }
                if self.skip_effect("select") {
                    return Ok(Value::Unit);
                }
                self.select_children(evaluated)?;
                Ok(Value::Unit)
            }
            Node::Draw { path, depth, force } => {
                let path = self.eval_path(path)?;
                if *depth < 0 {
                    return Err(OcliError::type_coercion("depth should be a positive integer"));
                }
                if self.skip_effect("draw") {
                    return Ok(Value::Unit);
                }
                self.draw(&path, *depth, *force)?;
                Ok(Value::Unit)
            }
            Node::Undraw(path) => {
                let path = path.as_ref().map(|p| self.eval_path(p)).transpose()?;
                if self.skip_effect("undraw") {
                    return Ok(Value::Unit);
                }
                self.undraw(path.as_deref())?;
                Ok(Value::Unit)
            }
            Node::DeleteObj(path) => {
                let path = self.eval_path(path)?;
                if self.skip_effect("delete") {
                    return Ok(Value::Unit);
                }
                self.delete_command(&path)?;
                Ok(Value::Unit)
            }
            Node::DeleteAttr { path, attribute } => {
                let path = self.eval_path(path)?;
                if self.skip_effect("unset attribute") {
                    return Ok(Value::Unit);
                }
                self.unset_attribute_command(&path, attribute)?;
                Ok(Value::Unit)
            }
            Node::DeleteSelection => {
                if self.skip_effect("delete selection") {
                    return Ok(Value::Unit);
                }
                self.delete_selection()?;
                Ok(Value::Unit)
            }
            Node::Update(update) => self.update_command(update),
            Node::Link(link) => self.link_command(link),
            Node::Unlink(path) => {
                let path = self.eval_path(path)?;
                if self.skip_effect("unlink") {
                    return Ok(Value::Unit);
                }
                self.unlink_object(&path)?;
                Ok(Value::Unit)
            }
            Node::Create(create) => self.create_command(create),
        }
    }

    fn execute_array_reference(&mut self, variable: &str, index: &Node) -> Result<Value, OcliError> {
        let vector = match self.state.variables.get(variable) {
            None => return Err(OcliError::runtime(format!("Undefined variable {}", variable))),
            Some(Value::FloatVector(v)) => v.clone(),
            Some(_) => return Err(OcliError::runtime("You can only index an array.")),
        };
        let i = self.eval_int(index, "index")?;
        usize::try_from(i)
            .ok()
            .and_then(|i| vector.get(i))
            .map(|x| Value::Float(*x))
            .ok_or_else(|| {
                OcliError::runtime(format!(
                    "Index out of range\nArray length : {}\nBut desired index at : {}",
                    vector.len(),
                    i
                ))
            })
    }

    fn execute_format(&mut self, format: &Node, args: &[Node]) -> Result<Value, OcliError> {
        let format = self.eval_string(format, "string")?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.execute(arg)?);
        }
        if format == "%v" {
            if let [vector @ Value::FloatVector(_)] = values.as_slice() {
                return Ok(vector.clone());
            }
        }
        Ok(Value::String(sprintf(&format, &values)))
    }

    fn execute_assign(&mut self, variable: &str, value: &Node) -> Result<Value, OcliError> {
        let value = self.execute(value)?;
        if value.is_unit() {
            return Err(OcliError::runtime(format!(
                "Invalid type to assign variable {}",
                variable
            )));
        }
        debug!(variable, %value, "variable assigned");
        self.state.variables.insert(variable.to_string(), value);
        Ok(Value::Unit)
    }

    fn print_env(&mut self) -> Result<Value, OcliError> {
        writeln!(self.out, "DebugLevel: {}", self.state.debug_level.as_str())?;
        writeln!(self.out, "Customer: {}", self.state.customer)?;
        writeln!(self.out)?;
        writeln!(self.out, "Currently defined user variables:")?;
        for (name, value) in &self.state.variables {
            writeln!(self.out, "Name: {}  Value: {}", name, value)?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "Currently defined user functions:")?;
        for name in self.state.functions.keys() {
            writeln!(self.out, "Name: {}", name)?;
        }
        Ok(Value::Unit)
    }

    fn set_env(&mut self, name: &str, value: &Node) -> Result<Value, OcliError> {
        match name {
            "DebugLevel" => {
                let level = self.eval_int(value, "DebugLevel")?;
                self.state.debug_level = DebugLevel::from_int(level).ok_or_else(|| {
                    OcliError::type_coercion("DebugLevel should be an integer between 0 and 4")
                })?;
            }
            "Customer" => {
                self.state.customer = self.eval_string(value, "Customer")?;
            }
            _ => self.emit(format!("{} is not an environment variable", name))?,
        }
        Ok(Value::Unit)
    }
}
