use crate::ir::spaces;
use crate::ir::Operation;
use crate::ir::Region;
use crate::ir::Value;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::shared::WeakShared;
use anyhow::Result;
use std::fmt::Formatter;
use std::sync::Arc;

/// A list of operations with typed arguments.
#[derive(Debug, Default)]
pub struct Block {
    /// Label such as `^bb0` (without arguments) if the source had one.
    label: Option<String>,
    arguments: Vec<Shared<Value>>,
    ops: Vec<Shared<Operation>>,
    parent: Option<WeakShared<Region>>,
}

impl Block {
    pub fn new(label: Option<String>, arguments: Vec<Shared<Value>>) -> Self {
        Self {
            label,
            arguments,
            ops: vec![],
            parent: None,
        }
    }
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
    pub fn arguments(&self) -> &[Shared<Value>] {
        &self.arguments
    }
    pub fn ops(&self) -> &[Shared<Operation>] {
        &self.ops
    }
    pub fn parent(&self) -> Option<Shared<Region>> {
        self.parent.as_ref().and_then(|parent| parent.upgrade())
    }
    pub fn set_parent(&mut self, parent: Option<WeakShared<Region>>) {
        self.parent = parent;
    }
    pub fn push_op(&mut self, op: Shared<Operation>) {
        self.ops.push(op);
    }
    pub fn index_of(&self, op: &Shared<Operation>) -> Option<usize> {
        self.ops.iter().position(|current| Arc::ptr_eq(current, op))
    }
    /// Position of `op` in this block, or an error if it is not there.
    pub fn position(&self, op: &Shared<Operation>) -> Result<usize> {
        match self.index_of(op) {
            Some(index) => Ok(index),
            None => Err(anyhow::anyhow!(
                "Could not find {} in its parent block",
                op.rd().name()
            )),
        }
    }
    /// Put `new` at `index`, dropping the operation that was there.
    pub fn set_op(&mut self, index: usize, new: Shared<Operation>) {
        self.ops[index] = new;
    }
    /// Print the block. The header (`^bb0(%arg0: i32):`) is only printed
    /// when it carries information.
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32, index: usize) -> std::fmt::Result {
        if 0 < index || !self.arguments.is_empty() || self.label.is_some() {
            let label = match &self.label {
                Some(label) => label.clone(),
                None => format!("^bb{index}"),
            };
            write!(f, "{}{label}", spaces(indent - 1))?;
            if !self.arguments.is_empty() {
                write!(f, "(")?;
                for (i, argument) in self.arguments.iter().enumerate() {
                    if 0 < i {
                        write!(f, ", ")?;
                    }
                    let argument = argument.rd();
                    write!(f, "{argument}: {}", argument.typ())?;
                }
                write!(f, ")")?;
            }
            writeln!(f, ":")?;
        }
        for op in &self.ops {
            write!(f, "{}", spaces(indent))?;
            op.rd().display(f, indent)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Set the parent of every operation in `block` to `block`.
pub fn adopt_ops(block: &Shared<Block>) {
    let weak = Arc::downgrade(block);
    for op in block.rd().ops() {
        op.wr().set_parent(Some(weak.clone()));
    }
}
