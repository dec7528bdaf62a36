use crate::ir::Operation;
use crate::ir::Type;
use crate::shared::Shared;
use crate::shared::WeakShared;
use std::fmt::Display;
use std::fmt::Formatter;

/// An argument of a block such as `%arg0` in `^bb0(%arg0: tensor<f32>):`.
#[derive(Debug)]
pub struct BlockArgument {
    name: String,
    typ: Type,
}

impl BlockArgument {
    pub fn new(name: &str, typ: Type) -> Self {
        Self {
            name: name.to_string(),
            typ,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A value produced by an operation.
///
/// Operations with multiple results print them as a group (`%0:2 = ...`).
/// In that case each result carries its index in the group and is referred
/// to as `%0#1`.
#[derive(Debug)]
pub struct OpResult {
    name: String,
    index: Option<usize>,
    typ: Type,
    defining_op: Option<WeakShared<Operation>>,
}

impl OpResult {
    pub fn new(name: &str, index: Option<usize>, typ: Type) -> Self {
        Self {
            name: name.to_string(),
            index,
            typ,
            defining_op: None,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn index(&self) -> Option<usize> {
        self.index
    }
    pub fn defining_op(&self) -> Option<Shared<Operation>> {
        self.defining_op.as_ref().and_then(|op| op.upgrade())
    }
    pub fn set_defining_op(&mut self, op: Option<WeakShared<Operation>>) {
        self.defining_op = op;
    }
}

#[derive(Debug)]
pub enum Value {
    BlockArgument(BlockArgument),
    OpResult(OpResult),
}

impl Value {
    pub fn typ(&self) -> &Type {
        match self {
            Value::BlockArgument(arg) => &arg.typ,
            Value::OpResult(res) => &res.typ,
        }
    }
    pub fn set_type(&mut self, typ: Type) {
        match self {
            Value::BlockArgument(arg) => arg.typ = typ,
            Value::OpResult(res) => res.typ = typ,
        }
    }
    /// Name without the group index (for example, `%0` for `%0#1`).
    pub fn name(&self) -> &str {
        match self {
            Value::BlockArgument(arg) => arg.name(),
            Value::OpResult(res) => res.name(),
        }
    }
}

/// Print the value as it is referred to by users (for example, `%0#1`).
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::BlockArgument(arg) => write!(f, "{}", arg.name),
            Value::OpResult(res) => match res.index {
                Some(index) => write!(f, "{}#{index}", res.name),
                None => write!(f, "{}", res.name),
            },
        }
    }
}
