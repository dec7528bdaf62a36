use crate::ir::spaces;
use crate::ir::Attributes;
use crate::ir::Block;
use crate::ir::FunctionType;
use crate::ir::OpResult;
use crate::ir::Region;
use crate::ir::Type;
use crate::ir::Value;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::shared::WeakShared;
use anyhow::Result;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

/// Name of the operation that holds the top-level region.
pub const MODULE: &str = "builtin.module";

/// A dialect-qualified operation name such as `stablehlo.add`.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct OperationName {
    name: String,
}

impl OperationName {
    pub fn new(name: String) -> Self {
        Self { name }
    }
    pub fn name(&self) -> String {
        self.name.clone()
    }
    pub fn as_str(&self) -> &str {
        &self.name
    }
    /// The namespace before the first dot (`builtin` if there is none).
    pub fn dialect(&self) -> &str {
        match self.name.split_once('.') {
            Some((dialect, _)) => dialect,
            None => crate::ir::BUILTIN,
        }
    }
}

impl Display for OperationName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "<unknown>")?;
        }
        write!(f, "{}", self.name)
    }
}

/// A generic operation.
///
/// Every operation, including the module, is represented by this one type.
/// Dialect schemas (see [crate::dialect]) know which names exist and how
/// many regions an operation of a given name owns.
#[derive(Debug)]
pub struct Operation {
    name: OperationName,
    operands: Vec<Shared<Value>>,
    /// Results are always [Value::OpResult]s.
    results: Vec<Shared<Value>>,
    attributes: Attributes,
    regions: Vec<Shared<Region>>,
    /// Set once the operation is inserted into a block.
    parent: Option<WeakShared<Block>>,
}

impl Operation {
    pub fn new(name: OperationName) -> Self {
        Self {
            name,
            operands: vec![],
            results: vec![],
            attributes: Attributes::new(),
            regions: vec![],
            parent: None,
        }
    }
    pub fn name(&self) -> OperationName {
        self.name.clone()
    }
    pub fn operands(&self) -> &[Shared<Value>] {
        &self.operands
    }
    pub fn operand_types(&self) -> Vec<Type> {
        self.operands.iter().map(|v| v.rd().typ().clone()).collect()
    }
    pub fn results(&self) -> &[Shared<Value>] {
        &self.results
    }
    pub fn result(&self, index: usize) -> Option<Shared<Value>> {
        self.results.get(index).cloned()
    }
    pub fn result_types(&self) -> Vec<Type> {
        self.results.iter().map(|v| v.rd().typ().clone()).collect()
    }
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
    pub fn regions(&self) -> &[Shared<Region>] {
        &self.regions
    }
    pub fn region(&self, index: usize) -> Option<Shared<Region>> {
        self.regions.get(index).cloned()
    }
    pub fn parent(&self) -> Option<Shared<Block>> {
        self.parent.as_ref().and_then(|parent| parent.upgrade())
    }
    /// Operations directly nested inside the regions of this operation.
    pub fn ops(&self) -> Vec<Shared<Operation>> {
        let mut out = vec![];
        for region in &self.regions {
            out.extend(region.rd().ops());
        }
        out
    }
    pub fn set_operands(&mut self, operands: Vec<Shared<Value>>) {
        self.operands = operands;
    }
    pub fn set_results(&mut self, results: Vec<Shared<Value>>) {
        self.results = results;
    }
    /// Create fresh results with the given types.
    ///
    /// The names are placeholders; results only receive their final names
    /// when they take over the values of a replaced operation.
    pub fn set_anonymous_results(&mut self, types: Vec<Type>) {
        let grouped = 1 < types.len();
        self.results = types
            .into_iter()
            .enumerate()
            .map(|(i, typ)| {
                let index = if grouped { Some(i) } else { None };
                Shared::new(Value::OpResult(OpResult::new("%0", index, typ)).into())
            })
            .collect();
    }
    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }
    pub fn add_region(&mut self, region: Shared<Region>) {
        self.regions.push(region);
    }
    pub fn set_parent(&mut self, parent: Option<WeakShared<Block>>) {
        self.parent = parent;
    }
    pub fn is_module(&self) -> bool {
        self.name.as_str() == MODULE
    }
    /// Display the results of the operation (e.g., `%0:2 = `).
    pub fn display_results(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.results.is_empty() {
            return Ok(());
        }
        let mut groups: Vec<(String, usize)> = vec![];
        for result in &self.results {
            let result = result.rd();
            let name = result.name();
            let grouped = matches!(&*result, Value::OpResult(res) if res.index().is_some());
            match groups.last_mut() {
                Some((last, count)) if grouped && last.as_str() == name => *count += 1,
                _ => groups.push((name.to_string(), 1)),
            }
        }
        for (i, (name, count)) in groups.iter().enumerate() {
            if 0 < i {
                write!(f, ", ")?;
            }
            if *count == 1 {
                write!(f, "{name}")?;
            } else {
                write!(f, "{name}:{count}")?;
            }
        }
        write!(f, " = ")
    }
    fn display_module(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        write!(f, "module ")?;
        if !self.attributes.is_empty() {
            write!(f, "attributes {} ", self.attributes)?;
        }
        match self.regions.first() {
            Some(region) => region.rd().display(f, indent),
            None => write!(f, "{{\n{}}}", spaces(indent)),
        }
    }
    /// Print the operation in the generic form, for example,
    /// `%0 = "stablehlo.add"(%arg0, %arg1) : (T, T) -> T`.
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        if self.is_module() && self.operands.is_empty() && self.results.is_empty() {
            return self.display_module(f, indent);
        }
        self.display_results(f)?;
        write!(f, "\"{}\"(", self.name)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if 0 < i {
                write!(f, ", ")?;
            }
            write!(f, "{}", operand.rd())?;
        }
        write!(f, ")")?;
        if !self.regions.is_empty() {
            write!(f, " (")?;
            for (i, region) in self.regions.iter().enumerate() {
                if 0 < i {
                    write!(f, ", ")?;
                }
                region.rd().display(f, indent)?;
            }
            write!(f, ")")?;
        }
        if !self.attributes.is_empty() {
            write!(f, " {}", self.attributes)?;
        }
        let typ = FunctionType::new(self.operand_types(), self.result_types());
        write!(f, " : {typ}")
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f, 0)
    }
}

/// Wrap the operation and point its regions and results back to it.
pub fn into_shared(operation: Operation) -> Shared<Operation> {
    let op = Shared::new(operation.into());
    let weak = Arc::downgrade(&op);
    {
        let operation = op.rd();
        for region in operation.regions() {
            region.wr().set_parent(Some(weak.clone()));
        }
        for result in operation.results() {
            if let Value::OpResult(res) = &mut *result.wr() {
                res.set_defining_op(Some(weak.clone()));
            }
        }
    }
    op
}

/// Replace `old` by `new` in the IR.
///
/// `new` must have been created with empty region slots. The values of `old`
/// are handed over to `new` (with the types that `new` declares), so every
/// user of `old` observes the replacement. The blocks of every region of
/// `old` move into the region slot of `new` at the same position.
///
/// Every check runs before anything is moved, so on error the IR is
/// unchanged.
pub fn replace(old: &Shared<Operation>, new: &Shared<Operation>) -> Result<()> {
    let new_weak = Arc::downgrade(new);
    let (results, regions, parent) = {
        let old = old.rd();
        (old.results.clone(), old.regions.clone(), old.parent.clone())
    };
    {
        let new_operation = new.rd();
        if new_operation.results.len() != results.len() {
            return Err(anyhow::anyhow!(
                "Cannot replace {} ({} results) by {} ({} results)",
                old.rd().name(),
                results.len(),
                new_operation.name(),
                new_operation.results.len()
            ));
        }
        if new_operation.regions.len() != regions.len() {
            return Err(anyhow::anyhow!(
                "Cannot replace {} ({} regions) by {} ({} regions)",
                old.rd().name(),
                regions.len(),
                new_operation.name(),
                new_operation.regions.len()
            ));
        }
    }
    let position = match parent.as_ref().and_then(|parent| parent.upgrade()) {
        Some(block) => {
            let index = block.rd().position(old)?;
            Some((block, index))
        }
        None => None,
    };
    let new_types = new.rd().result_types();
    for (result, typ) in results.iter().zip(new_types) {
        let mut result = result.wr();
        result.set_type(typ);
        if let Value::OpResult(res) = &mut *result {
            res.set_defining_op(Some(new_weak.clone()));
        }
    }
    let slots = new.rd().regions.clone();
    for (source, slot) in regions.iter().zip(slots.iter()) {
        let blocks = source.wr().take_blocks();
        slot.wr().set_blocks(blocks, Arc::downgrade(slot));
    }
    {
        let mut new_operation = new.wr();
        new_operation.results = results;
        new_operation.parent = parent.clone();
    }
    if let Some((block, index)) = position {
        block.wr().set_op(index, new.clone());
    }
    let mut old = old.wr();
    old.results = vec![];
    old.parent = None;
    Ok(())
}

/// Convenience methods for a [Shared] [Operation].
pub trait GuardedOperation {
    fn name(&self) -> OperationName;
    fn ops(&self) -> Vec<Shared<Operation>>;
    fn parent(&self) -> Option<Shared<Block>>;
}

impl GuardedOperation for Shared<Operation> {
    fn name(&self) -> OperationName {
        self.rd().name()
    }
    fn ops(&self) -> Vec<Shared<Operation>> {
        self.rd().ops()
    }
    fn parent(&self) -> Option<Shared<Block>> {
        self.rd().parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Attribute;
    use crate::ir::BlockArgument;

    fn arg(name: &str, typ: Type) -> Shared<Value> {
        Shared::new(Value::BlockArgument(BlockArgument::new(name, typ)).into())
    }

    #[test]
    fn display_generic_operation() {
        let f32 = Type::tensor(vec![], Type::Float(crate::ir::FloatType::F32));
        let mut operation = Operation::new(OperationName::new("foo.bar".to_string()));
        operation.set_operands(vec![arg("%arg0", f32.clone()), arg("%arg1", f32.clone())]);
        operation.set_anonymous_results(vec![f32.clone(), Type::Index]);
        let mut attributes = Attributes::new();
        attributes.insert("flag", Attribute::Unit);
        operation.set_attributes(attributes);
        assert_eq!(operation.name().dialect(), "foo");
        assert_eq!(
            operation.to_string(),
            r#"%0:2 = "foo.bar"(%arg0, %arg1) {flag = unit} : (tensor<f32>, tensor<f32>) -> (tensor<f32>, index)"#
        );
    }

    #[test]
    fn into_shared_sets_defining_op() {
        let mut operation = Operation::new(OperationName::new("foo.bar".to_string()));
        operation.set_anonymous_results(vec![Type::Index]);
        let op = into_shared(operation);
        let result = op.rd().result(0).unwrap();
        let result = result.rd();
        match &*result {
            Value::OpResult(res) => {
                let defining_op = res.defining_op().unwrap();
                assert!(Arc::ptr_eq(&defining_op, &op));
            }
            Value::BlockArgument(_) => panic!("expected an op result"),
        }
    }

    fn with_region(name: &str) -> Shared<Operation> {
        let block: Shared<Block> = Shared::new(Block::new(None, vec![]).into());
        let region: Shared<Region> = Shared::new(Region::default().into());
        region.wr().set_blocks(vec![block], Arc::downgrade(&region));
        let mut operation = Operation::new(OperationName::new(name.to_string()));
        operation.set_anonymous_results(vec![Type::Index]);
        operation.add_region(region);
        into_shared(operation)
    }

    #[test]
    fn replace_outside_parent_changes_nothing() {
        let old = with_region("foo.old");
        // The parent block does not list `old`.
        let block: Shared<Block> = Shared::new(Block::new(None, vec![]).into());
        old.wr().set_parent(Some(Arc::downgrade(&block)));

        let mut operation = Operation::new(OperationName::new("foo.new".to_string()));
        operation.set_anonymous_results(vec![Type::Index]);
        operation.add_region(Shared::new(Region::default().into()));
        let new = into_shared(operation);

        let err = replace(&old, &new).unwrap_err();
        assert!(err.to_string().contains("Could not find foo.old"));

        let result = old.rd().result(0).unwrap();
        match &*result.rd() {
            Value::OpResult(res) => assert!(Arc::ptr_eq(&res.defining_op().unwrap(), &old)),
            Value::BlockArgument(_) => panic!("expected an op result"),
        };
        assert_eq!(old.rd().region(0).unwrap().rd().blocks().len(), 1);
        assert!(new.rd().region(0).unwrap().rd().is_empty());
        assert!(old.rd().parent().is_some());
    }
}
