use crate::ir::spaces;
use crate::ir::Block;
use crate::ir::Operation;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::shared::WeakShared;
use std::fmt::Formatter;

/// An ordered list of blocks owned by exactly one operation.
#[derive(Debug, Default)]
pub struct Region {
    blocks: Vec<Shared<Block>>,
    parent: Option<WeakShared<Operation>>,
}

impl Region {
    pub fn new(blocks: Vec<Shared<Block>>) -> Self {
        Self {
            blocks,
            parent: None,
        }
    }
    pub fn blocks(&self) -> &[Shared<Block>] {
        &self.blocks
    }
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
    pub fn parent(&self) -> Option<Shared<Operation>> {
        self.parent.as_ref().and_then(|parent| parent.upgrade())
    }
    pub fn set_parent(&mut self, parent: Option<WeakShared<Operation>>) {
        self.parent = parent;
    }
    /// Operations of all blocks in order.
    pub fn ops(&self) -> Vec<Shared<Operation>> {
        let mut out = vec![];
        for block in &self.blocks {
            out.extend(block.rd().ops().iter().cloned());
        }
        out
    }
    /// Remove all blocks from this region (leaving it empty).
    pub fn take_blocks(&mut self) -> Vec<Shared<Block>> {
        std::mem::take(&mut self.blocks)
    }
    /// Move `blocks` into this region. `this` is a pointer to `self`.
    pub fn set_blocks(&mut self, blocks: Vec<Shared<Block>>, this: WeakShared<Region>) {
        for block in &blocks {
            block.wr().set_parent(Some(this.clone()));
        }
        self.blocks = blocks;
    }
    pub fn display(&self, f: &mut Formatter<'_>, indent: i32) -> std::fmt::Result {
        writeln!(f, "{{")?;
        for (i, block) in self.blocks.iter().enumerate() {
            block.rd().display(f, indent + 1, i)?;
        }
        write!(f, "{}}}", spaces(indent))
    }
}
