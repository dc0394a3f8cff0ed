//! Block and test case tree
//!
//! Blocks live in an arena owned by [`Suite`]. A block lists its children by
//! id and keeps a plain index back to its parent for upward navigation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::Outcome;

/// Work function of a test case
pub type TestFn = Box<dyn Fn() -> Outcome>;

/// Index of a block inside its [`Suite`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a block schedules its own tests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Sequential,
}

impl ExecutionMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "parallel" | "par" => Some(ExecutionMode::Parallel),
            "sequential" | "seq" | "serial" => Some(ExecutionMode::Sequential),
            _ => None,
        }
    }

    pub fn is_parallel(self) -> bool {
        matches!(self, ExecutionMode::Parallel)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Parallel => write!(f, "parallel"),
            ExecutionMode::Sequential => write!(f, "sequential"),
        }
    }
}

/// What happened when a test case was executed
#[derive(Clone, Debug)]
pub struct TestRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub outcome: Outcome,
    /// Process id of the test process
    pub pid: i32,
    /// Captured stdout/stderr; emptied when the log policy discards it
    pub log: Vec<u8>,
    /// Classification notes (bad exit status, signal, core dump)
    pub diagnostics: Vec<String>,
}

/// A registered unit of work
pub struct TestCase {
    name: String,
    number: usize,
    work: TestFn,
    record: Option<TestRecord>,
}

impl TestCase {
    fn new(name: String, number: usize, work: TestFn) -> Self {
        Self {
            name,
            number,
            work,
            record: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based position within the owning block
    pub fn number(&self) -> usize {
        self.number
    }

    /// Run the work function in the current process
    pub fn invoke(&self) -> Outcome {
        (self.work)()
    }

    pub fn record(&self) -> Option<&TestRecord> {
        self.record.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.record.as_ref().map(|r| r.outcome)
    }

    pub(crate) fn set_record(&mut self, record: TestRecord) {
        self.record = Some(record);
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("number", &self.number)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test n°{} ({})", self.number, self.name)
    }
}

/// A named group of tests and sub-blocks
#[derive(Debug)]
pub struct Block {
    pub name: String,
    pub mode: ExecutionMode,
    pub tests: Vec<TestCase>,
    pub children: Vec<BlockId>,
    pub parent: Option<BlockId>,
    /// Wall-clock time of the block and everything below it
    pub duration: Duration,
    /// False iff one of this block's own tests did not succeed
    pub success: bool,
}

impl Block {
    fn new(name: String, mode: ExecutionMode, parent: Option<BlockId>) -> Self {
        Self {
            name,
            mode,
            tests: Vec::new(),
            children: Vec::new(),
            parent,
            duration: Duration::ZERO,
            success: true,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena holding the block tree
#[derive(Debug)]
pub struct Suite {
    blocks: Vec<Block>,
}

impl Suite {
    pub const ROOT_NAME: &'static str = "root";

    /// Create a suite holding only the sentinel root block
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::new(
                Self::ROOT_NAME.to_string(),
                ExecutionMode::Sequential,
                None,
            )],
        }
    }

    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.block(id).parent
    }

    /// Append a child block under `parent`
    pub fn add_block(
        &mut self,
        parent: BlockId,
        name: impl Into<String>,
        mode: ExecutionMode,
    ) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block::new(name.into(), mode, Some(parent)));
        self.block_mut(parent).children.push(id);
        id
    }

    /// Append a test to `block`, numbering it by insertion order
    pub fn add_test(&mut self, block: BlockId, name: impl Into<String>, work: TestFn) -> usize {
        let tests = &mut self.block_mut(block).tests;
        let number = tests.len();
        tests.push(TestCase::new(name.into(), number, work));
        number
    }

    /// Names of the blocks from `id` up to (excluding) the root, innermost first
    pub fn ancestry(&self, id: BlockId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(block_id) = current {
            let block = self.block(block_id);
            if block.is_root() {
                break;
            }
            names.push(block.name.as_str());
            current = block.parent;
        }
        names
    }

    /// Slash separated path from the outermost block down to `id`
    pub fn path(&self, id: BlockId) -> String {
        let mut names = self.ancestry(id);
        names.reverse();
        names.join("/")
    }

    /// True when `id` and every descendant block succeeded
    pub fn subtree_passed(&self, id: BlockId) -> bool {
        let block = self.block(id);
        block.success && block.children.iter().all(|&child| self.subtree_passed(child))
    }

    /// Number of tests registered in `id` and all of its descendants
    pub fn subtree_test_count(&self, id: BlockId) -> usize {
        let block = self.block(id);
        block.tests.len()
            + block
                .children
                .iter()
                .map(|&child| self.subtree_test_count(child))
                .sum::<usize>()
    }

    /// First block with the given name in depth-first order
    pub fn find(&self, name: &str) -> Option<BlockId> {
        self.walk(self.root())
            .into_iter()
            .skip(1)
            .find(|&id| self.block(id).name == name)
    }

    /// Depth-first pre-order listing of `id` and its descendants
    pub fn walk(&self, id: BlockId) -> Vec<BlockId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.block(current).children.iter().rev().copied());
        }
        order
    }

    /// Number of registered blocks, not counting the root
    pub fn len(&self) -> usize {
        self.blocks.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}
