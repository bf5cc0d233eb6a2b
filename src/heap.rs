// Copyright 2014 Nick Fitzgerald
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Heap storage and the Cheney copying collector.
//!
//! ## Allocation
//!
//! Every block-bearing [`Value`] (`Str`, `Symbol`, `Pair`, `Lambda`) is a
//! handle, [`BlockRef`], into the heap's single *active* arena: a flat
//! `Vec<Block>` that only ever grows by bump-appending a new block at its
//! end. There is no free list and no in-place reuse of a slot — the only way
//! space is reclaimed is by a full collection, which builds an entirely new
//! arena containing just the reachable blocks and discards the old one.
//!
//! ## Garbage collection
//!
//! This heap uses a two-space Cheney copying collector, not the mark-sweep
//! scheme a free-list arena would normally use. Collection moves every
//! reachable block out of the current arena (`from`) into a freshly
//! allocated one (`to`) and rewrites every live [`Value`] — both the ones
//! the caller passed in as roots and the ones nested inside other blocks —
//! so that it points at the block's new home. When collection finishes,
//! `to` becomes the new active arena and `from` is dropped wholesale.
//!
//! A block that has already been copied this collection has a *forwarding
//! reference* recorded in a dedicated header field, [`Block::forward`] —
//! never aliased onto the block's own size or payload — so that a second
//! reference to the same block (this is how shared structure and cycles
//! survive a copying collection) is rewritten to the same new address
//! instead of being copied twice.
//!
//! ## Roots
//!
//! A collection can only discover blocks reachable from its root set. Two
//! kinds of roots feed every collection:
//!
//! * The caller-supplied `roots: &mut [&mut Value]` — the interpreter's
//!   shadow stack of in-flight locals (the form being evaluated, arguments
//!   accumulated so far, and so on). Every [`Heap`] method that can trigger
//!   a collection takes this parameter; it is the caller's responsibility
//!   to include every `Value` it still needs afterward. This is the
//!   "explicit root vector" the interpreter's evaluator is expected to
//!   maintain.
//! * Every still-alive [`crate::environment::Frame`]. Frames register a
//!   weak handle with the heap when they are created
//!   ([`Heap::register_frame`]) so that collection can walk their value
//!   slots without needing an explicit "current environment" argument. The
//!   heap holds only a `Weak` reference, so a frame that has otherwise been
//!   dropped does not artificially survive a collection and is pruned from
//!   the registry the next time one runs.
//!
//! Frames themselves are never moved or reclaimed by this collector — only
//! the values stored inside them are rewritten in place. Frame lifetime is
//! managed separately, by reference counting (see [`crate::environment`]).

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::environment::{Frame, FrameWeak};
use crate::error::HeapError;
use crate::value::Value;

/// A handle to a block inside the heap's active arena. Never valid across a
/// collection except through the `Value` that wraps it, which the collector
/// rewrites in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef(u32);

impl BlockRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Str,
    Symbol,
    Pair,
    Lambda,
}

/// The payload of a `LAMBDA` block: formal parameters, body, and captured
/// environment. Carries a process-wide unique `id` purely for diagnostics
/// (the printer and `Debug` impls use it to distinguish closures that would
/// otherwise look identical).
#[derive(Debug, Clone)]
pub struct LambdaData {
    pub id: u64,
    pub params: Value,
    pub body: Value,
    pub env: Frame,
}

#[derive(Debug, Clone)]
enum Payload {
    /// Shared representation for `STRING` and `SYMBOL` blocks; `Block::kind`
    /// disambiguates which one a given block is.
    Bytes(String),
    Pair(Value, Value),
    Lambda(Box<LambdaData>),
}

#[derive(Debug, Clone)]
struct Block {
    kind: Kind,
    /// Set during a collection the first time this (from-space) block is
    /// copied to `to`-space; `None` means "not yet moved this collection".
    forward: Option<u32>,
    /// Set once this (to-space) block's children have been scanned and
    /// moved; used by the scan cursor to know where it can stop.
    visited: bool,
    payload: Payload,
}

impl Block {
    /// A cheap placeholder left behind in `from`-space once a block's
    /// contents have been moved out. Never observed by anything but the
    /// collector itself, since the only remaining reference to this slot's
    /// index is rewritten to `forward` before the placeholder is written.
    fn tombstone() -> Block {
        Block {
            kind: Kind::Str,
            forward: None,
            visited: false,
            payload: Payload::Bytes(String::new()),
        }
    }
}

/// Tunable heap parameters. `Heap::new` uses [`HeapConfig::default`]; pass a
/// custom one to [`Heap::with_config`] to change sizing behavior, e.g. in
/// tests that want to force frequent collections.
#[derive(Debug, Clone, Copy)]
pub struct HeapConfig {
    /// Initial arena capacity, in blocks.
    pub initial_capacity: usize,
    /// Factor the arena's capacity is multiplied by when a collection does
    /// not free enough space to satisfy the allocation that triggered it.
    pub growth_factor: usize,
    /// The capacity ceiling. Growth that would exceed this is refused with
    /// [`HeapError::Exhausted`] instead of happening.
    pub max_capacity: usize,
}

impl Default for HeapConfig {
    fn default() -> HeapConfig {
        HeapConfig {
            initial_capacity: 1 << 10,
            growth_factor: 2,
            max_capacity: 1 << 24,
        }
    }
}

/// The Lisp heap: a single active arena plus the bookkeeping the collector
/// needs (symbol interning table and the set of live frames to treat as
/// roots).
pub struct Heap {
    active: Vec<Block>,
    capacity: usize,
    config: HeapConfig,
    symbol_table: HashMap<String, BlockRef>,
    frame_roots: Vec<FrameWeak>,
    next_lambda_id: u64,
    collections: usize,
}

/// ## Constructors
impl Heap {
    /// Create a new heap with default sizing.
    pub fn new() -> Heap {
        Heap::with_config(HeapConfig::default())
    }

    /// Create a new heap with the given sizing configuration.
    pub fn with_config(config: HeapConfig) -> Heap {
        Heap {
            active: Vec::with_capacity(config.initial_capacity),
            capacity: config.initial_capacity,
            config,
            symbol_table: HashMap::new(),
            frame_roots: Vec::new(),
            next_lambda_id: 0,
            collections: 0,
        }
    }
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new()
    }
}

/// ## Allocation
impl Heap {
    /// Allocate a new cons cell holding `car` and `cdr`.
    ///
    /// `extra_roots` should contain every other `Value` the caller still
    /// needs after this call returns; `car` and `cdr` are rooted
    /// automatically.
    pub fn alloc_pair(
        &mut self,
        mut car: Value,
        mut cdr: Value,
        extra_roots: &mut [&mut Value],
    ) -> Result<Value, HeapError> {
        {
            let mut roots: Vec<&mut Value> = Vec::with_capacity(2 + extra_roots.len());
            roots.push(&mut car);
            roots.push(&mut cdr);
            for r in extra_roots.iter_mut() {
                roots.push(&mut **r);
            }
            self.ensure_capacity(1, &mut roots)?;
        }
        trace!("heap: allocating pair block");
        let block_ref = self.push_block(Block {
            kind: Kind::Pair,
            forward: None,
            visited: false,
            payload: Payload::Pair(car, cdr),
        });
        Ok(Value::Pair(block_ref))
    }

    /// Allocate a new immutable string.
    pub fn alloc_string(
        &mut self,
        s: String,
        extra_roots: &mut [&mut Value],
    ) -> Result<Value, HeapError> {
        self.ensure_capacity(1, extra_roots)?;
        trace!("heap: allocating string block ({} bytes)", s.len());
        let block_ref = self.push_block(Block {
            kind: Kind::Str,
            forward: None,
            visited: false,
            payload: Payload::Bytes(s),
        });
        Ok(Value::Str(block_ref))
    }

    /// Intern (or find the existing interned) symbol named `s`, normalized
    /// to upper case. Two calls with strings that only differ in case
    /// always produce the same `Value`.
    pub fn alloc_symbol(
        &mut self,
        s: &str,
        extra_roots: &mut [&mut Value],
    ) -> Result<Value, HeapError> {
        let upper = s.to_uppercase();
        if let Some(block_ref) = self.symbol_table.get(&upper) {
            return Ok(Value::Symbol(*block_ref));
        }
        self.ensure_capacity(1, extra_roots)?;
        trace!("heap: interning new symbol {:?}", upper);
        let block_ref = self.push_block(Block {
            kind: Kind::Symbol,
            forward: None,
            visited: false,
            payload: Payload::Bytes(upper.clone()),
        });
        self.symbol_table.insert(upper, block_ref);
        Ok(Value::Symbol(block_ref))
    }

    /// Allocate a new closure capturing `env`.
    pub fn alloc_lambda(
        &mut self,
        mut params: Value,
        mut body: Value,
        env: Frame,
        extra_roots: &mut [&mut Value],
    ) -> Result<Value, HeapError> {
        {
            let mut roots: Vec<&mut Value> = Vec::with_capacity(2 + extra_roots.len());
            roots.push(&mut params);
            roots.push(&mut body);
            for r in extra_roots.iter_mut() {
                roots.push(&mut **r);
            }
            self.ensure_capacity(1, &mut roots)?;
        }
        let id = self.next_lambda_id;
        self.next_lambda_id += 1;
        trace!("heap: allocating lambda block (id {})", id);
        let block_ref = self.push_block(Block {
            kind: Kind::Lambda,
            forward: None,
            visited: false,
            payload: Payload::Lambda(Box::new(LambdaData {
                id,
                params,
                body,
                env,
            })),
        });
        Ok(Value::Lambda(block_ref))
    }

    fn push_block(&mut self, block: Block) -> BlockRef {
        let block_ref = BlockRef(self.active.len() as u32);
        self.active.push(block);
        block_ref
    }
}

/// ## Block accessors
impl Heap {
    /// The car of the pair at `block_ref`.
    ///
    /// # Panics
    ///
    /// Panics if `block_ref` does not refer to a `PAIR` block. Callers only
    /// ever obtain a `BlockRef` from a `Value::Pair`, so this indicates an
    /// internal inconsistency rather than a condition callers need to
    /// handle.
    pub fn pair_car(&self, block_ref: BlockRef) -> Value {
        match &self.active[block_ref.index()].payload {
            Payload::Pair(car, _) => *car,
            _ => panic!("pair_car: block is not a pair"),
        }
    }

    /// The cdr of the pair at `block_ref`. See [`Heap::pair_car`] for the
    /// panic condition.
    pub fn pair_cdr(&self, block_ref: BlockRef) -> Value {
        match &self.active[block_ref.index()].payload {
            Payload::Pair(_, cdr) => *cdr,
            _ => panic!("pair_cdr: block is not a pair"),
        }
    }

    /// The string content of a `STRING` or `SYMBOL` block.
    pub fn block_string(&self, block_ref: BlockRef) -> &str {
        match &self.active[block_ref.index()].payload {
            Payload::Bytes(s) => s,
            _ => panic!("block_string: block is not a string or symbol"),
        }
    }

    /// The closure data of a `LAMBDA` block.
    pub fn lambda_data(&self, block_ref: BlockRef) -> &LambdaData {
        match &self.active[block_ref.index()].payload {
            Payload::Lambda(data) => data,
            _ => panic!("lambda_data: block is not a lambda"),
        }
    }
}

/// ## Frame root registration
impl Heap {
    /// Register a frame as a GC root provider. Called by
    /// [`crate::environment::Frame::make`]; not meant to be called directly
    /// by embedders.
    pub fn register_frame(&mut self, frame: &Frame) {
        self.frame_roots.push(frame.downgrade());
    }
}

/// ## Garbage collection
impl Heap {
    /// Force a collection right now, treating `roots` (plus every live
    /// frame's value slots) as the root set. Exposed for callers — and
    /// tests — that want to pin down exactly when a collection happens
    /// rather than relying on allocation pressure.
    pub fn collect_garbage(&mut self, roots: &mut [&mut Value]) {
        self.collections += 1;
        let before = self.active.len();
        debug!("gc: collection #{} starting, {} blocks live", self.collections, before);

        let mut to: Vec<Block> = Vec::with_capacity(before);

        for root in roots.iter_mut() {
            Self::move_value(&mut self.active, &mut to, root);
        }
        // Interned symbols are always roots — `alloc_symbol`'s cache hands
        // out a `BlockRef` from `symbol_table` on every subsequent lookup
        // with no other reference keeping it reachable, so the table itself
        // has to be walked here and rewritten to the post-collection index,
        // the same way the collector rewrites every other reference.
        for block_ref in self.symbol_table.values_mut() {
            let mut v = Value::Symbol(*block_ref);
            Self::move_value(&mut self.active, &mut to, &mut v);
            *block_ref = match v {
                Value::Symbol(r) => r,
                _ => unreachable!("move_value never changes a Value's kind"),
            };
        }
        self.frame_roots.retain(|fw| fw.is_alive());
        for frame in &self.frame_roots {
            frame.for_each_value_mut(&mut |v| {
                Self::move_value(&mut self.active, &mut to, v);
            });
        }

        let mut scanned = 0;
        while scanned < to.len() {
            match &to[scanned].payload {
                Payload::Pair(car, cdr) => {
                    let (mut car, mut cdr) = (*car, *cdr);
                    Self::move_value(&mut self.active, &mut to, &mut car);
                    Self::move_value(&mut self.active, &mut to, &mut cdr);
                    to[scanned].payload = Payload::Pair(car, cdr);
                }
                Payload::Lambda(data) => {
                    let (mut params, mut body) = (data.params, data.body);
                    Self::move_value(&mut self.active, &mut to, &mut params);
                    Self::move_value(&mut self.active, &mut to, &mut body);
                    if let Payload::Lambda(data) = &mut to[scanned].payload {
                        data.params = params;
                        data.body = body;
                    }
                }
                // Strings and symbols hold no references to other blocks.
                Payload::Bytes(_) => {}
            }
            to[scanned].visited = true;
            scanned += 1;
        }

        let after = to.len();
        debug!(
            "gc: collection #{} complete, {} blocks live (reclaimed {})",
            self.collections,
            after,
            before.saturating_sub(after)
        );
        self.active = to;
    }

    /// Copy the block `v` refers to (if any) from `from` to `to`, rewriting
    /// `v` to point at its new home. A no-op for immediate values. Safe to
    /// call more than once on references to the same source block: the
    /// second call sees `forward` already set and reuses it, which is what
    /// makes shared structure and cycles survive intact.
    fn move_value(from: &mut [Block], to: &mut Vec<Block>, v: &mut Value) {
        let block_ref = match *v {
            Value::Pair(r) | Value::Str(r) | Value::Symbol(r) | Value::Lambda(r) => r,
            Value::Nil | Value::Int(_) | Value::Float(_) | Value::Proc(_) => return,
        };

        let i = block_ref.index();
        let new_index = if let Some(fwd) = from[i].forward {
            fwd
        } else {
            let mut block = std::mem::replace(&mut from[i], Block::tombstone());
            block.forward = None;
            block.visited = false;
            let new_index = to.len() as u32;
            to.push(block);
            from[i].forward = Some(new_index);
            new_index
        };

        *v = Self::retag(*v, BlockRef(new_index));
    }

    fn retag(v: Value, new_ref: BlockRef) -> Value {
        match v {
            Value::Pair(_) => Value::Pair(new_ref),
            Value::Str(_) => Value::Str(new_ref),
            Value::Symbol(_) => Value::Symbol(new_ref),
            Value::Lambda(_) => Value::Lambda(new_ref),
            other => other,
        }
    }

    /// Collect (if the arena is too full to satisfy `additional` more
    /// blocks) and grow (if collecting did not free enough room), up to
    /// `config.max_capacity`.
    fn ensure_capacity(
        &mut self,
        additional: usize,
        roots: &mut [&mut Value],
    ) -> Result<(), HeapError> {
        if self.active.len() + additional <= self.capacity {
            return Ok(());
        }

        self.collect_garbage(roots);

        while self.active.len() + additional > self.capacity {
            let grown = self.capacity.saturating_mul(self.config.growth_factor);
            if grown <= self.capacity || grown > self.config.max_capacity {
                return Err(HeapError::Exhausted {
                    requested: additional,
                    capacity: self.config.max_capacity,
                });
            }
            warn!(
                "gc: collection did not free enough room, growing capacity {} -> {}",
                self.capacity, grown
            );
            self.capacity = grown;
        }

        Ok(())
    }

    /// The number of blocks currently live in the active arena. Exposed for
    /// tests asserting on arena compactness after a collection.
    pub fn live_block_count(&self) -> usize {
        self.active.len()
    }

    /// The number of collections run so far.
    pub fn collection_count(&self) -> usize {
        self.collections
    }
}
