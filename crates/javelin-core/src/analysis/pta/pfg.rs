use indexmap::IndexSet;
use std::collections::VecDeque;
use std::hash::Hash;

/// Index of an interned pointer inside a [`PointerFlowGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

/// A monotonically growing set of abstract objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsToSet<O: Hash + Eq> {
    objs: IndexSet<O>,
}

impl<O: Copy + Eq + Hash> PointsToSet<O> {
    pub fn new() -> Self {
        Self { objs: IndexSet::new() }
    }

    pub fn singleton(obj: O) -> Self {
        let mut set = Self::new();
        set.add(obj);
        set
    }

    pub fn add(&mut self, obj: O) -> bool {
        self.objs.insert(obj)
    }

    pub fn contains(&self, obj: O) -> bool {
        self.objs.contains(&obj)
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = O> + '_ {
        self.objs.iter().copied()
    }
}

impl<O: Copy + Eq + Hash> Default for PointsToSet<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// FIFO worklist of (pointer, points-to-set) entries. Duplicate entries for a
/// pointer are allowed; propagation subtracts what is already known.
#[derive(Debug, Clone)]
pub struct WorkList<O: Hash + Eq> {
    queue: VecDeque<(PointerId, PointsToSet<O>)>,
}

impl<O: Copy + Eq + Hash> WorkList<O> {
    pub fn new() -> Self {
        Self { queue: VecDeque::new() }
    }

    pub fn add_entry(&mut self, pointer: PointerId, pts: PointsToSet<O>) {
        self.queue.push_back((pointer, pts));
    }

    pub fn poll(&mut self) -> Option<(PointerId, PointsToSet<O>)> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<O: Copy + Eq + Hash> Default for WorkList<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pointer arena plus flow edges. Pointers are interned from their key type
/// (`K`) to dense indices; every pointer owns one points-to set over `O`.
/// Generic so the context-insensitive and context-sensitive solvers share
/// the propagation machinery.
#[derive(Debug, Clone)]
pub struct PointerFlowGraph<K: Hash + Eq, O: Hash + Eq> {
    keys: IndexSet<K>,
    pts: Vec<PointsToSet<O>>,
    succs: Vec<IndexSet<PointerId>>,
}

impl<K, O> PointerFlowGraph<K, O>
where
    K: Copy + Eq + Hash,
    O: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self { keys: IndexSet::new(), pts: Vec::new(), succs: Vec::new() }
    }

    /// Interns `key`, returning its dense pointer index.
    pub fn pointer(&mut self, key: K) -> PointerId {
        let (index, inserted) = self.keys.insert_full(key);
        if inserted {
            self.pts.push(PointsToSet::new());
            self.succs.push(IndexSet::new());
        }
        PointerId(index as u32)
    }

    pub fn lookup(&self, key: K) -> Option<PointerId> {
        self.keys.get_index_of(&key).map(|i| PointerId(i as u32))
    }

    pub fn key(&self, pointer: PointerId) -> K {
        *self.keys.get_index(pointer.0 as usize).expect("interned pointer")
    }

    pub fn pts(&self, pointer: PointerId) -> &PointsToSet<O> {
        &self.pts[pointer.0 as usize]
    }

    pub fn succs_of(&self, pointer: PointerId) -> impl Iterator<Item = PointerId> + '_ {
        self.succs[pointer.0 as usize].iter().copied()
    }

    pub fn num_pointers(&self) -> usize {
        self.keys.len()
    }

    pub fn pointers(&self) -> impl Iterator<Item = PointerId> + '_ {
        (0..self.keys.len()).map(|i| PointerId(i as u32))
    }

    /// Adds the edge `source -> target`; false if it already existed.
    pub fn add_edge(&mut self, source: PointerId, target: PointerId) -> bool {
        self.succs[source.0 as usize].insert(target)
    }

    /// Adds an edge and, when it is new and the source already points
    /// somewhere, schedules the source's set for propagation into the target.
    pub fn add_flow_edge(&mut self, source: PointerId, target: PointerId, worklist: &mut WorkList<O>) -> bool {
        if self.add_edge(source, target) {
            if !self.pts(source).is_empty() {
                worklist.add_entry(target, self.pts(source).clone());
            }
            true
        } else {
            false
        }
    }

    /// Merges `pts \ pts(n)` into `pts(n)`, forwards the delta to every
    /// successor, and returns it. The empty delta means nothing changed.
    pub fn propagate(&mut self, n: PointerId, pts: &PointsToSet<O>, worklist: &mut WorkList<O>) -> PointsToSet<O> {
        let mut delta = PointsToSet::new();
        for obj in pts.iter() {
            if !self.pts(n).contains(obj) {
                delta.add(obj);
            }
        }
        if !delta.is_empty() {
            for obj in delta.iter() {
                self.pts[n.0 as usize].add(obj);
            }
            for succ in self.succs[n.0 as usize].iter().copied() {
                worklist.add_entry(succ, delta.clone());
            }
        }
        delta
    }
}

impl<K: Copy + Eq + Hash, O: Copy + Eq + Hash> Default for PointerFlowGraph<K, O> {
    fn default() -> Self {
        Self::new()
    }
}
