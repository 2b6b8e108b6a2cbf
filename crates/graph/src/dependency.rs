use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use jobmig_core::{format_cycle, CyclePath, JobId, JobRecord, MigrationError, Result};

const NO_DEPENDENTS: &BTreeSet<JobId> = &BTreeSet::new();

/// Directed graph over job ids with an edge `d -> j` for every job `j`
/// declaring a dependency on `d`.
///
/// Ordered containers keep traversal order (and therefore the first reported
/// cycle) stable for a given input.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    adjacency: BTreeMap<JobId, BTreeSet<JobId>>,
}

impl DependencyGraph {
    /// Build the graph from a job set.
    ///
    /// References to ids outside the set, and references without a target,
    /// contribute no edge. Duplicate declarations collapse into one edge.
    pub fn from_jobs(jobs: &[JobRecord]) -> Self {
        let mut adjacency: BTreeMap<JobId, BTreeSet<JobId>> =
            jobs.iter().map(|job| (job.id, BTreeSet::new())).collect();

        for job in jobs {
            for dep in job.dependency_ids() {
                match adjacency.get_mut(&dep) {
                    Some(dependents) => {
                        dependents.insert(job.id);
                    }
                    None => debug!(job_id = job.id, dependency = dep, "dangling dependency ignored"),
                }
            }
        }

        Self { adjacency }
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// Jobs that declared a dependency on `id`, in ascending order.
    pub fn dependents_of(&self, id: JobId) -> impl Iterator<Item = JobId> + '_ {
        self.neighbours(id).copied()
    }

    fn neighbours(&self, id: JobId) -> std::collections::btree_set::Iter<'_, JobId> {
        self.adjacency.get(&id).unwrap_or(NO_DEPENDENTS).iter()
    }

    /// Every elementary cycle in the graph.
    ///
    /// A fresh depth-first traversal starts from each vertex in ascending id
    /// order. Reaching the start vertex again closes a cycle, emitted as the
    /// active path with the start id repeated at the end. A vertex that
    /// backtracks is released so a later path of the same traversal can pass
    /// through it again; vertices that led nowhere stay blocked until one of
    /// their successors is released, which keeps the search polynomial per
    /// cycle found. A traversal only walks the strongly connected component of
    /// its start, restricted to ids not below the start, and starts whose
    /// component holds no cycle are skipped. Acyclic input costs O(V + E).
    ///
    /// Each cycle is reported once, beginning with its lowest id. Cycles are
    /// ordered by that id, then by traversal order. Empty iff the graph is a DAG.
    pub fn find_cycles(&self) -> Vec<CyclePath> {
        let all: BTreeSet<JobId> = self.adjacency.keys().copied().collect();
        let mut pending = self.cyclic_components(&all);
        let mut cycles = Vec::new();

        while let Some(mut component) = pending.pop() {
            let Some(root) = component.first().copied() else {
                continue;
            };
            self.circuits_from(root, &component, &mut cycles);
            component.remove(&root);
            pending.extend(self.cyclic_components(&component));
        }

        // Stable: traversal order is kept among cycles sharing a lowest id.
        cycles.sort_by_key(|cycle| cycle.first().copied());
        cycles
    }

    /// Strongly connected components of the subgraph induced by `vertices`
    /// that contain at least one cycle. Iterative Tarjan.
    fn cyclic_components(&self, vertices: &BTreeSet<JobId>) -> Vec<BTreeSet<JobId>> {
        let mut tarjan = Tarjan::default();
        let mut found = Vec::new();

        for &start in vertices {
            if tarjan.index.contains_key(&start) {
                continue;
            }

            tarjan.enter(start);
            let mut frames = vec![(start, self.neighbours(start))];

            loop {
                let (v, next) = match frames.last_mut() {
                    Some((v, successors)) => (*v, successors.next().copied()),
                    None => break,
                };

                match next {
                    Some(w) if !vertices.contains(&w) => {}
                    Some(w) if !tarjan.index.contains_key(&w) => {
                        tarjan.enter(w);
                        frames.push((w, self.neighbours(w)));
                    }
                    Some(w) => {
                        if tarjan.on_stack.contains(&w) {
                            tarjan.lower(v, tarjan.index[&w]);
                        }
                    }
                    None => {
                        frames.pop();
                        if let Some(&(parent, _)) = frames.last() {
                            tarjan.lower(parent, tarjan.low[&v]);
                        }
                        if let Some(component) = tarjan.close(v) {
                            if component.len() > 1 || self.neighbours(v).any(|&w| w == v) {
                                found.push(component);
                            }
                        }
                    }
                }
            }
        }

        found
    }

    /// Emit every cycle through `root` that stays inside `component`
    /// (Johnson's circuit search).
    fn circuits_from(&self, root: JobId, component: &BTreeSet<JobId>, cycles: &mut Vec<CyclePath>) {
        let mut blocked: HashSet<JobId> = HashSet::from([root]);
        let mut waiting: HashMap<JobId, HashSet<JobId>> = HashMap::new();
        let mut path: Vec<JobId> = vec![root];
        // (vertex, remaining successors, closed a cycle below this vertex)
        let mut frames = vec![(root, self.neighbours(root), false)];

        loop {
            let Some(frame) = frames.last_mut() else {
                break;
            };
            let v = frame.0;

            match frame.1.next().copied() {
                Some(w) if !component.contains(&w) => {}
                Some(w) if w == root => {
                    let mut cycle = path.clone();
                    cycle.push(root);
                    cycles.push(cycle);
                    frame.2 = true;
                }
                Some(w) => {
                    if blocked.insert(w) {
                        path.push(w);
                        frames.push((w, self.neighbours(w), false));
                    }
                }
                None => {
                    let closed = frame.2;
                    frames.pop();
                    path.pop();

                    if closed {
                        release(v, &mut blocked, &mut waiting);
                    } else {
                        for &w in self.neighbours(v).filter(|w| component.contains(w)) {
                            waiting.entry(w).or_default().insert(v);
                        }
                    }
                    if let Some(parent) = frames.last_mut() {
                        parent.2 |= closed;
                    }
                }
            }
        }
    }
}

/// Bookkeeping for Tarjan's strongly connected components.
#[derive(Debug, Default)]
struct Tarjan {
    index: HashMap<JobId, usize>,
    low: HashMap<JobId, usize>,
    stack: Vec<JobId>,
    on_stack: HashSet<JobId>,
}

impl Tarjan {
    fn enter(&mut self, v: JobId) {
        let order = self.index.len();
        self.index.insert(v, order);
        self.low.insert(v, order);
        self.stack.push(v);
        self.on_stack.insert(v);
    }

    fn lower(&mut self, v: JobId, reach: usize) {
        if let Some(low) = self.low.get_mut(&v) {
            *low = (*low).min(reach);
        }
    }

    /// Pop the component rooted at `v`, if `v` is a component root.
    fn close(&mut self, v: JobId) -> Option<BTreeSet<JobId>> {
        if self.low.get(&v) != self.index.get(&v) {
            return None;
        }
        let mut component = BTreeSet::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.remove(&member);
            component.insert(member);
            if member == v {
                break;
            }
        }
        Some(component)
    }
}

/// Unblock `v` and, transitively, every vertex waiting on it.
fn release(v: JobId, blocked: &mut HashSet<JobId>, waiting: &mut HashMap<JobId, HashSet<JobId>>) {
    let mut pending = vec![v];
    while let Some(u) = pending.pop() {
        if blocked.remove(&u) {
            if let Some(dependents) = waiting.remove(&u) {
                pending.extend(dependents);
            }
        }
    }
}

/// All cycles discoverable in the dependency graph of `jobs`.
pub fn detect_cycles(jobs: &[JobRecord]) -> Vec<CyclePath> {
    let graph = DependencyGraph::from_jobs(jobs);
    let cycles = graph.find_cycles();
    debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        cycles = cycles.len(),
        "cycle detection finished"
    );
    cycles
}

/// Fail with `CycleDetected` carrying the first cycle in traversal order.
pub fn assert_acyclic(jobs: &[JobRecord]) -> Result<()> {
    match detect_cycles(jobs).into_iter().next() {
        Some(first) => {
            warn!(cycle = %format_cycle(&first), "circular dependency detected");
            Err(MigrationError::CycleDetected(first))
        }
        None => Ok(()),
    }
}
