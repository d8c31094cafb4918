//! Execution mode and default computation graphs.
//!
//! The framework runs either eagerly or in graph mode. In graph mode a model
//! owns a [`Graph`] that marks the scope in which the model runs: while the
//! model's context is entered, its graph is the default graph. The eager flag
//! is process-wide; the default graph is per thread, as a stack maintained by
//! [`Graph::as_default`].
use log::{debug, warn};
use rlmodel_core::Scope;
use std::{
    cell::RefCell,
    fmt,
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

static EAGER: AtomicBool = AtomicBool::new(true);
static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);
static NEXT_GUARD_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static ROOT_GRAPH: Graph = Graph::new("root");
    // Entries are tagged with the id of the guard that pushed them.
    static DEFAULT_GRAPHS: RefCell<Vec<(usize, Graph)>> = RefCell::new(vec![]);
}

/// Returns `true` if operations run eagerly.
pub fn executing_eagerly() -> bool {
    EAGER.load(Ordering::SeqCst)
}

/// Switches the process to eager execution.
pub fn enable_eager_execution() {
    EAGER.store(true, Ordering::SeqCst);
}

/// Switches the process to graph execution.
pub fn disable_eager_execution() {
    EAGER.store(false, Ordering::SeqCst);
}

/// Returns the default graph of the current thread.
///
/// This is the graph of the innermost live [`DefaultGraphGuard`], or the
/// thread's root graph if there is none.
pub fn get_default_graph() -> Graph {
    DEFAULT_GRAPHS
        .with(|graphs| graphs.borrow().last().map(|(_, graph)| graph.clone()))
        .unwrap_or_else(|| ROOT_GRAPH.with(Graph::clone))
}

struct GraphInner {
    id: usize,
    name: String,
}

/// A shared handle to a computation graph.
///
/// Clones refer to the same graph.
#[derive(Clone)]
pub struct Graph(Arc<GraphInner>);

impl Graph {
    /// Creates a new graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(GraphInner {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::SeqCst),
            name: name.into(),
        }))
    }

    /// Name of the graph.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Makes this graph the default graph of the current thread until the
    /// returned guard is dropped.
    pub fn as_default(&self) -> DefaultGraphGuard {
        let id = NEXT_GUARD_ID.fetch_add(1, Ordering::SeqCst);
        let depth = DEFAULT_GRAPHS.with(|graphs| {
            let mut graphs = graphs.borrow_mut();
            graphs.push((id, self.clone()));
            graphs.len()
        });
        debug!("Enter graph {:?} (depth {})", self, depth);

        DefaultGraphGuard {
            id,
            graph: self.clone(),
            _not_send: PhantomData,
        }
    }

    /// Returns `true` if this is the default graph of the current thread.
    pub fn is_default(&self) -> bool {
        get_default_graph() == *self
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Graph {}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Graph({}#{})", self.0.name, self.0.id)
    }
}

/// Keeps a graph as the thread's default graph while alive.
///
/// Dropping the guard restores the default graph that was active when it
/// was created, also when the scope is left by unwinding. Guards dropped out
/// of order remove only their own entry, so every live guard keeps its place
/// in the stack.
#[must_use = "the graph is the default only while the guard is alive"]
pub struct DefaultGraphGuard {
    id: usize,
    graph: Graph,
    // The stack of default graphs is thread local.
    _not_send: PhantomData<*const ()>,
}

impl DefaultGraphGuard {
    /// The graph held as default.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

impl Drop for DefaultGraphGuard {
    fn drop(&mut self) {
        DEFAULT_GRAPHS.with(|graphs| {
            let mut graphs = graphs.borrow_mut();
            match graphs.iter().rposition(|(id, _)| *id == self.id) {
                Some(ix) => {
                    if ix + 1 != graphs.len() {
                        warn!(
                            "Graph {:?} left out of order ({} scopes still nested)",
                            self.graph,
                            graphs.len() - ix - 1
                        );
                    }
                    graphs.remove(ix);
                    debug!("Exit graph {:?} (depth {})", self.graph, ix + 1);
                }
                None => warn!("Graph {:?} is not in the default graph stack", self.graph),
            }
        });
    }
}

impl Scope for DefaultGraphGuard {}

/// How a model runs, resolved once when the model is built.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// Operations run immediately.
    Eager,

    /// The model runs with the given graph as default graph.
    Graph(Graph),
}

impl ExecutionMode {
    /// Resolves the mode from the global eager flag and, in graph mode, the
    /// current default graph.
    pub fn current() -> Self {
        if executing_eagerly() {
            Self::Eager
        } else {
            Self::Graph(get_default_graph())
        }
    }

    /// The graph of graph mode.
    pub fn graph(&self) -> Option<&Graph> {
        match self {
            Self::Eager => None,
            Self::Graph(graph) => Some(graph),
        }
    }

    /// Returns `true` in eager mode.
    pub fn is_eager(&self) -> bool {
        matches!(self, Self::Eager)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => write!(f, "eager"),
            Self::Graph(graph) => write!(f, "graph {}", graph.name()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_nested_defaults() {
        let root = get_default_graph();
        let g1 = Graph::new("g1");
        let g2 = Graph::new("g2");
        assert_ne!(g1, g2);
        assert!(root.is_default());

        {
            let _s1 = g1.as_default();
            assert!(g1.is_default());
            {
                let s2 = g2.as_default();
                assert_eq!(s2.graph(), &g2);
                assert!(g2.is_default());
            }
            assert!(g1.is_default());
        }
        assert!(root.is_default());
    }

    #[test]
    fn test_out_of_order_drop() {
        let root = get_default_graph();
        let g1 = Graph::new("g1");
        let g2 = Graph::new("g2");
        let g3 = Graph::new("g3");
        let g4 = Graph::new("g4");

        let s1 = g1.as_default();
        let s2 = g2.as_default();
        drop(s1);
        assert!(g2.is_default());

        let s3 = g3.as_default();
        let s4 = g4.as_default();
        drop(s2);
        assert!(g4.is_default());

        drop(s4);
        assert!(g3.is_default());
        drop(s3);
        assert!(root.is_default());
    }

    #[test]
    fn test_same_graph_nested() {
        let root = get_default_graph();
        let g = Graph::new("g");
        let h = Graph::new("h");

        let s1 = g.as_default();
        let s2 = h.as_default();
        let s3 = g.as_default();
        drop(s1);
        // The inner scope of `g` is still alive.
        assert!(g.is_default());
        drop(s3);
        assert!(h.is_default());
        drop(s2);
        assert!(root.is_default());
    }

    #[test]
    fn test_restore_on_unwind() {
        let g = Graph::new("g");
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _s = g.as_default();
            assert!(g.is_default());
            panic!("forward failed");
        }));
        assert!(result.is_err());
        assert!(!g.is_default());
    }

    #[test]
    fn test_default_graph_is_per_thread() {
        let g = Graph::new("g");
        let _s = g.as_default();
        let g_ = g.clone();
        let other = std::thread::spawn(move || g_.is_default()).join().unwrap();
        assert!(!other);
        assert!(g.is_default());
    }

    // The only test in this binary that touches the global eager flag.
    #[test]
    fn test_execution_mode_current() {
        assert!(executing_eagerly());
        assert_eq!(ExecutionMode::current(), ExecutionMode::Eager);

        disable_eager_execution();
        let g = Graph::new("g");
        let mode = {
            let _s = g.as_default();
            ExecutionMode::current()
        };
        enable_eager_execution();

        assert_eq!(mode.graph(), Some(&g));
        assert!(!mode.is_eager());
        assert_eq!(format!("{}", mode), "graph g");
    }
}
