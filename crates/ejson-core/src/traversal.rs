//! Depth-first traversal with pre/post visit hooks.
//!
//! The walk follows connections in canonical order (see
//! [`Network::connections_from`]). A component is marked visited only after its
//! pre-visit hook agrees to descend, so a component that halted the walk can be
//! offered again when reached along another path.

use indexmap::IndexSet;

use crate::component::Component;
use crate::Network;

/// Decision returned by a pre-visit hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Mark visited and continue into the neighbours.
    Descend,
    /// Do not visit, do not go past this component.
    Halt,
}

/// Hooks driven by [`Network::dfs`]. `A` is a caller-owned accumulator.
pub trait Visitor<A> {
    fn pre_visit(&mut self, network: &Network, component: &Component, acc: &mut A) -> Step;

    /// Runs after every neighbour of `component` has been explored.
    fn post_visit(&mut self, _network: &Network, _component: &Component, _acc: &mut A) {}
}

/// Halts at every component for which the predicate holds.
pub struct StopWhen<F>(pub F);

impl<A, F> Visitor<A> for StopWhen<F>
where
    F: FnMut(&Network, &Component) -> bool,
{
    fn pre_visit(&mut self, network: &Network, component: &Component, _acc: &mut A) -> Step {
        if (self.0)(network, component) {
            Step::Halt
        } else {
            Step::Descend
        }
    }
}

/// Folds every reached component into the accumulator, never halting.
pub struct Accumulate<F>(pub F);

impl<A, F> Visitor<A> for Accumulate<F>
where
    F: FnMut(&Network, &Component, &mut A),
{
    fn pre_visit(&mut self, network: &Network, component: &Component, acc: &mut A) -> Step {
        (self.0)(network, component, acc);
        Step::Descend
    }
}

/// Result of a traversal: visited ids in preorder and the final accumulator.
#[derive(Debug, Clone)]
pub struct Traversal<A> {
    pub visited: IndexSet<String>,
    pub accum: A,
}

struct Frame<'a> {
    id: &'a str,
    next: Vec<&'a str>,
    cursor: usize,
}

impl Network {
    /// Depth-first walk from `start`.
    ///
    /// An unknown `start` yields an empty traversal.
    pub fn dfs<A, V>(&self, start: &str, visitor: &mut V, accum: A) -> Traversal<A>
    where
        V: Visitor<A> + ?Sized,
    {
        let mut accum = accum;
        let mut visited = IndexSet::new();
        let mut stack: Vec<Frame<'_>> = Vec::new();

        if let Some(frame) = self.enter(start, visitor, &mut visited, &mut accum) {
            stack.push(frame);
        }

        while let Some(top) = stack.last_mut() {
            if top.cursor < top.next.len() {
                let next = top.next[top.cursor];
                top.cursor += 1;
                if let Some(frame) = self.enter(next, visitor, &mut visited, &mut accum) {
                    stack.push(frame);
                }
            } else {
                let id = top.id;
                stack.pop();
                if let Some(component) = self.component(id) {
                    visitor.post_visit(self, component, &mut accum);
                }
            }
        }

        Traversal { visited, accum }
    }

    /// Ids reachable from `start`, in preorder.
    pub fn preorder(&self, start: &str) -> IndexSet<String> {
        self.dfs(start, &mut StopWhen(|_: &Network, _: &Component| false), ())
            .visited
    }

    fn enter<'a, A, V>(
        &'a self,
        id: &str,
        visitor: &mut V,
        visited: &mut IndexSet<String>,
        accum: &mut A,
    ) -> Option<Frame<'a>>
    where
        V: Visitor<A> + ?Sized,
    {
        if visited.contains(id) {
            return None;
        }
        let component = self.component(id)?;
        if visitor.pre_visit(self, component, accum) == Step::Halt {
            return None;
        }
        visited.insert(component.id.clone());
        let own = component.id.as_str();
        let next = self
            .connections_from(own)
            .into_iter()
            .map(|c| c.other_end(own))
            .collect();
        Some(Frame {
            id: own,
            next,
            cursor: 0,
        })
    }
}
