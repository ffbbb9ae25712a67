//! Finalizes many independent trees against one session.

use crate::session::Session;
use crate::substitution::Substitutor;
use crate::verify::ensure_finalized;
use crate::writer::{finalize_expression, FinalizeOutcome};
use fp_core::error::Result;
use fp_core::tree::Expr;

/// A tree as the solver hands it over: pending references plus the
/// substitutor that fixes its type variables.
#[derive(Debug, Clone)]
pub struct PendingTree {
    pub root: Expr,
    pub substitutor: Substitutor,
}

impl PendingTree {
    pub fn new(root: Expr, substitutor: Substitutor) -> Self {
        Self { root, substitutor }
    }
}

#[derive(Debug)]
pub struct FinalizedTree {
    pub root: Expr,
    /// An error aborts only its own tree. A tree that still holds
    /// candidates or literal types afterwards is reported as an error too.
    pub result: Result<FinalizeOutcome>,
}

/// Finalizes `trees` on up to `session.options().threads` workers. Trees
/// share nothing but the session; results come back in input order.
pub fn finalize_trees(session: &Session, trees: Vec<PendingTree>) -> Vec<FinalizedTree> {
    let workers = session.options().threads.clamp(1, trees.len().max(1));
    let mut buckets: Vec<Vec<(usize, PendingTree)>> = (0..workers).map(|_| Vec::new()).collect();
    for (index, tree) in trees.into_iter().enumerate() {
        buckets[index % workers].push((index, tree));
    }
    tracing::debug!("finalizing with {} workers", workers);

    let mut finished: Vec<(usize, FinalizedTree)> = std::thread::scope(|scope| {
        let handles: Vec<_> = buckets
            .into_iter()
            .map(|bucket| {
                scope.spawn(move || {
                    bucket
                        .into_iter()
                        .map(|(index, tree)| (index, finalize_one(session, tree)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect()
    });
    finished.sort_by_key(|(index, _)| *index);
    finished.into_iter().map(|(_, tree)| tree).collect()
}

fn finalize_one(session: &Session, tree: PendingTree) -> FinalizedTree {
    let PendingTree {
        mut root,
        substitutor,
    } = tree;
    let result = finalize_expression(session, &substitutor, &mut root)
        .and_then(|outcome| ensure_finalized(&root).map(|()| outcome));
    if let Err(err) = &result {
        tracing::warn!("finalization of tree {} failed: {}", root.id, err);
    }
    FinalizedTree { root, result }
}
