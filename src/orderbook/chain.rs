//! Lock-free sorted chain of resting orders for one side of one book.
//!
//! The chain is a singly linked list reachable only through `head`. Orders are
//! threaded in with a compare-and-swap on the link in front of their sorted
//! position and leave only once their quantity is exhausted.
//!
//! Removal is two-phase. The retiring thread first sets the `RETIRED` tag on
//! the node's own `next` link (logical deletion), then swings the link in
//! front of it past it (physical unlink). A tagged link never matches an
//! untagged expected value, so no insertion can land behind a node that is on
//! its way out. Any traversal that meets a tagged node helps unlink it.
//!
//! Nodes are owned by `crossbeam-epoch`. Every traversal holds a pinned guard,
//! and a node is handed to `defer_destroy` only by the thread whose CAS
//! physically unlinked it, so memory is released once no pinned thread can
//! still be looking at it. The same guarantee rules out ABA on the links.

use super::order::OrderEntry;
use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use pricelevel::Side;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::trace;

/// Tag carried by the `next` link of a node that has been retired
const RETIRED: usize = 1;

struct Node {
    order: Arc<OrderEntry>,
    next: Atomic<Node>,
}

/// Outcome of walking the chain for an insertion point
enum Position<'g> {
    /// Link to swing, and the node it currently points at
    Found(&'g Atomic<Node>, Shared<'g, Node>),
    /// A concurrent change invalidated the walk
    Restart,
}

/// One side of a book, kept in price-time priority.
///
/// Bids are ordered by descending price, asks by ascending price, ties broken
/// by ascending sequence number. A reader walking the chain never sees it out
/// of order.
pub struct OrderChain {
    side: Side,
    head: Atomic<Node>,
}

impl OrderChain {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            head: Atomic::null(),
        }
    }

    /// Which side of the book this chain holds
    pub fn side(&self) -> Side {
        self.side
    }

    /// Thread `order` into its sorted position.
    ///
    /// The order must belong to this side, have a positive remaining quantity
    /// and not be linked anywhere yet. Lost CAS races are retried from the
    /// head; since ordering keys never change, every walk converges.
    pub fn insert(&self, order: Arc<OrderEntry>) {
        debug_assert_eq!(order.side(), self.side);
        debug_assert!(order.remaining() > 0, "zero-quantity order inserted");

        let guard = &epoch::pin();
        let mut node = Owned::new(Node {
            order,
            next: Atomic::null(),
        });
        let mut attempts = 0u32;

        loop {
            let (link, succ) = match self.locate(&node.order, guard) {
                Position::Found(link, succ) => (link, succ),
                Position::Restart => {
                    attempts += 1;
                    continue;
                }
            };

            node.next.store(succ, Ordering::Relaxed);

            match link.compare_exchange(succ, node, Ordering::AcqRel, Ordering::Acquire, guard) {
                Ok(inserted) => {
                    // SAFETY: just published by us under `guard`
                    if let Some(placed) = unsafe { inserted.as_ref() } {
                        trace!(
                            "{:?} chain: order {} at {} linked after {} retries",
                            self.side,
                            placed.order.id(),
                            placed.order.price(),
                            attempts
                        );
                    }
                    return;
                }
                Err(err) => {
                    node = err.new;
                    attempts += 1;
                }
            }
        }
    }

    /// Walk from the head to the first node that must not precede `order`.
    ///
    /// Retired nodes met on the way are unlinked. Any failed helping CAS means
    /// the links around us moved, so the caller starts over.
    fn locate<'g>(&'g self, order: &OrderEntry, guard: &'g Guard) -> Position<'g> {
        let mut link = &self.head;
        let mut curr = link.load(Ordering::Acquire, guard);

        loop {
            // SAFETY: `curr` was loaded under `guard` and nodes are only freed
            // through `defer_destroy`, so it stays valid while we are pinned.
            let node = match unsafe { curr.as_ref() } {
                Some(node) => node,
                None => return Position::Found(link, curr),
            };

            let next = node.next.load(Ordering::Acquire, guard);
            if next.tag() == RETIRED {
                let succ = next.with_tag(0);
                match link.compare_exchange(curr, succ, Ordering::AcqRel, Ordering::Acquire, guard)
                {
                    Ok(_) => {
                        // SAFETY: our CAS removed the only link to this node
                        unsafe { guard.defer_destroy(curr) };
                        trace!(
                            "{:?} chain: helped unlink retired order {}",
                            self.side,
                            node.order.id()
                        );
                        curr = succ;
                        continue;
                    }
                    Err(_) => return Position::Restart,
                }
            }

            if !node.order.ranks_before(order) {
                return Position::Found(link, curr);
            }

            link = &node.next;
            curr = next;
        }
    }

    /// First resting node, unlinking retired nodes found in front of it
    fn first_live<'g>(&'g self, guard: &'g Guard) -> Option<&'g Node> {
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            // SAFETY: loaded under `guard`, see `locate`
            let node = unsafe { head.as_ref() }?;

            let next = node.next.load(Ordering::Acquire, guard);
            if next.tag() != RETIRED {
                return Some(node);
            }

            if self
                .head
                .compare_exchange(
                    head,
                    next.with_tag(0),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                )
                .is_ok()
            {
                // SAFETY: our CAS removed the only link to this node
                unsafe { guard.defer_destroy(head) };
            }
        }
    }

    /// The order at the head of the chain, i.e. the best price on this side
    pub fn best(&self) -> Option<Arc<OrderEntry>> {
        let guard = &epoch::pin();
        self.first_live(guard).map(|node| Arc::clone(&node.order))
    }

    /// Unlink `order` once its remaining quantity has reached zero.
    ///
    /// Returns `true` if this call retired the order. Returns `false` if the
    /// order still has quantity, is not in this chain, or was already retired
    /// by someone else. When this returns `true` the node is no longer linked.
    pub fn retire_if_empty(&self, order: &OrderEntry) -> bool {
        if order.remaining() != 0 {
            return false;
        }

        let guard = &epoch::pin();
        let mut link = &self.head;
        let mut curr = link.load(Ordering::Acquire, guard);

        // SAFETY: loaded under `guard`, see `locate`
        while let Some(node) = unsafe { curr.as_ref() } {
            if ptr::eq(Arc::as_ptr(&node.order), order) {
                return self.retire_node(link, curr, node, guard);
            }
            if order.ranks_before(&node.order) {
                break;
            }
            link = &node.next;
            curr = node.next.load(Ordering::Acquire, guard).with_tag(0);
        }

        false
    }

    fn retire_node<'g>(
        &self,
        link: &'g Atomic<Node>,
        curr: Shared<'g, Node>,
        node: &'g Node,
        guard: &'g Guard,
    ) -> bool {
        let mut next = node.next.load(Ordering::Acquire, guard);
        loop {
            if next.tag() == RETIRED {
                return false;
            }
            match node.next.compare_exchange(
                next,
                next.with_tag(RETIRED),
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            ) {
                Ok(_) => break,
                Err(err) => next = err.current,
            }
        }

        if link
            .compare_exchange(curr, next, Ordering::AcqRel, Ordering::Acquire, guard)
            .is_ok()
        {
            // SAFETY: our CAS removed the only link to this node
            unsafe { guard.defer_destroy(curr) };
            trace!("{:?} chain: retired order {}", self.side, node.order.id());
        } else {
            // The link in front moved. Walk up to the node again; the walk
            // unlinks it, unless another traversal already did.
            let mut walks = 1u32;
            while let Position::Restart = self.locate(&node.order, guard) {
                walks += 1;
            }
            trace!(
                "{:?} chain: retired order {} after {} walks",
                self.side,
                node.order.id(),
                walks
            );
        }

        true
    }

    /// All resting orders in priority order
    pub fn orders(&self) -> Vec<Arc<OrderEntry>> {
        let guard = &epoch::pin();
        let mut result = Vec::new();
        self.for_each_live(guard, |node| result.push(Arc::clone(&node.order)));
        result
    }

    /// Number of resting orders
    pub fn len(&self) -> usize {
        let guard = &epoch::pin();
        let mut count = 0;
        self.for_each_live(guard, |_| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.best().is_none()
    }

    /// Sum of remaining quantity over all resting orders
    pub fn total_quantity(&self) -> u64 {
        let guard = &epoch::pin();
        let mut total = 0;
        self.for_each_live(guard, |node| total += node.order.remaining());
        total
    }

    /// Number of physically linked nodes, retired ones included
    #[cfg(test)]
    pub(crate) fn linked_len(&self) -> usize {
        let guard = &epoch::pin();
        let mut count = 0;
        let mut curr = self.head.load(Ordering::Acquire, guard);
        // SAFETY: loaded under `guard`, see `locate`
        while let Some(node) = unsafe { curr.as_ref() } {
            count += 1;
            curr = node.next.load(Ordering::Acquire, guard).with_tag(0);
        }
        count
    }

    fn for_each_live<'g, F>(&'g self, guard: &'g Guard, mut visit: F)
    where
        F: FnMut(&'g Node),
    {
        let mut curr = self.head.load(Ordering::Acquire, guard);
        // SAFETY: loaded under `guard`, see `locate`
        while let Some(node) = unsafe { curr.as_ref() } {
            let next = node.next.load(Ordering::Acquire, guard);
            if next.tag() != RETIRED {
                visit(node);
            }
            curr = next.with_tag(0);
        }
    }
}

impl Drop for OrderChain {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread can reach the chain. Nodes
        // still linked are freed here; unlinked ones were already deferred.
        unsafe {
            let guard = epoch::unprotected();
            let mut curr = self.head.load(Ordering::Relaxed, guard);
            while !curr.is_null() {
                let next = curr.deref().next.load(Ordering::Relaxed, guard);
                drop(curr.into_owned());
                curr = next.with_tag(0);
            }
        }
    }
}

impl std::fmt::Debug for OrderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderChain")
            .field("side", &self.side)
            .field("orders", &self.len())
            .finish()
    }
}
