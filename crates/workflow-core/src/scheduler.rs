// Scheduler: FIFO queue of pending WorkItems (SPEC_FULL.md §4.3)

use std::collections::VecDeque;

use workflow_contracts::{AecId, WorkItem};

/// Ordered queue the drain loop pops from. Plain FIFO ordering, with a
/// `prepend` escape hatch so a composite can push its children ahead of
/// whatever else is already queued — the depth-first, stack-like descent
/// composites need (SPEC_FULL.md §4.3, §5 "Ordering guarantees").
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: VecDeque<WorkItem>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `item` at the back — executes after everything already queued.
    pub fn schedule(&mut self, item: WorkItem) {
        self.queue.push_back(item);
    }

    /// Queue `item` at the front — executes before everything already
    /// queued, including items scheduled earlier this turn by an ancestor.
    pub fn prepend(&mut self, item: WorkItem) {
        self.queue.push_front(item);
    }

    /// Queue several items at the front in the given order (first of
    /// `items` runs first), as a composite scheduling multiple children does.
    pub fn schedule_many_prepend(&mut self, items: impl IntoIterator<Item = WorkItem>) {
        for item in items.into_iter().collect::<Vec<_>>().into_iter().rev() {
            self.queue.push_front(item);
        }
    }

    /// Remove queued work items matching `filter`, e.g. when a fault
    /// invalidates sibling work scheduled by the same composite.
    pub fn unschedule(&mut self, filter: impl Fn(&WorkItem) -> bool) {
        self.queue.retain(|item| !filter(item));
    }

    /// Remove and return queued work items targeting `owner`'s children.
    pub fn unschedule_owned_by(&mut self, owner: AecId) {
        self.unschedule(|item| item.owner == Some(owner));
    }

    pub fn next(&mut self) -> Option<WorkItem> {
        self.queue.pop_front()
    }

    pub fn has_any(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Replace the whole queue, e.g. when `Apply` replays a persisted
    /// scheduler snapshot.
    pub fn replace(&mut self, items: Vec<WorkItem>) {
        self.queue = items.into();
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Snapshot the queue in current order, for `Extract`.
    pub fn snapshot(&self) -> Vec<WorkItem> {
        self.queue.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_fifo() {
        let mut sched = Scheduler::new();
        sched.schedule(WorkItem::start("0.0", None));
        sched.schedule(WorkItem::start("0.1", None));
        assert_eq!(sched.next().unwrap().activity_node_id, "0.0");
        assert_eq!(sched.next().unwrap().activity_node_id, "0.1");
    }

    #[test]
    fn prepend_runs_before_existing_queue() {
        let mut sched = Scheduler::new();
        sched.schedule(WorkItem::start("0.1", None));
        sched.prepend(WorkItem::start("0.0", None));
        assert_eq!(sched.next().unwrap().activity_node_id, "0.0");
        assert_eq!(sched.next().unwrap().activity_node_id, "0.1");
    }

    #[test]
    fn schedule_many_prepend_preserves_relative_order() {
        let mut sched = Scheduler::new();
        sched.schedule(WorkItem::start("sibling", None));
        sched.schedule_many_prepend(vec![
            WorkItem::start("child-0", None),
            WorkItem::start("child-1", None),
        ]);
        assert_eq!(sched.next().unwrap().activity_node_id, "child-0");
        assert_eq!(sched.next().unwrap().activity_node_id, "child-1");
        assert_eq!(sched.next().unwrap().activity_node_id, "sibling");
    }
}
