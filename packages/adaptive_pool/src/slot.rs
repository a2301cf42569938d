use std::mem;

/// Observable state of one slot in an [`AdaptivePool`][crate::AdaptivePool].
///
/// Obtained from [`AdaptivePool::slot_states()`][crate::AdaptivePool::slot_states].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SlotState {
    /// The slot holds a live resource that is available to be acquired.
    Idle,

    /// The slot's resource is currently leased to a caller.
    Busy,

    /// The slot's resource has been torn down by the release policy and the slot is waiting to
    /// be restored.
    Released,
}

/// One entry of the slot table.
///
/// A busy slot does not hold its resource - the resource travels inside the
/// [`Lease`][crate::Lease] until it is returned. Keeping the three states in one enum makes
/// "busy and released at the same time" unrepresentable.
#[derive(Debug)]
enum Slot<T> {
    Idle(T),
    Busy,
    Released,
}

impl<T> Slot<T> {
    fn state(&self) -> SlotState {
        match self {
            Self::Idle(_) => SlotState::Idle,
            Self::Busy => SlotState::Busy,
            Self::Released => SlotState::Released,
        }
    }
}

/// Fixed-size, index-addressed table of resource slots.
///
/// The number of slots is decided at construction and never changes afterwards. Only the
/// state of individual slots changes over time.
///
/// The table itself is not synchronized - the pool keeps it behind its mutex.
#[derive(Debug)]
pub(crate) struct SlotTable<T> {
    slots: Vec<Slot<T>>,
}

impl<T> SlotTable<T> {
    /// Creates a table with one idle slot per resource, in the order given.
    pub(crate) fn new(resources: Vec<T>) -> Self {
        Self {
            slots: resources.into_iter().map(Slot::Idle).collect(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots backed by a live resource, whether idle or busy.
    pub(crate) fn active_count(&self) -> usize {
        self.count_in(|state| state != SlotState::Released)
    }

    pub(crate) fn idle_count(&self) -> usize {
        self.count_in(|state| state == SlotState::Idle)
    }

    pub(crate) fn busy_count(&self) -> usize {
        self.count_in(|state| state == SlotState::Busy)
    }

    pub(crate) fn released_count(&self) -> usize {
        self.count_in(|state| state == SlotState::Released)
    }

    fn count_in(&self, predicate: impl Fn(SlotState) -> bool) -> usize {
        self.slots
            .iter()
            .filter(|slot| predicate(slot.state()))
            .count()
    }

    pub(crate) fn states(&self) -> Vec<SlotState> {
        self.slots.iter().map(Slot::state).collect()
    }

    /// Index of the first idle slot at or after `start`, if any.
    pub(crate) fn first_idle_from(&self, start: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, slot)| matches!(slot, Slot::Idle(_)))
            .map(|(index, _)| index)
    }

    /// Indexes of all released slots, in ascending order.
    pub(crate) fn released_indexes(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, Slot::Released))
            .map(|(index, _)| index)
            .collect()
    }

    /// Moves the resource out of an idle slot, leaving the slot busy.
    ///
    /// Returns `None` and changes nothing if the slot is not idle.
    pub(crate) fn take_idle(&mut self, index: usize) -> Option<T> {
        self.transition(index, Slot::Busy, |slot| match slot {
            Slot::Idle(resource) => Ok(resource),
            other => Err(other),
        })
    }

    /// Moves the resource out of an idle slot, leaving the slot released.
    ///
    /// The caller is responsible for tearing the returned resource down. The slot is already
    /// marked released when this returns, so a teardown that panics cannot leave a busy slot
    /// without a resource behind.
    ///
    /// Returns `None` and changes nothing if the slot is not idle.
    pub(crate) fn mark_released(&mut self, index: usize) -> Option<T> {
        self.transition(index, Slot::Released, |slot| match slot {
            Slot::Idle(resource) => Ok(resource),
            other => Err(other),
        })
    }

    /// Puts a leased resource back into its busy slot, making the slot idle again.
    ///
    /// Hands the resource back as the error value if the slot is not busy.
    pub(crate) fn put_back(&mut self, index: usize, resource: T) -> Result<(), T> {
        match self.slots.get_mut(index) {
            Some(slot @ Slot::Busy) => {
                *slot = Slot::Idle(resource);
                Ok(())
            }
            _ => Err(resource),
        }
    }

    /// Installs a replacement resource into a released slot, making the slot idle again.
    ///
    /// Hands the resource back as the error value if the slot is not released.
    pub(crate) fn restore(&mut self, index: usize, resource: T) -> Result<(), T> {
        match self.slots.get_mut(index) {
            Some(slot @ Slot::Released) => {
                *slot = Slot::Idle(resource);
                Ok(())
            }
            _ => Err(resource),
        }
    }

    /// Empties the table, returning the resources of all idle slots with their indexes.
    ///
    /// Busy slots have no resource in the table, so they contribute nothing.
    pub(crate) fn drain_idle(&mut self) -> Vec<(usize, T)> {
        mem::take(&mut self.slots)
            .into_iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Idle(resource) => Some((index, resource)),
                Slot::Busy | Slot::Released => None,
            })
            .collect()
    }

    fn transition(
        &mut self,
        index: usize,
        next: Slot<T>,
        extract: impl FnOnce(Slot<T>) -> Result<T, Slot<T>>,
    ) -> Option<T> {
        let slot = self.slots.get_mut(index)?;

        match extract(mem::replace(slot, next)) {
            Ok(resource) => Some(resource),
            Err(previous) => {
                // Not the expected source state - put it back untouched.
                *slot = previous;
                None
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_all_idle() {
        let table = SlotTable::new(vec!['a', 'b', 'c']);

        assert_eq!(table.capacity(), 3);
        assert_eq!(table.idle_count(), 3);
        assert_eq!(table.active_count(), 3);
        assert_eq!(table.busy_count(), 0);
        assert_eq!(table.released_count(), 0);
        assert_eq!(table.states(), vec![SlotState::Idle; 3]);
    }

    #[test]
    fn empty_table_has_nothing_to_find() {
        let table = SlotTable::<u8>::new(Vec::new());

        assert_eq!(table.capacity(), 0);
        assert_eq!(table.first_idle_from(0), None);
        assert!(table.released_indexes().is_empty());
    }

    #[test]
    fn take_idle_marks_busy() {
        let mut table = SlotTable::new(vec![10, 20]);

        assert_eq!(table.take_idle(1), Some(20));
        assert_eq!(table.states(), vec![SlotState::Idle, SlotState::Busy]);

        // A busy slot cannot be taken twice.
        assert_eq!(table.take_idle(1), None);
        assert_eq!(table.states(), vec![SlotState::Idle, SlotState::Busy]);
    }

    #[test]
    fn take_idle_out_of_range_is_none() {
        let mut table = SlotTable::new(vec![10]);

        assert_eq!(table.take_idle(5), None);
        assert_eq!(table.idle_count(), 1);
    }

    #[test]
    fn put_back_requires_busy_slot() {
        let mut table = SlotTable::new(vec![10, 20]);

        assert_eq!(table.put_back(0, 99), Err(99));

        let resource = table.take_idle(0).unwrap();
        assert_eq!(table.put_back(0, resource), Ok(()));
        assert_eq!(table.idle_count(), 2);
    }

    #[test]
    fn mark_released_and_restore() {
        let mut table = SlotTable::new(vec![10, 20, 30]);

        assert_eq!(table.mark_released(1), Some(20));
        assert_eq!(table.active_count(), 2);
        assert_eq!(table.released_indexes(), vec![1]);

        // Only idle slots can be released.
        assert_eq!(table.mark_released(1), None);

        // Only released slots can be restored.
        assert_eq!(table.restore(0, 11), Err(11));
        assert_eq!(table.restore(1, 21), Ok(()));
        assert_eq!(table.active_count(), 3);
        assert_eq!(table.take_idle(1), Some(21));
    }

    #[test]
    fn busy_slot_cannot_be_released() {
        let mut table = SlotTable::new(vec![10]);
        table.take_idle(0).unwrap();

        assert_eq!(table.mark_released(0), None);
        assert_eq!(table.states(), vec![SlotState::Busy]);
    }

    #[test]
    fn first_idle_from_skips_busy_and_released() {
        let mut table = SlotTable::new(vec![1, 2, 3, 4]);
        table.take_idle(0).unwrap();
        table.mark_released(1).unwrap();

        assert_eq!(table.first_idle_from(0), Some(2));
        assert_eq!(table.first_idle_from(3), Some(3));
        assert_eq!(table.first_idle_from(4), None);
    }

    #[test]
    fn drain_idle_returns_only_live_resources() {
        let mut table = SlotTable::new(vec![1, 2, 3]);
        table.take_idle(0).unwrap();
        table.mark_released(2).unwrap();

        assert_eq!(table.drain_idle(), vec![(1, 2)]);
        assert_eq!(table.capacity(), 0);
    }
}
