//! The `(slot, generation)` arena backing every live filter/base-file.
//! REFERENCE: [3.2 Filter id / generation counter], [3.3 Global filter
//! lists], [9. DESIGN NOTES] ("pointer identity + generation counter for
//! dangling-reference diagnosis" -> "arena indexed by (slot_index,
//! generation) pair").

use ::std::collections::VecDeque;
use ::std::fmt::Debug;
use ::std::fmt::Formatter;
use ::std::fmt::Result as FmtResult;

use crate::filter::FilterEntry;
use crate::Generation;

/// The maximum generation value before a slot is retired rather than
/// reused, mirroring `LASTFILTERID` in the original `fileio.h`.
pub const MAX_GENERATION: Generation = 0x7FFE;

/// A caller-held handle to a filter: the arena index plus the generation
/// observed at the time the reference was taken. REFERENCE: [3.2 Filter id
/// / generation counter]: "A reference is live iff slot.generation ==
/// reference.generation and the slot is flagged open."
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterRef {
    pub(crate) index: u32,
    pub(crate) generation: Generation,
}

impl Debug for FilterRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "FilterRef(#{}, gen {})", self.index, self.generation)
    }
}

#[cfg(test)]
impl FilterRef {
    /// A ref that resolves to nothing live, for unit tests that exercise a
    /// filter kind's own `decode`/`encode` directly without going through
    /// `Engine::open` first (the kind itself never dereferences `this`
    /// unless it recurses into the engine for an underlying filter).
    pub(crate) fn dangling_for_tests() -> Self {
        Self {
            index: u32::MAX,
            generation: 0,
        }
    }
}

pub(crate) struct Slot {
    pub(crate) generation: Generation,
    pub(crate) local: bool,
    pub(crate) entry: FilterEntry,
}

/// The two global/local per-VM filter lists, plus the underlying slot
/// storage. REFERENCE: [3.3 Global filter lists]: "a filter appears before
/// its underlying filter" is preserved by always inserting new filters at
/// the head of their list, since by construction the underlying filter (if
/// any) was already linked in.
pub(crate) struct Arena {
    slots: Vec<Slot>,
    global_order: VecDeque<u32>,
    local_order: VecDeque<u32>,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            global_order: VecDeque::new(),
            local_order: VecDeque::new(),
        }
    }

    /// Finds a closed slot to reuse on the given list, preferring the one
    /// nearest the front (most recently vacated). REFERENCE: [4.2 Filter
    /// lifecycle, Creation] step 2-3.
    pub(crate) fn find_reusable(&self, local: bool) -> Option<u32> {
        let order = if local {
            &self.local_order
        } else {
            &self.global_order
        };
        order
            .iter()
            .copied()
            .find(|&index| {
                let slot = &self.slots[index as usize];
                !slot.entry.core.is_open() && slot.generation < MAX_GENERATION
            })
    }

    /// Reuses a closed slot: bumps its generation, unlinks and re-links it
    /// at the head of its list (it may move between the local and global
    /// lists), and returns the new live reference.
    pub(crate) fn reuse(&mut self, index: u32, local: bool, entry: FilterEntry) -> FilterRef {
        let slot = &mut self.slots[index as usize];
        slot.generation += 1;
        slot.local = local;
        slot.entry = entry;
        let generation = slot.generation;

        self.unlink(index);
        self.link_at_head(index, local);

        FilterRef { index, generation }
    }

    /// Allocates a brand-new slot at generation 1, linked at the head of
    /// its list.
    pub(crate) fn alloc(&mut self, local: bool, entry: FilterEntry) -> FilterRef {
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            local,
            entry,
        });
        self.link_at_head(index, local);
        FilterRef {
            index,
            generation: 1,
        }
    }

    fn link_at_head(&mut self, index: u32, local: bool) {
        if local {
            self.local_order.push_front(index);
        } else {
            self.global_order.push_front(index);
        }
    }

    fn unlink(&mut self, index: u32) {
        self.global_order.retain(|&i| i != index);
        self.local_order.retain(|&i| i != index);
    }

    pub(crate) fn is_live(&self, r: FilterRef) -> bool {
        self.slots
            .get(r.index as usize)
            .is_some_and(|slot| slot.generation == r.generation && slot.entry.core.is_open())
    }

    pub(crate) fn slot(&self, r: FilterRef) -> Option<&Slot> {
        self.slots.get(r.index as usize)
    }

    pub(crate) fn entry(&self, index: u32) -> &FilterEntry {
        &self.slots[index as usize].entry
    }

    pub(crate) fn entry_mut(&mut self, index: u32) -> &mut FilterEntry {
        &mut self.slots[index as usize].entry
    }

    /// Every live filter in list order (front-to-back, i.e. overlying before
    /// underlying), global list first, used by restore. REFERENCE: [5.
    /// CONCURRENCY & RESOURCE MODEL, Save/restore interaction].
    pub(crate) fn live_in_list_order(&self) -> Vec<FilterRef> {
        self.global_order
            .iter()
            .chain(self.local_order.iter())
            .filter_map(|&index| {
                let slot = &self.slots[index as usize];
                slot.entry
                    .core
                    .is_open()
                    .then_some(FilterRef {
                        index,
                        generation: slot.generation,
                    })
            })
            .collect()
    }
}
