use crate::context::get_context;
use crate::dtype::DType;
use crate::layout::Layout;
use crate::value::{Value, ValueError};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    #[error("All {0} storage slots are in use")]
    Exhausted(usize),
    #[error("Slot {0:?} was freed while already free")]
    DoubleFree(SlotId),
    #[error("Slot {0:?} does not belong to this allocator")]
    UnknownSlot(SlotId),
    #[error(transparent)]
    ValueError(#[from] ValueError),
}

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct SlotId {
    inner: usize,
}

/// A value together with the allocator slot backing it, if any.
#[derive(Debug, Clone)]
pub struct Variable {
    slot: Option<SlotId>,
    value: Value,
}

impl Variable {
    /// A variable whose storage is owned elsewhere. Freeing it does nothing.
    pub fn unmanaged(value: Value) -> Self {
        Self { slot: None, value }
    }

    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn dtype(&self) -> DType {
        self.value.dtype()
    }

    pub fn layout(&self) -> &Layout {
        self.value.layout()
    }
}

pub trait VariableAllocator {
    fn allocate(&mut self, dtype: DType, layout: &Layout) -> Result<Variable, AllocatorError>;
    fn free(&mut self, variable: &Variable) -> Result<(), AllocatorError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    pub max_slots: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self { max_slots: 64 }
    }
}

#[derive(Debug)]
struct Slot {
    storage: Value,
    scope: u64,
    live: bool,
}

/// Hands out storage from the active context and recycles it once freed.
///
/// A freed slot is reused for any later request of the same dtype that fits
/// in it; the recycled storage keeps whatever it held before. Under the
/// emitter context every slot is an emitted buffer, so `total_slots` is the
/// number of buffers the program declares. Free slots whose storage belongs
/// to an earlier scope of the context, such as a function emitted before,
/// get fresh storage instead of being recycled.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    config: AllocatorConfig,
    slots: Vec<Slot>,
}

impl SlotAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
        }
    }

    pub fn live_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.live).count()
    }

    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }
}

impl VariableAllocator for SlotAllocator {
    fn allocate(&mut self, dtype: DType, layout: &Layout) -> Result<Variable, AllocatorError> {
        let context = get_context()?;
        let scope = context.storage_scope();
        let needed = layout.memory_size();
        let free_slot = self.slots.iter().position(|slot| {
            !slot.live
                && slot.scope == scope
                && slot.storage.dtype() == dtype
                && slot.storage.layout().memory_size() >= needed
        });
        if let Some(index) = free_slot {
            let slot = &mut self.slots[index];
            let value = slot.storage.with_layout(layout.clone())?;
            slot.live = true;
            log::trace!("Recycling slot {index} for {dtype} {:?}", layout.extents());
            return Ok(Variable {
                slot: Some(SlotId { inner: index }),
                value,
            });
        }

        let stale_slot = self
            .slots
            .iter()
            .position(|slot| !slot.live && slot.scope != scope);
        if stale_slot.is_none() && self.slots.len() >= self.config.max_slots {
            return Err(AllocatorError::Exhausted(self.config.max_slots));
        }
        let storage = context.allocate(dtype, layout)?;
        let slot = Slot {
            storage: storage.clone(),
            scope,
            live: true,
        };
        let id = match stale_slot {
            Some(inner) => {
                self.slots[inner] = slot;
                SlotId { inner }
            }
            None => {
                self.slots.push(slot);
                SlotId {
                    inner: self.slots.len() - 1,
                }
            }
        };
        log::trace!("New storage in slot {} for {dtype} {:?}", id.inner, layout.extents());
        Ok(Variable {
            slot: Some(id),
            value: storage,
        })
    }

    fn free(&mut self, variable: &Variable) -> Result<(), AllocatorError> {
        let Some(id) = variable.slot else {
            return Ok(());
        };
        let slot = self
            .slots
            .get_mut(id.inner)
            .ok_or(AllocatorError::UnknownSlot(id))?;
        if !slot.live {
            return Err(AllocatorError::DoubleFree(id));
        }
        slot.live = false;
        log::trace!("Freed slot {}", id.inner);
        Ok(())
    }
}
