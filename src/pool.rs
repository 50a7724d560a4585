use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::models::ServerAssignment;

/// Fixed set of server ids `0..capacity`, each either free or busy.
///
/// The pool never blocks. A caller that gets `None` from [`try_acquire`]
/// is expected to park itself until a release hands it a server.
///
/// [`try_acquire`]: ServerPool::try_acquire
#[derive(Clone, Debug)]
pub struct ServerPool {
    busy: Vec<bool>,
    free: VecDeque<usize>,
    assignment: ServerAssignment,
}

impl ServerPool {
    pub fn new(capacity: usize, assignment: ServerAssignment) -> Self {
        Self {
            busy: vec![false; capacity],
            free: (0..capacity).collect(),
            assignment,
        }
    }

    pub fn capacity(&self) -> usize {
        self.busy.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn busy_count(&self) -> usize {
        self.capacity() - self.free_count()
    }

    pub fn is_busy(&self, server_id: usize) -> bool {
        self.busy.get(server_id).copied().unwrap_or(false)
    }

    pub fn try_acquire(&mut self) -> Option<usize> {
        let server_id = match self.assignment {
            ServerAssignment::ReleaseOrder => self.free.pop_front()?,
            ServerAssignment::LowestId => {
                let (pos, _) = self
                    .free
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, id)| **id)?;
                self.free.remove(pos)?
            }
        };
        self.busy[server_id] = true;
        Some(server_id)
    }

    pub fn release(&mut self, server_id: usize) -> Result<()> {
        match self.busy.get_mut(server_id) {
            Some(busy) if *busy => {
                *busy = false;
                self.free.push_back(server_id);
                Ok(())
            }
            Some(_) => Err(Error::InconsistentResourceState {
                server_id,
                reason: "released while not held",
            }),
            None => Err(Error::InconsistentResourceState {
                server_id,
                reason: "is outside the pool",
            }),
        }
    }
}
