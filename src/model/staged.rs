use std::hash::Hash;

use indexmap::{map::Iter, IndexMap};
use serde::{Deserialize, Serialize};

/// The pending structural change recorded against a container member since
/// the last time the container was persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// In sync with storage; nothing to do.
    Clean,
    /// Attached since the last commit; must be inserted.
    New,
    /// Re-parented from another container since the last commit; must be updated.
    Moved,
    /// Marked for removal; must be deleted. Hidden from the default view.
    Removed,
}

impl Action {
    /// Is a member with this action part of the live view?
    pub fn is_live(self) -> bool {
        self != Action::Removed
    }
}

/// How a member leaves its container.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Removal {
    /// Mark the member for deletion. It stays enumerable under
    /// [`Action::Removed`] until the container is committed.
    Delete,
    /// Stop tracking the member entirely, because it now belongs elsewhere.
    Move,
}

/// The members of one container together with their pending actions, in
/// attachment order.
#[derive(Debug, Clone)]
pub struct StagedMembers<K> {
    members: IndexMap<K, Action>,
}

impl<K: Hash + Eq> PartialEq for StagedMembers<K> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<K: Hash + Eq> Eq for StagedMembers<K> {}

impl<K> Default for StagedMembers<K> {
    fn default() -> Self {
        Self {
            members: IndexMap::new(),
        }
    }
}

impl<K> StagedMembers<K>
where
    K: Copy + Eq + Hash,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `key` with the given action. Attaching a tracked key overwrites
    /// its action but keeps its position.
    pub(crate) fn attach(&mut self, key: K, action: Action) {
        self.members.insert(key, action);
    }

    /// Change the action of a tracked key. Returns false if `key` is not tracked.
    pub(crate) fn set_action(&mut self, key: K, action: Action) -> bool {
        match self.members.get_mut(&key) {
            Some(current) => {
                *current = action;
                true
            }
            None => false,
        }
    }

    /// Stop tracking `key`. Returns false if it was not tracked.
    pub(crate) fn detach(&mut self, key: K) -> bool {
        self.members.shift_remove(&key).is_some()
    }

    /// Is `key` tracked at all, including under [`Action::Removed`]?
    pub fn contains(&self, key: K) -> bool {
        self.members.contains_key(&key)
    }

    /// The action recorded against `key`, if tracked.
    pub fn action(&self, key: K) -> Option<Action> {
        self.members.get(&key).copied()
    }

    /// Iterate the members matching `filter`. With no filter, this is every
    /// member not marked [`Action::Removed`].
    pub fn view(&self, filter: Option<Action>) -> Members<'_, K> {
        Members {
            inner: self.members.iter(),
            filter,
        }
    }

    /// Size of the live view.
    pub fn count(&self) -> usize {
        self.view(None).count()
    }

    /// Partition the pending work.
    pub fn changes(&self) -> Changes<K> {
        let mut changes = Changes::default();
        for (&key, &action) in &self.members {
            match action {
                Action::Clean => {}
                Action::New => changes.new.push(key),
                Action::Moved => changes.moved.push(key),
                Action::Removed => changes.removed.push(key),
            }
        }
        changes
    }

    /// Forget every removed member and mark the rest clean. Returns the keys
    /// that were dropped.
    pub(crate) fn commit(&mut self) -> Vec<K> {
        let removed: Vec<K> = self.view(Some(Action::Removed)).collect();
        self.members.retain(|_, action| action.is_live());
        for action in self.members.values_mut() {
            *action = Action::Clean;
        }
        removed
    }
}

/// Stop tracking `key` in every store that only holds it as
/// [`Action::Removed`]. Returns how many stores let go of it.
pub(crate) fn forget_removed<'a, K>(
    stores: impl Iterator<Item = &'a mut StagedMembers<K>>,
    key: K,
) -> usize
where
    K: Copy + Eq + Hash + 'a,
{
    let mut forgotten = 0;
    for store in stores {
        if store.action(key) == Some(Action::Removed) {
            store.detach(key);
            forgotten += 1;
        }
    }
    forgotten
}

/// A lazy filtered view over a [`StagedMembers`]. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Members<'a, K> {
    inner: Iter<'a, K, Action>,
    filter: Option<Action>,
}

impl<'a, K: Copy> Iterator for Members<'a, K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner
            .by_ref()
            .find(|&(_, &action)| match filter {
                Some(wanted) => action == wanted,
                None => action.is_live(),
            })
            .map(|(&key, _)| key)
    }
}

/// Members of one container grouped by the work a persistence layer has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changes<K> {
    pub new: Vec<K>,
    pub moved: Vec<K>,
    pub removed: Vec<K>,
}

impl<K> Default for Changes<K> {
    fn default() -> Self {
        Self {
            new: Vec::new(),
            moved: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<K> Changes<K> {
    /// Nothing to persist?
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.moved.is_empty() && self.removed.is_empty()
    }
}
