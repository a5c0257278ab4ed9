//! Lists that report every mutation to a listener.
//!
//! An [`ObservableList`] owns a `Vec<T>` and an optional listener. Each
//! mutator takes a snapshot, applies the change, and hands the listener a
//! [`ListChange`] describing the old and new contents. If the listener
//! fails, the snapshot is restored and the listener's error is returned
//! unchanged, so the list never shows a state the listener rejected.
//!
//! Mutations that leave the contents unchanged do not notify.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// Callback invoked after every effective mutation.
pub type ListAction<T> = Box<dyn FnMut(&ListChange<'_, T>) -> CoreResult<()> + Send + Sync>;

/// Which mutator produced a [`ListChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListMutation {
    /// [`ObservableList::push`]
    Push,
    /// [`ObservableList::insert`]
    Insert,
    /// [`ObservableList::extend`]
    Extend,
    /// [`ObservableList::set`]
    Set,
    /// [`ObservableList::remove_at`]
    RemoveAt,
    /// [`ObservableList::remove`]
    Remove,
    /// [`ObservableList::remove_all`]
    RemoveAll,
    /// [`ObservableList::retain`]
    Retain,
    /// [`ObservableList::remove_if`]
    RemoveIf,
    /// [`ObservableList::replace_all`]
    ReplaceAll,
    /// [`ObservableList::replace`]
    Replace,
    /// [`ObservableList::clear`]
    Clear,
    /// [`ObservableList::sort`]
    Sort,
    /// [`ObservableList::assign`]
    Assign,
}

/// A mutation as seen by the listener.
#[derive(Debug)]
pub struct ListChange<'a, T> {
    /// The mutator that ran.
    pub action: ListMutation,
    /// Contents before the mutation.
    pub before: &'a [T],
    /// Contents after the mutation.
    pub after: &'a [T],
}

/// A `Vec<T>` with rollback-on-failure change notification.
pub struct ObservableList<T> {
    items: Vec<T>,
    listener: Option<ListAction<T>>,
}

impl<T> ObservableList<T> {
    /// Creates an empty list without a listener.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            listener: None,
        }
    }

    /// Wraps existing items without a listener.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items,
            listener: None,
        }
    }

    /// Wraps existing items and installs a listener.
    pub fn with_listener(items: Vec<T>, listener: ListAction<T>) -> Self {
        Self {
            items,
            listener: Some(listener),
        }
    }

    /// Installs a listener, returning the previous one.
    pub fn set_listener(&mut self, listener: ListAction<T>) -> Option<ListAction<T>> {
        self.listener.replace(listener)
    }

    /// Removes the listener.
    pub fn clear_listener(&mut self) -> Option<ListAction<T>> {
        self.listener.take()
    }

    /// Returns true if a listener is installed.
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// The current contents.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Unwraps the contents, dropping the listener.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Clone + PartialEq> ObservableList<T> {
    /// Returns true if the list contains `item`.
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Copies the contents.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }

    fn mutate<R>(
        &mut self,
        action: ListMutation,
        change: impl FnOnce(&mut Vec<T>) -> R,
    ) -> CoreResult<R> {
        let before = self.items.clone();
        let result = change(&mut self.items);
        if self.items == before {
            return Ok(result);
        }

        if let Some(listener) = self.listener.as_mut() {
            let notified = listener(&ListChange {
                action,
                before: &before,
                after: &self.items,
            });
            if let Err(error) = notified {
                self.items = before;
                return Err(error);
            }
        }
        Ok(result)
    }

    fn check_index(&self, index: usize, len: usize) -> CoreResult<()> {
        if index < len {
            Ok(())
        } else {
            Err(CoreError::invalid_operation(format!(
                "index {index} out of bounds for list of length {}",
                self.items.len()
            )))
        }
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// Returns the listener's error; the list is unchanged in that case.
    pub fn push(&mut self, item: T) -> CoreResult<()> {
        self.mutate(ListMutation::Push, |items| items.push(item))
    }

    /// Inserts an element at `index`, shifting later elements.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if `index > len`, or the
    /// listener's error.
    pub fn insert(&mut self, index: usize, item: T) -> CoreResult<()> {
        self.check_index(index, self.items.len() + 1)?;
        self.mutate(ListMutation::Insert, |items| items.insert(index, item))
    }

    /// Appends every element of `iter`. Returns true if anything was added.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn extend(&mut self, iter: impl IntoIterator<Item = T>) -> CoreResult<bool> {
        self.mutate(ListMutation::Extend, |items| {
            let len = items.len();
            items.extend(iter);
            items.len() > len
        })
    }

    /// Replaces the element at `index` and returns the old one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if `index` is out of bounds,
    /// or the listener's error.
    pub fn set(&mut self, index: usize, item: T) -> CoreResult<T> {
        self.check_index(index, self.items.len())?;
        self.mutate(ListMutation::Set, |items| std::mem::replace(&mut items[index], item))
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if `index` is out of bounds,
    /// or the listener's error.
    pub fn remove_at(&mut self, index: usize) -> CoreResult<T> {
        self.check_index(index, self.items.len())?;
        self.mutate(ListMutation::RemoveAt, |items| items.remove(index))
    }

    /// Removes the first element equal to `item`. Returns true if found.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn remove(&mut self, item: &T) -> CoreResult<bool> {
        self.mutate(ListMutation::Remove, |items| {
            match items.iter().position(|candidate| candidate == item) {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        })
    }

    /// Removes every element contained in `other`. Returns true if anything
    /// was removed.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn remove_all(&mut self, other: &[T]) -> CoreResult<bool> {
        self.mutate(ListMutation::RemoveAll, |items| {
            let len = items.len();
            items.retain(|item| !other.contains(item));
            items.len() < len
        })
    }

    /// Keeps only the elements matching `keep`. Returns true if anything
    /// was removed.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> CoreResult<bool> {
        self.mutate(ListMutation::Retain, |items| {
            let len = items.len();
            items.retain(|item| keep(item));
            items.len() < len
        })
    }

    /// Removes the elements matching `predicate` and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn remove_if(&mut self, mut predicate: impl FnMut(&T) -> bool) -> CoreResult<usize> {
        self.mutate(ListMutation::RemoveIf, |items| {
            let len = items.len();
            items.retain(|item| !predicate(item));
            len - items.len()
        })
    }

    /// Maps every element through `f`.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn replace_all(&mut self, mut f: impl FnMut(&T) -> T) -> CoreResult<()> {
        self.mutate(ListMutation::ReplaceAll, |items| {
            for item in items.iter_mut() {
                *item = f(item);
            }
        })
    }

    /// Replaces every element equal to `from` with `to` and returns the
    /// number of replacements.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn replace(&mut self, from: &T, to: T) -> CoreResult<usize> {
        self.mutate(ListMutation::Replace, |items| {
            let mut replaced = 0;
            for item in items.iter_mut().filter(|item| **item == *from) {
                *item = to.clone();
                replaced += 1;
            }
            replaced
        })
    }

    /// Removes every element.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.mutate(ListMutation::Clear, Vec::clear)
    }

    /// Replaces the whole contents.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn assign(&mut self, items: Vec<T>) -> CoreResult<()> {
        self.mutate(ListMutation::Assign, |current| *current = items)
    }
}

impl<T: Clone + Ord> ObservableList<T> {
    /// Sorts the elements in ascending order.
    ///
    /// # Errors
    ///
    /// Returns the listener's error.
    pub fn sort(&mut self) -> CoreResult<()> {
        self.mutate(ListMutation::Sort, |items| items.sort())
    }
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones the contents; the listener is not cloned.
impl<T: Clone> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self::from_vec(self.items.clone())
    }
}

impl<T: PartialEq> PartialEq for ObservableList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for ObservableList<T> {}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &self.items)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl<T> From<Vec<T>> for ObservableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<'a, T> IntoIterator for &'a ObservableList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
