use std::collections::hash_set::{self, HashSet};
use std::hash::Hash;

/// An unordered set. Not synchronized.
#[derive(Debug, Clone)]
pub struct Set<T> {
    items: HashSet<T>,
}

impl<T: Eq + Hash> Set<T> {
    pub fn new() -> Self {
        Self {
            items: HashSet::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: HashSet::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, element: T) {
        self.items.insert(element);
    }

    pub fn add_slice(&mut self, elements: &[T])
    where
        T: Clone,
    {
        self.items.extend(elements.iter().cloned());
    }

    pub fn add_set(&mut self, other: &Set<T>)
    where
        T: Clone,
    {
        self.items.extend(other.items.iter().cloned());
    }

    pub fn remove(&mut self, element: &T) {
        self.items.remove(element);
    }

    pub fn remove_slice(&mut self, elements: &[T]) {
        for element in elements {
            self.items.remove(element);
        }
    }

    pub fn remove_set(&mut self, other: &Set<T>) {
        for element in &other.items {
            self.items.remove(element);
        }
    }

    pub fn contains(&self, element: &T) -> bool {
        self.items.contains(element)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Copies the elements out, in no particular order.
    pub fn elements(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Eq + Hash> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> PartialEq for Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq + Hash> Eq for Set<T> {}

impl<T: Eq + Hash> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: HashSet::from_iter(iter),
        }
    }
}

impl<T: Eq + Hash> Extend<T> for Set<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T> IntoIterator for Set<T> {
    type Item = T;
    type IntoIter = hash_set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Set<T> {
    type Item = &'a T;
    type IntoIter = hash_set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
