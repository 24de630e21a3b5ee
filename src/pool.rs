use std::{borrow::Borrow, hash::Hash, sync::Arc};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::Atom;

/// Bidirectional interning pool: every distinct value gets a small id,
/// handed out in insertion order starting at 0.
#[derive(Debug, Clone)]
pub struct Pool<T, Id> {
    ids: HashMap<T, Id>,
    values: Vec<T>,
}

impl<T, Id> Pool<T, Id>
where
    T: Eq + Hash + Clone,
    Id: Copy + TryFrom<usize> + Into<u64>,
{
    pub fn new() -> Self {
        Pool {
            ids: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Interns `value`, returning its existing id if it was seen before.
    pub fn add_ref(&mut self, value: &T) -> Id {
        if let Some(&id) = self.ids.get(value) {
            return id;
        }

        let id = Id::try_from(self.values.len())
            .unwrap_or_else(|_| panic!("pool exhausted after {} entries", self.values.len()));
        self.values.push(value.clone());
        self.ids.insert(value.clone(), id);
        id
    }

    pub fn id_of<Q>(&self, value: &Q) -> Option<Id>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.ids.get(value).copied()
    }

    pub fn get(&self, id: Id) -> Option<&T> {
        let index: u64 = id.into();
        usize::try_from(index)
            .ok()
            .and_then(|i| self.values.get(i))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T, Id> Default for Pool<T, Id>
where
    T: Eq + Hash + Clone,
    Id: Copy + TryFrom<usize> + Into<u64>,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Symbol table shared between every machine running the same program.
/// Cloning the handle shares the underlying pool.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pool: Arc<RwLock<Pool<String, Atom>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `constant`, interning it if it is new.
    pub fn id_of(&self, constant: &str) -> Atom {
        if let Some(id) = self.lookup(constant) {
            return id;
        }
        self.pool.write().add_ref(&constant.to_string())
    }

    pub fn has_id(&self, constant: &str) -> bool {
        self.lookup(constant).is_some()
    }

    /// Id of `constant` without interning it.
    pub fn lookup(&self, constant: &str) -> Option<Atom> {
        self.pool.read().id_of(constant)
    }

    pub fn symbol_of(&self, id: Atom) -> Option<String> {
        self.pool.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.pool.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.read().is_empty()
    }
}
