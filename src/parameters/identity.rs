//! Hierarchical identity of parameter-bearing objects
//!
//! Every category item and datablock owns an [`Identity`] node. A node may
//! set any of its three name slots (datablock entry, category code, category
//! entry) itself, either as a literal or as a closure deriving the name from
//! a live descriptor; unset slots are inherited from the parent node. Parents
//! are held weakly and resolution remembers which nodes it has visited, so a
//! cyclic ownership graph resolves to `None` instead of looping.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

/// Source of one name slot
#[derive(Clone)]
pub enum NameSource {
    /// Fixed text
    Literal(String),

    /// Computed on every lookup, e.g. from an atom-site label
    Derived(Rc<dyn Fn() -> Option<String>>),
}

impl NameSource {
    pub fn derived(f: impl Fn() -> Option<String> + 'static) -> Self {
        NameSource::Derived(Rc::new(f))
    }

    fn resolve(&self) -> Option<String> {
        let name = match self {
            NameSource::Literal(s) => Some(s.clone()),
            NameSource::Derived(f) => f(),
        };
        name.filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameSource::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            NameSource::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl From<&str> for NameSource {
    fn from(s: &str) -> Self {
        NameSource::Literal(s.to_string())
    }
}

impl From<String> for NameSource {
    fn from(s: String) -> Self {
        NameSource::Literal(s)
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    DatablockEntry,
    CategoryCode,
    CategoryEntry,
}

/// One node in the ownership chain
#[derive(Debug, Default)]
pub struct Identity {
    datablock_entry: RefCell<Option<NameSource>>,
    category_code: RefCell<Option<NameSource>>,
    category_entry: RefCell<Option<NameSource>>,
    parent: RefCell<Weak<Identity>>,
}

impl Identity {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Node for a datablock named `name`
    pub fn datablock(name: impl Into<NameSource>) -> Rc<Self> {
        let identity = Self::new();
        identity.set_datablock_entry(name);
        identity
    }

    /// Node for a category with the given code
    pub fn category(code: impl Into<NameSource>) -> Rc<Self> {
        let identity = Self::new();
        identity.set_category_code(code);
        identity
    }

    pub fn set_datablock_entry(&self, name: impl Into<NameSource>) {
        *self.datablock_entry.borrow_mut() = Some(name.into());
    }

    pub fn set_category_code(&self, code: impl Into<NameSource>) {
        *self.category_code.borrow_mut() = Some(code.into());
    }

    pub fn set_category_entry(&self, name: impl Into<NameSource>) {
        *self.category_entry.borrow_mut() = Some(name.into());
    }

    pub fn set_parent(&self, parent: &Rc<Identity>) {
        *self.parent.borrow_mut() = Rc::downgrade(parent);
    }

    pub fn clear_parent(&self) {
        *self.parent.borrow_mut() = Weak::new();
    }

    pub fn parent(&self) -> Option<Rc<Identity>> {
        self.parent.borrow().upgrade()
    }

    pub fn datablock_entry(&self) -> Option<String> {
        self.resolve(Slot::DatablockEntry, &mut HashSet::new())
    }

    pub fn category_code(&self) -> Option<String> {
        self.resolve(Slot::CategoryCode, &mut HashSet::new())
    }

    pub fn category_entry(&self) -> Option<String> {
        self.resolve(Slot::CategoryEntry, &mut HashSet::new())
    }

    /// Dot-joined path of the resolved slots followed by `leaf`
    ///
    /// Missing or empty slots are skipped, so a parameter of an unattached
    /// category resolves to just its category code and name.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffrefine::parameters::Identity;
    ///
    /// let model = Identity::datablock("lbco");
    /// let cell = Identity::category("cell");
    /// cell.set_parent(&model);
    /// assert_eq!(cell.unique_name("length_a"), "lbco.cell.length_a");
    /// ```
    pub fn unique_name(&self, leaf: &str) -> String {
        [
            self.datablock_entry(),
            self.category_code(),
            self.category_entry(),
            Some(leaf.to_string()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
    }

    fn slot(&self, slot: Slot) -> &RefCell<Option<NameSource>> {
        match slot {
            Slot::DatablockEntry => &self.datablock_entry,
            Slot::CategoryCode => &self.category_code,
            Slot::CategoryEntry => &self.category_entry,
        }
    }

    fn resolve(&self, slot: Slot, visited: &mut HashSet<*const Identity>) -> Option<String> {
        if !visited.insert(self as *const Identity) {
            return None;
        }

        let own = self.slot(slot).borrow().clone();
        if let Some(name) = own.as_ref().and_then(NameSource::resolve) {
            return Some(name);
        }

        let parent = self.parent()?;
        parent.resolve(slot, visited)
    }
}
