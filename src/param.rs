//! Named scalar unknowns.
//!
//! A [`Param`] is a cheap-to-clone handle to a shared mutable scalar. The
//! solver, entities and constraints all hold handles to the same underlying
//! slot; equality and hashing go by handle identity, never by name, so two
//! parameters that happen to share a debug name stay distinct.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::expr::Expr;

struct Inner {
    name: Box<str>,
    value: Cell<f64>,
    reduceable: bool,
    changed: Cell<bool>,
}

/// A named scalar unknown solved for by the equation system.
#[derive(Clone)]
pub struct Param {
    inner: Rc<Inner>,
}

impl Param {
    /// Create a parameter with the given debug name and initial value.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self::with_reduceable(name, value, true)
    }

    /// Create a parameter that constant folding may not inline even when it
    /// no longer appears in any equation.
    pub fn with_reduceable(name: impl Into<String>, value: f64, reduceable: bool) -> Self {
        Param {
            inner: Rc::new(Inner {
                name: name.into().into_boxed_str(),
                value: Cell::new(value),
                reduceable,
                changed: Cell::new(false),
            }),
        }
    }

    /// The debug name. Not an identity; see [`Param::eq`].
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> f64 {
        self.inner.value.get()
    }

    /// Set the value, raising the change flag when it actually differs.
    pub fn set_value(&self, value: f64) {
        if value == self.inner.value.get() {
            return;
        }
        self.inner.changed.set(true);
        self.inner.value.set(value);
    }

    /// Whether `set_value` has received a different value since the flag was
    /// last cleared.
    #[inline]
    pub fn is_changed(&self) -> bool {
        self.inner.changed.get()
    }

    /// Clear the change flag. Clearing is caller policy; the solver never
    /// does it on its own.
    pub fn mark_unchanged(&self) {
        self.inner.changed.set(false);
    }

    /// Whether constant folding may inline this parameter once it drops out
    /// of every equation.
    #[inline]
    pub fn is_reduceable(&self) -> bool {
        self.inner.reduceable
    }

    /// A fresh expression node referring to this parameter.
    pub fn expr(&self) -> Expr {
        Expr::param_ref(self.clone())
    }
}

// Identity semantics: two handles are equal iff they refer to the same slot.
impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Param {}

impl Hash for Param {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.name(), self.value())
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
