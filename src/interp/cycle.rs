//! Arrays and objects are shared and mutable, so `a.push(a)` builds a cycle.
//! Rendering and structural equality walk values recursively; they register each
//! container they enter here and stop when they meet one already on the walk.

use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static OPEN: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

/// A container (or pair of containers) on the current walk. Leaves it on drop.
pub struct Visit((usize, usize));

impl Visit {
    /// Enter `container` for rendering. `None` if it is already being rendered.
    pub fn enter<T>(container: &Rc<T>) -> Option<Visit> {
        Self::open((Rc::as_ptr(container) as usize, 0))
    }

    /// Enter the pair `(a, b)` for comparison. `None` if that pair is already
    /// being compared further up.
    pub fn enter_pair<T>(a: &Rc<T>, b: &Rc<T>) -> Option<Visit> {
        Self::open((Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize))
    }

    fn open(key: (usize, usize)) -> Option<Visit> {
        OPEN.with(|open| {
            let mut open = open.borrow_mut();
            if open.contains(&key) {
                return None;
            }
            open.push(key);
            Some(Visit(key))
        })
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        OPEN.with(|open| {
            let mut open = open.borrow_mut();
            if let Some(i) = open.iter().rposition(|k| *k == self.0) {
                open.remove(i);
            }
        });
    }
}

/// What a container renders as when met again inside itself.
pub const CYCLE_MARKER: &str = "[...]";
