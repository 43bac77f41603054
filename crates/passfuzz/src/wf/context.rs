//! Thread-local well-formedness context.
//!
//! While a stage is fuzzed, its input and output schemas are installed here so
//! that tag-to-schema lookups (such as [`Node::field`](crate::Node::field))
//! resolve against that stage. Schemas are only ever installed through a
//! [`WfScope`] guard, which removes them again when dropped.

use std::cell::RefCell;
use std::marker::PhantomData;

use super::SchemaRef;
use crate::ast::Token;

thread_local! {
    static WF_CONTEXT: RefCell<Vec<SchemaRef>> = const { RefCell::new(Vec::new()) };
}

/// Guard keeping a set of schemas installed in this thread's context.
///
/// Guards nest; each one removes exactly the schemas it installed.
#[must_use = "the schemas are uninstalled as soon as the scope is dropped"]
pub struct WfScope {
    installed: usize,
    // The context is per thread, so the guard must not leave it.
    _not_send: PhantomData<*const ()>,
}

impl WfScope {
    /// Install `schemas`, later ones taking precedence in lookups.
    pub fn enter(schemas: impl IntoIterator<Item = SchemaRef>) -> Self {
        let installed = WF_CONTEXT.with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            let before = ctx.len();
            ctx.extend(schemas);
            ctx.len() - before
        });
        Self {
            installed,
            _not_send: PhantomData,
        }
    }
}

impl Drop for WfScope {
    fn drop(&mut self) {
        let installed = self.installed;
        // The thread may already be tearing down its locals.
        let _ = WF_CONTEXT.try_with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            let keep = ctx.len().saturating_sub(installed);
            ctx.truncate(keep);
        });
    }
}

/// Number of schemas currently installed on this thread.
pub fn depth() -> usize {
    WF_CONTEXT.with(|ctx| ctx.borrow().len())
}

/// Resolve a field index against the installed schemas, most recent first.
pub fn field_index(parent: Token, field: Token) -> Option<usize> {
    WF_CONTEXT.with(|ctx| {
        ctx.borrow()
            .iter()
            .rev()
            .find_map(|wf| wf.field_index(parent, field))
    })
}

/// The schemas currently installed, oldest first.
pub fn installed() -> Vec<SchemaRef> {
    WF_CONTEXT.with(|ctx| ctx.borrow().clone())
}
