//! Lifecycle callbacks.
//!
//! Hooks are registered per entity type on the [`EntityBuilder`](crate::EntityBuilder)
//! and run by [`Record::save`] and [`Record::destroy`]. A hook returning an
//! error aborts the operation at that point; nothing already written is
//! rolled back.

use crate::record::Record;
use sqlrecord_core::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Points in the persistence lifecycle where a hook can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    BeforeSave,
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    AfterSave,
    BeforeDestroy,
    AfterDestroy,
}

impl LifecycleEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::BeforeSave => "before_save",
            LifecycleEvent::BeforeCreate => "before_create",
            LifecycleEvent::AfterCreate => "after_create",
            LifecycleEvent::BeforeUpdate => "before_update",
            LifecycleEvent::AfterUpdate => "after_update",
            LifecycleEvent::AfterSave => "after_save",
            LifecycleEvent::BeforeDestroy => "before_destroy",
            LifecycleEvent::AfterDestroy => "after_destroy",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle callback.
pub type Hook = Arc<dyn Fn(&mut Record) -> Result<()> + Send + Sync>;

/// The optional callback set of one entity type.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    hooks: HashMap<LifecycleEvent, Hook>,
}

impl Hooks {
    pub(crate) fn insert(&mut self, event: LifecycleEvent, hook: Hook) {
        self.hooks.insert(event, hook);
    }

    pub(crate) fn get(&self, event: LifecycleEvent) -> Option<Hook> {
        self.hooks.get(&event).cloned()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<&str> = self.hooks.keys().map(|e| e.as_str()).collect();
        events.sort_unstable();
        f.debug_list().entries(events).finish()
    }
}

impl Record {
    /// Run the hook registered for `event`, if any.
    pub(crate) fn run_hook(&mut self, event: LifecycleEvent) -> Result<()> {
        let Some(hook) = self.entity().hook(event) else {
            return Ok(());
        };
        tracing::trace!(entity = self.entity().name(), event = %event, "Running hook");
        hook(self)
    }
}
