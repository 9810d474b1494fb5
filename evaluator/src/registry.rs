//! Name-to-callable / name-to-template maps. A `Template` owns one of each;
//! the `globals` registries are an optional shared fallback a host sets up
//! once and hands to many templates (the "process-wide default" of
//! SPEC_FULL.md §2 item 5) -- the registry's own lookup/registration rules
//! beyond plain name equality are an external collaborator, out of scope.

use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Callable;
use crate::Template;

#[derive(Default, Clone)]
pub struct HelperRegistry {
  entries: HashMap<String, Rc<dyn Callable>>,
}

impl HelperRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, name: impl Into<String>, helper: impl Callable + 'static) {
    self.entries.insert(name.into(), Rc::new(helper));
  }

  pub fn register_rc(&mut self, name: impl Into<String>, helper: Rc<dyn Callable>) {
    self.entries.insert(name.into(), helper);
  }

  pub fn get(&self, name: &str) -> Option<Rc<dyn Callable>> {
    self.entries.get(name).cloned()
  }
}

#[derive(Default, Clone)]
pub struct PartialRegistry {
  entries: HashMap<String, Rc<Template>>,
}

impl PartialRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, name: impl Into<String>, partial: Template) {
    self.entries.insert(name.into(), Rc::new(partial));
  }

  pub fn get(&self, name: &str) -> Option<Rc<Template>> {
    self.entries.get(name).cloned()
  }
}
