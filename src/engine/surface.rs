use std::collections::BTreeMap;

use crate::error::SurfaceError;

use super::Phase;
use super::render::{Element, Fragment};

pub const VISIBLE_CLASS: &str = "woo-notif-visible";
pub const HIDING_CLASS: &str = "woo-notif-hiding";

/// The page the engine draws on.
///
/// Implementations own the actual element tree; the engine only keeps the
/// opaque handle returned by [`Surface::attach`].
pub trait Surface {
    type Handle;

    /// Sets a custom property on the document root. Reapplying is harmless.
    fn set_root_property(&mut self, name: &str, value: &str) -> Result<(), SurfaceError>;

    fn attach(&mut self, fragment: &Fragment) -> Result<Self::Handle, SurfaceError>;

    fn set_phase(&mut self, handle: &Self::Handle, phase: Phase) -> Result<(), SurfaceError>;

    fn detach(&mut self, handle: Self::Handle) -> Result<(), SurfaceError>;
}

impl<S: Surface + ?Sized> Surface for &mut S {
    type Handle = S::Handle;

    fn set_root_property(&mut self, name: &str, value: &str) -> Result<(), SurfaceError> {
        (**self).set_root_property(name, value)
    }

    fn attach(&mut self, fragment: &Fragment) -> Result<Self::Handle, SurfaceError> {
        (**self).attach(fragment)
    }

    fn set_phase(&mut self, handle: &Self::Handle, phase: Phase) -> Result<(), SurfaceError> {
        (**self).set_phase(handle, phase)
    }

    fn detach(&mut self, handle: Self::Handle) -> Result<(), SurfaceError> {
        (**self).detach(handle)
    }
}

impl Phase {
    /// Classes added and removed on the notification root when the phase
    /// begins.
    pub const fn class_delta(self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            Self::Entering => (&[], &[]),
            Self::Visible => (&[VISIBLE_CLASS], &[]),
            Self::Leaving => (&[HIDING_CLASS], &[VISIBLE_CLASS]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// In-memory page: a root style map and a body holding attached elements.
#[derive(Debug, Default)]
pub struct Page {
    root_style: BTreeMap<String, String>,
    body: Vec<(NodeId, Element)>,
    next_node: u64,
    writes: usize,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_property(&self, name: &str) -> Option<&str> {
        self.root_style.get(name).map(String::as_str)
    }

    pub const fn root_style(&self) -> &BTreeMap<String, String> {
        &self.root_style
    }

    pub fn attached(&self) -> impl Iterator<Item = &Element> {
        self.body.iter().map(|(_, element)| element)
    }

    pub fn attached_count(&self) -> usize {
        self.body.len()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.body
            .iter()
            .find(|(node, _)| *node == id)
            .map(|(_, element)| element)
    }

    /// Number of mutating calls the page has served.
    pub const fn writes(&self) -> usize {
        self.writes
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, SurfaceError> {
        self.body
            .iter_mut()
            .find(|(node, _)| *node == id)
            .map(|(_, element)| element)
            .ok_or(SurfaceError::UnknownHandle(id.0))
    }
}

impl Surface for Page {
    type Handle = NodeId;

    fn set_root_property(&mut self, name: &str, value: &str) -> Result<(), SurfaceError> {
        self.writes += 1;
        self.root_style.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn attach(&mut self, fragment: &Fragment) -> Result<NodeId, SurfaceError> {
        self.writes += 1;
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.body.push((id, fragment.root.clone()));
        Ok(id)
    }

    fn set_phase(&mut self, handle: &NodeId, phase: Phase) -> Result<(), SurfaceError> {
        self.writes += 1;
        let element = self.element_mut(*handle)?;
        let (add, remove) = phase.class_delta();
        for class in remove {
            element.remove_class(class);
        }
        for class in add {
            element.add_class(class);
        }
        Ok(())
    }

    fn detach(&mut self, handle: NodeId) -> Result<(), SurfaceError> {
        self.writes += 1;
        let before = self.body.len();
        self.body.retain(|(node, _)| *node != handle);
        if self.body.len() == before {
            return Err(SurfaceError::UnknownHandle(handle.0));
        }
        Ok(())
    }
}
