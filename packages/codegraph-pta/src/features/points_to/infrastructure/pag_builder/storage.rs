//! Application storage API
//!
//! `AppStorage` keeps global named properties. Each property is one
//! context-free node; `link` / `prop` return a handle local linked to the
//! property, and `set` / `get` on a handle write or read through the link.

use super::PagBuilder;
use crate::errors::Result;
use crate::features::call_graph::{CallSite, FuncId};
use crate::features::ir::{InvokeKind, Type, Value};
use crate::features::points_to::domain::{ContextId, NodeId, PagEdgeKind, PagValue};
use crate::shared::constants::storage::{
    APP_STORAGE_CLASS, GET, LINK, PROP, SET, SET_OR_CREATE, SUBSCRIBED_PROPERTY_CLASS,
};
use tracing::trace;

/// Direction of flow between a property and a local
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageLinkEdge {
    PropertyToLocal,
    LocalToProperty,
    Both,
}

impl<'p> PagBuilder<'p> {
    /// Model a storage API call; true if `callee` belongs to application storage
    pub(super) fn process_storage(&mut self, cs: &CallSite, callee: FuncId, cid: ContextId) -> Result<bool> {
        let signature = self.cg.node(callee).signature.clone();
        let is_app_storage = match signature.class.as_str() {
            APP_STORAGE_CLASS => true,
            SUBSCRIBED_PROPERTY_CLASS => match cs.invoke.base() {
                Some(base) => {
                    let node = self.node_of(cid, Value::Local(base), cs.stmt)?;
                    self.pag.node(node).storage_link().is_some()
                }
                None => false,
            },
            _ => false,
        };
        if !is_app_storage {
            return Ok(false);
        }

        trace!(call_site = %cs.id, method = %signature.name, "storage call");
        match signature.name.as_str() {
            SET_OR_CREATE => self.storage_set_or_create(cs, cid)?,
            LINK => self.storage_link(cs, cid, StorageLinkEdge::Both)?,
            PROP => self.storage_link(cs, cid, StorageLinkEdge::PropertyToLocal)?,
            SET => self.storage_set(cs, cid)?,
            GET => self.storage_get(cs, cid)?,
            _ => {}
        }
        Ok(true)
    }

    /// Property name: a string-literal typed local or a constant
    fn property_name(&self, value: &Value) -> Option<String> {
        match value {
            Value::Local(l) => match &self.program.local(*l).ty {
                Type::String(Some(lit)) => Some(lit.clone()),
                _ => None,
            },
            Value::Constant(c) => Some(c.value.clone()),
            _ => None,
        }
    }

    fn property_value(name: String) -> PagValue {
        PagValue::StorageProperty {
            storage: APP_STORAGE_CLASS.to_string(),
            name,
        }
    }

    fn get_or_new_property_node(&mut self, name: String) -> Result<NodeId> {
        self.node_of(ContextId::DUMMY, Self::property_value(name), None)
    }

    /// `AppStorage.setOrCreate(name, obj)`
    fn storage_set_or_create(&mut self, cs: &CallSite, cid: ContextId) -> Result<()> {
        let (Some(name), Some(obj)) = (
            cs.invoke.args.first().and_then(|a| self.property_name(a)),
            cs.invoke.args.get(1),
        ) else {
            return Ok(());
        };
        if !matches!(self.program.value_type(obj), Type::Class(_)) {
            return Ok(());
        }
        let property = self.get_or_new_property_node(name)?;
        let obj = self.node_of(cid, obj.clone(), cs.stmt)?;
        self.add_property_link_edge(property, obj, StorageLinkEdge::LocalToProperty, cs);
        Ok(())
    }

    /// `h = AppStorage.link(name)` / `h = AppStorage.prop(name)`
    fn storage_link(&mut self, cs: &CallSite, cid: ContextId, edge: StorageLinkEdge) -> Result<()> {
        let (Some(name), Some(lhs)) = (
            cs.invoke.args.first().and_then(|a| self.property_name(a)),
            cs.result.clone(),
        ) else {
            return Ok(());
        };
        let property = self.get_or_new_property_node(name)?;
        let handle = self.node_of(cid, lhs, cs.stmt)?;
        self.pag.set_storage_link(handle, property);
        self.add_property_link_edge(property, handle, edge, cs);
        Ok(())
    }

    /// `h.set(v)` on a linked handle
    fn storage_set(&mut self, cs: &CallSite, cid: ContextId) -> Result<()> {
        let InvokeKind::Instance { base } = cs.invoke.kind else {
            return Ok(());
        };
        let handle = self.node_of(cid, Value::Local(base), cs.stmt)?;
        if self.pag.node(handle).storage_link().is_none() {
            return Ok(());
        }
        let Some(value) = cs.invoke.args.first().filter(|v| !v.is_constant()) else {
            return Ok(());
        };
        let src = self.node_of(cid, value.clone(), cs.stmt)?;
        self.pag.add_edge(src, handle, PagEdgeKind::Copy, cs.stmt);
        Ok(())
    }

    /// `v = AppStorage.get(name)` / `v = h.get()`
    fn storage_get(&mut self, cs: &CallSite, cid: ContextId) -> Result<()> {
        let Some(lhs) = cs.result.clone() else {
            return Ok(());
        };
        let name = match cs.invoke.kind {
            InvokeKind::Static => cs.invoke.args.first().and_then(|a| self.property_name(a)),
            InvokeKind::Instance { base } => {
                let handle = self.node_of(cid, Value::Local(base), cs.stmt)?;
                self.pag
                    .node(handle)
                    .storage_link()
                    .and_then(|p| match &self.pag.node(p).value {
                        PagValue::StorageProperty { name, .. } => Some(name.clone()),
                        _ => None,
                    })
            }
            InvokeKind::Ptr { .. } => None,
        };
        let Some(name) = name else {
            return Ok(());
        };
        // reads never create a property
        let Some(property) = self.pag.get_node(ContextId::DUMMY, &Self::property_value(name)) else {
            return Ok(());
        };
        let dst = self.node_of(cid, lhs, cs.stmt)?;
        self.pag.add_edge(property, dst, PagEdgeKind::Copy, cs.stmt);
        Ok(())
    }

    fn add_property_link_edge(&mut self, property: NodeId, local: NodeId, edge: StorageLinkEdge, cs: &CallSite) {
        if matches!(edge, StorageLinkEdge::LocalToProperty | StorageLinkEdge::Both) {
            self.pag.add_edge(local, property, PagEdgeKind::Copy, cs.stmt);
        }
        if matches!(edge, StorageLinkEdge::PropertyToLocal | StorageLinkEdge::Both) {
            self.pag.add_edge(property, local, PagEdgeKind::Copy, cs.stmt);
        }
    }
}
