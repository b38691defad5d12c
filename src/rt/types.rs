//! Defined types: field layout, static storage, methods and call sites

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use super::callsite::{CallSiteTable, SiteId};
use super::value::{StaticStorage, Value};
use crate::classfile::descriptor::{FieldType, MethodDescriptor};
use crate::classfile::ClassFile;
use crate::code::{CodeAttribute, Instruction};
use crate::error::{Error, Result};

pub type TypeHandle = Arc<RuntimeType>;

/// A field and its slot in instance or static storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    pub name: String,
    pub field_type: FieldType,
    pub slot: usize,
}

pub struct RuntimeMethod {
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub is_static: bool,
    pub code: Option<CodeAttribute>,
}

impl RuntimeMethod {
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

pub struct RuntimeType {
    name: String,
    super_type: Option<TypeHandle>,
    class: ClassFile,
    instance_fields: Vec<FieldSlot>,
    static_fields: Vec<FieldSlot>,
    statics: StaticStorage,
    methods: Vec<RuntimeMethod>,
    method_index: HashMap<(String, String), usize>,
    call_sites: CallSiteTable,
}

impl RuntimeType {
    /// Build a type from a decoded class. `super_type` must already be defined,
    /// or be `None` for types whose superclass is outside the runtime.
    pub(crate) fn new(class: ClassFile, super_type: Option<TypeHandle>) -> Result<Self> {
        let name = class.name()?;
        let pool = &class.constant_pool;

        let mut instance_fields: Vec<FieldSlot> =
            super_type.as_ref().map(|s| s.instance_fields.clone()).unwrap_or_default();
        let mut static_fields = Vec::new();
        for field in &class.fields {
            let target = if field.is_static() { &mut static_fields } else { &mut instance_fields };
            let slot = target.len();
            target.push(FieldSlot { name: field.name(pool)?, field_type: field.field_type(pool)?, slot });
        }
        let statics = static_fields.iter().map(|f| Value::default_for(&f.field_type)).collect();

        let mut methods = Vec::with_capacity(class.methods.len());
        let mut method_index = HashMap::new();
        let mut sites = Vec::new();
        for (index, method) in class.methods.iter().enumerate() {
            let runtime_method = RuntimeMethod {
                name: method.name(pool)?,
                descriptor: method.descriptor(pool)?,
                is_static: method.is_static(),
                code: method.code().cloned(),
            };
            if let Some(code) = &runtime_method.code {
                sites.extend(
                    code.instructions
                        .iter()
                        .enumerate()
                        .filter(|(_, insn)| matches!(insn, Instruction::IndirectCall { .. }))
                        .map(|(instruction, _)| SiteId { method: index, instruction }),
                );
            }
            method_index.insert((runtime_method.name.clone(), runtime_method.descriptor.descriptor()), index);
            methods.push(runtime_method);
        }

        debug!(
            "laid out {}: {} instance fields, {} static fields, {} call sites",
            name,
            instance_fields.len(),
            static_fields.len(),
            sites.len()
        );
        Ok(Self {
            name,
            super_type,
            class,
            instance_fields,
            static_fields,
            statics: Arc::new(RwLock::new(statics)),
            methods,
            method_index,
            call_sites: CallSiteTable::new(sites),
        })
    }

    /// Internal name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_type(&self) -> Option<&TypeHandle> {
        self.super_type.as_ref()
    }

    pub fn class_file(&self) -> &ClassFile {
        &self.class
    }

    /// Instance layout, inherited fields first
    pub fn instance_fields(&self) -> &[FieldSlot] {
        &self.instance_fields
    }

    pub fn static_fields(&self) -> &[FieldSlot] {
        &self.static_fields
    }

    pub(crate) fn statics(&self) -> &StaticStorage {
        &self.statics
    }

    pub fn call_sites(&self) -> &CallSiteTable {
        &self.call_sites
    }

    pub fn methods(&self) -> &[RuntimeMethod] {
        &self.methods
    }

    pub(crate) fn method_at(&self, index: usize) -> Result<&RuntimeMethod> {
        self.methods
            .get(index)
            .ok_or_else(|| Error::execution(format!("{} has no method #{}", self.name, index)))
    }

    /// Instance field by name, searching the most derived declaration first
    pub fn instance_field(&self, name: &str) -> Option<&FieldSlot> {
        self.instance_fields.iter().rev().find(|f| f.name == name)
    }

    /// Static field declared on this type or inherited from a supertype,
    /// together with the type that owns the storage
    pub fn static_field(self: &Arc<Self>, name: &str) -> Option<(TypeHandle, FieldSlot)> {
        let mut current = Some(self.clone());
        while let Some(ty) = current {
            if let Some(field) = ty.static_fields.iter().find(|f| f.name == name) {
                let field = field.clone();
                return Some((ty, field));
            }
            current = ty.super_type.clone();
        }
        None
    }

    pub fn is_subtype_of(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty.name == name {
                return true;
            }
            current = ty.super_type.as_deref();
        }
        false
    }

    /// Find a method declared here or on a supertype
    pub fn find_method(self: &Arc<Self>, name: &str, descriptor: &str) -> Option<(TypeHandle, usize)> {
        let mut current = Some(self.clone());
        while let Some(ty) = current {
            if let Some(&index) = ty.method_index.get(&(name.to_string(), descriptor.to_string())) {
                return Some((ty, index));
            }
            current = ty.super_type.clone();
        }
        None
    }

    pub fn get_static(&self, name: &str) -> Option<Value> {
        let field = self.static_fields.iter().find(|f| f.name == name)?;
        self.statics.read().get(field.slot).cloned()
    }
}

impl fmt::Debug for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeType")
            .field("name", &self.name)
            .field("super", &self.super_type.as_ref().map(|s| s.name.clone()))
            .field("instance_fields", &self.instance_fields)
            .field("static_fields", &self.static_fields)
            .field("methods", &self.methods.iter().map(RuntimeMethod::signature).collect::<Vec<_>>())
            .finish()
    }
}
