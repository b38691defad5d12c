//! Accessor bootstrap: links one call site to a field

use log::debug;

use super::accessor::Accessor;
use super::directory::TypeDirectory;
use crate::classfile::descriptor::MethodDescriptor;
use crate::code::BootstrapKind;
use crate::error::ResolveError;

/// Resolve the accessor for a call site.
///
/// `owner_type_name` may be dotted or internal. Whether the site addresses a
/// static or an instance field follows from the signature's shape: getters
/// take the receiver as their only parameter, setters take it before the value.
pub fn resolve(
    directory: &dyn TypeDirectory,
    kind: BootstrapKind,
    site_signature: &MethodDescriptor,
    owner_type_name: &str,
    field_name: &str,
) -> Result<Accessor, ResolveError> {
    let owner = owner_type_name.replace('.', "/");
    let handle = directory
        .find_type(&owner)
        .ok_or_else(|| ResolveError::type_not_found(owner_type_name))?;

    let linkage = || ResolveError::Linkage {
        expected: site_signature.to_string(),
        actual: format!("{} of {}.{}", kind, owner, field_name),
    };
    let (is_static, value_type) = match (kind, site_signature.params.as_slice(), &site_signature.ret) {
        (BootstrapKind::Getter, [], Some(ret)) => (true, ret),
        (BootstrapKind::Getter, [_], Some(ret)) => (false, ret),
        (BootstrapKind::Setter, [value], None) => (true, value),
        (BootstrapKind::Setter, [_, value], None) => (false, value),
        _ => return Err(linkage()),
    };
    let missing = || ResolveError::member_not_found(owner_type_name, field_name, value_type.descriptor());

    let accessor = if is_static {
        let (storage_owner, field) = handle.static_field(field_name).ok_or_else(missing)?;
        if field.field_type != *value_type {
            return Err(missing());
        }
        let storage = storage_owner.statics().clone();
        match kind {
            BootstrapKind::Getter => Accessor::StaticGetter { owner: owner.clone(), field, storage },
            BootstrapKind::Setter => Accessor::StaticSetter { owner: owner.clone(), field, storage },
        }
    } else {
        let field = handle.instance_field(field_name).ok_or_else(missing)?.clone();
        if field.field_type != *value_type {
            return Err(missing());
        }
        match kind {
            BootstrapKind::Getter => Accessor::InstanceGetter { owner: owner.clone(), field },
            BootstrapKind::Setter => Accessor::InstanceSetter { owner: owner.clone(), field },
        }
    };

    if accessor.signature() != *site_signature {
        return Err(ResolveError::Linkage {
            expected: site_signature.to_string(),
            actual: accessor.signature().to_string(),
        });
    }
    debug!("resolved {} {}.{} as {:?}", kind, owner_type_name, field_name, accessor);
    Ok(accessor)
}

