//! Call-site construction and installation into a class's constant pool

use super::classify::{AccessKind, FieldAccessInfo};
use crate::classfile::defs::reference_kind::REF_INVOKE_STATIC;
use crate::classfile::descriptor::{FieldType, MethodDescriptor};
use crate::classfile::{BootstrapMethod, ClassFile};
use crate::code::{BootstrapKind, IndirectCall};
use crate::consts::{BOOTSTRAP_DESCRIPTOR, GETTER_PREFIX, SETTER_PREFIX};
use crate::error::Result;

/// Build the indirect call replacing one field access.
///
/// Reads of `T` on `X` become `(X)T`, writes `(X, T)V`; static accesses drop
/// the receiver parameter.
pub fn build(info: &FieldAccessInfo, bootstrap_owner: &str) -> IndirectCall {
    let receiver = (!info.is_static).then(|| FieldType::object(info.owner_internal_name()));
    let (callee_name, signature, kind) = match info.kind {
        AccessKind::Read => (
            format!("{}{}", GETTER_PREFIX, info.field_name),
            MethodDescriptor::new(receiver.into_iter().collect(), Some(info.value_type.clone())),
            BootstrapKind::Getter,
        ),
        AccessKind::Write => {
            let mut params: Vec<FieldType> = receiver.into_iter().collect();
            params.push(info.value_type.clone());
            (format!("{}{}", SETTER_PREFIX, info.field_name), MethodDescriptor::new(params, None), BootstrapKind::Setter)
        }
    };
    IndirectCall {
        callee_name,
        signature,
        owner_type_name: info.owner_type_name.clone(),
        field_name: info.field_name.clone(),
        kind,
        bootstrap_owner: bootstrap_owner.replace('.', "/"),
    }
}

/// Add the constants and bootstrap entry `call` needs and return its
/// `CONSTANT_InvokeDynamic` index. Repeated calls for an identical site reuse
/// every entry.
pub fn install(class: &mut ClassFile, call: &IndirectCall) -> Result<u16> {
    let pool = &mut class.constant_pool;
    let method = pool.add_method_ref(&call.bootstrap_owner, call.kind.entry_point(), BOOTSTRAP_DESCRIPTOR)?;
    let handle = pool.add_method_handle(REF_INVOKE_STATIC, method)?;
    let owner = pool.add_string(&call.owner_type_name)?;
    let field = pool.add_string(&call.field_name)?;
    let bootstrap = class.add_bootstrap_method(BootstrapMethod { method_ref: handle, arguments: vec![owner, field] })?;
    class
        .constant_pool
        .add_invoke_dynamic(bootstrap, &call.callee_name, &call.signature.descriptor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::DEFAULT_BOOTSTRAP_OWNER;

    fn info(kind: AccessKind, is_static: bool) -> FieldAccessInfo {
        FieldAccessInfo {
            kind,
            owner_type_name: "p.Counter".into(),
            field_name: "count".into(),
            value_type: FieldType::Int,
            is_static,
        }
    }

    #[test]
    fn test_signatures() {
        let cases = [
            (AccessKind::Read, false, "getter$$count", "(Lp/Counter;)I"),
            (AccessKind::Read, true, "getter$$count", "()I"),
            (AccessKind::Write, false, "setter$$count", "(Lp/Counter;I)V"),
            (AccessKind::Write, true, "setter$$count", "(I)V"),
        ];
        for (kind, is_static, name, descriptor) in cases {
            let call = build(&info(kind, is_static), DEFAULT_BOOTSTRAP_OWNER);
            assert_eq!(call.callee_name, name);
            assert_eq!(call.signature.descriptor(), descriptor);
            assert_eq!(call.bound_args(), ["p.Counter", "count"]);
        }
    }

    #[test]
    fn test_install_reuses_entries() {
        let mut class = ClassFile::new();
        let call = build(&info(AccessKind::Read, false), DEFAULT_BOOTSTRAP_OWNER);
        let first = install(&mut class, &call).unwrap();
        let pool_len = class.constant_pool.len();
        assert_eq!(install(&mut class, &call).unwrap(), first);
        assert_eq!(class.constant_pool.len(), pool_len);
        assert_eq!(class.bootstrap_methods().len(), 1);

        let setter = build(&info(AccessKind::Write, false), DEFAULT_BOOTSTRAP_OWNER);
        install(&mut class, &setter).unwrap();
        assert_eq!(class.bootstrap_methods().len(), 2);

        let indy = class.constant_pool.invoke_dynamic(first).unwrap();
        assert_eq!(indy.name, "getter$$count");
        assert_eq!(indy.descriptor, "(Lp/Counter;)I");
        let entry = &class.bootstrap_methods()[indy.bootstrap_index as usize];
        let strings: Vec<String> = entry.arguments.iter().map(|a| class.constant_pool.string(*a).unwrap()).collect();
        assert_eq!(strings, vec!["p.Counter", "count"]);
        let (kind, target) = class.constant_pool.method_handle(entry.method_ref).unwrap();
        assert_eq!(kind, REF_INVOKE_STATIC);
        let target = class.constant_pool.method_ref(target).unwrap();
        assert_eq!(target.owner, DEFAULT_BOOTSTRAP_OWNER);
        assert_eq!(target.name, "getterMetafactory");
        assert_eq!(target.descriptor, BOOTSTRAP_DESCRIPTOR);
    }
}
