mod common;

use common::*;
use fieldlink::classfile::defs::access_flags::{ACC_PUBLIC, ACC_STATIC};
use fieldlink::classfile::defs::major_versions;
use fieldlink::classfile::opcodes::*;
use fieldlink::classfile::{ClassFile, Constant, FieldType};
use fieldlink::classfile::defs::attribute_names;
use fieldlink::code::annotations::target_types;
use fieldlink::code::{
    BootstrapKind, CodeAttr, CodeAttrInfo, CodeAttribute, ExceptionHandler, FieldInsn, FrameKind, Instruction, Label, LineNumber,
    LocalRange, LocalVariable, StackMapFrame, TypeAnnotation, TypeTarget, VerificationType,
};
use fieldlink::{Config, Error, Rewriter};

fn instructions(class: &ClassFile, name: &str, descriptor: &str) -> Vec<Instruction> {
    class.method(name, descriptor).unwrap().code().unwrap().instructions.clone()
}

fn code<'a>(class: &'a ClassFile, name: &str, descriptor: &str) -> &'a CodeAttribute {
    class.method(name, descriptor).unwrap().code().unwrap()
}

/// `p/Loop`, no stack map frames
///
/// ```text
/// static int limit;
/// static int sum(int n) { int s = 0; for (int i = 0; i < n; i++) s += limit; return s; }
/// ```
fn loop_class() -> ClassBuilder {
    ClassBuilder::new("p/Loop")
        .field(ACC_STATIC, "limit", "I")
        .method(ACC_PUBLIC | ACC_STATIC, "sum", "(I)I", 2, 3, |pool| {
            vec![
                op(ICONST_0),
                op(ISTORE_0 + 1),
                op(ICONST_0),
                op(ISTORE_0 + 2),
                op(ILOAD_0 + 2),
                op(ILOAD_0),
                branch(IF_ICMPGE, 14),
                op(ILOAD_0 + 1),
                getstatic(pool, "p/Loop", "limit", "I"),
                op(IADD),
                op(ISTORE_0 + 1),
                Instruction::Other { opcode: IINC, operands: vec![2, 1] },
                branch(GOTO, 4),
                op(NOP),
                op(ILOAD_0 + 1),
                op(IRETURN),
            ]
        })
}

fn attr(pool: &mut fieldlink::classfile::ConstantPool, name: &str, info: CodeAttrInfo) -> CodeAttr {
    CodeAttr { name_index: pool.add_utf8(name).unwrap(), info }
}

/// `p/Guard`, version 50 with frames, debug tables and type annotations
///
/// ```text
/// int value;
/// static int read(Guard g) {
///     try { int v = g.value; if (v > 0) return v; return -1; }
///     catch (RuntimeException e) { return -1; }
/// }
/// static boolean label(Guard g, Object o) { int unused = g.value; return o instanceof @T String; }
/// ```
fn guard_class() -> ClassBuilder {
    ClassBuilder::new("p/Guard")
        .version(major_versions::JAVA_6_0)
        .field(0, "value", "I")
        .method_with_code(ACC_STATIC, "read", "(Lp/Guard;)I", |pool| {
            let guard = pool.add_class("p/Guard").unwrap();
            let failure = pool.add_class("java/lang/RuntimeException").unwrap();
            let (g, v) = (pool.add_utf8("g").unwrap(), pool.add_utf8("v").unwrap());
            let (guard_descriptor, int_descriptor) = (pool.add_utf8("Lp/Guard;").unwrap(), pool.add_utf8("I").unwrap());
            let annotation_type = pool.add_utf8("Lp/T;").unwrap();
            let mut code = CodeAttribute::new(
                2,
                2,
                vec![
                    op(ALOAD_0),
                    getfield(pool, "p/Guard", "value", "I"),
                    op(ISTORE_0 + 1),
                    op(ILOAD_0 + 1),
                    branch(IFLE, 7),
                    op(ILOAD_0 + 1),
                    op(IRETURN),
                    op(ICONST_M1),
                    op(IRETURN),
                    op(ASTORE_0 + 1),
                    op(ICONST_M1),
                    op(IRETURN),
                ],
            );
            code.exception_table.push(ExceptionHandler {
                start: Label(0),
                end: Label(7),
                handler: Label(9),
                catch_type: failure,
            });
            code.attributes = vec![
                attr(
                    pool,
                    attribute_names::LINE_NUMBER_TABLE,
                    CodeAttrInfo::LineNumberTable(
                        [(0, 10), (5, 11), (7, 12), (9, 13)]
                            .into_iter()
                            .map(|(start, line)| LineNumber { start: Label(start), line })
                            .collect(),
                    ),
                ),
                attr(
                    pool,
                    attribute_names::LOCAL_VARIABLE_TABLE,
                    CodeAttrInfo::LocalVariableTable(vec![
                        LocalVariable {
                            start: Label(0),
                            end: Label(12),
                            name_index: g,
                            descriptor_index: guard_descriptor,
                            index: 0,
                        },
                        LocalVariable {
                            start: Label(3),
                            end: Label(9),
                            name_index: v,
                            descriptor_index: int_descriptor,
                            index: 1,
                        },
                    ]),
                ),
                attr(
                    pool,
                    attribute_names::STACK_MAP_TABLE,
                    CodeAttrInfo::StackMapTable(vec![
                        StackMapFrame {
                            target: Label(7),
                            kind: FrameKind::Append(vec![VerificationType::Integer]),
                        },
                        StackMapFrame {
                            target: Label(9),
                            kind: FrameKind::Full {
                                locals: vec![VerificationType::Object(guard)],
                                stack: vec![VerificationType::Object(failure)],
                            },
                        },
                    ]),
                ),
                attr(
                    pool,
                    attribute_names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS,
                    CodeAttrInfo::TypeAnnotations(vec![
                        TypeAnnotation {
                            target: TypeTarget::LocalVariable {
                                target_type: target_types::LOCAL_VARIABLE,
                                ranges: vec![LocalRange { start: Label(3), end: Label(9), index: 1 }],
                            },
                            rest: annotation_body(annotation_type),
                        },
                        TypeAnnotation {
                            target: TypeTarget::Catch { exception_table_index: 0 },
                            rest: annotation_body(annotation_type),
                        },
                    ]),
                ),
            ];
            code
        })
        .method_with_code(ACC_STATIC, "label", "(Lp/Guard;Ljava/lang/Object;)Z", |pool| {
            let string = pool.add_class("java/lang/String").unwrap();
            let annotation_type = pool.add_utf8("Lp/T;").unwrap();
            let mut code = CodeAttribute::new(
                1,
                3,
                vec![
                    op(ALOAD_0),
                    getfield(pool, "p/Guard", "value", "I"),
                    op(ISTORE_0 + 2),
                    op(ALOAD_0 + 1),
                    Instruction::Other { opcode: INSTANCEOF, operands: string.to_be_bytes().to_vec() },
                    op(IRETURN),
                ],
            );
            code.attributes.push(attr(
                pool,
                attribute_names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS,
                CodeAttrInfo::TypeAnnotations(vec![TypeAnnotation {
                    target: TypeTarget::Offset { target_type: target_types::INSTANCEOF, at: Label(4) },
                    rest: annotation_body(annotation_type),
                }]),
            ));
            code
        })
}

/// Empty type path, annotation type, no element values
fn annotation_body(type_index: u16) -> Vec<u8> {
    let mut body = vec![0];
    body.extend_from_slice(&type_index.to_be_bytes());
    body.extend_from_slice(&[0, 0]);
    body
}

#[test]
fn rewrite_without_field_access_returns_input() {
    init_logging();
    let bytes = plain_class().bytes();
    let (output, report) = Rewriter::default().rewrite_with_report(&bytes).unwrap();
    assert_eq!(output, bytes);
    assert!(report.is_unchanged());
    assert_eq!(report.methods_visited, 2);
    // no version bump without call sites
    assert_eq!(ClassFile::decode(&output).unwrap().major_version, major_versions::JAVA_5_0);
}

#[test]
fn every_field_instruction_becomes_an_accessor_call() {
    init_logging();
    let bytes = counter_class().bytes();
    let (output, report) = Rewriter::default().rewrite_with_report(&bytes).unwrap();
    assert_eq!(report.reads_replaced, 3);
    assert_eq!(report.writes_replaced, 3);
    assert_eq!(report.methods_rewritten, 4);

    let class = ClassFile::decode(&output).unwrap();
    for method in &class.methods {
        let code = method.code().unwrap();
        assert_eq!(code.field_access_count(), 0);
    }

    let increment = instructions(&class, "increment", "()V");
    assert_eq!(increment.len(), 7);
    assert_eq!(increment[0], op(ALOAD_0));
    assert_eq!(increment[1], op(DUP));
    match (&increment[2], &increment[5]) {
        (Instruction::IndirectCall { call: read, .. }, Instruction::IndirectCall { call: write, .. }) => {
            assert_eq!(read.callee_name, "getter$$count");
            assert_eq!(read.signature.descriptor(), "(Lp/Counter;)I");
            assert_eq!(read.kind, BootstrapKind::Getter);
            assert_eq!(read.bound_args(), ["p.Counter", "count"]);
            assert_eq!(write.callee_name, "setter$$count");
            assert_eq!(write.signature.descriptor(), "(Lp/Counter;I)V");
            assert_eq!(write.kind, BootstrapKind::Setter);
        }
        other => panic!("expected accessor calls, got {:?}", other),
    }

    let bump = instructions(&class, "bump", "(J)V");
    let signatures: Vec<String> = bump
        .iter()
        .filter_map(|insn| match insn {
            Instruction::IndirectCall { call, .. } => Some(format!("{}{}", call.callee_name, call.signature)),
            _ => None,
        })
        .collect();
    assert_eq!(signatures, ["getter$$total()J", "setter$$total(J)V"]);

    // one bootstrap entry per (kind, owner, field)
    assert_eq!(class.bootstrap_methods().len(), 4);
}

#[test]
fn rewritten_class_round_trips() {
    let output = fieldlink::rewrite(&counter_class().bytes()).unwrap();
    let class = ClassFile::decode(&output).unwrap();
    assert_eq!(class.encode().unwrap(), output);
    // a second pass finds nothing left to rewrite
    assert_eq!(fieldlink::rewrite(&output).unwrap(), output);
}

#[test]
fn old_class_version_is_raised() {
    // straight-line bodies need no stack map frames at version 51
    let bytes = counter_class().version(major_versions::JAVA_6_0).bytes();
    let (output, report) = Rewriter::default().rewrite_with_report(&bytes).unwrap();
    assert!(report.version_raised);
    let class = ClassFile::decode(&output).unwrap();
    assert_eq!(class.major_version, major_versions::JAVA_7);
    assert_eq!(class.minor_version, 0);

    let (output, report) = Rewriter::default().rewrite_with_report(&counter_class().bytes()).unwrap();
    assert!(!report.version_raised);
    assert_eq!(ClassFile::decode(&output).unwrap().major_version, major_versions::JAVA_8);
}

#[test]
fn static_fields_can_be_left_alone() {
    let config = Config::default().with_rewrite_static(false);
    let (output, report) = Rewriter::new(config).rewrite_with_report(&counter_class().bytes()).unwrap();
    assert_eq!(report.reads_replaced, 2);
    assert_eq!(report.writes_replaced, 1);

    let class = ClassFile::decode(&output).unwrap();
    let bump = instructions(&class, "bump", "(J)V");
    assert!(matches!(&bump[0], Instruction::FieldRead(f) if f.is_static && f.name == "total"));
    assert!(matches!(&bump[3], Instruction::FieldWrite(f) if f.is_static && f.name == "total"));
    assert_eq!(class.bootstrap_methods().len(), 2);
}

#[test]
fn custom_bootstrap_owner_is_used() {
    let config = Config::default().with_bootstrap_owner("org.example.Links");
    let output = fieldlink::rewrite_with_config(&counter_class().bytes(), &config).unwrap();
    let class = ClassFile::decode(&output).unwrap();
    let get = instructions(&class, "get", "()I");
    match &get[1] {
        Instruction::IndirectCall { call, .. } => assert_eq!(call.bootstrap_owner, "org/example/Links"),
        other => panic!("expected accessor call, got {}", other),
    }
}

#[test]
fn branches_survive_the_rewrite() {
    let bytes = loop_class().bytes();
    let output = fieldlink::rewrite(&bytes).unwrap();
    let class = ClassFile::decode(&output).unwrap();
    let after = code(&class, "sum", "(I)I");
    assert_eq!(after.instructions[6], branch(IF_ICMPGE, 14));
    assert_eq!(after.instructions[12], branch(GOTO, 4));
    assert!(after.instructions[8].is_indirect_call());
    // getstatic (3 bytes) grew to invokedynamic (5 bytes)
    let before = ClassFile::decode(&bytes).unwrap();
    let old = code(&before, "sum", "(I)I").offsets().unwrap();
    let new = after.offsets().unwrap();
    assert_eq!(new[14] - old[14], 2);
}

#[test]
fn offset_tables_follow_their_instructions() {
    init_logging();
    let bytes = guard_class().bytes();
    let (output, report) = Rewriter::default().rewrite_with_report(&bytes).unwrap();
    assert_eq!(report.reads_replaced, 2);
    // the branching method already carries frames
    assert!(report.version_raised);

    let before = ClassFile::decode(&bytes).unwrap();
    let after = ClassFile::decode(&output).unwrap();
    for (name, descriptor) in [("read", "(Lp/Guard;)I"), ("label", "(Lp/Guard;Ljava/lang/Object;)Z")] {
        let old = code(&before, name, descriptor);
        let new = code(&after, name, descriptor);
        assert!(new.instructions[1].is_indirect_call());
        assert_eq!(new.exception_table, old.exception_table, "{}", name);
        assert_eq!(new.attributes, old.attributes, "{}", name);

        let (old_pcs, new_pcs) = (old.offsets().unwrap(), new.offsets().unwrap());
        for index in 2..old_pcs.len() {
            assert_eq!(new_pcs[index], old_pcs[index] + 2, "{} instruction {}", name, index);
        }
    }
    assert_eq!(code(&after, "read", "(Lp/Guard;)I").instructions[9], op(ASTORE_0 + 1));
    assert_eq!(fieldlink::rewrite(&output).unwrap(), output);
}

#[test]
fn branching_class_without_frames_is_not_raised() {
    let bytes = loop_class().version(major_versions::JAVA_5_0).bytes();
    match fieldlink::rewrite(&bytes) {
        Err(Error::UnsupportedVersion { class, major, method, .. }) => {
            assert_eq!(class, "p/Loop");
            assert_eq!(major, major_versions::JAVA_5_0);
            assert_eq!(method, "sum(I)I");
        }
        other => panic!("expected a version error, got {:?}", other.map(|output| output.len())),
    }
    // nothing rewritten, nothing raised
    let config = Config::default().with_rewrite_static(false);
    assert_eq!(fieldlink::rewrite_with_config(&bytes, &config).unwrap(), bytes);
}

#[test]
fn subroutines_block_the_version_raise() {
    let bytes = ClassBuilder::new("p/Legacy")
        .version(major_versions::JAVA_6_0)
        .field(ACC_STATIC, "n", "I")
        .method(ACC_STATIC, "touch", "()V", 1, 2, |pool| {
            vec![
                getstatic(pool, "p/Legacy", "n", "I"),
                op(POP),
                branch(JSR, 4),
                op(RETURN),
                op(ASTORE_0 + 1),
                op1(RET, 1),
            ]
        })
        .bytes();
    let err = fieldlink::rewrite(&bytes).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion { .. }));
    assert!(err.to_string().contains("subroutines"), "{}", err);
}

#[test]
fn unpaired_surrogate_names_decode_and_stay_fields() {
    // static int both() { return n + f\uD800; }
    let bytes = ClassBuilder::new("p/Odd")
        .field(ACC_STATIC, "n", "I")
        .method(ACC_STATIC, "both", "()I", 2, 0, |pool| {
            let owner = pool.add_class("p/Odd").unwrap();
            let name = pool.add(Constant::Utf8(vec![b'f', 0xED, 0xA0, 0x80])).unwrap();
            let descriptor = pool.add_utf8("I").unwrap();
            let name_and_type = pool.add(Constant::NameAndType(name, descriptor)).unwrap();
            let odd = FieldInsn {
                index: pool.add(Constant::FieldRef(owner, name_and_type)).unwrap(),
                owner: "p/Odd".to_string(),
                name: "f\u{FFFD}".to_string(),
                value_type: FieldType::Int,
                is_static: true,
            };
            vec![getstatic(pool, "p/Odd", "n", "I"), Instruction::FieldRead(odd), op(IADD), op(IRETURN)]
        })
        .bytes();

    let before = ClassFile::decode(&bytes).unwrap();
    assert!(matches!(&instructions(&before, "both", "()I")[1], Instruction::FieldRead(f) if f.name == "f\u{FFFD}"));

    let (output, report) = Rewriter::default().rewrite_with_report(&bytes).unwrap();
    assert_eq!(report.reads_replaced, 1);
    let after = instructions(&ClassFile::decode(&output).unwrap(), "both", "()I");
    assert!(after[0].is_indirect_call());
    assert_eq!(after[1], instructions(&before, "both", "()I")[1]);
}

#[test]
fn malformed_input_fails() {
    let mut bytes = counter_class().bytes();
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(fieldlink::rewrite(&bytes), Err(Error::MalformedInput { .. })));
    assert!(matches!(fieldlink::rewrite(b"not a class"), Err(Error::MalformedInput { .. })));
}
