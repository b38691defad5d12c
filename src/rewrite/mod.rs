//! The rewrite pass: field instructions become accessor call sites

pub mod callsite;
pub mod classify;

use log::{debug, info, warn};

pub use callsite::{build, install};
pub use classify::{classify, AccessKind, FieldAccessInfo};

use crate::classfile::defs::major_versions;
use crate::classfile::ClassFile;
use crate::code::Instruction;
use crate::config::Config;
use crate::consts::INVOKEDYNAMIC_MIN_MAJOR;
use crate::error::{Error, Result};
use crate::verify;

/// Counts gathered over one rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Methods with a `Code` attribute
    pub methods_visited: usize,
    pub methods_rewritten: usize,
    pub reads_replaced: usize,
    pub writes_replaced: usize,
    pub version_raised: bool,
}

impl RewriteReport {
    pub fn sites(&self) -> usize {
        self.reads_replaced + self.writes_replaced
    }

    pub fn is_unchanged(&self) -> bool {
        self.sites() == 0
    }
}

/// Applies the field-access rewrite to class files
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    config: Config,
}

impl Rewriter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rewrite(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.rewrite_with_report(bytes).map(|(output, _)| output)
    }

    /// Rewrite one class file. Input without field instructions comes back unchanged.
    pub fn rewrite_with_report(&self, bytes: &[u8]) -> Result<(Vec<u8>, RewriteReport)> {
        let mut class = ClassFile::decode(bytes)?;
        let report = self.rewrite_class(&mut class)?;
        if report.is_unchanged() {
            return Ok((bytes.to_vec(), report));
        }
        Ok((class.encode()?, report))
    }

    /// Rewrite a decoded class in place
    pub fn rewrite_class(&self, class: &mut ClassFile) -> Result<RewriteReport> {
        let class_name = class.name()?;
        let mut report = RewriteReport::default();

        for method_index in 0..class.methods.len() {
            let mut instructions = match class.methods[method_index].code_mut() {
                Some(code) => std::mem::take(&mut code.instructions),
                None => continue,
            };
            report.methods_visited += 1;
            let replaced = self.rewrite_instructions(class, &mut instructions);
            if let Some(code) = class.methods[method_index].code_mut() {
                code.instructions = instructions;
            }
            let (reads, writes) = replaced?;
            if reads + writes > 0 {
                let method = &class.methods[method_index];
                debug!(
                    "{}.{}: replaced {} reads and {} writes",
                    class_name,
                    method.name(&class.constant_pool)?,
                    reads,
                    writes
                );
                report.methods_rewritten += 1;
                report.reads_replaced += reads;
                report.writes_replaced += writes;
            }
        }

        if report.is_unchanged() {
            return Ok(report);
        }
        if class.major_version < INVOKEDYNAMIC_MIN_MAJOR {
            check_version_raise(class, &class_name)?;
            warn!(
                "{}: raising class version {} to {} for invokedynamic",
                class_name, class.major_version, major_versions::JAVA_7
            );
            class.major_version = INVOKEDYNAMIC_MIN_MAJOR;
            class.minor_version = 0;
            report.version_raised = true;
        }
        if self.config.verify_output {
            verify::verify(class)?;
        }
        info!(
            "{}: {} call sites in {} of {} methods",
            class_name,
            report.sites(),
            report.methods_rewritten,
            report.methods_visited
        );
        Ok(report)
    }

    fn rewrite_instructions(&self, class: &mut ClassFile, instructions: &mut [Instruction]) -> Result<(usize, usize)> {
        let (mut reads, mut writes) = (0, 0);
        for insn in instructions.iter_mut() {
            let Some(access) = classify(insn) else { continue };
            if access.is_static && !self.config.rewrite_static {
                continue;
            }
            if let Instruction::FieldRead(field) | Instruction::FieldWrite(field) = &*insn {
                if !class.constant_pool.member_is_exact(field.index) {
                    warn!(
                        "leaving {}.{} as a field instruction: its names are not valid UTF-16",
                        access.owner_type_name, access.field_name
                    );
                    continue;
                }
            }
            let call = build(&access, &self.config.bootstrap_owner);
            let index = install(class, &call)?;
            match access.kind {
                AccessKind::Read => reads += 1,
                AccessKind::Write => writes += 1,
            }
            *insn = Instruction::IndirectCall { call, index };
        }
        Ok((reads, writes))
    }
}

/// Version 51 bodies need stack map frames wherever control flow merges and
/// may not use subroutines. Frames are never synthesized, so a body that
/// would need new ones blocks the raise.
fn check_version_raise(class: &ClassFile, class_name: &str) -> Result<()> {
    let pool = &class.constant_pool;
    for method in &class.methods {
        let Some(code) = method.code() else { continue };
        let reason = if code.uses_subroutines() {
            "uses jsr/ret subroutines"
        } else if code.has_control_flow() && !code.has_stack_map() {
            "branches without a StackMapTable"
        } else {
            continue;
        };
        return Err(Error::UnsupportedVersion {
            class: class_name.to_string(),
            major: class.major_version,
            method: format!("{}{}", method.name(pool)?, method.descriptor(pool)?),
            reason: reason.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let report = RewriteReport { reads_replaced: 2, writes_replaced: 1, ..Default::default() };
        assert_eq!(report.sites(), 3);
        assert!(!report.is_unchanged());
        assert!(RewriteReport::default().is_unchanged());
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let rewriter = Rewriter::default();
        assert!(matches!(
            rewriter.rewrite(&[0xCA, 0xFE, 0xBA]),
            Err(crate::Error::MalformedInput { .. })
        ));
    }
}
