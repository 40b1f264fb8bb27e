//! Structural check of method bytecode, run once per class before linking.
//!
//! Every opcode has an entry in two tables: the skip table gives its fixed
//! length (0 when the length depends on the operands) and the check table
//! gives the routine that validates its operands and returns the number of
//! bytes it occupies.

use log::trace;

use crate::{
    Result,
    class::CpKind,
    consts::ClassAccessFlag,
    error::Error,
    runtime::{CPool, exceptions::throw_error},
};

mod op {
    pub const ACONST_NULL: u8 = 0x01;
    pub const BIPUSH: u8 = 0x10;
    pub const SIPUSH: u8 = 0x11;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const ILOAD: u8 = 0x15;
    pub const ALOAD: u8 = 0x19;
    pub const ALOAD_3: u8 = 0x2D;
    pub const ISTORE: u8 = 0x36;
    pub const ASTORE: u8 = 0x3A;
    pub const DUP: u8 = 0x59;
    pub const DUP2_X2: u8 = 0x5E;
    pub const IINC: u8 = 0x84;
    pub const IFEQ: u8 = 0x99;
    pub const IF_ACMPNE: u8 = 0xA6;
    pub const GOTO: u8 = 0xA7;
    pub const JSR: u8 = 0xA8;
    pub const RET: u8 = 0xA9;
    pub const TABLESWITCH: u8 = 0xAA;
    pub const LOOKUPSWITCH: u8 = 0xAB;
    pub const GETSTATIC: u8 = 0xB2;
    pub const PUTFIELD: u8 = 0xB5;
    pub const INVOKEVIRTUAL: u8 = 0xB6;
    pub const INVOKESTATIC: u8 = 0xB8;
    pub const INVOKEINTERFACE: u8 = 0xB9;
    pub const INVOKEDYNAMIC: u8 = 0xBA;
    pub const NEW: u8 = 0xBB;
    pub const NEWARRAY: u8 = 0xBC;
    pub const ANEWARRAY: u8 = 0xBD;
    pub const CHECKCAST: u8 = 0xC0;
    pub const INSTANCEOF: u8 = 0xC1;
    pub const WIDE: u8 = 0xC4;
    pub const MULTIANEWARRAY: u8 = 0xC5;
    pub const IFNULL: u8 = 0xC6;
    pub const IFNONNULL: u8 = 0xC7;
    pub const GOTO_W: u8 = 0xC8;
    pub const JSR_W: u8 = 0xC9;
    pub const BREAKPOINT: u8 = 0xCA;
}

const OPCODE_COUNT: usize = op::BREAKPOINT as usize + 1;

/// Returned by a check routine that rejects its instruction.
const ERROR: usize = usize::MAX;

/// Fixed instruction lengths. 0 marks `TABLESWITCH`, `LOOKUPSWITCH` and `WIDE`.
pub static SKIP_TABLE: [u8; OPCODE_COUNT] = build_skip_table();

const fn build_skip_table() -> [u8; OPCODE_COUNT] {
    let mut table = [1u8; OPCODE_COUNT];
    let mut opcode = 0;
    while opcode < OPCODE_COUNT {
        table[opcode] = match opcode as u8 {
            op::BIPUSH | op::LDC | op::ILOAD..=op::ALOAD | op::ISTORE..=op::ASTORE => 2,
            op::RET | op::NEWARRAY => 2,
            op::SIPUSH | op::LDC_W | op::LDC2_W | op::IINC => 3,
            op::IFEQ..=op::JSR | op::GETSTATIC..=op::INVOKESTATIC | op::NEW => 3,
            op::ANEWARRAY | op::CHECKCAST | op::INSTANCEOF | op::IFNULL | op::IFNONNULL => 3,
            op::MULTIANEWARRAY => 4,
            op::INVOKEINTERFACE | op::INVOKEDYNAMIC | op::GOTO_W | op::JSR_W => 5,
            op::TABLESWITCH | op::LOOKUPSWITCH | op::WIDE => 0,
            _ => 1,
        };
        opcode += 1;
    }
    table
}

type CheckFn = fn(&mut CodeChecker<'_>) -> usize;

static CHECK_TABLE: [CheckFn; OPCODE_COUNT] = build_check_table();

const fn build_check_table() -> [CheckFn; OPCODE_COUNT] {
    let mut table = [check_fixed as CheckFn; OPCODE_COUNT];
    let mut opcode = 0;
    while opcode < OPCODE_COUNT {
        table[opcode] = match opcode as u8 {
            op::ACONST_NULL..=op::SIPUSH => check_push,
            op::LDC | op::LDC_W | op::LDC2_W => check_ldc,
            op::ILOAD..=op::ALOAD | op::ISTORE..=op::ASTORE | op::RET => check_local,
            0x1A..=op::ALOAD_3 | op::DUP..=op::DUP2_X2 => check_push,
            op::IINC => check_iinc,
            op::IFEQ..=op::IF_ACMPNE | op::IFNULL | op::IFNONNULL => check_branch,
            op::GOTO | op::JSR => check_branch,
            op::GOTO_W | op::JSR_W => check_branch_wide,
            op::TABLESWITCH => check_tableswitch,
            op::LOOKUPSWITCH => check_lookupswitch,
            op::GETSTATIC..=op::PUTFIELD => check_field_ref,
            op::INVOKEVIRTUAL..=op::INVOKESTATIC => check_invoke,
            op::INVOKEINTERFACE => check_invokeinterface,
            op::INVOKEDYNAMIC => check_invokedynamic,
            op::NEW => check_new,
            op::ANEWARRAY | op::CHECKCAST | op::INSTANCEOF => check_class_ref,
            op::NEWARRAY => check_newarray,
            op::MULTIANEWARRAY => check_multianewarray,
            op::WIDE => check_wide,
            _ => check_fixed,
        };
        opcode += 1;
    }
    table
}

struct CodeChecker<'a> {
    code: &'a [u8],
    cp: &'a CPool,
    max_stack: u16,
    pc: usize,
    /// Start of the previous instruction, -1 before the first.
    prev_pc: isize,
    wide: bool,
}

impl CodeChecker<'_> {
    fn opcode(&self) -> u8 {
        self.code[self.pc]
    }

    fn u8_at(&self, offset: usize) -> Option<u8> {
        self.code.get(self.pc + offset).copied()
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        Some(u16::from_be_bytes([self.u8_at(offset)?, self.u8_at(offset + 1)?]))
    }

    fn i32_at(&self, pos: usize) -> Option<i32> {
        let bytes = self.code.get(pos..pos + 4)?;
        Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn jump_in_range(&self, offset: i64) -> bool {
        let target = self.pc as i64 + offset;
        target >= 0 && target < self.code.len() as i64
    }

    fn cp_kind_is(&self, index: u16, allowed: &[CpKind]) -> bool {
        index != 0
            && self
                .cp
                .kind_at(index)
                .is_some_and(|kind| allowed.contains(&kind))
    }

    /// Consumes the wide flag set by a WIDE directly before this instruction.
    fn take_wide(&mut self) -> bool {
        let wide = self.wide
            && self.prev_pc >= 0
            && self.code[self.prev_pc as usize] == op::WIDE;
        self.wide = false;
        wide
    }

    fn fixed_len(&self) -> usize {
        SKIP_TABLE[self.opcode() as usize] as usize
    }

    /// Length of an instruction whose only operand is a CP index of one of `allowed`.
    fn cp_operand(&self, allowed: &[CpKind]) -> usize {
        match self.u16_at(1) {
            Some(index) if self.cp_kind_is(index, allowed) => self.fixed_len(),
            _ => ERROR,
        }
    }
}

fn check_fixed(checker: &mut CodeChecker<'_>) -> usize {
    checker.fixed_len()
}

fn check_push(checker: &mut CodeChecker<'_>) -> usize {
    if checker.max_stack == 0 {
        return ERROR;
    }
    checker.fixed_len()
}

const LDC_KINDS: [CpKind; 8] = [
    CpKind::IntConst,
    CpKind::FloatConst,
    CpKind::Utf8,
    CpKind::StringConst,
    CpKind::ClassRef,
    CpKind::MethodType,
    CpKind::MethodHandle,
    CpKind::Dynamic,
];

fn check_ldc(checker: &mut CodeChecker<'_>) -> usize {
    if checker.max_stack == 0 {
        return ERROR;
    }
    let (index, allowed): (Option<u16>, &[CpKind]) = match checker.opcode() {
        op::LDC => (checker.u8_at(1).map(u16::from), &LDC_KINDS),
        op::LDC_W => (checker.u16_at(1), &LDC_KINDS),
        _ => (
            checker.u16_at(1),
            &[CpKind::LongConst, CpKind::DoubleConst, CpKind::Dynamic],
        ),
    };
    match index {
        Some(index) if checker.cp_kind_is(index, allowed) => checker.fixed_len(),
        _ => ERROR,
    }
}

// loads, stores and RET; a preceding WIDE makes the index two bytes
fn check_local(checker: &mut CodeChecker<'_>) -> usize {
    if checker.take_wide() {
        return 3;
    }
    checker.fixed_len()
}

fn check_iinc(checker: &mut CodeChecker<'_>) -> usize {
    if checker.take_wide() {
        return 5;
    }
    3
}

fn check_wide(checker: &mut CodeChecker<'_>) -> usize {
    match checker.u8_at(1) {
        Some(op::ILOAD..=op::ALOAD | op::ISTORE..=op::ASTORE | op::RET | op::IINC) => {
            checker.wide = true;
            1
        }
        _ => ERROR,
    }
}

fn check_branch(checker: &mut CodeChecker<'_>) -> usize {
    match checker.u16_at(1) {
        Some(offset) if checker.jump_in_range(offset as i16 as i64) => 3,
        _ => ERROR,
    }
}

fn check_branch_wide(checker: &mut CodeChecker<'_>) -> usize {
    match checker.i32_at(checker.pc + 1) {
        Some(offset) if checker.jump_in_range(offset as i64) => 5,
        _ => ERROR,
    }
}

fn switch_padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}

fn check_tableswitch(checker: &mut CodeChecker<'_>) -> usize {
    let base = checker.pc + 1 + switch_padding(checker.pc);
    let (Some(default), Some(low), Some(high)) = (
        checker.i32_at(base),
        checker.i32_at(base + 4),
        checker.i32_at(base + 8),
    ) else {
        return ERROR;
    };
    if low > high || !checker.jump_in_range(default as i64) {
        return ERROR;
    }
    let jumps = (high as i64 - low as i64 + 1) as usize;
    base + 12 + jumps * 4 - checker.pc
}

fn check_lookupswitch(checker: &mut CodeChecker<'_>) -> usize {
    let base = checker.pc + 1 + switch_padding(checker.pc);
    let (Some(default), Some(npairs)) = (checker.i32_at(base), checker.i32_at(base + 4)) else {
        return ERROR;
    };
    if npairs < 0 || !checker.jump_in_range(default as i64) {
        return ERROR;
    }
    base + 8 + npairs as usize * 8 - checker.pc
}

fn check_field_ref(checker: &mut CodeChecker<'_>) -> usize {
    checker.cp_operand(&[CpKind::FieldRef])
}

fn check_invoke(checker: &mut CodeChecker<'_>) -> usize {
    if checker.opcode() == op::INVOKEVIRTUAL {
        checker.cp_operand(&[CpKind::MethodRef])
    } else {
        // invokespecial and invokestatic may name interface methods
        checker.cp_operand(&[CpKind::MethodRef, CpKind::Interface])
    }
}

fn check_invokeinterface(checker: &mut CodeChecker<'_>) -> usize {
    match (checker.u8_at(3), checker.u8_at(4)) {
        (Some(count), Some(0)) if count > 0 => checker.cp_operand(&[CpKind::Interface]),
        _ => ERROR,
    }
}

fn check_invokedynamic(checker: &mut CodeChecker<'_>) -> usize {
    match (checker.u8_at(3), checker.u8_at(4)) {
        (Some(0), Some(0)) => checker.cp_operand(&[CpKind::InvokeDynamic]),
        _ => ERROR,
    }
}

fn check_new(checker: &mut CodeChecker<'_>) -> usize {
    if checker.max_stack == 0 {
        return ERROR;
    }
    checker.cp_operand(&[CpKind::ClassRef])
}

fn check_class_ref(checker: &mut CodeChecker<'_>) -> usize {
    checker.cp_operand(&[CpKind::ClassRef])
}

fn check_newarray(checker: &mut CodeChecker<'_>) -> usize {
    // T_BOOLEAN through T_LONG
    match checker.u8_at(1) {
        Some(4..=11) => 2,
        _ => ERROR,
    }
}

fn check_multianewarray(checker: &mut CodeChecker<'_>) -> usize {
    match checker.u8_at(3) {
        Some(dimensions) if dimensions > 0 => checker.cp_operand(&[CpKind::ClassRef]),
        _ => ERROR,
    }
}

/// Checks the bytecode of one method.
///
/// `code` may only be absent in an abstract class. Failures are reported
/// through the throw handler as `ClassFormatError` and returned.
pub fn check_code_validity(
    code: Option<&[u8]>,
    cp: Option<&CPool>,
    max_stack: u16,
    access: ClassAccessFlag,
) -> Result<()> {
    let Some(code) = code else {
        if access.contains(ClassAccessFlag::ABSTRACT) {
            return Ok(());
        }
        return Err(throw_error(Error::class_format(
            "check_code_validity: missing code in a non-abstract class",
        )));
    };
    let cp = match cp {
        Some(cp) if !cp.is_empty() => cp,
        Some(_) => {
            return Err(throw_error(Error::class_format(
                "check_code_validity: empty constant pool",
            )));
        }
        None => {
            return Err(throw_error(Error::class_format(
                "check_code_validity: missing constant pool",
            )));
        }
    };

    let mut checker = CodeChecker {
        code,
        cp,
        max_stack,
        pc: 0,
        prev_pc: -1,
        wide: false,
    };

    while checker.pc < code.len() {
        let opcode = checker.opcode();
        let len = match CHECK_TABLE.get(opcode as usize) {
            Some(check) => check(&mut checker),
            None => ERROR,
        };
        if len == ERROR || len == 0 || checker.pc + len > code.len() {
            trace!("rejected opcode {opcode:#04x} at {}", checker.pc);
            return Err(invalid_at(checker.pc));
        }
        checker.prev_pc = checker.pc as isize;
        checker.pc += len;
    }
    Ok(())
}

#[track_caller]
fn invalid_at(pc: usize) -> Error {
    throw_error(Error::class_format(format!(
        "Invalid bytecode or argument at location {pc}"
    )))
}
