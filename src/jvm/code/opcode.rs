use crate::jvm::constants::ConstantPoolTag;
use std::fmt;

/// Shape of the operands that follow an opcode
///
/// Every instruction is emitted through the method on [`super::InstructionEncoder`] matching its
/// kind.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum OpcodeKind {
    /// No operands
    Simple,

    /// Local variable index (`u1`, or `u2` behind `wide`)
    LocalIndex,

    /// `iinc`: local variable index and signed increment
    Increment,

    /// `u2` constant pool index
    ConstantRef,

    /// `u1` constant pool index (only `ldc`)
    NarrowConstantRef,

    /// `invokeinterface`: `u2` index, `u1` count, and a zero byte
    InvokeInterface,

    /// `invokedynamic`: `u2` index and two zero bytes
    InvokeDynamic,

    /// `multianewarray`: `u2` index and `u1` dimensions
    MultiANewArray,

    /// `i2` relative jump
    Branch,

    /// `i4` relative jump
    WideBranch,

    /// `i1` operand (`bipush`) or `u1` array type (`newarray`)
    ByteImmediate,

    /// `i2` operand (`sipush`)
    ShortImmediate,

    TableSwitch,

    LookupSwitch,

    /// `wide` modifier
    WidePrefix,
}

macro_rules! opcodes {
    ($($name:ident = $byte:literal, $mnemonic:literal, $kind:ident;)*) => {
        /// JVM opcode
        ///
        /// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-7.html
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $byte,)*
        }

        impl Opcode {
            pub fn from_u8(byte: u8) -> Option<Opcode> {
                match byte {
                    $($byte => Some(Opcode::$name),)*
                    _ => None,
                }
            }

            /// Name of the instruction, as `javap` prints it
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => $mnemonic,)*
                }
            }

            pub fn kind(self) -> OpcodeKind {
                match self {
                    $(Opcode::$name => OpcodeKind::$kind,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x00, "nop", Simple;
    AConstNull = 0x01, "aconst_null", Simple;
    IConstM1 = 0x02, "iconst_m1", Simple;
    IConst0 = 0x03, "iconst_0", Simple;
    IConst1 = 0x04, "iconst_1", Simple;
    IConst2 = 0x05, "iconst_2", Simple;
    IConst3 = 0x06, "iconst_3", Simple;
    IConst4 = 0x07, "iconst_4", Simple;
    IConst5 = 0x08, "iconst_5", Simple;
    LConst0 = 0x09, "lconst_0", Simple;
    LConst1 = 0x0a, "lconst_1", Simple;
    FConst0 = 0x0b, "fconst_0", Simple;
    FConst1 = 0x0c, "fconst_1", Simple;
    FConst2 = 0x0d, "fconst_2", Simple;
    DConst0 = 0x0e, "dconst_0", Simple;
    DConst1 = 0x0f, "dconst_1", Simple;
    BiPush = 0x10, "bipush", ByteImmediate;
    SiPush = 0x11, "sipush", ShortImmediate;
    Ldc = 0x12, "ldc", NarrowConstantRef;
    LdcW = 0x13, "ldc_w", ConstantRef;
    Ldc2W = 0x14, "ldc2_w", ConstantRef;
    ILoad = 0x15, "iload", LocalIndex;
    LLoad = 0x16, "lload", LocalIndex;
    FLoad = 0x17, "fload", LocalIndex;
    DLoad = 0x18, "dload", LocalIndex;
    ALoad = 0x19, "aload", LocalIndex;
    ILoad0 = 0x1a, "iload_0", Simple;
    ILoad1 = 0x1b, "iload_1", Simple;
    ILoad2 = 0x1c, "iload_2", Simple;
    ILoad3 = 0x1d, "iload_3", Simple;
    LLoad0 = 0x1e, "lload_0", Simple;
    LLoad1 = 0x1f, "lload_1", Simple;
    LLoad2 = 0x20, "lload_2", Simple;
    LLoad3 = 0x21, "lload_3", Simple;
    FLoad0 = 0x22, "fload_0", Simple;
    FLoad1 = 0x23, "fload_1", Simple;
    FLoad2 = 0x24, "fload_2", Simple;
    FLoad3 = 0x25, "fload_3", Simple;
    DLoad0 = 0x26, "dload_0", Simple;
    DLoad1 = 0x27, "dload_1", Simple;
    DLoad2 = 0x28, "dload_2", Simple;
    DLoad3 = 0x29, "dload_3", Simple;
    ALoad0 = 0x2a, "aload_0", Simple;
    ALoad1 = 0x2b, "aload_1", Simple;
    ALoad2 = 0x2c, "aload_2", Simple;
    ALoad3 = 0x2d, "aload_3", Simple;
    IALoad = 0x2e, "iaload", Simple;
    LALoad = 0x2f, "laload", Simple;
    FALoad = 0x30, "faload", Simple;
    DALoad = 0x31, "daload", Simple;
    AALoad = 0x32, "aaload", Simple;
    BALoad = 0x33, "baload", Simple;
    CALoad = 0x34, "caload", Simple;
    SALoad = 0x35, "saload", Simple;
    IStore = 0x36, "istore", LocalIndex;
    LStore = 0x37, "lstore", LocalIndex;
    FStore = 0x38, "fstore", LocalIndex;
    DStore = 0x39, "dstore", LocalIndex;
    AStore = 0x3a, "astore", LocalIndex;
    IStore0 = 0x3b, "istore_0", Simple;
    IStore1 = 0x3c, "istore_1", Simple;
    IStore2 = 0x3d, "istore_2", Simple;
    IStore3 = 0x3e, "istore_3", Simple;
    LStore0 = 0x3f, "lstore_0", Simple;
    LStore1 = 0x40, "lstore_1", Simple;
    LStore2 = 0x41, "lstore_2", Simple;
    LStore3 = 0x42, "lstore_3", Simple;
    FStore0 = 0x43, "fstore_0", Simple;
    FStore1 = 0x44, "fstore_1", Simple;
    FStore2 = 0x45, "fstore_2", Simple;
    FStore3 = 0x46, "fstore_3", Simple;
    DStore0 = 0x47, "dstore_0", Simple;
    DStore1 = 0x48, "dstore_1", Simple;
    DStore2 = 0x49, "dstore_2", Simple;
    DStore3 = 0x4a, "dstore_3", Simple;
    AStore0 = 0x4b, "astore_0", Simple;
    AStore1 = 0x4c, "astore_1", Simple;
    AStore2 = 0x4d, "astore_2", Simple;
    AStore3 = 0x4e, "astore_3", Simple;
    IAStore = 0x4f, "iastore", Simple;
    LAStore = 0x50, "lastore", Simple;
    FAStore = 0x51, "fastore", Simple;
    DAStore = 0x52, "dastore", Simple;
    AAStore = 0x53, "aastore", Simple;
    BAStore = 0x54, "bastore", Simple;
    CAStore = 0x55, "castore", Simple;
    SAStore = 0x56, "sastore", Simple;
    Pop = 0x57, "pop", Simple;
    Pop2 = 0x58, "pop2", Simple;
    Dup = 0x59, "dup", Simple;
    DupX1 = 0x5a, "dup_x1", Simple;
    DupX2 = 0x5b, "dup_x2", Simple;
    Dup2 = 0x5c, "dup2", Simple;
    Dup2X1 = 0x5d, "dup2_x1", Simple;
    Dup2X2 = 0x5e, "dup2_x2", Simple;
    Swap = 0x5f, "swap", Simple;
    IAdd = 0x60, "iadd", Simple;
    LAdd = 0x61, "ladd", Simple;
    FAdd = 0x62, "fadd", Simple;
    DAdd = 0x63, "dadd", Simple;
    ISub = 0x64, "isub", Simple;
    LSub = 0x65, "lsub", Simple;
    FSub = 0x66, "fsub", Simple;
    DSub = 0x67, "dsub", Simple;
    IMul = 0x68, "imul", Simple;
    LMul = 0x69, "lmul", Simple;
    FMul = 0x6a, "fmul", Simple;
    DMul = 0x6b, "dmul", Simple;
    IDiv = 0x6c, "idiv", Simple;
    LDiv = 0x6d, "ldiv", Simple;
    FDiv = 0x6e, "fdiv", Simple;
    DDiv = 0x6f, "ddiv", Simple;
    IRem = 0x70, "irem", Simple;
    LRem = 0x71, "lrem", Simple;
    FRem = 0x72, "frem", Simple;
    DRem = 0x73, "drem", Simple;
    INeg = 0x74, "ineg", Simple;
    LNeg = 0x75, "lneg", Simple;
    FNeg = 0x76, "fneg", Simple;
    DNeg = 0x77, "dneg", Simple;
    IShl = 0x78, "ishl", Simple;
    LShl = 0x79, "lshl", Simple;
    IShr = 0x7a, "ishr", Simple;
    LShr = 0x7b, "lshr", Simple;
    IUShr = 0x7c, "iushr", Simple;
    LUShr = 0x7d, "lushr", Simple;
    IAnd = 0x7e, "iand", Simple;
    LAnd = 0x7f, "land", Simple;
    IOr = 0x80, "ior", Simple;
    LOr = 0x81, "lor", Simple;
    IXor = 0x82, "ixor", Simple;
    LXor = 0x83, "lxor", Simple;
    IInc = 0x84, "iinc", Increment;
    I2L = 0x85, "i2l", Simple;
    I2F = 0x86, "i2f", Simple;
    I2D = 0x87, "i2d", Simple;
    L2I = 0x88, "l2i", Simple;
    L2F = 0x89, "l2f", Simple;
    L2D = 0x8a, "l2d", Simple;
    F2I = 0x8b, "f2i", Simple;
    F2L = 0x8c, "f2l", Simple;
    F2D = 0x8d, "f2d", Simple;
    D2I = 0x8e, "d2i", Simple;
    D2L = 0x8f, "d2l", Simple;
    D2F = 0x90, "d2f", Simple;
    I2B = 0x91, "i2b", Simple;
    I2C = 0x92, "i2c", Simple;
    I2S = 0x93, "i2s", Simple;
    LCmp = 0x94, "lcmp", Simple;
    FCmpL = 0x95, "fcmpl", Simple;
    FCmpG = 0x96, "fcmpg", Simple;
    DCmpL = 0x97, "dcmpl", Simple;
    DCmpG = 0x98, "dcmpg", Simple;
    IfEq = 0x99, "ifeq", Branch;
    IfNe = 0x9a, "ifne", Branch;
    IfLt = 0x9b, "iflt", Branch;
    IfGe = 0x9c, "ifge", Branch;
    IfGt = 0x9d, "ifgt", Branch;
    IfLe = 0x9e, "ifle", Branch;
    IfICmpEq = 0x9f, "if_icmpeq", Branch;
    IfICmpNe = 0xa0, "if_icmpne", Branch;
    IfICmpLt = 0xa1, "if_icmplt", Branch;
    IfICmpGe = 0xa2, "if_icmpge", Branch;
    IfICmpGt = 0xa3, "if_icmpgt", Branch;
    IfICmpLe = 0xa4, "if_icmple", Branch;
    IfACmpEq = 0xa5, "if_acmpeq", Branch;
    IfACmpNe = 0xa6, "if_acmpne", Branch;
    Goto = 0xa7, "goto", Branch;
    Jsr = 0xa8, "jsr", Branch;
    Ret = 0xa9, "ret", LocalIndex;
    TableSwitch = 0xaa, "tableswitch", TableSwitch;
    LookupSwitch = 0xab, "lookupswitch", LookupSwitch;
    IReturn = 0xac, "ireturn", Simple;
    LReturn = 0xad, "lreturn", Simple;
    FReturn = 0xae, "freturn", Simple;
    DReturn = 0xaf, "dreturn", Simple;
    AReturn = 0xb0, "areturn", Simple;
    Return = 0xb1, "return", Simple;
    GetStatic = 0xb2, "getstatic", ConstantRef;
    PutStatic = 0xb3, "putstatic", ConstantRef;
    GetField = 0xb4, "getfield", ConstantRef;
    PutField = 0xb5, "putfield", ConstantRef;
    InvokeVirtual = 0xb6, "invokevirtual", ConstantRef;
    InvokeSpecial = 0xb7, "invokespecial", ConstantRef;
    InvokeStatic = 0xb8, "invokestatic", ConstantRef;
    InvokeInterface = 0xb9, "invokeinterface", InvokeInterface;
    InvokeDynamic = 0xba, "invokedynamic", InvokeDynamic;
    New = 0xbb, "new", ConstantRef;
    NewArray = 0xbc, "newarray", ByteImmediate;
    ANewArray = 0xbd, "anewarray", ConstantRef;
    ArrayLength = 0xbe, "arraylength", Simple;
    AThrow = 0xbf, "athrow", Simple;
    CheckCast = 0xc0, "checkcast", ConstantRef;
    InstanceOf = 0xc1, "instanceof", ConstantRef;
    MonitorEnter = 0xc2, "monitorenter", Simple;
    MonitorExit = 0xc3, "monitorexit", Simple;
    Wide = 0xc4, "wide", WidePrefix;
    MultiANewArray = 0xc5, "multianewarray", MultiANewArray;
    IfNull = 0xc6, "ifnull", Branch;
    IfNonNull = 0xc7, "ifnonnull", Branch;
    GotoW = 0xc8, "goto_w", WideBranch;
    JsrW = 0xc9, "jsr_w", WideBranch;
}

impl Opcode {
    /// Length of the operands following the opcode byte, if that doesn't depend on the operands
    ///
    /// Switches are padded and variable length, and `wide` changes the length of the instruction
    /// it modifies, so those return `None`.
    pub fn operands_len(self) -> Option<usize> {
        match self.kind() {
            OpcodeKind::Simple => Some(0),
            OpcodeKind::LocalIndex | OpcodeKind::NarrowConstantRef | OpcodeKind::ByteImmediate => {
                Some(1)
            }
            OpcodeKind::Increment
            | OpcodeKind::ConstantRef
            | OpcodeKind::Branch
            | OpcodeKind::ShortImmediate => Some(2),
            OpcodeKind::MultiANewArray => Some(3),
            OpcodeKind::InvokeInterface | OpcodeKind::InvokeDynamic | OpcodeKind::WideBranch => {
                Some(4)
            }
            OpcodeKind::TableSwitch | OpcodeKind::LookupSwitch | OpcodeKind::WidePrefix => None,
        }
    }
}

impl Opcode {
    /// Constant pool records a [`OpcodeKind::ConstantRef`] instruction may point at
    ///
    /// Empty for every other kind of instruction.
    pub fn constant_tags(self) -> &'static [ConstantPoolTag] {
        use ConstantPoolTag::*;
        match self {
            Opcode::GetStatic | Opcode::PutStatic | Opcode::GetField | Opcode::PutField => {
                &[FieldRef]
            }
            Opcode::InvokeVirtual => &[MethodRef],
            Opcode::InvokeSpecial | Opcode::InvokeStatic => &[MethodRef, InterfaceMethodRef],
            Opcode::New | Opcode::ANewArray | Opcode::CheckCast | Opcode::InstanceOf => &[Class],
            Opcode::LdcW => &[
                Integer,
                Float,
                Class,
                String,
                MethodHandle,
                MethodType,
                Dynamic,
            ],
            Opcode::Ldc2W => &[Long, Double, Dynamic],
            _ => &[],
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Element type operand of `newarray`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum ArrayType {
    Boolean = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opcode_table_is_dense() {
        for byte in 0x00..=0xc9u8 {
            let opcode = Opcode::from_u8(byte).expect("opcode");
            assert_eq!(opcode as u8, byte);
        }
        assert_eq!(Opcode::from_u8(0xca), None);
        assert_eq!(Opcode::from_u8(0xff), None);
    }

    #[test]
    fn mnemonics_and_kinds() {
        assert_eq!(Opcode::GotoW.mnemonic(), "goto_w");
        assert_eq!(Opcode::GotoW.kind(), OpcodeKind::WideBranch);
        assert_eq!(Opcode::ALoad0.kind(), OpcodeKind::Simple);
        assert_eq!(Opcode::Ret.kind(), OpcodeKind::LocalIndex);
        assert_eq!(Opcode::InvokeInterface.operands_len(), Some(4));
        assert_eq!(Opcode::TableSwitch.operands_len(), None);
        assert_eq!(Opcode::IfNonNull.to_string(), "ifnonnull");
    }

    #[test]
    fn constant_ref_opcodes_have_tags() {
        for byte in 0x00..=0xc9u8 {
            let opcode = Opcode::from_u8(byte).expect("opcode");
            let has_tags = !opcode.constant_tags().is_empty();
            assert_eq!(has_tags, opcode.kind() == OpcodeKind::ConstantRef, "{}", opcode);
        }
        assert_eq!(Opcode::CheckCast.constant_tags(), &[ConstantPoolTag::Class]);
    }
}
