use super::{
    ClassConstantIndex, ConstantIndex, ConstantPoolTag, NameAndTypeConstantIndex,
    Utf8ConstantIndex,
};
use crate::jvm::Serialize;
use byteorder::WriteBytesExt;

/// Constants as they are laid out in the constant pool
///
/// Every reference to another constant is by index, so two records are equal exactly when they
/// would serialize to the same bytes. This is what the pool interns on.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`, as raw bits (so `-0.0` and each NaN stay distinct)
    Float(u32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`, as raw bits
    Double(u64),

    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Field
    FieldRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Method on a class
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Method on an interface
    InterfaceMethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// Depending on the method kind, this points to different things:
        ///
        ///   - `FieldRef` for `GetField`, `GetStatic`, `PutField`, `PutStatic`
        ///   - `MethodRef` or `InterfaceMethodRef` for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    Module(Utf8ConstantIndex),

    Package(Utf8ConstantIndex),
}

impl Constant {
    pub fn tag(&self) -> ConstantPoolTag {
        match self {
            Constant::Utf8(_) => ConstantPoolTag::Utf8,
            Constant::Integer(_) => ConstantPoolTag::Integer,
            Constant::Float(_) => ConstantPoolTag::Float,
            Constant::Long(_) => ConstantPoolTag::Long,
            Constant::Double(_) => ConstantPoolTag::Double,
            Constant::Class(_) => ConstantPoolTag::Class,
            Constant::String(_) => ConstantPoolTag::String,
            Constant::FieldRef { .. } => ConstantPoolTag::FieldRef,
            Constant::MethodRef { .. } => ConstantPoolTag::MethodRef,
            Constant::InterfaceMethodRef { .. } => ConstantPoolTag::InterfaceMethodRef,
            Constant::NameAndType { .. } => ConstantPoolTag::NameAndType,
            Constant::MethodHandle { .. } => ConstantPoolTag::MethodHandle,
            Constant::MethodType { .. } => ConstantPoolTag::MethodType,
            Constant::Dynamic { .. } => ConstantPoolTag::Dynamic,
            Constant::InvokeDynamic { .. } => ConstantPoolTag::InvokeDynamic,
            Constant::Module(_) => ConstantPoolTag::Module,
            Constant::Package(_) => ConstantPoolTag::Package,
        }
    }

    /// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`.
    /// Quoting JVMS §4.4.5:
    ///
    /// > All 8-byte constants take up two entries in the constant_pool table of the class file.
    /// > If a CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the
    /// > constant_pool table at index n, then the next usable item in the pool is located at
    /// > index n+2. The constant_pool index n+1 must be valid but is considered unusable.
    pub fn width(&self) -> usize {
        self.tag().width()
    }
}

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl HandleKind {
    pub fn from_u8(byte: u8) -> Option<HandleKind> {
        use HandleKind::*;
        Some(match byte {
            1 => GetField,
            2 => GetStatic,
            3 => PutField,
            4 => PutStatic,
            5 => InvokeVirtual,
            6 => InvokeStatic,
            7 => InvokeSpecial,
            8 => NewInvokeSpecial,
            9 => InvokeInterface,
            _ => return None,
        })
    }

    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            HandleKind::GetField | HandleKind::GetStatic | HandleKind::PutField | HandleKind::PutStatic
        )
    }
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (*self as u8).serialize(writer)
    }
}

/// Kind of member a reference constant points to
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum MemberKind {
    Field,
    Method,
    InterfaceMethod,
}

/// Field or method, identified by owner, name, and descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub class: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> MemberRef {
        MemberRef {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAndType {
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    pub kind: HandleKind,
    pub member_kind: MemberKind,
    pub member: MemberRef,
}

/// Shared shape of `CONSTANT_Dynamic_info` and `CONSTANT_InvokeDynamic_info`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DynamicConstant {
    pub bootstrap_method: u16,
    pub name: String,
    pub descriptor: String,
}

/// Logical value of a constant, with every reference spelled out in full
///
/// This is what callers hand to [`super::ConstantsPool::get_constant`] when they don't already
/// hold indices, and what a [`super::ConstantView`] hands back when reading an existing pool.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantData {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(String),
    String(String),
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType(NameAndType),
    MethodHandle(MethodHandle),
    MethodType(String),
    Dynamic(DynamicConstant),
    InvokeDynamic(DynamicConstant),
    Module(String),
    Package(String),
}

impl ConstantData {
    pub fn tag(&self) -> ConstantPoolTag {
        match self {
            ConstantData::Utf8(_) => ConstantPoolTag::Utf8,
            ConstantData::Integer(_) => ConstantPoolTag::Integer,
            ConstantData::Float(_) => ConstantPoolTag::Float,
            ConstantData::Long(_) => ConstantPoolTag::Long,
            ConstantData::Double(_) => ConstantPoolTag::Double,
            ConstantData::Class(_) => ConstantPoolTag::Class,
            ConstantData::String(_) => ConstantPoolTag::String,
            ConstantData::FieldRef(_) => ConstantPoolTag::FieldRef,
            ConstantData::MethodRef(_) => ConstantPoolTag::MethodRef,
            ConstantData::InterfaceMethodRef(_) => ConstantPoolTag::InterfaceMethodRef,
            ConstantData::NameAndType(_) => ConstantPoolTag::NameAndType,
            ConstantData::MethodHandle(_) => ConstantPoolTag::MethodHandle,
            ConstantData::MethodType(_) => ConstantPoolTag::MethodType,
            ConstantData::Dynamic(_) => ConstantPoolTag::Dynamic,
            ConstantData::InvokeDynamic(_) => ConstantPoolTag::InvokeDynamic,
            ConstantData::Module(_) => ConstantPoolTag::Module,
            ConstantData::Package(_) => ConstantPoolTag::Package,
        }
    }
}
