use crate::jvm::Serialize;
use byteorder::WriteBytesExt;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Tag byte of a record in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4-140
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum ConstantPoolTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl ConstantPoolTag {
    pub fn from_u8(tag: u8) -> Option<ConstantPoolTag> {
        use ConstantPoolTag::*;
        Some(match tag {
            1 => Utf8,
            3 => Integer,
            4 => Float,
            5 => Long,
            6 => Double,
            7 => Class,
            8 => String,
            9 => FieldRef,
            10 => MethodRef,
            11 => InterfaceMethodRef,
            12 => NameAndType,
            15 => MethodHandle,
            16 => MethodType,
            17 => Dynamic,
            18 => InvokeDynamic,
            19 => Module,
            20 => Package,
            _ => return None,
        })
    }

    /// Number of pool slots a record with this tag occupies
    pub fn width(self) -> usize {
        match self {
            ConstantPoolTag::Long | ConstantPoolTag::Double => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ConstantPoolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Static kind of constant a [`ConstantIndex`] points at
pub trait ConstantKind: 'static {
    /// Tag the pointed-to record must have (`None` means any record is fine)
    const TAG: Option<ConstantPoolTag>;
}

/// Constants that `ldc` and `ldc_w` can push onto the stack
pub trait LoadableConstant: ConstantKind {}

/// Constants that `ldc2_w` can push onto the stack
pub trait WideLoadableConstant: ConstantKind {}

/// Marker types for [`ConstantIndex`]
///
/// These are never constructed, they only exist at the type level.
pub mod kind {
    use super::{ConstantKind, ConstantPoolTag};

    /// Any kind of constant at all
    #[derive(Debug)]
    pub enum AnyConstant {}

    impl ConstantKind for AnyConstant {
        const TAG: Option<ConstantPoolTag> = None;
    }

    macro_rules! constant_kinds {
        ($($kind:ident),* $(,)?) => {
            $(
            #[derive(Debug)]
            pub enum $kind {}

            impl ConstantKind for $kind {
                const TAG: Option<ConstantPoolTag> = Some(ConstantPoolTag::$kind);
            }
            )*
        };
    }

    macro_rules! loadable {
        ($trait:ident: $($kind:ident),*) => {
            $(impl super::$trait for $kind {})*
        };
    }

    loadable!(LoadableConstant: Integer, Float, Class, String, MethodHandle, MethodType, Dynamic);
    loadable!(WideLoadableConstant: Long, Double, Dynamic);

    constant_kinds!(
        Utf8,
        Integer,
        Float,
        Long,
        Double,
        Class,
        String,
        FieldRef,
        MethodRef,
        InterfaceMethodRef,
        NameAndType,
        MethodHandle,
        MethodType,
        Dynamic,
        InvokeDynamic,
        Module,
        Package,
    );
}

/// Index into the constant pool, statically tagged with what kind of constant it refers to
///
/// Only the pool hands out typed indices, so an index of one kind can't be passed where another
/// kind is expected. Going from a typed index to an untyped one is free ([`ConstantIndex::erase`])
/// while the other direction is checked against the pool (see
/// [`super::ConstantsPool::checked_cast`]).
///
/// Index `0` is never a valid constant and is used throughout the class file format to mean
/// "nothing" (eg. the superclass of `java/lang/Object`).
pub struct ConstantIndex<K = kind::AnyConstant> {
    slot: u16,
    kind: PhantomData<fn() -> K>,
}

impl<K> ConstantIndex<K> {
    /// The absent constant
    pub const NONE: ConstantIndex<K> = ConstantIndex {
        slot: 0,
        kind: PhantomData,
    };

    pub(crate) const fn new(slot: u16) -> ConstantIndex<K> {
        ConstantIndex {
            slot,
            kind: PhantomData,
        }
    }

    /// Raw 1-based slot
    pub fn slot(self) -> u16 {
        self.slot
    }

    pub fn is_none(self) -> bool {
        self.slot == 0
    }

    /// Forget the kind of constant
    pub fn erase(self) -> ConstantIndex {
        ConstantIndex::new(self.slot)
    }
}

impl ConstantIndex {
    /// Untyped index from a raw slot (eg. one read out of an existing class file)
    pub fn from_raw(slot: u16) -> ConstantIndex {
        ConstantIndex::new(slot)
    }
}

impl<K> Clone for ConstantIndex<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for ConstantIndex<K> {}

impl<K> PartialEq for ConstantIndex<K> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<K> Eq for ConstantIndex<K> {}

impl<K> Hash for ConstantIndex<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state)
    }
}

impl<K> fmt::Debug for ConstantIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.slot)
    }
}

impl<K> Serialize for ConstantIndex<K> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.slot.serialize(writer)
    }
}

pub type Utf8ConstantIndex = ConstantIndex<kind::Utf8>;
pub type IntegerConstantIndex = ConstantIndex<kind::Integer>;
pub type FloatConstantIndex = ConstantIndex<kind::Float>;
pub type LongConstantIndex = ConstantIndex<kind::Long>;
pub type DoubleConstantIndex = ConstantIndex<kind::Double>;
pub type ClassConstantIndex = ConstantIndex<kind::Class>;
pub type StringConstantIndex = ConstantIndex<kind::String>;
pub type FieldRefConstantIndex = ConstantIndex<kind::FieldRef>;
pub type MethodRefConstantIndex = ConstantIndex<kind::MethodRef>;
pub type InterfaceMethodRefConstantIndex = ConstantIndex<kind::InterfaceMethodRef>;
pub type NameAndTypeConstantIndex = ConstantIndex<kind::NameAndType>;
pub type MethodHandleConstantIndex = ConstantIndex<kind::MethodHandle>;
pub type MethodTypeConstantIndex = ConstantIndex<kind::MethodType>;
pub type DynamicConstantIndex = ConstantIndex<kind::Dynamic>;
pub type InvokeDynamicConstantIndex = ConstantIndex<kind::InvokeDynamic>;
pub type ModuleConstantIndex = ConstantIndex<kind::Module>;
pub type PackageConstantIndex = ConstantIndex<kind::Package>;
