use super::{
    encode_modified_utf8, kind, ClassConstantIndex, Constant, ConstantData, ConstantIndex,
    ConstantKind, ConstantPoolTag, DoubleConstantIndex, DynamicConstantIndex,
    FieldRefConstantIndex, FloatConstantIndex, HandleKind, IntegerConstantIndex,
    InterfaceMethodRefConstantIndex, InvokeDynamicConstantIndex, LongConstantIndex, MemberKind,
    MemberRef, MethodHandle, MethodHandleConstantIndex, MethodRefConstantIndex,
    MethodTypeConstantIndex, ModuleConstantIndex, NameAndTypeConstantIndex, PackageConstantIndex,
    StringConstantIndex, Utf8ConstantIndex,
};
use crate::jvm::{Error, Version};
use crate::util::BlobBuilder;
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;

/// Class file constants pool builder
///
/// Constants are serialized into the pool's own buffer as soon as they are added, so that the
/// finished pool can be spliced into the class file without copying. The pool is append only.
///
/// Every kind of constant can be added in two ways:
///
///   - `get_*` methods return the existing slot if an identical constant was already added
///   - `add_*` methods always create a new slot (any dependent constants are still shared)
///
/// Composite constants accept plain strings and intern whatever they refer to.
pub struct ConstantsPool {
    /// Class file version the pool is destined for
    version: Version,

    /// Serialized records
    buffer: BlobBuilder,

    /// Records indexed by slot (slot `0` and the slot after a long or double are `None`)
    entries: Vec<Option<Constant>>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    interned: HashMap<Constant, ConstantIndex>,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new(version: Version) -> ConstantsPool {
        ConstantsPool {
            version,
            buffer: BlobBuilder::new(),
            entries: vec![None],
            utf8s: HashMap::new(),
            interned: HashMap::new(),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Number of slots used so far (long and double constants use two slots each)
    pub fn len(&self) -> u16 {
        (self.entries.len() - 1) as u16
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Write out the `constant_pool_count` followed by all of the constants
    ///
    /// The count is one more than the number of slots used, since slot `0` is never used.
    pub fn serialize_into(self, buffer: &mut BlobBuilder) {
        log::debug!(
            "Writing constant pool with {} slots ({} bytes)",
            self.len(),
            self.buffer.len()
        );
        buffer.push_u16(self.entries.len() as u16);
        buffer.link_suffix(self.buffer);
    }

    /// Look up the record at an index
    pub fn record<K>(&self, index: ConstantIndex<K>) -> Result<&Constant, Error> {
        self.entries
            .get(index.slot() as usize)
            .and_then(|entry| entry.as_ref())
            .ok_or(Error::BadConstantIndex {
                index: index.slot(),
                len: self.entries.len() as u16,
            })
    }

    pub fn tag_of<K>(&self, index: ConstantIndex<K>) -> Result<ConstantPoolTag, Error> {
        self.record(index).map(Constant::tag)
    }

    /// Narrow an untyped index, checking it against what is actually in the pool
    pub fn checked_cast<K: ConstantKind>(
        &self,
        index: ConstantIndex,
    ) -> Result<ConstantIndex<K>, Error> {
        let actual = self.tag_of(index)?;
        match K::TAG {
            Some(expected) if expected != actual => Err(Error::BadConstantKind {
                index: index.slot(),
                expected,
                actual,
            }),
            _ => Ok(ConstantIndex::new(index.slot())),
        }
    }

    /// String content of a utf8 constant
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.record(index)? {
            Constant::Utf8(string) => Ok(string),
            other => Err(Error::BadConstantKind {
                index: index.slot(),
                expected: ConstantPoolTag::Utf8,
                actual: other.tag(),
            }),
        }
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65534, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        // Compute the offset at which this constant will be inserted
        let offset = self.entries.len();

        let utf8 = match &constant {
            Constant::Utf8(string) => Some(encode_modified_utf8(string, self.version)?),
            _ => None,
        };

        // Detect if the next constant would overflow the pool
        if offset + constant.width() > u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow { constant, offset });
        }

        let buffer = &mut self.buffer;
        buffer.push_u8(constant.tag() as u8);
        match &constant {
            Constant::Utf8(_) => {
                let bytes = utf8.unwrap_or_default();
                buffer.push_u16(bytes.len() as u16);
                buffer.push_bytes(&bytes);
            }
            Constant::Integer(integer) => buffer.push_i32(*integer),
            Constant::Float(bits) => buffer.push_u32(*bits),
            Constant::Long(long) => buffer.push_i64(*long),
            Constant::Double(bits) => buffer.push_bytes(&bits.to_be_bytes()),
            Constant::Class(name)
            | Constant::String(name)
            | Constant::MethodType { descriptor: name }
            | Constant::Module(name)
            | Constant::Package(name) => buffer.push_u16(name.slot()),
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => {
                buffer.push_u16(class.slot());
                buffer.push_u16(name_and_type.slot());
            }
            Constant::NameAndType { name, descriptor } => {
                buffer.push_u16(name.slot());
                buffer.push_u16(descriptor.slot());
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                buffer.push_u8(*handle_kind as u8);
                buffer.push_u16(member.slot());
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            }
            | Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            } => {
                buffer.push_u16(*bootstrap_method);
                buffer.push_u16(name_and_type.slot());
            }
        }

        log::trace!("Constant #{} = {:?}", offset, constant);
        let width = constant.width();
        self.entries.push(Some(constant));
        if width == 2 {
            self.entries.push(None);
        }
        Ok(ConstantIndex::new(offset as u16))
    }

    /// Add a record, either reusing an identical one or always making a new slot
    fn insert<K>(&mut self, constant: Constant, fresh: bool) -> Result<ConstantIndex<K>, Error> {
        if !fresh {
            if let Some(index) = self.interned.get(&constant) {
                return Ok(ConstantIndex::new(index.slot()));
            }
        }
        let index = self.push_constant(constant.clone())?;
        self.interned.entry(constant).or_insert(index);
        Ok(ConstantIndex::new(index.slot()))
    }

    fn require_version(&self, feature: &'static str, minimum: Version) -> Result<(), Error> {
        if self.version < minimum {
            Err(Error::UnsupportedByVersion {
                feature,
                version: self.version,
            })
        } else {
            Ok(())
        }
    }

    fn utf8_constant(&mut self, utf8: Cow<'_, str>, fresh: bool) -> Result<Utf8ConstantIndex, Error> {
        if !fresh {
            if let Some(idx) = self.utf8s.get::<str>(utf8.borrow()) {
                return Ok(*idx);
            }
        }
        let owned = utf8.into_owned();
        let idx = ConstantIndex::new(self.push_constant(Constant::Utf8(owned.clone()))?.slot());
        self.utf8s.entry(owned).or_insert(idx);
        Ok(idx)
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        self.utf8_constant(utf8.into(), false)
    }

    /// Insert a new utf8 constant into the constant pool
    pub fn add_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        self.utf8_constant(utf8.into(), true)
    }

    pub fn get_integer(&mut self, integer: i32) -> Result<IntegerConstantIndex, Error> {
        self.insert(Constant::Integer(integer), false)
    }

    pub fn add_integer(&mut self, integer: i32) -> Result<IntegerConstantIndex, Error> {
        self.insert(Constant::Integer(integer), true)
    }

    /// Get or insert a float constant (floats are compared bitwise)
    pub fn get_float(&mut self, float: f32) -> Result<FloatConstantIndex, Error> {
        self.insert(Constant::Float(float.to_bits()), false)
    }

    pub fn add_float(&mut self, float: f32) -> Result<FloatConstantIndex, Error> {
        self.insert(Constant::Float(float.to_bits()), true)
    }

    pub fn get_long(&mut self, long: i64) -> Result<LongConstantIndex, Error> {
        self.insert(Constant::Long(long), false)
    }

    pub fn add_long(&mut self, long: i64) -> Result<LongConstantIndex, Error> {
        self.insert(Constant::Long(long), true)
    }

    /// Get or insert a double constant (doubles are compared bitwise)
    pub fn get_double(&mut self, double: f64) -> Result<DoubleConstantIndex, Error> {
        self.insert(Constant::Double(double.to_bits()), false)
    }

    pub fn add_double(&mut self, double: f64) -> Result<DoubleConstantIndex, Error> {
        self.insert(Constant::Double(double.to_bits()), true)
    }

    /// Get or insert a class constant from its binary name (eg. `java/lang/Object`)
    pub fn get_class(&mut self, name: &str) -> Result<ClassConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        self.insert(Constant::Class(name), false)
    }

    pub fn add_class(&mut self, name: &str) -> Result<ClassConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        self.insert(Constant::Class(name), true)
    }

    pub fn get_class_index(&mut self, name: Utf8ConstantIndex) -> Result<ClassConstantIndex, Error> {
        self.insert(Constant::Class(name), false)
    }

    pub fn get_string(&mut self, string: &str) -> Result<StringConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        self.insert(Constant::String(utf8), false)
    }

    pub fn add_string(&mut self, string: &str) -> Result<StringConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        self.insert(Constant::String(utf8), true)
    }

    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        self.get_name_and_type_indices(name, descriptor)
    }

    pub fn add_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        self.insert(Constant::NameAndType { name, descriptor }, true)
    }

    pub fn get_name_and_type_indices(
        &mut self,
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        self.insert(Constant::NameAndType { name, descriptor }, false)
    }

    fn member_ref<K>(
        &mut self,
        member_kind: MemberKind,
        class: &str,
        name: &str,
        descriptor: &str,
        fresh: bool,
    ) -> Result<ConstantIndex<K>, Error> {
        let class = self.get_class(class)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        self.insert(member_record(member_kind, class, name_and_type), fresh)
    }

    pub fn get_field_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<FieldRefConstantIndex, Error> {
        self.member_ref(MemberKind::Field, class, name, descriptor, false)
    }

    pub fn add_field_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<FieldRefConstantIndex, Error> {
        self.member_ref(MemberKind::Field, class, name, descriptor, true)
    }

    pub fn get_field_ref_indices(
        &mut self,
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    ) -> Result<FieldRefConstantIndex, Error> {
        self.insert(member_record(MemberKind::Field, class, name_and_type), false)
    }

    pub fn get_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodRefConstantIndex, Error> {
        self.member_ref(MemberKind::Method, class, name, descriptor, false)
    }

    pub fn add_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodRefConstantIndex, Error> {
        self.member_ref(MemberKind::Method, class, name, descriptor, true)
    }

    pub fn get_method_ref_indices(
        &mut self,
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    ) -> Result<MethodRefConstantIndex, Error> {
        self.insert(member_record(MemberKind::Method, class, name_and_type), false)
    }

    pub fn get_interface_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<InterfaceMethodRefConstantIndex, Error> {
        self.member_ref(MemberKind::InterfaceMethod, class, name, descriptor, false)
    }

    pub fn add_interface_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<InterfaceMethodRefConstantIndex, Error> {
        self.member_ref(MemberKind::InterfaceMethod, class, name, descriptor, true)
    }

    pub fn get_interface_method_ref_indices(
        &mut self,
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    ) -> Result<InterfaceMethodRefConstantIndex, Error> {
        self.insert(
            member_record(MemberKind::InterfaceMethod, class, name_and_type),
            false,
        )
    }

    /// Check that a method handle of a given kind can refer to a given member
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4.8
    fn method_handle_record(
        &self,
        handle_kind: HandleKind,
        member: ConstantIndex,
    ) -> Result<Constant, Error> {
        self.require_version("CONSTANT_MethodHandle", Version::JAVA7)?;

        let (member_tag, name) = match self.record(member)? {
            Constant::FieldRef { name_and_type, .. }
            | Constant::MethodRef { name_and_type, .. }
            | Constant::InterfaceMethodRef { name_and_type, .. } => {
                let name = match self.record(*name_and_type)? {
                    Constant::NameAndType { name, .. } => self.utf8(*name)?,
                    other => {
                        return Err(Error::BadConstantKind {
                            index: name_and_type.slot(),
                            expected: ConstantPoolTag::NameAndType,
                            actual: other.tag(),
                        })
                    }
                };
                (self.tag_of(member)?, name)
            }
            other => (other.tag(), ""),
        };

        let member_ok = match handle_kind {
            HandleKind::GetField
            | HandleKind::GetStatic
            | HandleKind::PutField
            | HandleKind::PutStatic => member_tag == ConstantPoolTag::FieldRef,
            HandleKind::InvokeVirtual | HandleKind::NewInvokeSpecial => {
                member_tag == ConstantPoolTag::MethodRef
            }
            HandleKind::InvokeStatic | HandleKind::InvokeSpecial => {
                member_tag == ConstantPoolTag::MethodRef
                    || (member_tag == ConstantPoolTag::InterfaceMethodRef
                        && self.version >= Version::JAVA8)
            }
            HandleKind::InvokeInterface => member_tag == ConstantPoolTag::InterfaceMethodRef,
        };
        let name_ok = match handle_kind {
            HandleKind::NewInvokeSpecial => name == "<init>",
            HandleKind::InvokeVirtual
            | HandleKind::InvokeStatic
            | HandleKind::InvokeSpecial
            | HandleKind::InvokeInterface => name != "<init>" && name != "<clinit>",
            _ => true,
        };

        if !(member_ok && name_ok) {
            return Err(Error::InvalidMethodHandle {
                kind: handle_kind,
                member: member_tag,
                name: name.to_owned(),
                version: self.version,
            });
        }
        Ok(Constant::MethodHandle {
            handle_kind,
            member,
        })
    }

    fn method_handle_constant(
        &mut self,
        handle: &MethodHandle,
        fresh: bool,
    ) -> Result<MethodHandleConstantIndex, Error> {
        self.require_version("CONSTANT_MethodHandle", Version::JAVA7)?;
        let member = self.member_data(handle.member_kind, &handle.member, false)?;
        let record = self.method_handle_record(handle.kind, member)?;
        self.insert(record, fresh)
    }

    pub fn get_method_handle(
        &mut self,
        handle: &MethodHandle,
    ) -> Result<MethodHandleConstantIndex, Error> {
        self.method_handle_constant(handle, false)
    }

    pub fn add_method_handle(
        &mut self,
        handle: &MethodHandle,
    ) -> Result<MethodHandleConstantIndex, Error> {
        self.method_handle_constant(handle, true)
    }

    /// Get or insert a method handle to a member reference that is already in the pool
    pub fn get_method_handle_indices(
        &mut self,
        kind: HandleKind,
        member: ConstantIndex,
    ) -> Result<MethodHandleConstantIndex, Error> {
        let record = self.method_handle_record(kind, member)?;
        self.insert(record, false)
    }

    fn method_type_constant(
        &mut self,
        descriptor: &str,
        fresh: bool,
    ) -> Result<MethodTypeConstantIndex, Error> {
        self.require_version("CONSTANT_MethodType", Version::JAVA7)?;
        let descriptor = self.get_utf8(descriptor)?;
        self.insert(Constant::MethodType { descriptor }, fresh)
    }

    pub fn get_method_type(&mut self, descriptor: &str) -> Result<MethodTypeConstantIndex, Error> {
        self.method_type_constant(descriptor, false)
    }

    pub fn add_method_type(&mut self, descriptor: &str) -> Result<MethodTypeConstantIndex, Error> {
        self.method_type_constant(descriptor, true)
    }

    fn dynamic_constant(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
        fresh: bool,
    ) -> Result<DynamicConstantIndex, Error> {
        self.require_version("CONSTANT_Dynamic", Version::JAVA11)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        self.insert(
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            },
            fresh,
        )
    }

    /// Get or insert a dynamically-computed constant
    ///
    /// `bootstrap_method` is an index into the class's `BootstrapMethods` attribute.
    pub fn get_dynamic(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<DynamicConstantIndex, Error> {
        self.dynamic_constant(bootstrap_method, name, descriptor, false)
    }

    pub fn add_dynamic(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<DynamicConstantIndex, Error> {
        self.dynamic_constant(bootstrap_method, name, descriptor, true)
    }

    fn invoke_dynamic_constant(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
        fresh: bool,
    ) -> Result<InvokeDynamicConstantIndex, Error> {
        self.require_version("CONSTANT_InvokeDynamic", Version::JAVA7)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        self.insert(
            Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            },
            fresh,
        )
    }

    /// Get or insert a dynamically-computed call site
    ///
    /// `bootstrap_method` is an index into the class's `BootstrapMethods` attribute.
    pub fn get_invoke_dynamic(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<InvokeDynamicConstantIndex, Error> {
        self.invoke_dynamic_constant(bootstrap_method, name, descriptor, false)
    }

    pub fn add_invoke_dynamic(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<InvokeDynamicConstantIndex, Error> {
        self.invoke_dynamic_constant(bootstrap_method, name, descriptor, true)
    }

    fn module_constant(&mut self, name: &str, fresh: bool) -> Result<ModuleConstantIndex, Error> {
        self.require_version("CONSTANT_Module", Version::JAVA9)?;
        let name = self.get_utf8(name)?;
        self.insert(Constant::Module(name), fresh)
    }

    pub fn get_module(&mut self, name: &str) -> Result<ModuleConstantIndex, Error> {
        self.module_constant(name, false)
    }

    pub fn add_module(&mut self, name: &str) -> Result<ModuleConstantIndex, Error> {
        self.module_constant(name, true)
    }

    fn package_constant(&mut self, name: &str, fresh: bool) -> Result<PackageConstantIndex, Error> {
        self.require_version("CONSTANT_Package", Version::JAVA9)?;
        let name = self.get_utf8(name)?;
        self.insert(Constant::Package(name), fresh)
    }

    /// Get or insert a package constant from its binary name (eg. `java/lang`)
    pub fn get_package(&mut self, name: &str) -> Result<PackageConstantIndex, Error> {
        self.package_constant(name, false)
    }

    pub fn add_package(&mut self, name: &str) -> Result<PackageConstantIndex, Error> {
        self.package_constant(name, true)
    }

    fn constant_data(&mut self, data: &ConstantData, fresh: bool) -> Result<ConstantIndex, Error> {
        Ok(match data {
            ConstantData::Utf8(string) => self.utf8_constant(Cow::Borrowed(string.as_str()), fresh)?.erase(),
            ConstantData::Integer(integer) => self
                .insert::<kind::Integer>(Constant::Integer(*integer), fresh)?
                .erase(),
            ConstantData::Float(float) => self
                .insert::<kind::Float>(Constant::Float(float.to_bits()), fresh)?
                .erase(),
            ConstantData::Long(long) => self.insert::<kind::Long>(Constant::Long(*long), fresh)?.erase(),
            ConstantData::Double(double) => self
                .insert::<kind::Double>(Constant::Double(double.to_bits()), fresh)?
                .erase(),
            ConstantData::Class(name) => {
                let name = self.get_utf8(name.as_str())?;
                self.insert::<kind::Class>(Constant::Class(name), fresh)?.erase()
            }
            ConstantData::String(string) => {
                let utf8 = self.get_utf8(string.as_str())?;
                self.insert::<kind::String>(Constant::String(utf8), fresh)?.erase()
            }
            ConstantData::FieldRef(member) => {
                self.member_data(MemberKind::Field, member, fresh)?
            }
            ConstantData::MethodRef(member) => {
                self.member_data(MemberKind::Method, member, fresh)?
            }
            ConstantData::InterfaceMethodRef(member) => {
                self.member_data(MemberKind::InterfaceMethod, member, fresh)?
            }
            ConstantData::NameAndType(name_and_type) => {
                let name = self.get_utf8(name_and_type.name.as_str())?;
                let descriptor = self.get_utf8(name_and_type.descriptor.as_str())?;
                self.insert::<kind::NameAndType>(Constant::NameAndType { name, descriptor }, fresh)?
                    .erase()
            }
            ConstantData::MethodHandle(handle) => {
                self.method_handle_constant(handle, fresh)?.erase()
            }
            ConstantData::MethodType(descriptor) => {
                self.method_type_constant(descriptor, fresh)?.erase()
            }
            ConstantData::Dynamic(dynamic) => self
                .dynamic_constant(
                    dynamic.bootstrap_method,
                    &dynamic.name,
                    &dynamic.descriptor,
                    fresh,
                )?
                .erase(),
            ConstantData::InvokeDynamic(dynamic) => self
                .invoke_dynamic_constant(
                    dynamic.bootstrap_method,
                    &dynamic.name,
                    &dynamic.descriptor,
                    fresh,
                )?
                .erase(),
            ConstantData::Module(name) => self.module_constant(name, fresh)?.erase(),
            ConstantData::Package(name) => self.package_constant(name, fresh)?.erase(),
        })
    }

    fn member_data(
        &mut self,
        member_kind: MemberKind,
        member: &MemberRef,
        fresh: bool,
    ) -> Result<ConstantIndex, Error> {
        self.member_ref(
            member_kind,
            &member.class,
            &member.name,
            &member.descriptor,
            fresh,
        )
    }

    /// Get or insert any kind of constant
    pub fn get_constant(&mut self, data: &ConstantData) -> Result<ConstantIndex, Error> {
        self.constant_data(data, false)
    }

    /// Insert a new constant of any kind
    pub fn add_constant(&mut self, data: &ConstantData) -> Result<ConstantIndex, Error> {
        self.constant_data(data, true)
    }
}

fn member_record(
    member_kind: MemberKind,
    class: ClassConstantIndex,
    name_and_type: NameAndTypeConstantIndex,
) -> Constant {
    match member_kind {
        MemberKind::Field => Constant::FieldRef {
            class,
            name_and_type,
        },
        MemberKind::Method => Constant::MethodRef {
            class,
            name_and_type,
        },
        MemberKind::InterfaceMethod => Constant::InterfaceMethodRef {
            class,
            name_and_type,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pool_bytes(pool: ConstantsPool) -> Vec<u8> {
        let mut buffer = BlobBuilder::new();
        pool.serialize_into(&mut buffer);
        buffer.to_vec()
    }

    #[test]
    fn interning() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let first = pool.get_utf8("hello")?;
        let second = pool.get_utf8("hello")?;
        assert_eq!(first, second);
        assert_eq!(first.slot(), 1);
        assert_eq!(pool.len(), 1);

        let fresh = pool.add_utf8("hello")?;
        assert_ne!(fresh, first);
        assert_eq!(fresh.slot(), 2);

        // Interning still hands back the first slot
        assert_eq!(pool.get_utf8("hello")?, first);
        Ok(())
    }

    #[test]
    fn slot_arithmetic() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        assert_eq!(pool.get_integer(1)?.slot(), 1);
        assert_eq!(pool.get_long(2)?.slot(), 2);
        assert_eq!(pool.get_double(3.0)?.slot(), 4);
        assert_eq!(pool.get_float(4.0)?.slot(), 6);
        assert_eq!(pool.len(), 6);

        assert!(matches!(
            pool.record(ConstantIndex::from_raw(3)),
            Err(Error::BadConstantIndex { index: 3, .. })
        ));

        let bytes = pool_bytes(pool);
        assert_eq!(&bytes[..2], &[0, 7]);
        assert_eq!(&bytes[2..7], &[3, 0, 0, 0, 1]);
        assert_eq!(&bytes[7..16], &[5, 0, 0, 0, 0, 0, 0, 0, 2]);
        Ok(())
    }

    #[test]
    fn composite_constants_intern_dependents() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let field = pool.get_field_ref("a/B", "f", "I")?;
        assert_eq!(pool.len(), 6);

        let class = pool.get_class("a/B")?;
        let name_and_type = pool.get_name_and_type("f", "I")?;
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.get_field_ref_indices(class, name_and_type)?, field);

        // Same name and type, different kind of reference
        let method = pool.get_method_ref("a/B", "f", "I")?;
        assert_ne!(method.erase(), field.erase());
        assert_eq!(pool.len(), 7);
        Ok(())
    }

    #[test]
    fn serialized_records() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        pool.get_string("hi")?;
        let bytes = pool_bytes(pool);
        assert_eq!(bytes, vec![0, 3, 1, 0, 2, b'h', b'i', 8, 0, 1]);
        Ok(())
    }

    #[test]
    fn floats_are_interned_bitwise() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let zero = pool.get_float(0.0)?;
        let negative_zero = pool.get_float(-0.0)?;
        assert_ne!(zero, negative_zero);
        assert_eq!(pool.get_float(f32::NAN)?, pool.get_float(f32::NAN)?);
        Ok(())
    }

    #[test]
    fn checked_cast() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let class = pool.get_class("java/lang/Object")?;
        let untyped = class.erase();
        assert_eq!(pool.checked_cast::<kind::Class>(untyped)?, class);
        assert!(pool.checked_cast::<kind::AnyConstant>(untyped).is_ok());
        assert!(matches!(
            pool.checked_cast::<kind::Utf8>(untyped),
            Err(Error::BadConstantKind {
                expected: ConstantPoolTag::Utf8,
                actual: ConstantPoolTag::Class,
                ..
            })
        ));
        Ok(())
    }

    fn handle(kind: HandleKind, member_kind: MemberKind, name: &str) -> MethodHandle {
        MethodHandle {
            kind,
            member_kind,
            member: MemberRef::new("a/B", name, "()V"),
        }
    }

    #[test]
    fn method_handle_validation() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA7);
        pool.get_method_handle(&handle(HandleKind::GetStatic, MemberKind::Field, "f"))?;
        pool.get_method_handle(&handle(HandleKind::NewInvokeSpecial, MemberKind::Method, "<init>"))?;
        pool.get_method_handle(&handle(HandleKind::InvokeInterface, MemberKind::InterfaceMethod, "m"))?;

        for bad in [
            handle(HandleKind::GetField, MemberKind::Method, "f"),
            handle(HandleKind::InvokeVirtual, MemberKind::Field, "m"),
            handle(HandleKind::InvokeVirtual, MemberKind::Method, "<init>"),
            handle(HandleKind::InvokeStatic, MemberKind::Method, "<clinit>"),
            handle(HandleKind::NewInvokeSpecial, MemberKind::Method, "m"),
            handle(HandleKind::InvokeInterface, MemberKind::Method, "m"),
            // Interface targets for static and special handles need Java 8
            handle(HandleKind::InvokeStatic, MemberKind::InterfaceMethod, "m"),
        ] {
            let err = pool.get_method_handle(&bad).unwrap_err();
            assert!(matches!(err, Error::InvalidMethodHandle { .. }), "{:?}", bad);
            assert!(err.is_format_error());
        }

        let mut pool = ConstantsPool::new(Version::JAVA8);
        pool.get_method_handle(&handle(HandleKind::InvokeStatic, MemberKind::InterfaceMethod, "m"))?;
        pool.get_method_handle(&handle(HandleKind::InvokeSpecial, MemberKind::InterfaceMethod, "m"))?;
        Ok(())
    }

    #[test]
    fn method_handle_by_index() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let field = pool.get_field_ref("a/B", "f", "I")?;
        let first = pool.get_method_handle_indices(HandleKind::PutField, field.erase())?;
        let second = pool.get_method_handle_indices(HandleKind::PutField, field.erase())?;
        assert_eq!(first, second);

        let class = pool.get_class("a/B")?;
        assert!(matches!(
            pool.get_method_handle_indices(HandleKind::GetField, class.erase()),
            Err(Error::InvalidMethodHandle {
                member: ConstantPoolTag::Class,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn version_gated_constants() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA6);
        assert!(matches!(
            pool.get_method_type("()V"),
            Err(Error::UnsupportedByVersion { .. })
        ));
        assert!(pool
            .get_method_handle(&handle(HandleKind::GetStatic, MemberKind::Field, "f"))
            .is_err());
        assert!(pool.get_invoke_dynamic(0, "run", "()V").is_err());

        let mut pool = ConstantsPool::new(Version::JAVA9);
        pool.get_module("java.base")?;
        pool.get_package("java/lang")?;
        assert!(matches!(
            pool.get_dynamic(0, "x", "I"),
            Err(Error::UnsupportedByVersion {
                feature: "CONSTANT_Dynamic",
                ..
            })
        ));

        let mut pool = ConstantsPool::new(Version::JAVA11);
        let first = pool.get_dynamic(0, "x", "I")?;
        assert_eq!(pool.get_dynamic(0, "x", "I")?, first);
        assert_ne!(pool.get_dynamic(1, "x", "I")?, first);
        Ok(())
    }

    #[test]
    fn polymorphic_constants() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let member = MemberRef::new("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
        let typed = pool.get_method_ref(&member.class, &member.name, &member.descriptor)?;
        let untyped = pool.get_constant(&ConstantData::MethodRef(member.clone()))?;
        assert_eq!(untyped, typed.erase());

        let fresh = pool.add_constant(&ConstantData::MethodRef(member))?;
        assert_ne!(fresh, untyped);
        assert_eq!(pool.tag_of(fresh)?, ConstantPoolTag::MethodRef);

        let long = pool.get_constant(&ConstantData::Long(9))?;
        assert_eq!(pool.get_long(9)?.erase(), long);
        Ok(())
    }

    #[test]
    fn pool_overflow() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        for i in 0..65533 {
            pool.get_integer(i)?;
        }
        assert_eq!(pool.len(), 65533);

        // A long needs two slots, but only one is left
        assert!(matches!(
            pool.get_long(0),
            Err(Error::ConstantPoolOverflow { offset: 65534, .. })
        ));
        pool.get_integer(-1)?;
        assert!(matches!(
            pool.get_integer(-2),
            Err(Error::ConstantPoolOverflow { offset: 65535, .. })
        ));

        let bytes = pool_bytes(pool);
        assert_eq!(&bytes[..2], &[0xFF, 0xFF]);
        Ok(())
    }
}
