use super::{
    Constant, ConstantData, ConstantIndex, ConstantKind, ConstantPoolTag, ConstantsPool,
    DynamicConstant, MemberKind, MemberRef, MethodHandle, NameAndType,
};
use crate::jvm::Error;

/// Read access to the constant pool of some existing class file
///
/// This is the only thing the encoders need to know about a decoder: given a slot, produce the
/// logical value of the constant there (with all references followed).
pub trait ConstantView {
    fn constant(&self, index: u16) -> Result<ConstantData, Error>;
}

impl ConstantView for ConstantsPool {
    fn constant(&self, index: u16) -> Result<ConstantData, Error> {
        let index = ConstantIndex::from_raw(index);
        let class_name = |class: ConstantIndex| -> Result<String, Error> {
            match self.record(class)? {
                Constant::Class(name) => Ok(self.utf8(*name)?.to_owned()),
                other => Err(Error::BadConstantKind {
                    index: class.slot(),
                    expected: ConstantPoolTag::Class,
                    actual: other.tag(),
                }),
            }
        };
        let name_and_type = |nat: ConstantIndex| -> Result<(String, String), Error> {
            match self.record(nat)? {
                Constant::NameAndType { name, descriptor } => Ok((
                    self.utf8(*name)?.to_owned(),
                    self.utf8(*descriptor)?.to_owned(),
                )),
                other => Err(Error::BadConstantKind {
                    index: nat.slot(),
                    expected: ConstantPoolTag::NameAndType,
                    actual: other.tag(),
                }),
            }
        };
        let member = |class: ConstantIndex, nat: ConstantIndex| -> Result<MemberRef, Error> {
            let (name, descriptor) = name_and_type(nat)?;
            Ok(MemberRef {
                class: class_name(class)?,
                name,
                descriptor,
            })
        };

        Ok(match self.record(index)? {
            Constant::Utf8(string) => ConstantData::Utf8(string.clone()),
            Constant::Integer(integer) => ConstantData::Integer(*integer),
            Constant::Float(bits) => ConstantData::Float(f32::from_bits(*bits)),
            Constant::Long(long) => ConstantData::Long(*long),
            Constant::Double(bits) => ConstantData::Double(f64::from_bits(*bits)),
            Constant::Class(name) => ConstantData::Class(self.utf8(*name)?.to_owned()),
            Constant::String(utf8) => ConstantData::String(self.utf8(*utf8)?.to_owned()),
            Constant::FieldRef {
                class,
                name_and_type,
            } => ConstantData::FieldRef(member(class.erase(), name_and_type.erase())?),
            Constant::MethodRef {
                class,
                name_and_type,
            } => ConstantData::MethodRef(member(class.erase(), name_and_type.erase())?),
            Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => ConstantData::InterfaceMethodRef(member(class.erase(), name_and_type.erase())?),
            Constant::NameAndType { .. } => {
                let (name, descriptor) = name_and_type(index)?;
                ConstantData::NameAndType(NameAndType { name, descriptor })
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => match self.constant(member.slot())? {
                ConstantData::FieldRef(member) => ConstantData::MethodHandle(MethodHandle {
                    kind: *handle_kind,
                    member_kind: MemberKind::Field,
                    member,
                }),
                ConstantData::MethodRef(member) => {
                    ConstantData::MethodHandle(MethodHandle {
                        kind: *handle_kind,
                        member_kind: MemberKind::Method,
                        member,
                    })
                }
                ConstantData::InterfaceMethodRef(member) => {
                    ConstantData::MethodHandle(MethodHandle {
                        kind: *handle_kind,
                        member_kind: MemberKind::InterfaceMethod,
                        member,
                    })
                }
                other => {
                    return Err(Error::BadConstantKind {
                        index: member.slot(),
                        expected: ConstantPoolTag::MethodRef,
                        actual: other.tag(),
                    })
                }
            },
            Constant::MethodType { descriptor } => {
                ConstantData::MethodType(self.utf8(*descriptor)?.to_owned())
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type: nat,
            } => {
                let (name, descriptor) = name_and_type(nat.erase())?;
                ConstantData::Dynamic(DynamicConstant {
                    bootstrap_method: *bootstrap_method,
                    name,
                    descriptor,
                })
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type: nat,
            } => {
                let (name, descriptor) = name_and_type(nat.erase())?;
                ConstantData::InvokeDynamic(DynamicConstant {
                    bootstrap_method: *bootstrap_method,
                    name,
                    descriptor,
                })
            }
            Constant::Module(name) => ConstantData::Module(self.utf8(*name)?.to_owned()),
            Constant::Package(name) => ConstantData::Package(self.utf8(*name)?.to_owned()),
        })
    }
}

impl ConstantsPool {
    /// Copy a constant (and everything it refers to) out of some other pool into this one
    ///
    /// Index `0` maps to [`ConstantIndex::NONE`]. The copy is interned, so importing the same
    /// constant twice yields the same index.
    pub fn import<V: ConstantView + ?Sized>(
        &mut self,
        view: &V,
        index: u16,
    ) -> Result<ConstantIndex, Error> {
        if index == 0 {
            return Ok(ConstantIndex::NONE);
        }
        let data = view.constant(index)?;
        self.get_constant(&data)
    }

    /// Import a constant, checking that it has the expected kind
    pub fn import_as<K: ConstantKind, V: ConstantView + ?Sized>(
        &mut self,
        view: &V,
        index: u16,
    ) -> Result<ConstantIndex<K>, Error> {
        let imported = self.import(view, index)?;
        if imported.is_none() {
            return Ok(ConstantIndex::NONE);
        }
        self.checked_cast(imported)
    }
}

#[cfg(test)]
mod test {
    use super::super::{kind, HandleKind};
    use super::*;
    use crate::jvm::Version;

    #[test]
    fn import_between_pools() -> Result<(), Error> {
        let mut source = ConstantsPool::new(Version::JAVA8);
        source.get_integer(12)?;
        source.get_long(-1)?;
        let method = source.get_method_ref("a/B", "m", "()V")?;
        let handle = source.get_method_handle_indices(HandleKind::InvokeStatic, method.erase())?;

        let mut target = ConstantsPool::new(Version::JAVA8);
        target.get_utf8("unrelated")?;
        let imported = target.import(&source, handle.slot())?;
        assert_ne!(imported.slot(), handle.slot());

        let expected = ConstantData::MethodHandle(MethodHandle {
            kind: HandleKind::InvokeStatic,
            member_kind: MemberKind::Method,
            member: MemberRef::new("a/B", "m", "()V"),
        });
        assert_eq!(target.constant(imported.slot())?, expected);

        // Importing again is a no-op
        let len = target.len();
        assert_eq!(target.import(&source, handle.slot())?, imported);
        assert_eq!(target.len(), len);
        Ok(())
    }

    #[test]
    fn import_checks_kind() -> Result<(), Error> {
        let mut source = ConstantsPool::new(Version::JAVA8);
        let class = source.get_class("a/B")?;
        let string = source.get_string("a/B")?;

        let mut target = ConstantsPool::new(Version::JAVA8);
        let imported = target.import_as::<kind::Class, _>(&source, class.slot())?;
        assert_eq!(target.constant(imported.slot())?, ConstantData::Class("a/B".to_owned()));
        assert!(target
            .import_as::<kind::Class, _>(&source, string.slot())
            .is_err());
        assert!(target
            .import_as::<kind::Class, _>(&source, 0)?
            .is_none());
        assert!(source.constant(40).is_err());
        Ok(())
    }
}
