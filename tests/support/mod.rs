//! Just enough of a class file reader to check what the encoders produce

#![allow(dead_code)]

use byteorder::{BigEndian, ReadBytesExt};
use classasm::jvm::constants::{
    ConstantData, ConstantPoolTag, ConstantView, DynamicConstant, HandleKind, MemberKind,
    MemberRef, MethodHandle, NameAndType,
};
use classasm::jvm::Error;
use std::io::{Cursor, Read};

/// Constant pool entry, with references left as raw indices
#[derive(Debug, Clone)]
pub enum RawConstant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    Member(ConstantPoolTag, u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(ConstantPoolTag, u16, u16),
    Module(u16),
    Package(u16),

    /// Second slot of a `long` or `double`
    Unusable,
}

#[derive(Debug, Clone)]
pub struct RawAttribute {
    pub name: u16,
    pub info: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RawMember {
    pub access_flags: u16,
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Vec<RawAttribute>,
}

#[derive(Debug, Clone)]
pub struct ParsedClass {
    pub minor_version: u16,
    pub major_version: u16,

    /// Slot 0 is [`RawConstant::Unusable`]
    pub constants: Vec<RawConstant>,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<RawMember>,
    pub methods: Vec<RawMember>,
    pub attributes: Vec<RawAttribute>,
}

impl ParsedClass {
    /// Parse a whole class file, panicking if it is malformed or has trailing bytes
    pub fn parse(bytes: &[u8]) -> ParsedClass {
        let mut cursor = Cursor::new(bytes);
        let magic = cursor.read_u32::<BigEndian>().unwrap();
        assert_eq!(magic, 0xCAFEBABE, "bad magic");
        let minor_version = u2(&mut cursor);
        let major_version = u2(&mut cursor);

        let constants_count = u2(&mut cursor);
        let mut constants = vec![RawConstant::Unusable];
        while constants.len() < constants_count as usize {
            let constant = read_constant(&mut cursor);
            let wide = matches!(constant, RawConstant::Long(_) | RawConstant::Double(_));
            constants.push(constant);
            if wide {
                constants.push(RawConstant::Unusable);
            }
        }
        assert_eq!(constants.len(), constants_count as usize);

        let access_flags = u2(&mut cursor);
        let this_class = u2(&mut cursor);
        let super_class = u2(&mut cursor);
        let interfaces = (0..u2(&mut cursor)).map(|_| u2(&mut cursor)).collect();
        let fields = read_members(&mut cursor);
        let methods = read_members(&mut cursor);
        let attributes = read_attributes(&mut cursor);
        assert_eq!(cursor.position() as usize, bytes.len(), "trailing bytes");

        ParsedClass {
            minor_version,
            major_version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        }
    }

    pub fn utf8(&self, index: u16) -> &str {
        match &self.constants[index as usize] {
            RawConstant::Utf8(string) => string,
            other => panic!("constant {} is not UTF-8: {:?}", index, other),
        }
    }

    pub fn class_name(&self, index: u16) -> &str {
        match &self.constants[index as usize] {
            RawConstant::Class(name) => self.utf8(*name),
            other => panic!("constant {} is not a class: {:?}", index, other),
        }
    }

    /// Find an attribute by name in a table
    pub fn attribute<'a>(&self, attributes: &'a [RawAttribute], name: &str) -> &'a RawAttribute {
        attributes
            .iter()
            .find(|attribute| self.utf8(attribute.name) == name)
            .unwrap_or_else(|| panic!("missing `{}` attribute", name))
    }

    fn raw(&self, index: u16) -> Result<&RawConstant, Error> {
        match self.constants.get(index as usize) {
            Some(RawConstant::Unusable) | None => Err(Error::BadConstantIndex {
                index,
                len: self.constants.len() as u16,
            }),
            Some(constant) => Ok(constant),
        }
    }

    fn name_and_type(&self, index: u16) -> Result<(String, String), Error> {
        match self.raw(index)? {
            RawConstant::NameAndType(name, descriptor) => Ok((
                self.utf8(*name).to_owned(),
                self.utf8(*descriptor).to_owned(),
            )),
            _ => Err(Error::BadConstantKind {
                index,
                expected: ConstantPoolTag::NameAndType,
                actual: self.constant(index)?.tag(),
            }),
        }
    }
}

impl ConstantView for ParsedClass {
    fn constant(&self, index: u16) -> Result<ConstantData, Error> {
        Ok(match self.raw(index)? {
            RawConstant::Utf8(string) => ConstantData::Utf8(string.clone()),
            RawConstant::Integer(integer) => ConstantData::Integer(*integer),
            RawConstant::Float(float) => ConstantData::Float(*float),
            RawConstant::Long(long) => ConstantData::Long(*long),
            RawConstant::Double(double) => ConstantData::Double(*double),
            RawConstant::Class(name) => ConstantData::Class(self.utf8(*name).to_owned()),
            RawConstant::String(string) => ConstantData::String(self.utf8(*string).to_owned()),
            RawConstant::Member(tag, class, nat) => {
                let (name, descriptor) = self.name_and_type(*nat)?;
                let member = MemberRef::new(self.class_name(*class), name, descriptor);
                match tag {
                    ConstantPoolTag::FieldRef => ConstantData::FieldRef(member),
                    ConstantPoolTag::MethodRef => ConstantData::MethodRef(member),
                    _ => ConstantData::InterfaceMethodRef(member),
                }
            }
            RawConstant::NameAndType(..) => {
                let (name, descriptor) = self.name_and_type(index)?;
                ConstantData::NameAndType(NameAndType { name, descriptor })
            }
            RawConstant::MethodHandle(kind, member) => {
                let (member_kind, member) = match self.constant(*member)? {
                    ConstantData::FieldRef(member) => (MemberKind::Field, member),
                    ConstantData::MethodRef(member) => (MemberKind::Method, member),
                    ConstantData::InterfaceMethodRef(member) => {
                        (MemberKind::InterfaceMethod, member)
                    }
                    other => panic!("method handle to {:?}", other),
                };
                ConstantData::MethodHandle(MethodHandle {
                    kind: HandleKind::from_u8(*kind).expect("handle kind"),
                    member_kind,
                    member,
                })
            }
            RawConstant::MethodType(descriptor) => {
                ConstantData::MethodType(self.utf8(*descriptor).to_owned())
            }
            RawConstant::Dynamic(tag, bootstrap_method, nat) => {
                let (name, descriptor) = self.name_and_type(*nat)?;
                let dynamic = DynamicConstant {
                    bootstrap_method: *bootstrap_method,
                    name,
                    descriptor,
                };
                if *tag == ConstantPoolTag::Dynamic {
                    ConstantData::Dynamic(dynamic)
                } else {
                    ConstantData::InvokeDynamic(dynamic)
                }
            }
            RawConstant::Module(name) => ConstantData::Module(self.utf8(*name).to_owned()),
            RawConstant::Package(name) => ConstantData::Package(self.utf8(*name).to_owned()),
            RawConstant::Unusable => unreachable!(),
        })
    }
}

fn u2(cursor: &mut Cursor<&[u8]>) -> u16 {
    cursor.read_u16::<BigEndian>().unwrap()
}

fn read_constant(cursor: &mut Cursor<&[u8]>) -> RawConstant {
    let tag = cursor.read_u8().unwrap();
    let tag = ConstantPoolTag::from_u8(tag).unwrap_or_else(|| panic!("unknown tag {}", tag));
    match tag {
        ConstantPoolTag::Utf8 => {
            let mut bytes = vec![0; u2(cursor) as usize];
            cursor.read_exact(&mut bytes).unwrap();
            RawConstant::Utf8(decode_modified_utf8(&bytes))
        }
        ConstantPoolTag::Integer => RawConstant::Integer(cursor.read_i32::<BigEndian>().unwrap()),
        ConstantPoolTag::Float => RawConstant::Float(cursor.read_f32::<BigEndian>().unwrap()),
        ConstantPoolTag::Long => RawConstant::Long(cursor.read_i64::<BigEndian>().unwrap()),
        ConstantPoolTag::Double => RawConstant::Double(cursor.read_f64::<BigEndian>().unwrap()),
        ConstantPoolTag::Class => RawConstant::Class(u2(cursor)),
        ConstantPoolTag::String => RawConstant::String(u2(cursor)),
        ConstantPoolTag::FieldRef
        | ConstantPoolTag::MethodRef
        | ConstantPoolTag::InterfaceMethodRef => RawConstant::Member(tag, u2(cursor), u2(cursor)),
        ConstantPoolTag::NameAndType => RawConstant::NameAndType(u2(cursor), u2(cursor)),
        ConstantPoolTag::MethodHandle => {
            RawConstant::MethodHandle(cursor.read_u8().unwrap(), u2(cursor))
        }
        ConstantPoolTag::MethodType => RawConstant::MethodType(u2(cursor)),
        ConstantPoolTag::Dynamic | ConstantPoolTag::InvokeDynamic => {
            RawConstant::Dynamic(tag, u2(cursor), u2(cursor))
        }
        ConstantPoolTag::Module => RawConstant::Module(u2(cursor)),
        ConstantPoolTag::Package => RawConstant::Package(u2(cursor)),
    }
}

fn read_attributes(cursor: &mut Cursor<&[u8]>) -> Vec<RawAttribute> {
    (0..u2(cursor))
        .map(|_| {
            let name = u2(cursor);
            let mut info = vec![0; cursor.read_u32::<BigEndian>().unwrap() as usize];
            cursor.read_exact(&mut info).unwrap();
            RawAttribute { name, info }
        })
        .collect()
}

fn read_members(cursor: &mut Cursor<&[u8]>) -> Vec<RawMember> {
    (0..u2(cursor))
        .map(|_| RawMember {
            access_flags: u2(cursor),
            name: u2(cursor),
            descriptor: u2(cursor),
            attributes: read_attributes(cursor),
        })
        .collect()
}

/// Decode modified UTF-8 (`0` is two bytes, supplementary characters are surrogate pairs)
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units = vec![];
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i] as u16;
        if b & 0x80 == 0 {
            units.push(b);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            units.push(((b & 0x1F) << 6) | (bytes[i + 1] as u16 & 0x3F));
            i += 2;
        } else {
            units.push(
                ((b & 0x0F) << 12)
                    | ((bytes[i + 1] as u16 & 0x3F) << 6)
                    | (bytes[i + 2] as u16 & 0x3F),
            );
            i += 3;
        }
    }
    char::decode_utf16(units)
        .map(|c| c.expect("unpaired surrogate"))
        .collect()
}
