use super::{names, write_table, AttributeTableEncoder, CountWidth};
use crate::jvm::constants::{
    ConstantsPool, DoubleConstantIndex, FloatConstantIndex, IntegerConstantIndex,
    LongConstantIndex, Utf8ConstantIndex,
};
use crate::jvm::Error;
use crate::util::BlobBuilder;

/// Annotation on a class, field, method, parameter, or type
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.16
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Annotation {
    /// Field descriptor of the annotation type
    pub type_index: Utf8ConstantIndex,
    pub elements: Vec<(Utf8ConstantIndex, ElementValue)>,
}

/// Value of an annotation element
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ElementValue {
    Byte(IntegerConstantIndex),
    Char(IntegerConstantIndex),
    Double(DoubleConstantIndex),
    Float(FloatConstantIndex),
    Int(IntegerConstantIndex),
    Long(LongConstantIndex),
    Short(IntegerConstantIndex),
    Boolean(IntegerConstantIndex),
    String(Utf8ConstantIndex),
    Enum {
        type_name: Utf8ConstantIndex,
        const_name: Utf8ConstantIndex,
    },

    /// Return descriptor of the class (eg. `V` for `void.class`)
    Class(Utf8ConstantIndex),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    pub fn tag(&self) -> u8 {
        match self {
            ElementValue::Byte(_) => b'B',
            ElementValue::Char(_) => b'C',
            ElementValue::Double(_) => b'D',
            ElementValue::Float(_) => b'F',
            ElementValue::Int(_) => b'I',
            ElementValue::Long(_) => b'J',
            ElementValue::Short(_) => b'S',
            ElementValue::Boolean(_) => b'Z',
            ElementValue::String(_) => b's',
            ElementValue::Enum { .. } => b'e',
            ElementValue::Class(_) => b'c',
            ElementValue::Annotation(_) => b'@',
            ElementValue::Array(_) => b'[',
        }
    }

    fn write(&self, buffer: &mut BlobBuilder) -> Result<(), Error> {
        buffer.push_u8(self.tag());
        match self {
            ElementValue::Byte(index)
            | ElementValue::Char(index)
            | ElementValue::Int(index)
            | ElementValue::Short(index)
            | ElementValue::Boolean(index) => buffer.push_u16(index.slot()),
            ElementValue::Double(index) => buffer.push_u16(index.slot()),
            ElementValue::Float(index) => buffer.push_u16(index.slot()),
            ElementValue::Long(index) => buffer.push_u16(index.slot()),
            ElementValue::String(index) | ElementValue::Class(index) => {
                buffer.push_u16(index.slot())
            }
            ElementValue::Enum {
                type_name,
                const_name,
            } => {
                buffer.push_u16(type_name.slot());
                buffer.push_u16(const_name.slot());
            }
            ElementValue::Annotation(annotation) => annotation.write(buffer)?,
            ElementValue::Array(values) => {
                write_table(buffer, CountWidth::U2, "array_value", values, |buffer, value| {
                    value.write(buffer)
                })?
            }
        }
        Ok(())
    }
}

impl Annotation {
    fn write(&self, buffer: &mut BlobBuilder) -> Result<(), Error> {
        buffer.push_u16(self.type_index.slot());
        write_table(
            buffer,
            CountWidth::U2,
            "element_value_pairs",
            &self.elements,
            |buffer, (name, value)| {
                buffer.push_u16(name.slot());
                value.write(buffer)
            },
        )
    }
}

/// Annotation on a type use
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.20
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeAnnotation {
    /// Kind of target (eg. `0x13` for a field type)
    pub target_type: u8,
    pub target_info: TargetInfo,

    /// Steps into the type at which the annotation applies
    pub target_path: Vec<TypePathEntry>,
    pub annotation: Annotation,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TargetInfo {
    TypeParameter {
        index: u8,
    },
    Supertype {
        index: u16,
    },
    TypeParameterBound {
        type_parameter_index: u8,
        bound_index: u8,
    },
    Empty,
    FormalParameter {
        index: u8,
    },
    Throws {
        index: u16,
    },
    LocalVariable(Vec<LocalVariableTarget>),
    Catch {
        exception_table_index: u16,
    },
    Offset {
        offset: u16,
    },
    TypeArgument {
        offset: u16,
        type_argument_index: u8,
    },
}

/// Live range of a local variable targetted by a type annotation
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LocalVariableTarget {
    pub start_pc: u16,
    pub length: u16,
    pub index: u16,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TypePathEntry {
    pub type_path_kind: u8,
    pub type_argument_index: u8,
}

impl TypeAnnotation {
    fn write(&self, buffer: &mut BlobBuilder) -> Result<(), Error> {
        buffer.push_u8(self.target_type);
        match &self.target_info {
            TargetInfo::TypeParameter { index } | TargetInfo::FormalParameter { index } => {
                buffer.push_u8(*index)
            }
            TargetInfo::Supertype { index } | TargetInfo::Throws { index } => {
                buffer.push_u16(*index)
            }
            TargetInfo::TypeParameterBound {
                type_parameter_index,
                bound_index,
            } => {
                buffer.push_u8(*type_parameter_index);
                buffer.push_u8(*bound_index);
            }
            TargetInfo::Empty => (),
            TargetInfo::LocalVariable(ranges) => {
                write_table(buffer, CountWidth::U2, "localvar_target", ranges, |buffer, range| {
                    buffer.push_u16(range.start_pc);
                    buffer.push_u16(range.length);
                    buffer.push_u16(range.index);
                    Ok(())
                })?
            }
            TargetInfo::Catch {
                exception_table_index,
            } => buffer.push_u16(*exception_table_index),
            TargetInfo::Offset { offset } => buffer.push_u16(*offset),
            TargetInfo::TypeArgument {
                offset,
                type_argument_index,
            } => {
                buffer.push_u16(*offset);
                buffer.push_u8(*type_argument_index);
            }
        }
        write_table(
            buffer,
            CountWidth::U1,
            "type_path",
            &self.target_path,
            |buffer, entry| {
                buffer.push_u8(entry.type_path_kind);
                buffer.push_u8(entry.type_argument_index);
                Ok(())
            },
        )?;
        self.annotation.write(buffer)
    }
}

impl<'a> AttributeTableEncoder<'a> {
    fn annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        name: &'static str,
        annotations: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f Annotation>,
    {
        let name_index = pool.get_utf8(name)?;
        let mut body = BlobBuilder::new();
        write_table(&mut body, CountWidth::U2, name, annotations, |buffer, annotation| {
            annotation.write(buffer)
        })?;
        self.attribute(name_index, body)
    }

    fn parameter_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        name: &'static str,
        parameters: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f [Annotation]>,
    {
        let name_index = pool.get_utf8(name)?;
        let mut body = BlobBuilder::new();
        write_table(&mut body, CountWidth::U1, name, parameters, |buffer, annotations| {
            write_table(buffer, CountWidth::U2, "annotations", annotations, |buffer, annotation| {
                annotation.write(buffer)
            })
        })?;
        self.attribute(name_index, body)
    }

    fn type_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        name: &'static str,
        annotations: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f TypeAnnotation>,
    {
        let name_index = pool.get_utf8(name)?;
        let mut body = BlobBuilder::new();
        write_table(&mut body, CountWidth::U2, name, annotations, |buffer, annotation| {
            annotation.write(buffer)
        })?;
        self.attribute(name_index, body)
    }

    pub fn runtime_visible_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        annotations: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f Annotation>,
    {
        self.annotations(pool, names::RUNTIME_VISIBLE_ANNOTATIONS, annotations)
    }

    pub fn runtime_invisible_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        annotations: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f Annotation>,
    {
        self.annotations(pool, names::RUNTIME_INVISIBLE_ANNOTATIONS, annotations)
    }

    /// Add a `RuntimeVisibleParameterAnnotations` attribute (one list per parameter, at most 255)
    pub fn runtime_visible_parameter_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        parameters: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f [Annotation]>,
    {
        self.parameter_annotations(
            pool,
            names::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
            parameters,
        )
    }

    pub fn runtime_invisible_parameter_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        parameters: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f [Annotation]>,
    {
        self.parameter_annotations(
            pool,
            names::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
            parameters,
        )
    }

    pub fn runtime_visible_type_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        annotations: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f TypeAnnotation>,
    {
        self.type_annotations(pool, names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS, annotations)
    }

    pub fn runtime_invisible_type_annotations<'f, I>(
        &mut self,
        pool: &mut ConstantsPool,
        annotations: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'f TypeAnnotation>,
    {
        self.type_annotations(pool, names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS, annotations)
    }

    /// Add an `AnnotationDefault` attribute (on methods of annotation interfaces)
    pub fn annotation_default(
        &mut self,
        pool: &mut ConstantsPool,
        default: &ElementValue,
    ) -> Result<(), Error> {
        let name = pool.get_utf8(names::ANNOTATION_DEFAULT)?;
        let mut body = BlobBuilder::new();
        default.write(&mut body)?;
        self.attribute(name, body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::Version;

    #[test]
    fn nested_annotation() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let retention = pool.get_utf8("Ljava/lang/annotation/Retention;")?;
        let value = pool.get_utf8("value")?;
        let policy = pool.get_utf8("Ljava/lang/annotation/RetentionPolicy;")?;
        let runtime = pool.get_utf8("RUNTIME")?;
        let one = pool.get_integer(1)?;

        let annotation = Annotation {
            type_index: retention,
            elements: vec![
                (
                    value,
                    ElementValue::Enum {
                        type_name: policy,
                        const_name: runtime,
                    },
                ),
                (
                    value,
                    ElementValue::Array(vec![ElementValue::Int(one), ElementValue::Boolean(one)]),
                ),
            ],
        };

        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.runtime_visible_annotations(&mut pool, &[annotation])?;

        let (r, v, p, n, o) = (
            retention.slot() as u8,
            value.slot() as u8,
            policy.slot() as u8,
            runtime.slot() as u8,
            one.slot() as u8,
        );
        assert_eq!(
            &buffer.to_vec()[4..],
            &[
                0, 0, 0, 24, // attribute length
                0, 1, // annotation count
                0, r, 0, 2, // type, pair count
                0, v, b'e', 0, p, 0, n, // enum element
                0, v, b'[', 0, 2, b'I', 0, o, b'Z', 0, o, // array element
            ]
        );
        Ok(())
    }

    #[test]
    fn parameter_annotations_use_narrow_count() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let deprecated = pool.get_utf8("Ljava/lang/Deprecated;")?;
        let first = vec![Annotation {
            type_index: deprecated,
            elements: vec![],
        }];
        let second: Vec<Annotation> = vec![];

        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.runtime_invisible_parameter_annotations(
            &mut pool,
            vec![&first[..], &second[..]],
        )?;

        let d = deprecated.slot() as u8;
        assert_eq!(
            &buffer.to_vec()[4..],
            &[0, 0, 0, 9, 2, 0, 1, 0, d, 0, 0, 0, 0]
        );
        Ok(())
    }

    #[test]
    fn type_annotation() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let non_null = pool.get_utf8("LNonNull;")?;
        let annotation = TypeAnnotation {
            target_type: 0x40,
            target_info: TargetInfo::LocalVariable(vec![LocalVariableTarget {
                start_pc: 2,
                length: 5,
                index: 1,
            }]),
            target_path: vec![TypePathEntry {
                type_path_kind: 3,
                type_argument_index: 0,
            }],
            annotation: Annotation {
                type_index: non_null,
                elements: vec![],
            },
        };

        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.runtime_visible_type_annotations(&mut pool, &[annotation])?;

        let n = non_null.slot() as u8;
        assert_eq!(
            &buffer.to_vec()[4..],
            &[
                0, 0, 0, 18, // attribute length
                0, 1, 0x40, // count, target type
                0, 1, 0, 2, 0, 5, 0, 1, // local variable ranges
                1, 3, 0, // type path
                0, n, 0, 0, // annotation
            ]
        );
        Ok(())
    }

    #[test]
    fn annotation_default() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        let void = pool.get_utf8("V")?;
        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.annotation_default(&mut pool, &ElementValue::Class(void))?;
        assert_eq!(
            &buffer.to_vec()[4..],
            &[0, 0, 0, 3, b'c', 0, void.slot() as u8]
        );
        Ok(())
    }
}
