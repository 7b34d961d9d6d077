use super::{names, write_table, AttributeTableEncoder, CountWidth};
use crate::jvm::constants::{
    ClassConstantIndex, ConstantsPool, ModuleConstantIndex, PackageConstantIndex,
    Utf8ConstantIndex,
};
use crate::jvm::{Error, ExportsAccessFlags, ModuleAccessFlags, RequiresAccessFlags};
use crate::util::BlobBuilder;

/// Contents of the `Module` attribute of a `module-info` class
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.25
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ModuleAttribute {
    pub name: ModuleConstantIndex,
    pub flags: ModuleAccessFlags,

    /// Version of the module (`NONE` if there is no version)
    pub version: Utf8ConstantIndex,
    pub requires: Vec<Requires>,
    pub exports: Vec<Exports>,
    pub opens: Vec<Exports>,

    /// Service interfaces the module uses
    pub uses: Vec<ClassConstantIndex>,
    pub provides: Vec<Provides>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Requires {
    pub module: ModuleConstantIndex,
    pub flags: RequiresAccessFlags,
    pub version: Utf8ConstantIndex,
}

/// Entry of the `exports` or `opens` tables
///
/// An empty `to` list means the package is exported (or opened) to every module.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Exports {
    pub package: PackageConstantIndex,
    pub flags: ExportsAccessFlags,
    pub to: Vec<ModuleConstantIndex>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Provides {
    /// Service interface
    pub service: ClassConstantIndex,

    /// Implementations of the service
    pub with: Vec<ClassConstantIndex>,
}

fn write_exports(
    buffer: &mut BlobBuilder,
    table: &'static str,
    exports: &[Exports],
) -> Result<(), Error> {
    write_table(buffer, CountWidth::U2, table, exports, |buffer, export| {
        buffer.push_u16(export.package.slot());
        export.flags.push_to(buffer);
        write_table(buffer, CountWidth::U2, table, &export.to, |buffer, module| {
            buffer.push_u16(module.slot());
            Ok(())
        })
    })
}

impl<'a> AttributeTableEncoder<'a> {
    pub fn module(
        &mut self,
        pool: &mut ConstantsPool,
        module: &ModuleAttribute,
    ) -> Result<(), Error> {
        let name = pool.get_utf8(names::MODULE)?;
        let mut body = BlobBuilder::new();
        body.push_u16(module.name.slot());
        module.flags.push_to(&mut body);
        body.push_u16(module.version.slot());

        write_table(
            &mut body,
            CountWidth::U2,
            "requires",
            &module.requires,
            |buffer, requires| {
                buffer.push_u16(requires.module.slot());
                requires.flags.push_to(buffer);
                buffer.push_u16(requires.version.slot());
                Ok(())
            },
        )?;
        write_exports(&mut body, "exports", &module.exports)?;
        write_exports(&mut body, "opens", &module.opens)?;
        write_table(&mut body, CountWidth::U2, "uses", &module.uses, |buffer, uses| {
            buffer.push_u16(uses.slot());
            Ok(())
        })?;
        write_table(
            &mut body,
            CountWidth::U2,
            "provides",
            &module.provides,
            |buffer, provides| {
                buffer.push_u16(provides.service.slot());
                write_table(
                    buffer,
                    CountWidth::U2,
                    "provides_with",
                    &provides.with,
                    |buffer, with| {
                        buffer.push_u16(with.slot());
                        Ok(())
                    },
                )
            },
        )?;

        self.attribute(name, body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::Version;

    #[test]
    fn module_attribute() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA9);
        let this = pool.get_module("com.example")?;
        let base = pool.get_module("java.base")?;
        let api = pool.get_package("com/example/api")?;
        let service = pool.get_class("com/example/api/Service")?;
        let implementation = pool.get_class("com/example/Impl")?;

        let module = ModuleAttribute {
            name: this,
            flags: ModuleAccessFlags::OPEN,
            version: Utf8ConstantIndex::NONE,
            requires: vec![Requires {
                module: base,
                flags: RequiresAccessFlags::MANDATED,
                version: Utf8ConstantIndex::NONE,
            }],
            exports: vec![Exports {
                package: api,
                flags: ExportsAccessFlags::empty(),
                to: vec![base],
            }],
            opens: vec![],
            uses: vec![service],
            provides: vec![Provides {
                service,
                with: vec![implementation],
            }],
        };

        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.module(&mut pool, &module)?;

        let (m, b, a, s, i) = (
            this.slot() as u8,
            base.slot() as u8,
            api.slot() as u8,
            service.slot() as u8,
            implementation.slot() as u8,
        );
        assert_eq!(
            &buffer.to_vec()[4..],
            &[
                0, 0, 0, 38, // attribute length
                0, m, 0, 0x20, 0, 0, // name, flags, version
                0, 1, 0, b, 0x80, 0, 0, 0, // requires
                0, 1, 0, a, 0, 0, 0, 1, 0, b, // exports
                0, 0, // opens
                0, 1, 0, s, // uses
                0, 1, 0, s, 0, 1, 0, i, // provides
            ]
        );
        Ok(())
    }

    #[test]
    fn module_constants_need_java9() {
        let mut pool = ConstantsPool::new(Version::JAVA8);
        assert!(matches!(
            pool.get_module("java.base"),
            Err(Error::UnsupportedByVersion { .. })
        ));
    }
}
