use super::{names, AttributeTableEncoder, CountWidth, TableEncoder};
use crate::jvm::constants::ConstantsPool;
use crate::jvm::Error;
use crate::util::BlobBuilder;

/// Components of a `Record` attribute
///
/// Every component has its own nested attribute table (for its signature, annotations, ...).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.30
pub struct RecordComponentsEncoder<'a> {
    table: TableEncoder<'a>,
}

impl<'a> RecordComponentsEncoder<'a> {
    pub fn component<F>(
        &mut self,
        pool: &mut ConstantsPool,
        name: &str,
        descriptor: &str,
        attributes: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut AttributeTableEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        let name = pool.get_utf8(name)?;
        let descriptor = pool.get_utf8(descriptor)?;
        let buffer = self.table.entry()?;
        buffer.push_u16(name.slot());
        buffer.push_u16(descriptor.slot());
        attributes(&mut AttributeTableEncoder::new(buffer), pool)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<'a> AttributeTableEncoder<'a> {
    /// Add a `Record` attribute, with components added in the callback
    pub fn record<F>(&mut self, pool: &mut ConstantsPool, components: F) -> Result<(), Error>
    where
        F: FnOnce(&mut RecordComponentsEncoder, &mut ConstantsPool) -> Result<(), Error>,
    {
        let name = pool.get_utf8(names::RECORD)?;
        let mut body = BlobBuilder::new();
        let mut encoder = RecordComponentsEncoder {
            table: TableEncoder::new(&mut body, CountWidth::U2, names::RECORD),
        };
        components(&mut encoder, pool)?;
        self.attribute(name, body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::Version;

    #[test]
    fn record_components() -> Result<(), Error> {
        let mut pool = ConstantsPool::new(Version::JAVA17);
        let mut buffer = BlobBuilder::new();
        let mut attributes = AttributeTableEncoder::new(&mut buffer);
        attributes.record(&mut pool, |components, pool| {
            components.component(pool, "x", "I", |_, _| Ok(()))?;
            components.component(pool, "names", "Ljava/util/List;", |nested, pool| {
                nested.signature(pool, "Ljava/util/List<Ljava/lang/String;>;")
            })?;
            assert_eq!(components.len(), 2);
            Ok(())
        })?;

        let x = pool.get_utf8("x")?.slot() as u8;
        let int = pool.get_utf8("I")?.slot() as u8;
        let names = pool.get_utf8("names")?.slot() as u8;
        let list = pool.get_utf8("Ljava/util/List;")?.slot() as u8;
        let signature = pool.get_utf8(super::names::SIGNATURE)?.slot() as u8;
        let generic = pool
            .get_utf8("Ljava/util/List<Ljava/lang/String;>;")?
            .slot() as u8;
        assert_eq!(
            &buffer.to_vec()[4..],
            &[
                0, 0, 0, 22, // attribute length
                0, 2, // component count
                0, x, 0, int, 0, 0, // first component
                0, names, 0, list, 0, 1, // second component
                0, signature, 0, 0, 0, 2, 0, generic,
            ]
        );
        Ok(())
    }
}
