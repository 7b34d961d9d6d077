use super::Serialize;
use byteorder::WriteBytesExt;
use std::fmt;
use std::io::Result;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
///
/// Ordering compares the major version first.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// JVM class file version corresponding to JDK 1.1 (and also 1.0.2)
    pub const JAVA1_1: Version = Version::new(45, 3);

    /// JVM class file version corresponding to J2SE 1.4 (released February 2002)
    pub const JAVA1_4: Version = Version::new(48, 0);

    /// JVM class file version corresponding to Java SE 6 (released December 2006)
    pub const JAVA6: Version = Version::new(50, 0);

    /// JVM class file version corresponding to Java SE 7 (released July 2011)
    pub const JAVA7: Version = Version::new(51, 0);

    /// JVM class file version corresponding to Java SE 8 (released March 2014)
    pub const JAVA8: Version = Version::new(52, 0);

    /// JVM class file version corresponding to Java SE 9 (released September 2017)
    pub const JAVA9: Version = Version::new(53, 0);

    /// JVM class file version corresponding to Java SE 11 (released September 2018)
    pub const JAVA11: Version = Version::new(55, 0);

    /// JVM class file version corresponding to Java SE 17 (released September 2021)
    pub const JAVA17: Version = Version::new(61, 0);

    pub const fn new(major_version: u16, minor_version: u16) -> Version {
        Version {
            major_version,
            minor_version,
        }
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major_version, self.minor_version)
    }
}
