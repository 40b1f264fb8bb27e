use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Flags of one entry in a `MethodParameters` attribute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParameterAccessFlag: u16 {
        const FINAL = 0x0010;
        const SYNTHETIC = 0x1000;
        const MANDATED = 0x8000;
    }
}

impl ParameterAccessFlag {
    /// The only flag combinations javac emits for a parameter.
    pub const VALID_COMBINATIONS: [u16; 6] = [0x0000, 0x0010, 0x1000, 0x1010, 0x8000, 0x8010];

    pub fn is_valid_combination(bits: u16) -> bool {
        Self::VALID_COMBINATIONS.contains(&bits)
    }
}

impl MethodAccessFlag {
    /// Number of the public/private/protected bits set.
    pub(crate) fn visibility_count(self) -> u32 {
        (self & (Self::PUBLIC | Self::PRIVATE | Self::PROTECTED))
            .bits()
            .count_ones()
    }
}

impl FieldAccessFlag {
    pub(crate) fn visibility_count(self) -> u32 {
        (self & (Self::PUBLIC | Self::PRIVATE | Self::PROTECTED))
            .bits()
            .count_ones()
    }
}

/// Offset between a Java release number and its class file major version.
pub const JAVA_VERSION_OFFSET: u16 = 44;

pub const OBJECT_CLASS_NAME: &str = "java/lang/Object";

/// Package prefixes of classes shipped with the JDK.
pub const JDK_PACKAGE_PREFIXES: [&str; 5] = ["java/", "javax/", "jdk/", "sun/", "com/sun/"];

pub fn is_jdk_class(class_name: &str) -> bool {
    JDK_PACKAGE_PREFIXES
        .iter()
        .any(|prefix| class_name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_flags() {
        for bits in ParameterAccessFlag::VALID_COMBINATIONS {
            assert!(ParameterAccessFlag::is_valid_combination(bits));
        }
        assert!(!ParameterAccessFlag::is_valid_combination(0x0001));
        assert!(!ParameterAccessFlag::is_valid_combination(0x9010));
    }

    #[test]
    fn test_visibility_count() {
        let flags = MethodAccessFlag::PUBLIC | MethodAccessFlag::STATIC;
        assert_eq!(flags.visibility_count(), 1);
        let flags = MethodAccessFlag::PUBLIC | MethodAccessFlag::PRIVATE;
        assert_eq!(flags.visibility_count(), 2);
    }

    #[test]
    fn test_jdk_class() {
        assert!(is_jdk_class("java/lang/String"));
        assert!(is_jdk_class("com/sun/crypto/provider/AESCrypt"));
        assert!(!is_jdk_class("com/example/Main"));
        assert!(!is_jdk_class("Hello"));
    }
}
