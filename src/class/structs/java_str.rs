use std::{borrow::Cow, fmt::Debug};

use cesu8_str::java as cesu8_java;

/// Modified UTF-8 text as stored in class files.
#[derive(Hash, Eq, PartialEq)]
#[repr(transparent)]
pub struct JavaStr {
    inner: [u8],
}

impl JavaStr {
    pub fn new(inner: &[u8]) -> &Self {
        // SAFETY: JavaStr is a transparent wrapper over [u8]
        unsafe { &*(inner as *const [u8] as *const JavaStr) }
    }

    /// Decodes to standard UTF-8, `None` if the bytes are not valid modified UTF-8.
    pub fn to_str(&self) -> Option<Cow<'_, str>> {
        let java_str = cesu8_java::JavaStr::from_java_cesu8(&self.inner).ok()?;
        Some(cesu8_java::from_java_cesu8(java_str))
    }

    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        match self.to_str() {
            Some(s) => s,
            None => String::from_utf8_lossy(&self.inner),
        }
    }

    /// A zero byte or a byte in `0xF0..=0xFF` can never appear in modified UTF-8.
    pub fn has_forbidden_bytes(&self) -> bool {
        self.inner.iter().any(|&b| b == 0 || b >= 0xF0)
    }
}

impl Debug for JavaStr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.to_str_lossy(), f)
    }
}
