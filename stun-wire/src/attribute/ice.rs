// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;

use byteorder::{BigEndian, ByteOrder};

use crate::message::StunParseError;

use super::{Attribute, AttributeStaticType, AttributeType, AttributeWrite, RawAttribute};

/// The Priority [`Attribute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    priority: u32,
}

impl AttributeStaticType for Priority {
    const TYPE: AttributeType = AttributeType(0x0024);
}
impl Attribute for Priority {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        4
    }
}
impl AttributeWrite<'_> for Priority {
    fn write_inline(&self, dest: &mut [u8]) -> usize {
        BigEndian::write_u32(&mut dest[..4], self.priority);
        4
    }
}

impl TryFrom<&RawAttribute<'_>> for Priority {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, 4..=4)?;
        Ok(Self {
            priority: BigEndian::read_u32(&raw.value[..4]),
        })
    }
}

impl Priority {
    /// Create a new Priority [`Attribute`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::*;
    /// let priority = Priority::new(1234);
    /// assert_eq!(priority.priority(), 1234);
    /// ```
    pub fn new(priority: u32) -> Self {
        Self { priority }
    }

    /// Retrieve the priority value
    pub fn priority(&self) -> u32 {
        self.priority
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", Self::TYPE, self.priority)
    }
}

/// The UseCandidate [`Attribute`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UseCandidate {}

impl AttributeStaticType for UseCandidate {
    const TYPE: AttributeType = AttributeType(0x0025);
}
impl Attribute for UseCandidate {
    fn get_type(&self) -> AttributeType {
        Self::TYPE
    }

    fn length(&self) -> u16 {
        0
    }
}
impl AttributeWrite<'_> for UseCandidate {
    fn write_inline(&self, _dest: &mut [u8]) -> usize {
        0
    }
}

impl TryFrom<&RawAttribute<'_>> for UseCandidate {
    type Error = StunParseError;

    fn try_from(raw: &RawAttribute) -> Result<Self, Self::Error> {
        raw.check_type_and_len(Self::TYPE, 0..=0)?;
        Ok(Self {})
    }
}

impl UseCandidate {
    /// Create a new UseCandidate [`Attribute`]
    pub fn new() -> Self {
        Self {}
    }
}

impl std::fmt::Display for UseCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::TYPE)
    }
}

macro_rules! tie_breaker_attribute {
    ($name:ident, $atype:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            tie_breaker: u64,
        }

        impl AttributeStaticType for $name {
            const TYPE: AttributeType = AttributeType($atype);
        }

        impl Attribute for $name {
            fn get_type(&self) -> AttributeType {
                Self::TYPE
            }

            fn length(&self) -> u16 {
                8
            }
        }

        impl AttributeWrite<'_> for $name {
            fn write_inline(&self, dest: &mut [u8]) -> usize {
                BigEndian::write_u64(&mut dest[..8], self.tie_breaker);
                8
            }
        }

        impl TryFrom<&RawAttribute<'_>> for $name {
            type Error = StunParseError;

            fn try_from(raw: &RawAttribute) -> Result<Self, Self::Error> {
                raw.check_type_and_len(Self::TYPE, 8..=8)?;
                Ok(Self {
                    tie_breaker: BigEndian::read_u64(&raw.value[..8]),
                })
            }
        }

        impl $name {
            /// Create a new attribute with the provided tie breaker value
            pub fn new(tie_breaker: u64) -> Self {
                Self { tie_breaker }
            }

            /// Retrieve the tie breaker value
            pub fn tie_breaker(&self) -> u64 {
                self.tie_breaker
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}: {:#x}", Self::TYPE, self.tie_breaker)
            }
        }
    };
}

tie_breaker_attribute!(IceControlled, 0x8029, "The IceControlled [`Attribute`]");
tie_breaker_attribute!(IceControlling, 0x802A, "The IceControlling [`Attribute`]");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ICE_REQUEST;
    use tracing::trace;

    #[test]
    fn priority() {
        let _log = crate::tests::test_init_log();
        let raw = RawAttribute::from_bytes(&ICE_REQUEST[60..]).unwrap();
        let priority = Priority::try_from(&raw).unwrap();
        trace!("{priority}");
        assert_eq!(priority.priority(), 0x6e7f1eff);
        let mut dest = [0; 8];
        assert_eq!(priority.write_inline(&mut dest), 4);
        assert_eq!(dest[..4], ICE_REQUEST[64..68]);

        let raw = RawAttribute::new(Priority::TYPE, &[1, 2, 3]);
        assert!(matches!(
            Priority::try_from(&raw),
            Err(StunParseError::Truncated {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn use_candidate() {
        let _log = crate::tests::test_init_log();
        let raw = RawAttribute::from_bytes(&ICE_REQUEST[56..]).unwrap();
        let use_candidate = UseCandidate::try_from(&raw).unwrap();
        trace!("{use_candidate}");
        assert_eq!(use_candidate.length(), 0);
        let raw = RawAttribute::new(UseCandidate::TYPE, &[1]);
        assert!(matches!(
            UseCandidate::try_from(&raw),
            Err(StunParseError::TooLarge {
                expected: 0,
                actual: 1
            })
        ));
    }

    #[test]
    fn tie_breakers() {
        let _log = crate::tests::test_init_log();
        let raw = RawAttribute::from_bytes(&ICE_REQUEST[44..]).unwrap();
        let controlling = IceControlling::try_from(&raw).unwrap();
        trace!("{controlling}");
        assert_eq!(controlling.tie_breaker(), 0x6eee_c6e9_7d18_395c);
        assert!(matches!(
            IceControlled::try_from(&raw),
            Err(StunParseError::WrongAttributeImplementation)
        ));

        let controlled = IceControlled::new(0x0102_0304_0506_0708);
        let mut dest = [0; 8];
        assert_eq!(controlled.write_inline(&mut dest), 8);
        assert_eq!(dest, [1, 2, 3, 4, 5, 6, 7, 8]);
        let raw = RawAttribute::new(IceControlled::TYPE, &dest);
        assert_eq!(IceControlled::try_from(&raw).unwrap(), controlled);
    }
}
