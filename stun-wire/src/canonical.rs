// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Canonical message views
//!
//! FINGERPRINT and MESSAGE-INTEGRITY values are computed over a prefix of the message in which the
//! header's length field has been replaced by the length the message has directly after the
//! attribute being computed.  A [`CanonicalView`] is that byte sequence, expressed as a copy of
//! the header followed by borrowed chunks of the body so that nothing needs to be copied or
//! allocated.
//!
//! Outgoing messages ([`MessageBuilder`](crate::builder::MessageBuilder)) and received messages
//! ([`Message`](crate::message::Message)) both construct their views through
//! [`CanonicalView::new`].

use byteorder::{BigEndian, ByteOrder};
use smallvec::SmallVec;

use crate::message::MessageHeader;

/// Maximum number of body chunks stored without allocating.
const INLINE_CHUNKS: usize = 24;

/// A STUN message header followed by a sequence of body chunks
#[derive(Debug, Clone)]
pub struct CanonicalView<'a> {
    header: [u8; MessageHeader::LENGTH],
    body: SmallVec<[&'a [u8]; INLINE_CHUNKS]>,
}

impl<'a> CanonicalView<'a> {
    /// Construct a new [`CanonicalView`] from a message header, the value of the length field to
    /// present in the header and the body chunks following the header.
    ///
    /// Empty chunks are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::canonical::CanonicalView;
    /// let header = [0, 1, 0, 0, 0x21, 0x12, 0xa4, 0x42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
    /// let view = CanonicalView::new(&header, 0x0102, [&[1u8, 2, 3, 4][..], &[][..], &[5, 6, 7, 8][..]]);
    /// assert_eq!(view.len(), 28);
    /// let bytes = view.to_vec();
    /// assert_eq!(&bytes[2..4], &[1, 2]);
    /// assert_eq!(&bytes[20..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    /// ```
    pub fn new(
        header: &[u8; MessageHeader::LENGTH],
        length: u16,
        body: impl IntoIterator<Item = &'a [u8]>,
    ) -> Self {
        let mut header = *header;
        BigEndian::write_u16(&mut header[2..4], length);
        Self {
            header,
            body: body.into_iter().filter(|chunk| !chunk.is_empty()).collect(),
        }
    }

    /// The header as it appears in this view
    pub fn header(&self) -> &[u8; MessageHeader::LENGTH] {
        &self.header
    }

    /// The value of the length field in this view
    pub fn length_field(&self) -> u16 {
        BigEndian::read_u16(&self.header[2..4])
    }

    /// Iterate over all the chunks of this view in order, starting with the header
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> + '_ {
        std::iter::once(&self.header[..]).chain(self.body.iter().copied())
    }

    /// The total number of bytes in this view
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        MessageHeader::LENGTH + self.body.iter().map(|chunk| chunk.len()).sum::<usize>()
    }

    /// Copy the bytes of this view into `dest`.  Returns the number of bytes written or `None`
    /// if `dest` is too small.
    pub fn write_into(&self, dest: &mut [u8]) -> Option<usize> {
        let len = self.len();
        if dest.len() < len {
            return None;
        }
        let mut offset = 0;
        for chunk in self.chunks() {
            dest[offset..offset + chunk.len()].copy_from_slice(chunk);
            offset += chunk.len();
        }
        Some(offset)
    }

    /// Copy the bytes of this view into a new `Vec`
    pub fn to_vec(&self) -> Vec<u8> {
        let mut ret = Vec::with_capacity(self.len());
        for chunk in self.chunks() {
            ret.extend_from_slice(chunk);
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ICE_REQUEST;

    #[test]
    fn length_substitution() {
        let _log = crate::tests::test_init_log();
        let mut header = [0; 20];
        header.copy_from_slice(&ICE_REQUEST[..20]);
        let view = CanonicalView::new(&header, 72, [&ICE_REQUEST[20..68]]);
        assert_eq!(view.length_field(), 72);
        assert_eq!(view.len(), 68);
        let bytes = view.to_vec();
        assert_eq!(&bytes[..2], &ICE_REQUEST[..2]);
        assert_eq!(&bytes[2..4], &[0, 72]);
        assert_eq!(&bytes[4..], &ICE_REQUEST[4..68]);
        // the source header is untouched
        assert_eq!(&header[2..4], &[0, 0x50]);
    }

    #[test]
    fn write_into() {
        let _log = crate::tests::test_init_log();
        let mut header = [0; 20];
        header.copy_from_slice(&ICE_REQUEST[..20]);
        let view = CanonicalView::new(
            &header,
            80,
            [&ICE_REQUEST[20..36], &ICE_REQUEST[36..60], &ICE_REQUEST[60..]],
        );
        let mut dest = [0; 100];
        assert!(view.write_into(&mut dest[..99]).is_none());
        assert_eq!(view.write_into(&mut dest), Some(100));
        assert_eq!(dest, ICE_REQUEST);
        assert_eq!(view.chunks().count(), 4);
    }
}
