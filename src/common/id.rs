//! Ring identity: a 160-bit integer on the mod 2^160 identifier circle.

use std::fmt::{self, Debug, Display, Formatter};
use std::net::Ipv4Addr;

/// The size of identities in bytes.
pub const ID_SIZE: usize = 20;

/// The size of identities in bits, and the modulus exponent of the ring.
pub const ID_BITS: usize = ID_SIZE * 8;

/// A node identity or a hashed key on the ring.
///
/// Stored big-endian, so the derived ordering is numeric ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id([u8; ID_SIZE]);

impl Id {
    /// Identity of a peer: SHA-1 over its IPv4 octets followed by the
    /// big-endian port.
    pub fn from_addr(ip: Ipv4Addr, port: u16) -> Id {
        let mut hasher = sha1_smol::Sha1::new();
        hasher.update(&ip.octets());
        hasher.update(&port.to_be_bytes());

        Id(hasher.digest().bytes())
    }

    /// Identity of a key: SHA-1 over its UTF-8 bytes.
    pub fn from_key(key: &str) -> Id {
        let mut hasher = sha1_smol::Sha1::new();
        hasher.update(key.as_bytes());

        Id(hasher.digest().bytes())
    }

    pub const fn from_bytes(bytes: [u8; ID_SIZE]) -> Id {
        Id(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// `self + 2^exp` on the ring. An `exp` of [ID_BITS] or more adds a
    /// multiple of the modulus, returning `self` unchanged.
    pub fn wrapping_add_pow2(&self, exp: usize) -> Id {
        if exp >= ID_BITS {
            return *self;
        }

        let mut bytes = self.0;
        let mut index = ID_SIZE - 1 - exp / 8;
        let mut carry: u16 = 1 << (exp % 8);

        loop {
            let sum = bytes[index] as u16 + carry;
            bytes[index] = sum as u8;
            carry = sum >> 8;

            if carry == 0 || index == 0 {
                // A carry out of the top byte wraps past 2^160 and is dropped.
                break;
            }
            index -= 1;
        }

        Id(bytes)
    }

    /// Bitwise XOR, the distance metric used when resolving finger successors.
    pub fn xor(&self, other: &Id) -> Id {
        let mut out = [0u8; ID_SIZE];
        for (i, (a, b)) in self.0.iter().zip(other.0.iter()).enumerate() {
            out[i] = a ^ b;
        }

        Id(out)
    }

    /// Whether `self` lies in the ring arc `(lo, hi]`, wrapping through zero
    /// when `hi <= lo`. When `lo == hi` the arc is the whole ring.
    pub fn in_interval_oc(&self, lo: &Id, hi: &Id) -> bool {
        if lo < hi {
            lo < self && self <= hi
        } else {
            self > lo || self <= hi
        }
    }

    /// Whether `self` lies in the ring arc `[lo, hi)`, wrapping through zero
    /// when `hi <= lo`. When `lo == hi` the arc is the whole ring.
    pub fn in_interval_co(&self, lo: &Id, hi: &Id) -> bool {
        if lo < hi {
            lo <= self && self < hi
        } else {
            self >= lo || self < hi
        }
    }

    /// Parses the decimal wire rendering back into an identity.
    ///
    /// Returns `None` on empty input, non-digit characters, or values of
    /// 2^160 and above.
    pub fn from_decimal(text: &str) -> Option<Id> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut bytes = [0u8; ID_SIZE];
        for digit in text.bytes() {
            let mut carry = (digit - b'0') as u16;
            for byte in bytes.iter_mut().rev() {
                let acc = *byte as u16 * 10 + carry;
                *byte = acc as u8;
                carry = acc >> 8;
            }
            if carry != 0 {
                return None;
            }
        }

        Some(Id(bytes))
    }

    #[cfg(test)]
    /// Convenience function for working with small identities in tests.
    pub(crate) fn from_u64(raw: u64) -> Id {
        let mut bytes = [0u8; ID_SIZE];
        bytes[ID_SIZE - 8..].copy_from_slice(&raw.to_be_bytes());

        Id(bytes)
    }
}

/// The full decimal expansion, as identities appear on the wire in
/// `Node Hash` and `Key Hash` headers.
impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // Long division by 10^9 over five big-endian u32 limbs.
        let mut limbs = [0u32; 5];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = u32::from_be_bytes([
                self.0[4 * i],
                self.0[4 * i + 1],
                self.0[4 * i + 2],
                self.0[4 * i + 3],
            ]);
        }

        let mut chunks = Vec::with_capacity(6);
        loop {
            let mut rem: u64 = 0;
            let mut all_zero = true;
            for limb in limbs.iter_mut() {
                let acc = (rem << 32) | *limb as u64;
                *limb = (acc / 1_000_000_000) as u32;
                rem = acc % 1_000_000_000;
                if *limb != 0 {
                    all_zero = false;
                }
            }
            chunks.push(rem as u32);
            if all_zero {
                break;
            }
        }

        let mut chunks = chunks.iter().rev();
        if let Some(head) = chunks.next() {
            write!(f, "{head}")?;
        }
        for chunk in chunks {
            write!(f, "{chunk:09}")?;
        }

        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({:x?})", &self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sha1_key_vector() {
        let expected: [u8; ID_SIZE] = [
            0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
            0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
        ];

        assert_eq!(Id::from_key("abc").as_bytes(), &expected);
    }

    #[test]
    fn addr_hash_is_deterministic_and_port_sensitive() {
        let ip = Ipv4Addr::new(127, 0, 0, 1);

        assert_eq!(Id::from_addr(ip, 8000), Id::from_addr(ip, 8000));
        assert_ne!(Id::from_addr(ip, 8000), Id::from_addr(ip, 8001));
        assert_ne!(
            Id::from_addr(ip, 8000),
            Id::from_addr(Ipv4Addr::new(127, 0, 0, 2), 8000)
        );
    }

    #[test]
    fn decimal_display() {
        assert_eq!(Id::from_bytes([0; ID_SIZE]).to_string(), "0");
        assert_eq!(Id::from_u64(7).to_string(), "7");
        assert_eq!(Id::from_u64(u64::MAX).to_string(), u64::MAX.to_string());
        assert_eq!(
            Id::from_bytes([0xff; ID_SIZE]).to_string(),
            "1461501637330902918203684832716283019655932542975"
        );
    }

    #[test]
    fn decimal_round_trip() {
        for id in [
            Id::from_bytes([0; ID_SIZE]),
            Id::from_u64(42),
            Id::from_key("round trip"),
            Id::from_bytes([0xff; ID_SIZE]),
        ] {
            assert_eq!(Id::from_decimal(&id.to_string()), Some(id));
        }

        assert_eq!(Id::from_decimal(""), None);
        assert_eq!(Id::from_decimal("12a"), None);
        // 2^160 is one past the top of the ring.
        assert_eq!(
            Id::from_decimal("1461501637330902918203684832716283019655932542976"),
            None
        );
    }

    #[test]
    fn add_pow2() {
        let zero = Id::from_bytes([0; ID_SIZE]);

        assert_eq!(zero.wrapping_add_pow2(0), Id::from_u64(1));
        assert_eq!(zero.wrapping_add_pow2(63), Id::from_u64(1 << 63));

        let mut top_bit = [0u8; ID_SIZE];
        top_bit[0] = 0x80;
        assert_eq!(zero.wrapping_add_pow2(159), Id::from_bytes(top_bit));

        // Adding the modulus is a no-op.
        let id = Id::from_key("anything");
        assert_eq!(id.wrapping_add_pow2(160), id);
    }

    #[test]
    fn add_pow2_carries_and_wraps() {
        let all_ones = Id::from_bytes([0xff; ID_SIZE]);
        assert_eq!(
            all_ones.wrapping_add_pow2(0),
            Id::from_bytes([0; ID_SIZE]),
            "2^160 - 1 + 1 wraps to zero"
        );

        let id = Id::from_u64(0xff);
        assert_eq!(id.wrapping_add_pow2(0), Id::from_u64(0x100));
    }

    #[test]
    fn interval_open_closed() {
        let (lo, hi) = (Id::from_u64(10), Id::from_u64(20));

        assert!(Id::from_u64(15).in_interval_oc(&lo, &hi));
        assert!(Id::from_u64(20).in_interval_oc(&lo, &hi));
        assert!(!Id::from_u64(10).in_interval_oc(&lo, &hi));
        assert!(!Id::from_u64(25).in_interval_oc(&lo, &hi));

        // Wrapping arc (30, 10].
        let (lo, hi) = (Id::from_u64(30), Id::from_u64(10));
        assert!(Id::from_u64(5).in_interval_oc(&lo, &hi));
        assert!(Id::from_u64(10).in_interval_oc(&lo, &hi));
        assert!(Id::from_u64(35).in_interval_oc(&lo, &hi));
        assert!(!Id::from_u64(30).in_interval_oc(&lo, &hi));
        assert!(!Id::from_u64(20).in_interval_oc(&lo, &hi));

        // Degenerate arc covers the whole ring.
        let point = Id::from_u64(10);
        assert!(Id::from_u64(10).in_interval_oc(&point, &point));
        assert!(Id::from_u64(999).in_interval_oc(&point, &point));
    }

    #[test]
    fn interval_closed_open() {
        let (lo, hi) = (Id::from_u64(10), Id::from_u64(20));

        assert!(Id::from_u64(10).in_interval_co(&lo, &hi));
        assert!(Id::from_u64(15).in_interval_co(&lo, &hi));
        assert!(!Id::from_u64(20).in_interval_co(&lo, &hi));

        // Wrapping arc [30, 10).
        let (lo, hi) = (Id::from_u64(30), Id::from_u64(10));
        assert!(Id::from_u64(30).in_interval_co(&lo, &hi));
        assert!(Id::from_u64(5).in_interval_co(&lo, &hi));
        assert!(!Id::from_u64(10).in_interval_co(&lo, &hi));
        assert!(!Id::from_u64(20).in_interval_co(&lo, &hi));
    }

    #[test]
    fn xor_orders_by_proximity() {
        let target = Id::from_u64(0b1000);

        let near = Id::from_u64(0b1001);
        let far = Id::from_u64(0b0111);
        assert!(near.xor(&target) < far.xor(&target));
    }
}
