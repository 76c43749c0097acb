//! # Group Parameters
//!
//! Prime `p`, prime `q` dividing `p - 1`, and a generator `g` of the
//! order-`q` subgroup of `Z_p*`. Fixed per process, never sent per message.

use crate::encoding::hex_biguint;
use crate::errors::ZkpError;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// 2048-bit prime modulus, big-endian.
const DEFAULT_P: [u8; 256] = [
    0x83, 0x18, 0x61, 0x99, 0x86, 0xd5, 0xd9, 0x38, 0x07, 0xec, 0x1a, 0x85,
    0xdb, 0xe2, 0x28, 0xe0, 0x96, 0x38, 0x1d, 0x3f, 0x33, 0xd1, 0x8a, 0x07,
    0x0c, 0xf0, 0xef, 0xb1, 0x40, 0xe0, 0x07, 0xbc, 0xa9, 0xd0, 0x3b, 0x4d,
    0xa0, 0xab, 0x52, 0x94, 0xe2, 0x20, 0x4a, 0x02, 0x92, 0xc9, 0x06, 0x30,
    0x83, 0x46, 0x69, 0x2c, 0x48, 0x52, 0x0f, 0x9d, 0x48, 0xa8, 0xbb, 0x26,
    0x5f, 0xb6, 0x1c, 0x92, 0x37, 0x64, 0x08, 0xae, 0x78, 0x83, 0x99, 0xba,
    0xb2, 0x9c, 0x5c, 0xe5, 0x39, 0xca, 0x07, 0x41, 0x8d, 0x0e, 0x22, 0x2c,
    0x07, 0xe0, 0xc1, 0x0f, 0x69, 0x12, 0xbc, 0x10, 0x34, 0x91, 0xa4, 0xce,
    0x5f, 0xe5, 0x19, 0x39, 0x71, 0xa8, 0x57, 0x34, 0xfd, 0xb4, 0x97, 0x92,
    0x1c, 0x43, 0xe8, 0x6a, 0x05, 0x59, 0x2a, 0x9a, 0x01, 0x41, 0xcd, 0x8f,
    0x43, 0x5d, 0x42, 0x89, 0x39, 0x70, 0x8b, 0x70, 0x18, 0xbd, 0x32, 0xa9,
    0xe5, 0x58, 0x72, 0xb5, 0xc5, 0x22, 0xc8, 0xa1, 0x51, 0x16, 0x5b, 0x32,
    0xbf, 0x83, 0xe7, 0xdd, 0xe6, 0xca, 0xd7, 0x0a, 0xc7, 0x25, 0x1e, 0x08,
    0xba, 0x07, 0x94, 0xec, 0x9a, 0x75, 0x40, 0x0c, 0xd6, 0x83, 0x30, 0x2e,
    0x08, 0xf2, 0xd2, 0x1e, 0x68, 0xfc, 0xdc, 0x92, 0xfc, 0x2e, 0x0f, 0x36,
    0x93, 0xd7, 0x83, 0x5f, 0x1c, 0xac, 0xa3, 0xae, 0x88, 0xe7, 0x1f, 0x27,
    0x33, 0x71, 0x73, 0xa7, 0x81, 0x3c, 0x04, 0xa2, 0xb5, 0xf5, 0xbe, 0xb6,
    0x7a, 0x3c, 0x86, 0xc3, 0xbd, 0xe5, 0x95, 0xcf, 0xbb, 0x3c, 0x4e, 0xe2,
    0x08, 0xae, 0x1a, 0xd2, 0xbe, 0x64, 0x96, 0x34, 0xc0, 0x6b, 0x3c, 0xaa,
    0x50, 0x0b, 0x57, 0x77, 0x04, 0x33, 0x6d, 0x1b, 0x6f, 0x61, 0x7e, 0x7c,
    0x6a, 0x10, 0x72, 0x55, 0x93, 0xeb, 0x5c, 0xe8, 0x2d, 0xf4, 0x0e, 0x5b,
    0x4f, 0x26, 0xef, 0xfb,
];

/// 256-bit prime order of the subgroup, big-endian.
const DEFAULT_Q: [u8; 32] = [
    0xec, 0xd4, 0xff, 0x80, 0x91, 0xe5, 0x96, 0x3b, 0xe5, 0xaf, 0x50, 0x62,
    0xb7, 0xc0, 0x6b, 0x95, 0x66, 0xda, 0xeb, 0xc0, 0xb1, 0x67, 0xf2, 0xcb,
    0xc9, 0xac, 0x0c, 0x4b, 0x91, 0xeb, 0x88, 0x3f,
];

/// Generator of the order-`q` subgroup, big-endian.
const DEFAULT_G: [u8; 256] = [
    0x23, 0x45, 0xd8, 0x6d, 0xbf, 0xaa, 0xb9, 0x30, 0x00, 0x03, 0xeb, 0x03,
    0xa3, 0xc4, 0xe7, 0x34, 0x8c, 0x91, 0x05, 0x2a, 0x73, 0x14, 0xc0, 0x8f,
    0x41, 0x07, 0x9d, 0xe1, 0xb6, 0x69, 0x43, 0x4f, 0x64, 0xb0, 0xf5, 0xa4,
    0xdd, 0x9c, 0x19, 0x5e, 0xe0, 0xb0, 0x14, 0xe0, 0xd0, 0xa8, 0x47, 0x89,
    0x73, 0x92, 0x60, 0x98, 0xba, 0x2b, 0x99, 0x89, 0x07, 0x28, 0x61, 0x13,
    0x1a, 0x30, 0xfb, 0xed, 0x71, 0x1a, 0x86, 0x19, 0x5d, 0x85, 0x9f, 0x45,
    0x34, 0xa9, 0x4a, 0x6c, 0xcf, 0x25, 0x39, 0x0c, 0x4d, 0xf8, 0xb5, 0x7e,
    0xc6, 0x0e, 0xaa, 0x2f, 0x0c, 0x0d, 0xc4, 0xb9, 0x3c, 0x5a, 0xff, 0xec,
    0x60, 0xe1, 0xe8, 0xd2, 0x83, 0x0c, 0x4e, 0x5b, 0xce, 0x92, 0x13, 0xed,
    0x0e, 0x31, 0xd8, 0x29, 0xb5, 0x4d, 0xef, 0x57, 0x66, 0x79, 0x4f, 0xd7,
    0xa6, 0x7f, 0xb0, 0xc1, 0x41, 0x4e, 0xab, 0x51, 0x87, 0xcc, 0x97, 0x3e,
    0xb6, 0x47, 0x33, 0x28, 0x9d, 0x5c, 0x2e, 0x9b, 0x3a, 0x04, 0xc7, 0x09,
    0x87, 0xe6, 0x0d, 0xc9, 0x93, 0x66, 0x91, 0x52, 0x6e, 0x3b, 0xac, 0xd5,
    0x48, 0x70, 0x9b, 0xb2, 0xef, 0xfa, 0x6a, 0x2e, 0xc4, 0xb3, 0xfe, 0xff,
    0x00, 0xdf, 0x6f, 0xe8, 0x84, 0x39, 0x40, 0x1b, 0xd1, 0x79, 0x13, 0x5e,
    0xad, 0x23, 0x1a, 0x7e, 0x57, 0xca, 0x12, 0x25, 0x5a, 0xbe, 0x19, 0xe1,
    0x7b, 0x77, 0xb0, 0x44, 0x78, 0x6f, 0xaa, 0x57, 0xa1, 0xbb, 0xb3, 0xd8,
    0x89, 0x10, 0x35, 0x3c, 0x4a, 0x92, 0x02, 0xd5, 0x35, 0x1f, 0xd5, 0xb3,
    0x5f, 0x35, 0x77, 0xa0, 0xe7, 0xe3, 0xd1, 0x9d, 0xc5, 0x4e, 0x2e, 0x53,
    0x00, 0x79, 0xcb, 0x13, 0xfa, 0x69, 0x23, 0x7b, 0xd7, 0x90, 0x32, 0xde,
    0x44, 0x20, 0x4f, 0x88, 0x06, 0x0a, 0x7a, 0xb8, 0x40, 0xc7, 0xd2, 0x9c,
    0x15, 0xba, 0xa0, 0xb5,
];

/// Schnorr group `(p, q, g)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParameters {
    /// Field modulus.
    #[serde(with = "hex_biguint")]
    pub p: BigUint,
    /// Subgroup order.
    #[serde(with = "hex_biguint")]
    pub q: BigUint,
    /// Subgroup generator.
    #[serde(with = "hex_biguint")]
    pub g: BigUint,
}

impl GroupParameters {
    /// Build and validate a group.
    pub fn new(p: BigUint, q: BigUint, g: BigUint) -> Result<Self, ZkpError> {
        let params = Self { p, q, g };
        params.validate()?;
        Ok(params)
    }

    /// Check the subgroup structure.
    ///
    /// Primality of `p` and `q` is not tested; the remaining checks catch
    /// typos and generators outside the subgroup.
    ///
    /// # Errors
    ///
    /// `ZkpError::InvalidGroupParameters` naming the first violated condition.
    pub fn validate(&self) -> Result<(), ZkpError> {
        let one = BigUint::one();

        if self.q <= one {
            return Err(invalid("q must be greater than 1"));
        }
        if self.p <= self.q {
            return Err(invalid("p must be greater than q"));
        }
        if !((&self.p - &one) % &self.q).is_zero() {
            return Err(invalid("q must divide p - 1"));
        }
        if self.g <= one || self.g >= self.p {
            return Err(invalid("g must lie in (1, p)"));
        }
        if !self.g.modpow(&self.q, &self.p).is_one() {
            return Err(invalid("g does not generate the order-q subgroup"));
        }
        Ok(())
    }

    /// Byte length of `p`; group elements are padded to this width before
    /// hashing.
    pub fn element_len(&self) -> usize {
        ((self.p.bits() + 7) / 8) as usize
    }
}

impl Default for GroupParameters {
    /// The built-in 2048-bit group with a 256-bit subgroup.
    fn default() -> Self {
        Self {
            p: BigUint::from_bytes_be(&DEFAULT_P),
            q: BigUint::from_bytes_be(&DEFAULT_Q),
            g: BigUint::from_bytes_be(&DEFAULT_G),
        }
    }
}

fn invalid(reason: &str) -> ZkpError {
    ZkpError::InvalidGroupParameters(reason.to_string())
}
