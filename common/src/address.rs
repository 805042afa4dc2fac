// common/src/address.rs
//! Base58 wallet addresses.
//!
//! A wallet address is the base58 (Bitcoin alphabet) rendering of the raw
//! 32-byte Ed25519 public key. Leading zero bytes are preserved as leading
//! `'1'` characters, so the encoding is lossless for every byte sequence.
use thiserror::Error;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58 character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("decoded address is {0} bytes, expected 32")]
    InvalidLength(usize),
}

/// Encode bytes as base58
pub fn encode(bytes: &[u8]) -> String {
    let zeros = bytes.iter().take_while(|&&b| b == 0).count();

    // Little-endian base58 digits of the big integer after the zero prefix
    let mut digits: Vec<u8> = Vec::with_capacity((bytes.len() - zeros) * 138 / 100 + 1);
    for &byte in &bytes[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat('1').take(zeros));
    out.extend(digits.iter().rev().map(|&d| ALPHABET[d as usize] as char));
    out
}

/// Decode a base58 string back into bytes
pub fn decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let zeros = input.bytes().take_while(|&c| c == b'1').count();

    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
    for (position, character) in input.chars().enumerate().skip(zeros) {
        let value = digit_value(character)
            .ok_or(AddressError::InvalidCharacter { character, position })?;

        let mut carry = value as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

fn digit_value(character: char) -> Option<u8> {
    if !character.is_ascii() {
        return None;
    }
    ALPHABET
        .iter()
        .position(|&symbol| symbol == character as u8)
        .map(|index| index as u8)
}

/// Wallet address for a raw public key
pub fn address_from_public_key(public_key: &[u8]) -> String {
    encode(public_key)
}

/// Raw 32-byte public key behind a wallet address
pub fn public_key_from_address(address: &str) -> Result<[u8; 32], AddressError> {
    let bytes = decode(address)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| AddressError::InvalidLength(len))
}
