//! Tokenization related functionality allowing rust types to be mapped to
//! solidity types.
//!
//! `Vec<u8>` maps to `bytes` and `[u8; N]` to `bytesN`, so a blanket
//! `Tokenize` implementation for vectors and arrays would conflict. The
//! intermediate `TokenizeArray` marker is implemented for every element type
//! except `u8` and only vectors and arrays of `TokenizeArray` types are
//! tokenized as solidity arrays.
//!
//! Multiple arguments or multiple outputs are packed as a tuple. A raw
//! `Token` is its own tokenization, which allows calling methods without any
//! static knowledge of their types.

use std::convert::{TryFrom, TryInto};
use unionpay_common::{abi::Token, TransactionHash};
use web3::types::{Address, U256};

/// A tokenization related error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tokenize::from_token token type doesn't match the rust type.
    #[error("expected a different token type")]
    TypeMismatch,
    /// Tokenize::from_token is called with integer that doesn't fit in the rust type.
    #[error("abi integer does not fit rust integer")]
    IntegerMismatch,
    /// Tokenize::from_token token is fixed bytes with wrong length.
    #[error("expected a different number of fixed bytes")]
    FixedBytesLengthsMismatch,
    /// Tokenize::from_token token is fixed array with wrong length.
    #[error("expected a different number of tokens in fixed array")]
    FixedArrayLengthsMismatch,
    /// Tokenize::from_token token is tuple with wrong length.
    #[error("expected a different number of tokens in tuple")]
    TupleLengthMismatch,
}

/// Rust type and single token conversion.
pub trait Tokenize {
    /// Convert token into Self.
    fn from_token(token: Token) -> Result<Self, Error>
    where
        Self: Sized;

    /// Convert self into token.
    fn into_token(self) -> Token;
}

impl Tokenize for Token {
    fn from_token(token: Token) -> Result<Self, Error> {
        Ok(token)
    }

    fn into_token(self) -> Token {
        self
    }
}

impl Tokenize for Vec<u8> {
    fn from_token(token: Token) -> Result<Self, Error> {
        match token {
            Token::Bytes(bytes) => Ok(bytes),
            _ => Err(Error::TypeMismatch),
        }
    }

    fn into_token(self) -> Token {
        Token::Bytes(self)
    }
}

impl Tokenize for String {
    fn from_token(token: Token) -> Result<Self, Error> {
        match token {
            Token::String(s) => Ok(s),
            _ => Err(Error::TypeMismatch),
        }
    }

    fn into_token(self) -> Token {
        Token::String(self)
    }
}

impl Tokenize for Address {
    fn from_token(token: Token) -> Result<Self, Error> {
        match token {
            Token::Address(data) => Ok(data),
            _ => Err(Error::TypeMismatch),
        }
    }

    fn into_token(self) -> Token {
        Token::Address(self)
    }
}

impl Tokenize for U256 {
    fn from_token(token: Token) -> Result<Self, Error> {
        match token {
            Token::Uint(u256) => Ok(u256),
            _ => Err(Error::TypeMismatch),
        }
    }

    fn into_token(self) -> Token {
        Token::Uint(self)
    }
}

impl Tokenize for TransactionHash {
    fn from_token(token: Token) -> Result<Self, Error> {
        <[u8; 32]>::from_token(token).map(Self)
    }

    fn into_token(self) -> Token {
        self.0.into_token()
    }
}

impl Tokenize for bool {
    fn from_token(token: Token) -> Result<Self, Error> {
        match token {
            Token::Bool(data) => Ok(data),
            _ => Err(Error::TypeMismatch),
        }
    }

    fn into_token(self) -> Token {
        Token::Bool(self)
    }
}

/// Encodes a signed integer as a 256-bit two's complement word.
fn int_to_raw(value: i128) -> U256 {
    let magnitude = U256::from(value.unsigned_abs());
    if value < 0 {
        (!magnitude).overflowing_add(U256::one()).0
    } else {
        magnitude
    }
}

/// Decodes a 256-bit two's complement word, `None` if it does not fit.
fn raw_to_int(raw: U256) -> Option<i128> {
    if raw.bit(255) {
        let magnitude: u128 = (!raw).overflowing_add(U256::one()).0.try_into().ok()?;
        if magnitude > 1 << 127 {
            return None;
        }
        Some((magnitude as i128).wrapping_neg())
    } else {
        let value: u128 = raw.try_into().ok()?;
        i128::try_from(value).ok()
    }
}

macro_rules! uint_tokenize {
    ($($int: ident),*) => {
        $(
            impl Tokenize for $int {
                fn from_token(token: Token) -> Result<Self, Error> {
                    let u256 = match token {
                        Token::Uint(u256) => u256,
                        _ => return Err(Error::TypeMismatch),
                    };
                    u256.try_into().map_err(|_| Error::IntegerMismatch)
                }

                fn into_token(self) -> Token {
                    Token::Uint(self.into())
                }
            }
        )*
    };
}

macro_rules! int_tokenize {
    ($($int: ident),*) => {
        $(
            impl Tokenize for $int {
                fn from_token(token: Token) -> Result<Self, Error> {
                    let raw = match token {
                        Token::Int(raw) => raw,
                        _ => return Err(Error::TypeMismatch),
                    };
                    raw_to_int(raw)
                        .and_then(|value| $int::try_from(value).ok())
                        .ok_or(Error::IntegerMismatch)
                }

                fn into_token(self) -> Token {
                    Token::Int(int_to_raw(self.into()))
                }
            }
        )*
    };
}

uint_tokenize!(u8, u16, u32, u64, u128);
int_tokenize!(i8, i16, i32, i64, i128);

/// Marker trait for `Tokenize` types that are can tokenized to and from a
/// `Token::Array` and `Token:FixedArray`. This is everything except `u8`
/// because `Vec<u8>` and `[u8; N]` directly implement `Tokenize`.
pub trait TokenizeArray: Tokenize {}

macro_rules! single_tokenize_array {
    ($($type: ty,)*) => {
        $(
            impl TokenizeArray for $type {}
        )*
    };
}

single_tokenize_array! {
    Token, String, Address, U256, TransactionHash, Vec<u8>, bool,
    i8, i16, i32, i64, i128, u16, u32, u64, u128,
}

impl<T: TokenizeArray> Tokenize for Vec<T> {
    fn from_token(token: Token) -> Result<Self, Error> {
        match token {
            Token::FixedArray(tokens) | Token::Array(tokens) => {
                tokens.into_iter().map(Tokenize::from_token).collect()
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    fn into_token(self) -> Token {
        Token::Array(self.into_iter().map(Tokenize::into_token).collect())
    }
}

impl<T: TokenizeArray> TokenizeArray for Vec<T> {}

impl<T: TokenizeArray, const N: usize> Tokenize for [T; N] {
    fn from_token(token: Token) -> Result<Self, Error> {
        let tokens = match token {
            Token::FixedArray(tokens) => tokens,
            _ => return Err(Error::TypeMismatch),
        };
        let values = tokens
            .into_iter()
            .map(T::from_token)
            .collect::<Result<Vec<T>, Error>>()?;
        values
            .try_into()
            .map_err(|_| Error::FixedArrayLengthsMismatch)
    }

    fn into_token(self) -> Token {
        Token::FixedArray(self.into_iter().map(T::into_token).collect())
    }
}

impl<T: TokenizeArray, const N: usize> TokenizeArray for [T; N] {}

impl<const N: usize> Tokenize for [u8; N] {
    fn from_token(token: Token) -> Result<Self, Error> {
        match token {
            Token::FixedBytes(bytes) => bytes
                .try_into()
                .map_err(|_| Error::FixedBytesLengthsMismatch),
            _ => Err(Error::TypeMismatch),
        }
    }

    fn into_token(self) -> Token {
        Token::FixedBytes(self.to_vec())
    }
}

impl<const N: usize> TokenizeArray for [u8; N] {}

macro_rules! impl_single_tokenize_for_tuple {
    ($count: expr, $( $ty: ident : $no: tt, )*) => {
        impl<$($ty, )*> TokenizeArray for ($($ty,)*)
        where
            $($ty: Tokenize,)*
        {}

        impl<$($ty, )*> Tokenize for ($($ty,)*)
        where
            $($ty: Tokenize,)*
        {
            fn from_token(token: Token) -> Result<Self, Error>
            {
                let tokens = match token {
                    Token::Tuple(tokens) => tokens,
                    _ => return Err(Error::TypeMismatch),
                };
                if tokens.len() != $count {
                    return Err(Error::TupleLengthMismatch);
                }
                #[allow(unused_variables)]
                #[allow(unused_mut)]
                let mut drain = tokens.into_iter();
                Ok(($($ty::from_token(drain.next().ok_or(Error::TupleLengthMismatch)?)?,)*))
            }

            fn into_token(self) -> Token {
                Token::Tuple(vec![$(self.$no.into_token(),)*])
            }
        }
    }
}

impl_single_tokenize_for_tuple!(0,);
impl_single_tokenize_for_tuple!(1, A:0, );
impl_single_tokenize_for_tuple!(2, A:0, B:1, );
impl_single_tokenize_for_tuple!(3, A:0, B:1, C:2, );
impl_single_tokenize_for_tuple!(4, A:0, B:1, C:2, D:3, );
impl_single_tokenize_for_tuple!(5, A:0, B:1, C:2, D:3, E:4, );
impl_single_tokenize_for_tuple!(6, A:0, B:1, C:2, D:3, E:4, F:5, );
impl_single_tokenize_for_tuple!(7, A:0, B:1, C:2, D:3, E:4, F:5, G:6, );
impl_single_tokenize_for_tuple!(8, A:0, B:1, C:2, D:3, E:4, F:5, G:6, H:7, );
impl_single_tokenize_for_tuple!(9, A:0, B:1, C:2, D:3, E:4, F:5, G:6, H:7, I:8, );
impl_single_tokenize_for_tuple!(10, A:0, B:1, C:2, D:3, E:4, F:5, G:6, H:7, I:8, J:9, );
impl_single_tokenize_for_tuple!(11, A:0, B:1, C:2, D:3, E:4, F:5, G:6, H:7, I:8, J:9, K:10, );
impl_single_tokenize_for_tuple!(12, A:0, B:1, C:2, D:3, E:4, F:5, G:6, H:7, I:8, J:9, K:10, L:11, );

#[cfg(test)]
mod tests {
    use super::*;
    use unionpay_common::abi::{self, ParamType};

    fn assert_single_tokenize_roundtrip<T>(value: T)
    where
        T: Tokenize + Clone + std::fmt::Debug + Eq,
    {
        assert_eq!(value, T::from_token(value.clone().into_token()).unwrap());
    }

    #[test]
    fn single_tokenize_roundtrip() {
        assert_single_tokenize_roundtrip(u8::MIN);
        assert_single_tokenize_roundtrip(u8::MAX);
        assert_single_tokenize_roundtrip(i8::MIN);
        assert_single_tokenize_roundtrip(i8::MAX);
        assert_single_tokenize_roundtrip(u16::MIN);
        assert_single_tokenize_roundtrip(i16::MAX);
        assert_single_tokenize_roundtrip(u32::MIN);
        assert_single_tokenize_roundtrip(i32::MAX);
        assert_single_tokenize_roundtrip(u64::MIN);
        assert_single_tokenize_roundtrip(i64::MIN);
        assert_single_tokenize_roundtrip(u128::MAX);
        assert_single_tokenize_roundtrip(i128::MIN);
        assert_single_tokenize_roundtrip(i128::MAX);
        assert_single_tokenize_roundtrip(U256::zero());
        assert_single_tokenize_roundtrip(U256::MAX);
        assert_single_tokenize_roundtrip(false);
        assert_single_tokenize_roundtrip(true);
        assert_single_tokenize_roundtrip("abcd".to_string());
        assert_single_tokenize_roundtrip(vec![0u8, 1u8, 2u8]);
        assert_single_tokenize_roundtrip([0u8, 1u8, 2u8]);
        assert_single_tokenize_roundtrip(Address::from_low_u64_be(42));
        assert_single_tokenize_roundtrip(TransactionHash::from_low_u64_be(42));
        assert_single_tokenize_roundtrip(());
        assert_single_tokenize_roundtrip((-1i8, 1i8));
        assert_single_tokenize_roundtrip([-1i8, 1i8]);
    }

    #[test]
    fn tokenize_bytes() {
        assert!(matches!([0u8].into_token(), Token::FixedBytes(_)));
        assert!(matches!(vec![0u8].into_token(), Token::Bytes(_)));
        assert!(matches!(
            <[u8; 4]>::from_token(Token::FixedBytes(vec![0; 3])),
            Err(Error::FixedBytesLengthsMismatch)
        ));
    }

    #[test]
    fn signed_integers_are_twos_complement() {
        assert_eq!((-1i8).into_token(), Token::Int(U256::MAX));
        assert_eq!(42i32.into_token(), Token::Int(42.into()));
        assert_eq!(i64::from_token(Token::Int(U256::MAX)).unwrap(), -1);
        assert!(matches!(
            i8::from_token((-129i16).into_token()),
            Err(Error::IntegerMismatch)
        ));
        assert!(matches!(
            i128::from_token(Token::Int(U256::one() << 200)),
            Err(Error::IntegerMismatch)
        ));
    }

    #[test]
    fn unsigned_integer_overflow() {
        assert!(matches!(
            u8::from_token(Token::Uint(256.into())),
            Err(Error::IntegerMismatch)
        ));
        assert!(matches!(
            u8::from_token(Token::Int(1.into())),
            Err(Error::TypeMismatch)
        ));
    }

    #[test]
    fn tuple_length_mismatch() {
        assert!(matches!(
            <(bool, bool)>::from_token(Token::Tuple(vec![Token::Bool(true)])),
            Err(Error::TupleLengthMismatch)
        ));
    }

    #[test]
    fn raw_tokens_are_identity() {
        let token = Token::Tuple(vec![Token::Bool(true), Token::Uint(1.into())]);
        assert_eq!(token.clone().into_token(), token);
        assert_eq!(Token::from_token(token.clone()).unwrap(), token);
    }

    #[test]
    fn complex() {
        let rust = (vec![[(0u8, 1i8)]], false);
        let token = Token::Tuple(vec![
            Token::Array(vec![Token::FixedArray(vec![Token::Tuple(vec![
                Token::Uint(0.into()),
                Token::Int(1.into()),
            ])])]),
            Token::Bool(false),
        ]);
        assert_eq!(rust.clone().into_token(), token);
        assert_single_tokenize_roundtrip(rust);
    }

    #[test]
    fn abi_roundtrip_static_and_dynamic() {
        type Params = (Address, U256, String, Vec<u8>, [u8; 32], Vec<u32>, i64);

        let value: Params = (
            Address::from_low_u64_be(7),
            U256::from(1_000_000u64),
            "i-o-p".to_string(),
            vec![0xdeu8, 0xad, 0xbe, 0xef],
            [1u8; 32],
            vec![1u32, 2, 3],
            -5i64,
        );
        let types = [
            ParamType::Address,
            ParamType::Uint(256),
            ParamType::String,
            ParamType::Bytes,
            ParamType::FixedBytes(32),
            ParamType::Array(Box::new(ParamType::Uint(32))),
            ParamType::Int(64),
        ];

        let tokens = match value.clone().into_token() {
            Token::Tuple(tokens) => tokens,
            _ => unreachable!(),
        };
        let encoded = abi::encode(&tokens);
        let decoded = abi::decode(&types, &encoded).unwrap();

        assert_eq!(Params::from_token(Token::Tuple(decoded)).unwrap(), value);
    }
}
