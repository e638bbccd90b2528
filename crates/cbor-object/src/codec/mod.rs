//! Binary encoding/decoding for CBOR (RFC 7049).

pub mod decoder;
pub mod encoder;
pub mod header;
pub mod primitives;
mod refs;

pub use decoder::{
    decode_from_bytes, decode_from_bytes_with, read_value, read_value_with, DecodeOptions,
    Decoder,
};
pub use encoder::{
    encode_value, encode_value_with_options, write_value, write_value_with_options,
    EncodeOptions, Encoder,
};
pub use primitives::{ByteSource, Reader, StreamReader, Writer};
