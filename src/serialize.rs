use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub fn encode_to_string<T>(data: &T) -> Result<String, String>
where
    T: Serialize,
{
    let serialized_data = bincode::serialize(data).map_err(|e| e.to_string())?;

    encode_buffer_to_string(&serialized_data)
}

pub fn encode_buffer_to_string(data: &[u8]) -> Result<String, String> {
    use flate2::write::*;
    use flate2::*;
    use std::io::prelude::*;

    let mut compressor = GzEncoder::new(Vec::with_capacity(1024), Compression::default());

    compressor.write_all(data).map_err(|e| e.to_string())?;

    let compressed_data = compressor.finish().map_err(|e| e.to_string())?;

    Ok(STANDARD.encode(compressed_data))
}

pub fn decode_from_string<T>(data: &str) -> Result<T, String>
where
    for<'de> T: Deserialize<'de>,
{
    let decoded_data = decode_buffer_from_string(data)?;

    bincode::deserialize_from(decoded_data.as_slice()).map_err(|e| e.to_string())
}

pub fn decode_buffer_from_string(data: &str) -> Result<Vec<u8>, String> {
    use flate2::read::*;
    use std::io::prelude::*;

    let decoded_data = STANDARD.decode(data).map_err(|e| e.to_string())?;

    let mut decompressor = GzDecoder::new(decoded_data.as_slice());

    let mut decompressed_data = Vec::with_capacity(1024);

    decompressor.read_to_end(&mut decompressed_data).map_err(|e| e.to_string())?;

    Ok(decompressed_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_input_is_an_error_not_a_panic() {
        assert!(decode_from_string::<Vec<u32>>("not base64 at all!").is_err());

        let not_gzip = STANDARD.encode([1u8, 2, 3, 4]);
        assert!(decode_from_string::<Vec<u32>>(&not_gzip).is_err());
    }

    #[test]
    fn encoded_values_are_plain_ascii() {
        let encoded = encode_to_string(&vec![255u8; 2500]).unwrap();

        assert!(encoded.is_ascii());
        assert_eq!(decode_from_string::<Vec<u8>>(&encoded).unwrap(), vec![255u8; 2500]);
    }
}
