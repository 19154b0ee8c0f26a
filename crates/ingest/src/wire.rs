//! 길이 인코딩 레코드 프로토콜 — 엔진 프로세스 stdin의 와이어 형식
//!
//! 레코드 하나는 빅엔디언 u32 필드 수 N, 이어서 N개의 (빅엔디언 u32
//! 바이트 길이, UTF-8 페이로드) 쌍입니다. 구분자와 패딩은 없습니다.
//! 스트림의 첫 레코드는 필드 *이름*들의 헤더 레코드이며, 이후 모든
//! 데이터 레코드는 헤더와 동일한 필드 수를 가집니다.

use bytes::{BufMut, BytesMut};

/// 길이 인코딩 레코드 작성기
///
/// 레코드 하나를 내부 버퍼에 인코딩한 뒤 한 번의 write로 내보냅니다.
pub struct LengthEncodedWriter<W: std::io::Write> {
    inner: W,
    buf: BytesMut,
}

impl<W: std::io::Write> LengthEncodedWriter<W> {
    /// 주어진 싱크 위에 작성기를 만듭니다.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(1024),
        }
    }

    /// 레코드 하나를 인코딩하여 씁니다.
    pub fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) -> std::io::Result<()> {
        self.buf.clear();
        encode_record(&mut self.buf, fields);
        self.inner.write_all(&self.buf)
    }

    /// 싱크를 플러시합니다.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    /// 내부 싱크를 돌려받습니다.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// 레코드 하나를 버퍼에 인코딩합니다.
pub fn encode_record<S: AsRef<str>>(buf: &mut BytesMut, fields: &[S]) {
    buf.put_u32(fields.len() as u32);
    for field in fields {
        let bytes = field.as_ref().as_bytes();
        buf.put_u32(bytes.len() as u32);
        buf.put_slice(bytes);
    }
}

/// 와이어 디코딩 실패
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    /// 선언된 길이에 비해 입력이 짧음
    #[error("truncated record: need {need} more bytes")]
    Truncated { need: usize },

    /// UTF-8이 아닌 필드 페이로드
    #[error("field payload is not valid UTF-8")]
    InvalidUtf8,
}

/// 입력 앞쪽에서 레코드 하나를 디코딩합니다.
///
/// 입력이 비어 있으면 `Ok(None)`을 반환하고, 소비한 바이트만큼
/// 슬라이스를 전진시킵니다. 테스트와 퍼징에서 사용합니다.
pub fn decode_record(input: &mut &[u8]) -> Result<Option<Vec<String>>, WireError> {
    if input.is_empty() {
        return Ok(None);
    }

    let field_count = read_u32(input)? as usize;
    let mut fields = Vec::with_capacity(field_count.min(1024));
    for _ in 0..field_count {
        let len = read_u32(input)? as usize;
        if input.len() < len {
            return Err(WireError::Truncated {
                need: len - input.len(),
            });
        }
        let (payload, rest) = input.split_at(len);
        let field = std::str::from_utf8(payload).map_err(|_| WireError::InvalidUtf8)?;
        fields.push(field.to_owned());
        *input = rest;
    }
    Ok(Some(fields))
}

fn read_u32(input: &mut &[u8]) -> Result<u32, WireError> {
    if input.len() < 4 {
        return Err(WireError::Truncated {
            need: 4 - input.len(),
        });
    }
    let (head, rest) = input.split_at(4);
    *input = rest;
    Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn record_roundtrip_preserves_order_and_lengths() {
        let fields = ["1350824400", "DJA", "622", "flightcentre"];
        let mut writer = LengthEncodedWriter::new(Vec::new());
        writer.write_record(&fields).unwrap();
        let encoded = writer.into_inner();

        // 4(필드 수) + Σ(4 + utf8 길이)
        let expected_len: usize = 4 + fields.iter().map(|f| 4 + f.len()).sum::<usize>();
        assert_eq!(encoded.len(), expected_len);

        let mut input = encoded.as_slice();
        let decoded = decode_record(&mut input).unwrap().unwrap();
        assert_eq!(decoded, fields);
        assert!(input.is_empty());
    }

    #[test]
    fn header_and_data_records_share_field_count() {
        let mut writer = LengthEncodedWriter::new(Vec::new());
        writer.write_record(&["airline", "responsetime", "time"]).unwrap();
        writer.write_record(&["DJA", "622", "1350824400"]).unwrap();
        writer.write_record(&["JQA", "1742", "1350824401"]).unwrap();
        let encoded = writer.into_inner();

        let mut input = encoded.as_slice();
        let header = decode_record(&mut input).unwrap().unwrap();
        let mut count = 0;
        while let Some(record) = decode_record(&mut input).unwrap() {
            assert_eq!(record.len(), header.len());
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn multibyte_utf8_lengths_are_bytes_not_chars() {
        let mut writer = LengthEncodedWriter::new(Vec::new());
        writer.write_record(&["항공사"]).unwrap();
        let encoded = writer.into_inner();
        // "항공사"는 9바이트
        assert_eq!(u32::from_be_bytes(encoded[4..8].try_into().unwrap()), 9);
    }

    #[test]
    fn truncated_input_reports_missing_bytes() {
        let mut writer = LengthEncodedWriter::new(Vec::new());
        writer.write_record(&["hello"]).unwrap();
        let encoded = writer.into_inner();

        let mut input = &encoded[..encoded.len() - 2];
        assert!(matches!(
            decode_record(&mut input),
            Err(WireError::Truncated { need: 2 })
        ));
    }

    #[test]
    fn empty_input_yields_none() {
        let mut input: &[u8] = &[];
        assert_eq!(decode_record(&mut input).unwrap(), None);
    }

    proptest! {
        /// 인코딩→디코딩은 임의의 필드 목록을 보존한다.
        #[test]
        fn roundtrip_any_fields(fields in proptest::collection::vec(".{0,32}", 0..16)) {
            let mut writer = LengthEncodedWriter::new(Vec::new());
            writer.write_record(&fields).unwrap();
            let encoded = writer.into_inner();
            let mut input = encoded.as_slice();
            let decoded = decode_record(&mut input).unwrap().unwrap();
            prop_assert_eq!(decoded, fields);
        }
    }
}
