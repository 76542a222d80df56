//! Container reader.
//!
//! Reads what [`encode`](crate::encode) writes: the header (magic first),
//! the vocabulary, then tensor records until a clean end of file. An end of
//! file anywhere else means the writer was interrupted and the container is
//! rejected as truncated.

use crate::error::{FormatError, Result};
use crate::header::{HEADER_LEN, ModelHeader};
use crate::tensor::{ElementType, decode_f32, record_len};
use crate::vocab::Vocab;
use std::io::{self, Read};
use std::path::Path;

/// Upper bound on a single vocab token or tensor name.
const MAX_STR_LEN: u64 = 1024 * 1024;
/// Upper bound on tensor rank accepted by the reader.
pub const MAX_RANK: i32 = 8;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One tensor record as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorRecord {
    pub name: String,
    pub element_type: ElementType,
    /// Logical shape, outermost axis first.
    pub shape: Vec<usize>,
    /// Raw little-endian payload.
    pub data: Vec<u8>,
}

impl TensorRecord {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Dimensions in on-disk order (innermost axis first).
    pub fn disk_dims(&self) -> Vec<usize> {
        self.shape.iter().rev().copied().collect()
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Payload decoded to f32 values.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        decode_f32(self.element_type, &self.data)
    }

    /// Encoded size of the record.
    pub fn encoded_len(&self) -> usize {
        record_len(self.rank(), self.name.len(), self.data.len())
    }
}

// ---------------------------------------------------------------------------
// Streaming reader
// ---------------------------------------------------------------------------

/// Read the 36-byte header.
pub fn read_header<R: Read>(r: &mut R) -> Result<ModelHeader> {
    let mut buf = [0u8; HEADER_LEN];
    let n = read_full(r, &mut buf)?;
    ModelHeader::parse(&buf[..n])
}

/// Sequential reader over a container.
///
/// Header and vocab are read on construction; tensor records are then pulled
/// one at a time with [`next_record`](Self::next_record) or
/// [`records`](Self::records).
pub struct ModelReader<R> {
    inner: R,
    header: ModelHeader,
    vocab: Vocab,
}

impl<R: Read> ModelReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let header = read_header(&mut inner)?;
        let vocab = read_vocab(&mut inner, header.vocab_len()?)?;
        Ok(Self { inner, header, vocab })
    }

    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Next tensor record, or `None` at a clean end of file.
    pub fn next_record(&mut self) -> Result<Option<TensorRecord>> {
        let mut first = [0u8; 4];
        match read_full(&mut self.inner, &mut first)? {
            0 => return Ok(None),
            4 => {}
            _ => return Err(FormatError::Truncated("tensor record header")),
        }
        let n_dims = i32::from_le_bytes(first);
        let name_len = read_i32(&mut self.inner, "tensor record header")?;
        let type_code = read_i32(&mut self.inner, "tensor record header")?;

        if n_dims < 0 {
            return Err(FormatError::NegativeField { what: "tensor rank", value: n_dims });
        }
        if n_dims > MAX_RANK {
            return Err(FormatError::RankTooLarge(n_dims));
        }

        let mut disk_dims = Vec::with_capacity(n_dims as usize);
        for _ in 0..n_dims {
            let d = read_i32(&mut self.inner, "tensor dimensions")?;
            let d = usize::try_from(d)
                .map_err(|_| FormatError::NegativeField { what: "tensor dimension", value: d })?;
            disk_dims.push(d);
        }

        let name = read_string(&mut self.inner, name_len, "tensor name")?;
        let element_type = ElementType::from_code(type_code)
            .ok_or_else(|| FormatError::UnknownElementType { name: name.clone(), code: type_code })?;

        let payload_len = disk_dims
            .iter()
            .try_fold(element_type.element_size(), |acc, &d| acc.checked_mul(d))
            .ok_or(FormatError::Malformed("tensor payload size overflows"))?;
        // Grows with the bytes actually present, so corrupt dims cannot force
        // a huge allocation.
        let mut data = Vec::new();
        (&mut self.inner).take(payload_len as u64).read_to_end(&mut data)?;
        if data.len() != payload_len {
            return Err(FormatError::Truncated("tensor payload"));
        }

        disk_dims.reverse();
        Ok(Some(TensorRecord { name, element_type, shape: disk_dims, data }))
    }

    /// Iterate the remaining tensor records.
    pub fn records(&mut self) -> impl Iterator<Item = Result<TensorRecord>> + '_ {
        std::iter::from_fn(move || self.next_record().transpose())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Read `count` length-prefixed tokens.
pub fn read_vocab<R: Read>(r: &mut R, count: usize) -> Result<Vocab> {
    let mut tokens = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let len = read_i32(r, "vocab entry")?;
        tokens.push(read_string(r, len, "vocab entry")?);
    }
    Ok(Vocab::from_ordered(tokens))
}

// ---------------------------------------------------------------------------
// Whole-file access
// ---------------------------------------------------------------------------

/// A fully decoded container.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub header: ModelHeader,
    pub vocab: Vocab,
    pub tensors: Vec<TensorRecord>,
}

impl Container {
    /// Decode a container held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ModelReader::new(bytes)?;
        let tensors = reader.records().collect::<Result<Vec<_>>>()?;
        Ok(Self { header: reader.header, vocab: reader.vocab, tensors })
    }

    /// Memory-map a container file and decode it.
    ///
    /// The mapping is released before this returns.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before returning; the
        // file is not modified while it is mapped by this process.
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        Self::from_bytes(&mmap[..])
    }

    /// Look up a tensor by its stored name.
    pub fn tensor(&self, name: &str) -> Option<&TensorRecord> {
        self.tensors.iter().find(|t| t.name == name)
    }

    /// Encoded size of the whole container.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + self.vocab.encoded_len()
            + self.tensors.iter().map(TensorRecord::encoded_len).sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read until `buf` is full or EOF; returns bytes read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FormatError::Truncated(what),
        _ => FormatError::Io(e),
    })
}

fn read_i32<R: Read>(r: &mut R, what: &'static str) -> Result<i32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b, what)?;
    Ok(i32::from_le_bytes(b))
}

fn read_string<R: Read>(r: &mut R, len: i32, what: &'static str) -> Result<String> {
    let len = u64::try_from(len).map_err(|_| FormatError::NegativeField { what, value: len })?;
    if len > MAX_STR_LEN {
        return Err(FormatError::StringTooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    read_exact(r, &mut buf, what)?;
    String::from_utf8(buf).map_err(|_| FormatError::InvalidUtf8(what.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FormatType;

    fn header_bytes(vocab_size: i32) -> Vec<u8> {
        ModelHeader {
            vocab_size,
            max_position_embeddings: 4,
            hidden_size: 2,
            intermediate_size: 4,
            num_attention_heads: 1,
            num_hidden_layers: 1,
            format_type: FormatType::Full,
            num_labels: 1,
        }
        .to_bytes()
        .to_vec()
    }

    fn push_i32(buf: &mut Vec<u8>, v: i32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn reads_hand_built_container() {
        let mut d = header_bytes(1);
        push_i32(&mut d, 3);
        d.extend_from_slice(b"[a]");
        // rank 2, name "w", f32, dims [3, 2] on disk => shape [2, 3]
        push_i32(&mut d, 2);
        push_i32(&mut d, 1);
        push_i32(&mut d, 0);
        push_i32(&mut d, 3);
        push_i32(&mut d, 2);
        d.extend_from_slice(b"w");
        for i in 0..6 {
            d.extend_from_slice(&(i as f32).to_le_bytes());
        }

        let c = Container::from_bytes(&d).unwrap();
        assert_eq!(c.vocab.tokens(), ["[a]"]);
        assert_eq!(c.tensors.len(), 1);
        let w = &c.tensors[0];
        assert_eq!(w.shape, vec![2, 3]);
        assert_eq!(w.disk_dims(), vec![3, 2]);
        assert_eq!(w.to_f32_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(c.encoded_len(), d.len());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut d = header_bytes(0);
        push_i32(&mut d, 1);
        push_i32(&mut d, 1);
        push_i32(&mut d, 0);
        push_i32(&mut d, 4);
        d.extend_from_slice(b"b");
        d.extend_from_slice(&[0u8; 10]);
        let err = Container::from_bytes(&d).unwrap_err();
        assert!(matches!(err, FormatError::Truncated("tensor payload")), "got {err:?}");
    }

    #[test]
    fn huge_dims_are_truncation_not_allocation() {
        let mut d = header_bytes(0);
        push_i32(&mut d, 2);
        push_i32(&mut d, 1);
        push_i32(&mut d, 0);
        push_i32(&mut d, i32::MAX);
        push_i32(&mut d, 1 << 30);
        d.extend_from_slice(b"w");
        let err = Container::from_bytes(&d).unwrap_err();
        assert!(matches!(err, FormatError::Truncated("tensor payload")), "got {err:?}");

        let mut reader = ModelReader::new(&d[..]).unwrap();
        assert!(matches!(reader.next_record(), Err(FormatError::Truncated("tensor payload"))));
    }

    #[test]
    fn partial_record_header_is_truncation() {
        let mut d = header_bytes(0);
        d.extend_from_slice(&[1, 0]);
        let err = Container::from_bytes(&d).unwrap_err();
        assert!(matches!(err, FormatError::Truncated(_)), "got {err:?}");
    }

    #[test]
    fn missing_vocab_is_truncation() {
        let d = header_bytes(2);
        let err = Container::from_bytes(&d).unwrap_err();
        assert!(matches!(err, FormatError::Truncated("vocab entry")), "got {err:?}");
    }

    #[test]
    fn unknown_element_type_is_rejected() {
        let mut d = header_bytes(0);
        push_i32(&mut d, 0);
        push_i32(&mut d, 1);
        push_i32(&mut d, 2);
        d.extend_from_slice(b"q");
        let err = Container::from_bytes(&d).unwrap_err();
        assert!(matches!(err, FormatError::UnknownElementType { code: 2, .. }), "got {err:?}");
    }

    #[test]
    fn header_only_container_has_no_tensors() {
        let c = Container::from_bytes(&header_bytes(0)).unwrap();
        assert!(c.tensors.is_empty());
        assert!(c.vocab.is_empty());
    }
}
