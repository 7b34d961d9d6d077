use byteorder::{BigEndian, ByteOrder};
use std::fmt::{Debug, Error as FmtError, Formatter};
use std::io;

/// Region of a [`BlobBuilder`] that was reserved up front and can be written later
///
/// Blobs are plain indices: they do not borrow the builder, so the builder can keep growing while
/// the reservation is outstanding. A blob is only meaningful for the builder that handed it out.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Blob {
    segment: usize,
    start: usize,
    len: usize,
}

impl Blob {
    /// Number of bytes reserved
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Growable, segmented byte sink
///
/// Bytes are appended in big-endian order (as everything in class files is). On top of plain
/// appending, the builder supports:
///
///   - reserving a fixed size region to be patched later (see [`Blob`])
///   - appending another builder wholesale, by taking ownership of its segments instead of
///     copying its bytes
///
/// Segments are only ever added at the end, so a reservation's position never moves.
pub struct BlobBuilder {
    /// Chunks of output, in order (never empty - the last one is where appends go)
    segments: Vec<Vec<u8>>,

    /// Total number of bytes across all segments
    len: usize,
}

impl BlobBuilder {
    pub fn new() -> BlobBuilder {
        BlobBuilder::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> BlobBuilder {
        BlobBuilder {
            segments: vec![Vec::with_capacity(capacity)],
            len: 0,
        }
    }

    /// Total number of bytes written or reserved so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of underlying segments (linking in another builder adds its segments)
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn tail(&mut self) -> &mut Vec<u8> {
        self.segments
            .last_mut()
            .expect("blob builder always has a segment")
    }

    /// Reserve `len` zeroed bytes to be written later
    pub fn reserve_bytes(&mut self, len: usize) -> Blob {
        let segment = self.segments.len() - 1;
        let tail = self.tail();
        let start = tail.len();
        tail.resize(start + len, 0);
        self.len += len;
        Blob {
            segment,
            start,
            len,
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.tail().extend_from_slice(bytes);
        self.len += bytes.len();
    }

    pub fn push_u8(&mut self, value: u8) {
        self.tail().push(value);
        self.len += 1;
    }

    pub fn push_i8(&mut self, value: i8) {
        self.push_u8(value as u8);
    }

    pub fn push_u16(&mut self, value: u16) {
        let mut buf = [0; 2];
        BigEndian::write_u16(&mut buf, value);
        self.push_bytes(&buf);
    }

    pub fn push_i16(&mut self, value: i16) {
        let mut buf = [0; 2];
        BigEndian::write_i16(&mut buf, value);
        self.push_bytes(&buf);
    }

    pub fn push_u32(&mut self, value: u32) {
        let mut buf = [0; 4];
        BigEndian::write_u32(&mut buf, value);
        self.push_bytes(&buf);
    }

    pub fn push_i32(&mut self, value: i32) {
        let mut buf = [0; 4];
        BigEndian::write_i32(&mut buf, value);
        self.push_bytes(&buf);
    }

    pub fn push_i64(&mut self, value: i64) {
        let mut buf = [0; 8];
        BigEndian::write_i64(&mut buf, value);
        self.push_bytes(&buf);
    }

    pub fn push_f32(&mut self, value: f32) {
        let mut buf = [0; 4];
        BigEndian::write_f32(&mut buf, value);
        self.push_bytes(&buf);
    }

    pub fn push_f64(&mut self, value: f64) {
        let mut buf = [0; 8];
        BigEndian::write_f64(&mut buf, value);
        self.push_bytes(&buf);
    }

    /// Write bytes into a reservation, starting `offset` bytes into it
    ///
    /// Panics if the write does not fit in the reservation: that always means the size of some
    /// fixed-width field was miscomputed.
    pub fn patch_at(&mut self, blob: Blob, offset: usize, bytes: &[u8]) {
        assert!(
            offset + bytes.len() <= blob.len,
            "write of {} bytes at {} overflows {}-byte blob",
            bytes.len(),
            offset,
            blob.len
        );
        let start = blob.start + offset;
        self.segments[blob.segment][start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn patch(&mut self, blob: Blob, bytes: &[u8]) {
        self.patch_at(blob, 0, bytes)
    }

    pub fn patch_u8(&mut self, blob: Blob, value: u8) {
        self.patch(blob, &[value])
    }

    pub fn patch_u16(&mut self, blob: Blob, value: u16) {
        let mut buf = [0; 2];
        BigEndian::write_u16(&mut buf, value);
        self.patch(blob, &buf)
    }

    pub fn patch_i16(&mut self, blob: Blob, value: i16) {
        let mut buf = [0; 2];
        BigEndian::write_i16(&mut buf, value);
        self.patch(blob, &buf)
    }

    pub fn patch_u32(&mut self, blob: Blob, value: u32) {
        let mut buf = [0; 4];
        BigEndian::write_u32(&mut buf, value);
        self.patch(blob, &buf)
    }

    pub fn patch_i32(&mut self, blob: Blob, value: i32) {
        let mut buf = [0; 4];
        BigEndian::write_i32(&mut buf, value);
        self.patch(blob, &buf)
    }

    /// Append the entire contents of another builder
    ///
    /// The other builder's segments are moved over rather than copied. Any [`Blob`] reserved
    /// from `other` can no longer be patched.
    pub fn link_suffix(&mut self, other: BlobBuilder) {
        self.len += other.len;
        self.segments
            .extend(other.segments.into_iter().filter(|segment| !segment.is_empty()));

        // Keep appends from landing in a segment we don't own the capacity of
        self.segments.push(Vec::new());
    }

    /// Flatten everything into one contiguous vector
    pub fn to_vec(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.len);
        for segment in &self.segments {
            output.extend_from_slice(segment);
        }
        output
    }

    /// Write out every segment in order
    pub fn write_content_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        for segment in &self.segments {
            writer.write_all(segment)?;
        }
        Ok(())
    }
}

impl Default for BlobBuilder {
    fn default() -> BlobBuilder {
        BlobBuilder::new()
    }
}

/// Writing never fails - this just lets `byteorder` and [`crate::jvm::Serialize`] target a blob
impl io::Write for BlobBuilder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Debug for BlobBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("BlobBuilder")
            .field("len", &self.len)
            .field("segments", &self.segments.len())
            .finish()
    }
}
