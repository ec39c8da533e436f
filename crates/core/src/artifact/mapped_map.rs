//! Hash-indexed key-value store over a borrowed buffer.
//!
//! Layout, all little-endian, no padding:
//!
//! ```text
//! buffer_size        : u32
//! number_of_elements : u32
//! hash_table_size    : u32
//! end_pos            : u32             one past the last storage byte
//! index              : (u32, u32) × H  per-bucket (begin, end) offsets
//! storage            : packed          serialized (key, value) records
//! ```
//!
//! Collisions are resolved inside a bucket's contiguous storage region: a
//! lookup hashes the key, reads the bucket's directory entry, and scans that
//! region linearly, comparing keys. Empty buckets store `0xFFFFFFFF` twice.
//! The bucket count is picked at write time as the collision-minimizing prime
//! near the element count, so the average bucket holds about one record.

use std::marker::PhantomData;

use crate::buffer::{BufferReader, BufferWriter};
use crate::error::{Result, TokenizerError};
use crate::Pair;

const HEADER_BYTES: usize = 16;
const BUCKET_ENTRY_BYTES: usize = 8;
const UNKNOWN_OFFSET: u32 = u32::MAX;

/// A value that can be framed into map storage and read back.
///
/// Reads may borrow from the attached buffer (lifetime `'a`), which is how
/// byte-string keys come back as views instead of copies.
pub trait Record<'a>: Sized {
    fn write(&self, writer: &mut BufferWriter<'_>);
    fn read(reader: &mut BufferReader<'a>) -> Result<Self>;
    fn skip(reader: &mut BufferReader<'a>) -> Result<()>;
}

/// A map key: a [`Record`] with a lookup form and a stable hash.
///
/// `Query` is the borrowed form callers look keys up by (`[u8]` for byte
/// strings), decoupled from the buffer lifetime of the stored key.
pub trait MapKey<'a>: Record<'a> {
    type Query: ?Sized;

    /// Hash of a key in query form. Bucket assignment is baked into the
    /// artifact, so this must be identical across platforms and versions.
    fn hash(query: &Self::Query) -> u64;

    fn as_query(&self) -> &Self::Query;

    fn matches(&self, query: &Self::Query) -> bool;
}

impl<'a> Record<'a> for u32 {
    #[inline]
    fn write(&self, writer: &mut BufferWriter<'_>) {
        writer.write_u32(*self);
    }

    #[inline]
    fn read(reader: &mut BufferReader<'a>) -> Result<Self> {
        reader.read_u32()
    }

    #[inline]
    fn skip(reader: &mut BufferReader<'a>) -> Result<()> {
        reader.skip::<u32>()
    }
}

impl<'a> Record<'a> for Pair {
    #[inline]
    fn write(&self, writer: &mut BufferWriter<'_>) {
        writer.write_u32(self.0);
        writer.write_u32(self.1);
    }

    #[inline]
    fn read(reader: &mut BufferReader<'a>) -> Result<Self> {
        Ok((reader.read_u32()?, reader.read_u32()?))
    }

    #[inline]
    fn skip(reader: &mut BufferReader<'a>) -> Result<()> {
        reader.skip_bytes(8)
    }
}

impl<'a> MapKey<'a> for Pair {
    type Query = Pair;

    #[inline]
    fn hash(query: &Pair) -> u64 {
        query.0 as u64 | ((query.1 as u64) << 32)
    }

    #[inline]
    fn as_query(&self) -> &Pair {
        self
    }

    #[inline]
    fn matches(&self, query: &Pair) -> bool {
        self == query
    }
}

impl<'a> Record<'a> for &'a [u8] {
    #[inline]
    fn write(&self, writer: &mut BufferWriter<'_>) {
        writer.write_short_bytes(self);
    }

    #[inline]
    fn read(reader: &mut BufferReader<'a>) -> Result<Self> {
        reader.read_short_bytes()
    }

    #[inline]
    fn skip(reader: &mut BufferReader<'a>) -> Result<()> {
        reader.skip_short_bytes()
    }
}

impl<'a> MapKey<'a> for &'a [u8] {
    type Query = [u8];

    #[inline]
    fn hash(query: &[u8]) -> u64 {
        fnv1a(query)
    }

    #[inline]
    fn as_query(&self) -> &[u8] {
        self
    }

    #[inline]
    fn matches(&self, query: &[u8]) -> bool {
        *self == query
    }
}

impl<'a> Record<'a> for Vec<u32> {
    fn write(&self, writer: &mut BufferWriter<'_>) {
        writer.write_u32(self.len() as u32);
        for &value in self {
            writer.write_u32(value);
        }
    }

    fn read(reader: &mut BufferReader<'a>) -> Result<Self> {
        let len = reader.read_u32()? as usize;
        if len.saturating_mul(4) > reader.remaining() {
            return Err(TokenizerError::Corrupted(format!(
                "vector of {len} u32 overruns {} remaining bytes",
                reader.remaining()
            )));
        }
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(reader.read_u32()?);
        }
        Ok(values)
    }

    fn skip(reader: &mut BufferReader<'a>) -> Result<()> {
        let len = reader.read_u32()? as usize;
        reader.skip_bytes(len.saturating_mul(4))
    }
}

/// 64-bit FNV-1a. The artifact format pins this hash for byte-string keys:
/// it is defined byte-by-byte, so it cannot drift between the writing and
/// the attaching platform.
#[inline]
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes
        .iter()
        .fold(OFFSET_BASIS, |hash, &byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

/// Read-only view over a mapped-map artifact in a borrowed buffer.
pub struct MappedMap<'a, K, V> {
    element_count: u32,
    bucket_count: u32,
    end_pos: u32,
    index: &'a [u8],
    storage: &'a [u8],
    _types: PhantomData<(K, V)>,
}

impl<'a, K: MapKey<'a>, V: Record<'a>> MappedMap<'a, K, V> {
    /// Attach to the artifact at the start of `data`.
    ///
    /// Validates header self-consistency against the buffer and returns the
    /// view together with the number of bytes the artifact occupies.
    pub fn attach(data: &'a [u8]) -> Result<(Self, usize)> {
        let mut reader = BufferReader::new(data);
        let buffer_size = reader.read_u32()? as usize;
        let element_count = reader.read_u32()?;
        let bucket_count = reader.read_u32()?;
        let end_pos = reader.read_u32()?;

        if buffer_size > data.len() {
            return Err(TokenizerError::Corrupted(format!(
                "mapped map claims {buffer_size} bytes, buffer holds {}",
                data.len()
            )));
        }
        if bucket_count == 0 && element_count != 0 {
            return Err(TokenizerError::Corrupted(
                "mapped map has elements but no hash buckets".into(),
            ));
        }
        let storage_start = HEADER_BYTES
            .checked_add((bucket_count as usize).saturating_mul(BUCKET_ENTRY_BYTES))
            .filter(|&start| start <= buffer_size)
            .ok_or_else(|| {
                TokenizerError::Corrupted(format!(
                    "mapped map index ({bucket_count} buckets) overruns {buffer_size} bytes"
                ))
            })?;
        let storage = &data[storage_start..buffer_size];
        if end_pos as usize > storage.len() {
            return Err(TokenizerError::Corrupted(format!(
                "mapped map end_pos {end_pos} outside storage of {} bytes",
                storage.len()
            )));
        }

        let map = Self {
            element_count,
            bucket_count,
            end_pos,
            index: &data[HEADER_BYTES..storage_start],
            storage,
            _types: PhantomData,
        };
        Ok((map, buffer_size))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.element_count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Number of hash buckets in the embedded index.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.bucket_count as usize
    }

    /// Look the key up, scanning its bucket's storage region linearly.
    ///
    /// A missing key is `Ok(None)`; a bucket directory entry pointing outside
    /// the storage region is [`TokenizerError::Corrupted`].
    pub fn get(&self, query: &K::Query) -> Result<Option<V>> {
        if self.element_count == 0 {
            return Ok(None);
        }

        let bucket = (K::hash(query) % self.bucket_count as u64) as usize;
        let entry_pos = bucket * BUCKET_ENTRY_BYTES;
        let mut directory = BufferReader::new(&self.index[entry_pos..entry_pos + BUCKET_ENTRY_BYTES]);

        let begin = directory.read_u32()?;
        if begin == UNKNOWN_OFFSET {
            return Ok(None);
        }
        let end = directory.read_u32()?;
        if begin > end || end > self.end_pos {
            return Err(TokenizerError::Corrupted(format!(
                "bucket {bucket} spans [{begin}, {end}) outside storage of {} bytes",
                self.end_pos
            )));
        }

        let mut reader = BufferReader::new(&self.storage[begin as usize..end as usize]);
        while reader.remaining() > 0 {
            let key = K::read(&mut reader)?;
            if key.matches(query) {
                return Ok(Some(V::read(&mut reader)?));
            }
            V::skip(&mut reader)?;
        }
        Ok(None)
    }

    pub fn contains(&self, query: &K::Query) -> Result<bool> {
        Ok(self.get(query)?.is_some())
    }

    /// Iterate all records in storage order.
    pub fn iter(&self) -> MapIter<'a, K, V> {
        MapIter {
            reader: BufferReader::new(&self.storage[..self.end_pos as usize]),
            failed: false,
            _types: PhantomData,
        }
    }

    /// Serialize `entries` as a mapped-map artifact appended to `buffer`;
    /// returns the artifact's size in bytes.
    pub fn write_to_buffer<'e, I>(entries: I, buffer: &mut Vec<u8>) -> usize
    where
        I: IntoIterator<Item = (K, &'e V)>,
        V: 'e,
    {
        let items: Vec<(K, &V)> = entries.into_iter().collect();
        let bucket_count = choose_bucket_count(&items.iter().map(|(key, _)| K::hash(key.as_query())).collect::<Vec<_>>());

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); bucket_count];
        for (item_index, (key, _)) in items.iter().enumerate() {
            let bucket = (K::hash(key.as_query()) % bucket_count as u64) as usize;
            buckets[bucket].push(item_index);
        }

        // Storage is laid out bucket by bucket; the directory records each
        // bucket's half-open byte range as the cursor moves.
        let mut storage = Vec::new();
        let mut directory = Vec::with_capacity(bucket_count);
        {
            let mut writer = BufferWriter::new(&mut storage);
            for bucket in &buckets {
                if bucket.is_empty() {
                    directory.push((UNKNOWN_OFFSET, UNKNOWN_OFFSET));
                    continue;
                }
                let begin = writer.position() as u32;
                for &item_index in bucket {
                    let (key, value) = &items[item_index];
                    key.write(&mut writer);
                    value.write(&mut writer);
                }
                directory.push((begin, writer.position() as u32));
            }
        }

        let buffer_size = HEADER_BYTES + bucket_count * BUCKET_ENTRY_BYTES + storage.len();
        let mut writer = BufferWriter::new(buffer);
        writer.write_u32(buffer_size as u32);
        writer.write_u32(items.len() as u32);
        writer.write_u32(bucket_count as u32);
        writer.write_u32(storage.len() as u32);
        for (begin, end) in directory {
            writer.write_u32(begin);
            writer.write_u32(end);
        }
        writer.write_bytes(&storage);

        buffer_size
    }
}

/// Sequential iterator over a mapped map's storage region.
pub struct MapIter<'a, K, V> {
    reader: BufferReader<'a>,
    failed: bool,
    _types: PhantomData<(K, V)>,
}

impl<'a, K: MapKey<'a>, V: Record<'a>> Iterator for MapIter<'a, K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.remaining() == 0 {
            return None;
        }
        let record = K::read(&mut self.reader).and_then(|key| Ok((key, V::read(&mut self.reader)?)));
        if record.is_err() {
            self.failed = true;
        }
        Some(record)
    }
}

/// Pick the bucket count: the prime in `[0.5 n, 1.2 n]` with the fewest
/// collisions over the actual key hashes, ties going to the smallest prime.
/// Falls back to `max(1, n)` when the range holds no prime (tiny maps), so
/// empty and single-entry maps still serialize and attach cleanly.
fn choose_bucket_count(hashes: &[u64]) -> usize {
    let n = hashes.len();
    let upper = (n as f64 * 1.2) as usize;
    let lower = (n as f64 * 0.5) as usize;

    let mut best = 0usize;
    let mut best_collisions = usize::MAX;
    for prime in primes_up_to(upper) {
        if prime < lower {
            continue;
        }
        let mut counts = vec![0u32; prime];
        for &hash in hashes {
            counts[(hash % prime as u64) as usize] += 1;
        }
        let collisions: usize = counts
            .iter()
            .filter(|&&count| count >= 2)
            .map(|&count| count as usize - 1)
            .sum();
        if collisions < best_collisions {
            best_collisions = collisions;
            best = prime;
        }
    }

    if best == 0 {
        n.max(1)
    } else {
        best
    }
}

/// Sieve of Eratosthenes: all primes `<= limit`.
fn primes_up_to(limit: usize) -> Vec<usize> {
    if limit < 2 {
        return Vec::new();
    }
    let mut is_prime = vec![true; limit + 1];
    is_prime[0] = false;
    is_prime[1] = false;
    let mut candidate = 2;
    while candidate * candidate <= limit {
        if is_prime[candidate] {
            let mut multiple = candidate * candidate;
            while multiple <= limit {
                is_prime[multiple] = false;
                multiple += candidate;
            }
        }
        candidate += 1;
    }
    (2..=limit).filter(|&value| is_prime[value]).collect()
}
