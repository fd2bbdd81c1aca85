//! Splitting oversized inputs into bounded chunks.
//!
//! Vendor APIs cap how much can go into one request, either as an item count
//! (page size, batch size) or as an encoded length (BioMart rejects
//! filter-value lists beyond roughly 5000 characters). Both limits map to a
//! chunking strategy here; the resulting chunks are fed to
//! [`scheduler::run`](crate::batch::run).

/// Split `items` into consecutive chunks of at most `chunk_size` elements,
/// preserving order. The last chunk may be smaller.
///
/// A `chunk_size` of zero or an empty input yields an empty chunk list.
///
/// # Examples
///
/// ```
/// use biodbs_fetch::batch::chunk;
///
/// let ids: Vec<u32> = (0..5).collect();
/// assert_eq!(chunk(&ids, 2), vec![vec![0, 1], vec![2, 3], vec![4]]);
/// ```
#[must_use]
pub fn chunk<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    if chunk_size == 0 || items.is_empty() {
        return Vec::new();
    }
    items.chunks(chunk_size).map(<[T]>::to_vec).collect()
}

/// Split `items` so that no chunk's comma-joined encoding exceeds
/// `max_encoded_length` characters.
///
/// The chunk size is first estimated from the average item length (plus one
/// separator byte per item) and then verified greedily against the actual
/// encoded length, so uneven item lengths cannot push a chunk over the
/// ceiling. Every chunk contains at least one item: a single item longer
/// than the ceiling becomes a degenerate chunk of one rather than looping
/// forever, and the server's rejection of it surfaces as that chunk's
/// failure.
#[must_use]
pub fn adaptive_chunk(items: &[String], max_encoded_length: usize) -> Vec<Vec<String>> {
    if items.is_empty() {
        return Vec::new();
    }

    let total_length: usize = items.iter().map(String::len).sum();
    let average_length = total_length / items.len();
    let max_per_chunk = (max_encoded_length / (average_length + 1)).max(1);

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_length = 0;

    for item in items {
        let projected = current_length + item.len() + usize::from(!current.is_empty());
        if !current.is_empty() && (projected > max_encoded_length || current.len() >= max_per_chunk)
        {
            chunks.push(std::mem::take(&mut current));
            current_length = 0;
        }
        current_length += item.len() + usize::from(!current.is_empty());
        current.push(item.clone());
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
