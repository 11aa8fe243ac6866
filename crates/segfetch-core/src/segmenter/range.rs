//! Segment type and range planning.

/// A single segment: inclusive byte range `[start, end]` of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Position in the plan (0..N-1); also the store entry index.
    pub index: usize,
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl Segment {
    /// Planned length of this segment in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// First offset still missing when `persisted` bytes are already on disk,
    /// or `None` when the segment is complete.
    pub fn resume_start(&self, persisted: u64) -> Option<u64> {
        let effective = self.start.saturating_add(persisted);
        (effective <= self.end).then_some(effective)
    }

    /// True if `persisted` bytes cover the whole planned range.
    pub fn is_complete(&self, persisted: u64) -> bool {
        self.resume_start(persisted).is_none()
    }
}

/// Planning failed because the inputs cannot describe a segmented transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("segment count must be positive")]
    ZeroSegments,
    #[error("total length must be positive")]
    ZeroLength,
}

/// Builds a segment plan for a given total length and segment count.
///
/// Every segment gets `total / count` bytes and the last one also absorbs the
/// remainder. When `segment_count` exceeds `total_length` the count is clamped
/// so no segment is empty.
pub fn plan_segments(total_length: u64, segment_count: usize) -> Result<Vec<Segment>, PlanError> {
    if segment_count == 0 {
        return Err(PlanError::ZeroSegments);
    }
    if total_length == 0 {
        return Err(PlanError::ZeroLength);
    }

    let count = (segment_count as u64).min(total_length);
    let base = total_length / count;
    let last = count - 1;

    let segments = (0..count)
        .map(|i| Segment {
            index: i as usize,
            start: i * base,
            end: if i == last {
                total_length - 1
            } else {
                (i + 1) * base - 1
            },
        })
        .collect();
    Ok(segments)
}
