use std::collections::BTreeSet;

use super::{pack_label, LabelKey, LABEL_WINDOW, LABEL_WORDS};
use crate::device::BufferDevice;
use crate::tile::{TileKey, TileSlot, LABEL_BUFFER_FIELD};

/// Result of one label encoding request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    /// The packed labels already reflect the requested configuration.
    UpToDate,
    /// Labels were packed and uploaded for `points` points.
    Encoded { points: u32 },
    /// The tile has no buffer yet.
    NotReady,
    /// The tile schema has no usable label region: absent, or not aligned to whole floats.
    MissingLayout,
}

/// Packs the label field of every point into the tile's label region and
/// uploads the affected byte range with a single write.
///
/// The slot keeps a CPU copy of the record buffer; only the label words are
/// patched, so the uploaded range leaves the other fields as they were.
pub(crate) fn encode<D>(
    tile: TileKey,
    slot: &mut TileSlot<D::Buffer>,
    parent_charset: Option<&BTreeSet<char>>,
    key: &LabelKey,
    device: &D,
) -> EncodeOutcome
where
    D: BufferDevice + ?Sized,
{
    if slot.label.is_current(key) {
        return EncodeOutcome::UpToDate;
    }

    let TileSlot {
        buffer,
        payload,
        label,
        charset,
        ..
    } = slot;

    let (Some(buffer), Some(payload)) = (buffer.as_ref(), payload.as_mut()) else {
        return EncodeOutcome::NotReady;
    };
    let Some(layout) = payload.schema.get(LABEL_BUFFER_FIELD).copied() else {
        log::warn!("tile {tile}: schema has no `{LABEL_BUFFER_FIELD}` region, labels skipped");
        return EncodeOutcome::MissingLayout;
    };

    let float_size = std::mem::size_of::<f32>() as u64;
    if layout.offset % float_size != 0 || layout.stride % float_size != 0 {
        log::warn!(
            "tile {tile}: `{LABEL_BUFFER_FIELD}` region (offset {}, stride {}) is not float aligned, labels skipped",
            layout.offset,
            layout.stride
        );
        return EncodeOutcome::MissingLayout;
    }

    if let Some(parent) = parent_charset {
        charset.extend(parent.iter().copied());
    }

    let first = (layout.offset / float_size) as usize;
    let stride = (layout.stride / float_size) as usize;

    let (floats, texts) = payload.batch.split_text_mut(&key.field);

    let mut written = 0u32;
    for i in 0..buffer.count as usize {
        let start = first + i * stride;
        let Some(dst) = floats.get_mut(start..start + LABEL_WORDS) else {
            break;
        };
        let text = texts
            .and_then(|t| t.get(i))
            .map(String::as_str)
            .unwrap_or("");

        charset.extend(text.chars().take(LABEL_WINDOW));
        dst.copy_from_slice(&pack_label(text));
        written += 1;
    }

    if written > 0 {
        let end = first + (written as usize - 1) * stride + LABEL_WORDS;
        device.write_buffer(
            &buffer.handle,
            layout.offset,
            bytemuck::cast_slice(&floats[first..end]),
        );
    }

    log::debug!("tile {tile}: encoded `{}` labels for {written} points", key.field);
    label.last_encoded = Some(key.clone());
    EncodeOutcome::Encoded { points: written }
}
