//! Slices and the base row mapping shared by every slice track

use serde::{Deserialize, Serialize};
use tv_core::TrackKey;
use tv_data::schema::{DUR_COLUMN, ID_COLUMN, NAME_COLUMN, TS_COLUMN};
use tv_data::Row;

/// Rendering flags derived from the slice duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SliceFlags {
    /// Still running at the end of the trace (negative duration)
    pub incomplete: bool,
    /// Zero-length slice
    pub instant: bool,
}

/// A renderable timeline element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slice {
    pub id: i64,
    pub title: String,
    pub start: i64,
    pub duration: i64,
    pub end: i64,
    pub track_key: TrackKey,
    pub flags: SliceFlags,
}

impl Slice {
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

impl AsRef<Slice> for Slice {
    fn as_ref(&self) -> &Slice {
        self
    }
}

/// Address of a slice in a track snapshot.
///
/// Slice ids are only unique within a scope (for interactions, the source
/// `type`). An unscoped reference matches only an unambiguous id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceRef {
    pub id: i64,
    pub scope: Option<String>,
}

impl SliceRef {
    pub fn id(id: i64) -> Self {
        Self { id, scope: None }
    }

    pub fn scoped(scope: impl Into<String>, id: i64) -> Self {
        Self {
            id,
            scope: Some(scope.into()),
        }
    }

    /// Parse `<id>` or `<scope>:<id>`
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        let (scope, id) = match text.rsplit_once(':') {
            Some((scope, id)) if !scope.is_empty() => (Some(scope), id),
            Some(_) => return Err(format!("missing scope in '{}'", text)),
            None => (None, text),
        };
        let id = id
            .parse::<i64>()
            .map_err(|e| format!("invalid slice id '{}': {}", id, e))?;
        Ok(Self {
            id,
            scope: scope.map(str::to_string),
        })
    }
}

/// Map a named-slice row to its base slice.
///
/// Rows are trusted to match the schema; absent or NULL base values fall
/// back to zero / the empty title rather than being rejected.
pub fn base_row_to_slice(row: &Row, track_key: TrackKey) -> Slice {
    let id = row.get_i64(ID_COLUMN).unwrap_or_default();
    let start = row.get_i64(TS_COLUMN).unwrap_or_default();
    let duration = row.get_i64(DUR_COLUMN).unwrap_or_default();
    let title = row.get_str(NAME_COLUMN).unwrap_or_default().to_string();

    let incomplete = duration < 0;
    let end = if incomplete { start } else { start.saturating_add(duration) };

    Slice {
        id,
        title,
        start,
        duration,
        end,
        track_key,
        flags: SliceFlags {
            incomplete,
            instant: duration == 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_complete_slice() {
        let key = Uuid::new_v4();
        let row = Row::new()
            .with("id", 1i64)
            .with("name", "load")
            .with("ts", 100i64)
            .with("dur", 50i64);
        let slice = base_row_to_slice(&row, key);

        assert_eq!(slice.id, 1);
        assert_eq!(slice.title, "load");
        assert_eq!((slice.start, slice.duration, slice.end), (100, 50, 150));
        assert_eq!(slice.track_key, key);
        assert_eq!(slice.flags, SliceFlags::default());
        assert!(slice.contains(120));
    }

    #[test]
    fn test_incomplete_and_instant_flags() {
        let key = Uuid::new_v4();
        let open = base_row_to_slice(
            &Row::new().with("id", 2i64).with("name", "x").with("ts", 10i64).with("dur", -1i64),
            key,
        );
        assert!(open.flags.incomplete);
        assert_eq!(open.end, 10);

        let instant = base_row_to_slice(
            &Row::new().with("id", 3i64).with("name", "x").with("ts", 0i64).with("dur", 0i64),
            key,
        );
        assert!(instant.flags.instant);
        assert!(!instant.flags.incomplete);
    }

    #[test]
    fn test_null_name_maps_to_empty_title() {
        let row = Row::new()
            .with("id", 4i64)
            .with("name", None::<String>)
            .with("ts", 0i64)
            .with("dur", 1i64);
        assert_eq!(base_row_to_slice(&row, Uuid::new_v4()).title, "");
    }

    #[test]
    fn test_parse_slice_ref() {
        assert_eq!(SliceRef::parse("42"), Ok(SliceRef::id(42)));
        assert_eq!(
            SliceRef::parse("chrome_page_loads:1"),
            Ok(SliceRef::scoped("chrome_page_loads", 1))
        );
        assert!(SliceRef::parse(":1").is_err());
        assert!(SliceRef::parse("chrome_page_loads:x").is_err());
    }
}
