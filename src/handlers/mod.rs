pub mod posts;
pub mod spotify_oauth;
pub mod users;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::JambleError;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?limit=&offset=` as accepted by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// `(limit, offset)`; limit is clamped to [`MAX_PAGE_SIZE`].
    pub fn resolve(&self) -> Result<(i64, i64), JambleError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit < 1 {
            return Err(JambleError::validation("limit must be at least 1"));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(JambleError::validation("offset must not be negative"));
        }
        Ok((limit.min(MAX_PAGE_SIZE), offset))
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, JambleError> {
    Uuid::parse_str(raw.trim()).map_err(|_| JambleError::Validation(format!("invalid id `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().resolve().unwrap(), (50, 0));
        let big = Pagination {
            limit: Some(1000),
            offset: Some(10),
        };
        assert_eq!(big.resolve().unwrap(), (100, 10));
        let bad = Pagination {
            limit: Some(0),
            offset: None,
        };
        assert!(bad.resolve().is_err());
    }

    #[test]
    fn ids_must_be_uuids() {
        assert!(parse_id("not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}
