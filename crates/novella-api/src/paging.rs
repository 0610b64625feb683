use serde::Deserialize;

/// Upper bound for any `limit` query parameter.
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?page=&limit=` as sent by clients. Both are optional.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub limit: u32,
}

impl Page {
    /// Page 1 and up, limit clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            number: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.number - 1).saturating_mul(self.limit)
    }
}

impl PageQuery {
    pub fn page(&self, default_limit: u32) -> Page {
        Page::new(self.page, self.limit, default_limit)
    }
}
