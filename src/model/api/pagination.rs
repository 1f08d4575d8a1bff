use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// Which page of a listing to return, taken from the `page_num` (1-indexed) and `page_size`
/// query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_num: usize,
    page_size: usize,
}

impl Pagination {
    /// A page request, if the numbers make sense.
    pub fn new(page_num: usize, page_size: usize) -> Option<Self> {
        if page_num == 0 || !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return None;
        }
        // The offset has to fit the database's signed 64-bit skip.
        (page_num - 1)
            .checked_mul(page_size)
            .and_then(|skip| i64::try_from(skip).ok())?;
        Some(Self {
            page_num,
            page_size,
        })
    }

    pub fn page_num(&self) -> usize {
        self.page_num
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn skip(&self) -> u64 {
        ((self.page_num - 1) * self.page_size) as u64
    }

    pub fn result(self, total: usize) -> PaginationResult {
        PaginationResult {
            page_num: self.page_num,
            page_size: self.page_size,
            total,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page_num = req.query_value::<usize>("page_num").unwrap_or(Ok(1));
        let page_size = req
            .query_value::<usize>("page_size")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE));
        match (page_num, page_size) {
            (Ok(page_num), Ok(page_size)) => match Self::new(page_num, page_size) {
                Some(pagination) => request::Outcome::Success(pagination),
                None => request::Outcome::Failure((Status::BadRequest, ())),
            },
            _ => request::Outcome::Failure((Status::BadRequest, ())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page_num: usize,
    pub page_size: usize,
    pub total: usize,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert_eq!(Pagination::new(0, 10), None);
        assert_eq!(Pagination::new(1, 0), None);
        assert_eq!(Pagination::new(1, MAX_PAGE_SIZE + 1), None);
        assert_eq!(Pagination::new(3, 20).unwrap().skip(), 40);
        assert_eq!(Pagination::default().skip(), 0);
    }

    #[test]
    fn huge_page_numbers_are_refused() {
        assert_eq!(Pagination::new(usize::MAX, MAX_PAGE_SIZE), None);
        assert_eq!(Pagination::new(usize::MAX, 1), None);
        assert_eq!(Pagination::new(2, MAX_PAGE_SIZE).unwrap().skip(), MAX_PAGE_SIZE as u64);
    }
}
