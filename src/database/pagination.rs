use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
    pub rows: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows(total_rows);
        }

        let next_offset = current_offset + page_size;
        let next_offset = (next_offset < total_rows).then_some(next_offset);
        let prev_offset = (current_offset > 0).then(|| (current_offset - page_size).max(0));

        Self {
            count: total_rows,
            next_offset,
            prev_offset,
            rows,
        }
    }

    pub fn no_rows(total_rows: i64) -> Self {
        Self {
            count: total_rows,
            next_offset: None,
            prev_offset: None,
            rows: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_only_next() {
        let page = PageContext::from_rows(vec![1, 2, 3], 7, 3, 0);

        assert_eq!(page.count, 7);
        assert_eq!(page.next_offset, Some(3));
        assert_eq!(page.prev_offset, None);
    }

    #[test]
    fn last_page_has_only_prev() {
        let page = PageContext::from_rows(vec![7], 7, 3, 6);

        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(3));
    }

    #[test]
    fn offset_past_the_end_is_empty() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 7, 3, 30);

        assert_eq!(page, PageContext::no_rows(7));
        assert!(page.rows.is_empty());
    }
}
